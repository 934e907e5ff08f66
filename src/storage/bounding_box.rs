use serde::{Deserialize, Serialize};

///
/// Axis aligned domain of a grid together with the Dirichlet flags of each
/// boundary face. Only used to map between unit and real coordinates, it never
/// influences which points a grid contains.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox
{
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    #[serde(default)]
    pub dirichlet_lower: Vec<bool>,
    #[serde(default)]
    pub dirichlet_upper: Vec<bool>,
}

impl Default for BoundingBox
{
    #[inline]
    fn default() -> Self {
        Self { lower: vec![], upper: vec![], dirichlet_lower: vec![], dirichlet_upper: vec![] }
    }
}

impl BoundingBox
{
    #[inline]
    pub fn new(lower: &[f64], upper: &[f64]) -> Self
    {
        Self { lower: lower.to_vec(), upper: upper.to_vec(), dirichlet_lower: vec![false; lower.len()], dirichlet_upper: vec![false; upper.len()] }
    }
    pub fn with_dim(num_inputs: usize) -> Self
    {
        Self::new(&vec![0.0; num_inputs], &vec![1.0; num_inputs])
    }
    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.lower.len()
    }
    #[inline]
    pub fn width(&self, dim: usize) -> f64
    {
        self.upper[dim] - self.lower[dim]
    }

    pub fn set_dirichlet(&mut self, dim: usize, lower: bool, upper: bool)
    {
        self.dirichlet_lower.resize(self.lower.len(), false);
        self.dirichlet_upper.resize(self.upper.len(), false);
        self.dirichlet_lower[dim] = lower;
        self.dirichlet_upper[dim] = upper;
    }

    #[inline]
    pub fn is_dirichlet_lower(&self, dim: usize) -> bool
    {
        self.dirichlet_lower.get(dim).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_dirichlet_upper(&self, dim: usize) -> bool
    {
        self.dirichlet_upper.get(dim).copied().unwrap_or(false)
    }

    ///
    /// True if this is the unit hypercube.
    ///
    pub fn is_unit_cube(&self) -> bool
    {
        self.lower.iter().all(|&l| l == 0.0) && self.upper.iter().all(|&u| u == 1.0)
    }

    ///
    /// Volume of hypercube (width(dim1)*...*width(dim_n))
    ///
    #[inline]
    pub fn volume(&self) -> f64
    {
        (0..self.lower.len()).map(|d| self.width(d)).product()
    }
    #[inline]
    pub fn to_unit_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().enumerate().map(|(i, &x)| (x - self.lower[i]) / self.width(i)).collect()
    }
    #[inline]
    pub fn to_real_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        let mut r = point.to_vec();
        self.to_real_coordinate_in_place(&mut r);
        r
    }
    #[inline]
    pub fn to_real_coordinate_in_place(&self, point: &mut [f64])
    {
        for (i, x) in point.iter_mut().enumerate()
        {
            *x = self.lower[i] + self.width(i) * *x;
        }
    }
    #[inline]
    pub fn contains(&self, point: &[f64]) -> bool
    {
        point.iter().enumerate().all(|(d, &x)| self.lower[d] <= x && x <= self.upper[d])
    }
}

#[test]
fn test_bounding_box_transforms()
{
    let mut bbox = BoundingBox::new(&[-1.0, 2.0], &[1.0, 6.0]);
    assert_eq!(bbox.volume(), 8.0);
    assert_eq!(bbox.to_real_coordinate(&[0.5, 0.25]), vec![0.0, 3.0]);
    assert_eq!(bbox.to_unit_coordinate(&[0.0, 3.0]), vec![0.5, 0.25]);
    assert!(bbox.contains(&[1.0, 2.0]));
    assert!(!bbox.contains(&[1.5, 2.0]));
    assert!(!bbox.is_unit_cube());
    bbox.set_dirichlet(1, true, false);
    assert!(bbox.is_dirichlet_lower(1));
    assert!(!bbox.is_dirichlet_upper(1));
    assert!(BoundingBox::with_dim(3).is_unit_cube());
}
