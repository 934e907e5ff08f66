use crate::algorithms::refinement::RefinementFunctor;
use crate::storage::SparseGridData;

///
/// Largest absolute surplus over all outputs of point `seq`. Points without
/// coefficients score zero.
///
fn max_abs_surplus(alpha: &[f64], num_outputs: usize, seq: usize) -> f64
{
    let Some(alpha_i) = alpha.get(seq*num_outputs..(seq+1)*num_outputs) else { return 0.0 };
    alpha_i.iter().fold(0.0_f64, |max, &val| max.max(val.abs()))
}

///
/// Refine the points with the largest absolute hierarchical surplus.
/// `alpha` holds `num_outputs` coefficients per point, in sequence order.
///
pub struct SurplusRefinement<'a>
{
    pub alpha: &'a [f64],
    pub num_outputs: usize,
    pub refinements_num: usize,
    pub threshold: f64,
}

impl<'a> SurplusRefinement<'a>
{
    pub fn new(alpha: &'a [f64], num_outputs: usize, refinements_num: usize, threshold: f64) -> Self
    {
        Self { alpha, num_outputs, refinements_num, threshold }
    }
}

impl RefinementFunctor for SurplusRefinement<'_>
{
    fn eval(&self, _storage: &SparseGridData, seq: usize) -> f64 {
        max_abs_surplus(self.alpha, self.num_outputs, seq)
    }

    #[inline]
    fn refinements_num(&self) -> usize {
        self.refinements_num
    }

    #[inline]
    fn threshold(&self) -> f64 {
        self.threshold
    }
}

///
/// Remove the points with the smallest absolute surplus, as long as it is
/// below `threshold`.
///
pub struct SurplusCoarsening<'a>
{
    pub alpha: &'a [f64],
    pub num_outputs: usize,
    pub removements_num: usize,
    pub threshold: f64,
}

impl<'a> SurplusCoarsening<'a>
{
    pub fn new(alpha: &'a [f64], num_outputs: usize, removements_num: usize, threshold: f64) -> Self
    {
        Self { alpha, num_outputs, removements_num, threshold }
    }
}

impl RefinementFunctor for SurplusCoarsening<'_>
{
    fn eval(&self, _storage: &SparseGridData, seq: usize) -> f64 {
        max_abs_surplus(self.alpha, self.num_outputs, seq)
    }

    fn start(&self) -> f64 {
        f64::MAX
    }

    #[inline]
    fn refinements_num(&self) -> usize {
        self.removements_num
    }

    #[inline]
    fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::algorithms::coarsening::Coarsening;
    use crate::algorithms::refinement::{BaseRefinement, Refinement};
    use crate::generators::regular;

    #[test]
    fn surplus_of_multiple_outputs()
    {
        let storage = SparseGridData::new(1);
        let alpha = [1.0, -3.0, 0.5, 0.25];
        let functor = SurplusRefinement::new(&alpha, 2, 1, 0.0);
        assert_eq!(functor.eval(&storage, 0), 3.0);
        assert_eq!(functor.eval(&storage, 1), 0.5);
        assert_eq!(functor.eval(&storage, 2), 0.0);
        let empty = SurplusRefinement::new(&alpha, 0, 1, 0.0);
        assert_eq!(empty.eval(&storage, 0), 0.0);
        let nan = [f64::NAN, -2.0];
        assert_eq!(SurplusRefinement::new(&nan, 2, 1, 0.0).eval(&storage, 0), 2.0);
    }

    #[test]
    fn refine_largest_surplus()
    {
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        let alpha = [1.0, 0.1, -0.7];
        let functor = SurplusRefinement::new(&alpha, 1, 1, 0.5);
        let created = BaseRefinement::default().free_refine(&mut storage, &functor).expect("refinement failed");
        assert_eq!(created.len(), 2);
        assert!(storage.contains(&crate::storage::GridPoint::new(&[3], &[5], true)));
    }

    #[test]
    fn coarsen_smallest_surplus()
    {
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        let alpha = [1.0, 0.1, -0.7];
        let functor = SurplusCoarsening::new(&alpha, 1, 2, 0.5);
        let result = Coarsening::new(1).free_coarsen(&mut storage, &functor).expect("coarsening failed");
        assert_eq!(result.removed.len(), 1);
        assert_eq!(result.compact(&alpha, 1), vec![1.0, -0.7]);
    }
}
