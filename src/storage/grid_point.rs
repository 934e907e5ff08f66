use std::hash::{Hash, Hasher};

use bitfield_struct::bitfield;
use serde::{Deserialize, Serialize};

/// Deepest level a point may carry. Indices are `u32`, so `2^level` must fit.
pub const MAX_LEVEL: u8 = 31;

#[bitfield(u8, new=false)]
#[derive(Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPointFlags
{
    pub is_leaf: bool,
    pub is_inner: bool,
    #[bits(6)]
    pub _empty: u8
}

impl GridPointFlags
{
    pub fn new(level: &[u8], is_leaf: bool) -> Self
    {
        let mut r = Self::default();
        r.set_is_leaf(is_leaf);
        r.set_is_inner(!level.contains(&0));
        r
    }
    /// update `is_inner` flag...
    pub fn update_is_inner(&mut self, level: &[u8])
    {
        self.set_is_inner(!level.contains(&0));
    }
}

///
/// A point of a hierarchical grid: one `(level, index)` pair per dimension plus
/// the leaf flag. Identity (equality, hashing, ordering) only looks at the
/// `(level, index)` pairs.
///
/// For `level >= 1` the index is odd and lies in `1..2^level`; level zero
/// denotes the left (`index == 0`) or right (`index == 1`) domain boundary.
///
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct GridPoint
{
    pub level: Vec<u8>,
    pub index: Vec<u32>,
    pub(crate) flags: GridPointFlags,
}

impl Hash for GridPoint
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.index.hash(state);
    }
}
impl Default for GridPoint
{
    fn default() -> Self {
        Self { level: vec![], index: vec![], flags: GridPointFlags(0) }
    }
}
impl PartialOrd for GridPoint
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(std::cmp::Ord::cmp(self, other))
    }
}
impl Ord for GridPoint{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.level.cmp(&other.level).then(self.index.cmp(&other.index))
    }
}

impl PartialEq for GridPoint
{
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for GridPoint{}

impl GridPoint
{
    pub fn new(level: &[u8], index: &[u32], is_leaf: bool) -> Self
    {
        debug_assert_eq!(level.len(), index.len());
        let flags = GridPointFlags::new(level, is_leaf);
        Self { level: level.to_vec(), index: index.to_vec(), flags }
    }

    ///
    /// Point with level one, index one in every dimension (the center of the domain).
    ///
    pub fn root(num_inputs: usize) -> Self
    {
        Self::new(&vec![1; num_inputs], &vec![1; num_inputs], true)
    }

    pub fn zero_index(num_inputs: usize) -> Self
    {
        Self{ level: vec![0; num_inputs], index: vec![0; num_inputs], flags: GridPointFlags(0) }
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.level.len()
    }

    #[inline]
    pub fn get(&self, dim: usize) -> (u8, u32)
    {
        (self.level[dim], self.index[dim])
    }

    ///
    /// Overwrite the `(level, index)` pair of one dimension. The caller keeps the
    /// pair valid (odd index below `2^level`, or `0`/`1` on level zero).
    ///
    #[inline]
    pub fn set(&mut self, dim: usize, level: u8, index: u32)
    {
        debug_assert!(is_valid_pair(level, index), "invalid level/index pair ({level}, {index})");
        self.level[dim] = level;
        self.index[dim] = index;
        self.flags.update_is_inner(&self.level);
    }

    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }
    pub fn set_is_leaf(&mut self, is_leaf: bool)
    {
        self.flags.set_is_leaf(is_leaf);
    }

    ///
    /// This is an inner point if no levels are zero...
    ///
    pub fn is_inner_point(&self) -> bool
    {
        !self.level.contains(&0)
    }
    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }
    #[inline]
    pub fn level_max(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }
    pub fn level_min(&self) -> u8
    {
        *self.level.iter().min().unwrap_or(&0)
    }

    ///
    /// Left child in direction `dim`. A level-zero point has a single child,
    /// the level-one point.
    ///
    pub fn left_child(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        if self.level[dim] == 0
        {
            r.set(dim, 1, 1);
            return r;
        }
        r.set(dim, self.level[dim] + 1, 2*self.index[dim] - 1);
        r
    }
    pub fn right_child(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        if self.level[dim] == 0
        {
            r.set(dim, 1, 1);
            return r;
        }
        r.set(dim, self.level[dim] + 1, 2*self.index[dim] + 1);
        r
    }

    ///
    /// Hierarchical parent in direction `dim`. The parent of a level-one point
    /// is the left boundary point `(0, 0)`. Must not be called on level zero.
    ///
    pub fn parent(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        let (level, index) = self.get(dim);
        debug_assert!(level > 0, "level-zero points have no parent");
        if level == 1
        {
            r.set(dim, 0, 0);
            return r;
        }
        let mut parent_index = (index + 1) / 2;
        if parent_index % 2 == 0
        {
            parent_index -= 1;
        }
        r.set(dim, level - 1, parent_index);
        r
    }

    ///
    /// Every point this one is a child of: the hierarchical parent of each
    /// dimension with level >= 2, and both boundary points of each dimension on
    /// level one.
    ///
    pub fn parents(&self) -> Vec<GridPoint>
    {
        let mut parents = Vec::with_capacity(self.dim());
        for dim in 0..self.dim()
        {
            match self.level[dim]
            {
                0 => {},
                1 =>
                {
                    let mut left = self.clone();
                    left.set(dim, 0, 0);
                    let mut right = self.clone();
                    right.set(dim, 0, 1);
                    parents.push(left);
                    parents.push(right);
                }
                _ => parents.push(self.parent(dim)),
            }
        }
        parents
    }

    #[inline]
    pub fn is_left_child(&self, dim: usize) -> bool
    {
        ((self.index[dim] + 1) / 2) % 2 == 1
    }

    ///
    /// Coordinate in the unit interval for direction `dim`.
    ///
    pub fn standard_coordinate(&self, dim: usize) -> f64
    {
        standard_coordinate(self.level[dim], self.index[dim])
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        (0..self.dim()).map(|d| self.standard_coordinate(d)).collect()
    }

    ///
    /// Whether the `(level, index)` pair of every dimension is valid.
    ///
    pub fn is_valid(&self) -> bool
    {
        self.level.len() == self.index.len() &&
            self.level.iter().zip(self.index.iter()).all(|(&l, &i)| is_valid_pair(l, i))
    }
}

#[inline]
pub(crate) fn standard_coordinate(level: u8, index: u32) -> f64
{
    if level == 0
    {
        if index == 0 { 0.0 } else { 1.0 }
    }
    else
    {
        index as f64 / (1u64 << level) as f64
    }
}

#[inline]
pub(crate) fn is_valid_pair(level: u8, index: u32) -> bool
{
    if level == 0
    {
        index <= 1
    }
    else
    {
        level <= MAX_LEVEL && index % 2 == 1 && (index as u64) < (1u64 << level)
    }
}

pub struct GridPointRef<'a> {
    pub(crate) index: &'a [u32],
    pub(crate) level: &'a [u8],
    pub(crate) flags: &'a GridPointFlags
}
impl GridPointRef<'_>
{
    #[inline]
    pub fn level(&self) -> &[u8]
    {
        self.level
    }
    #[inline]
    pub fn index(&self) -> &[u32]
    {
        self.index
    }
    #[inline]
    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }
    #[inline]
    pub fn is_inner_point(&self) -> bool
    {
        self.flags.is_inner()
    }
    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        self.level.iter().zip(self.index.iter()).map(|(&l, &i)| standard_coordinate(l, i)).collect()
    }
    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }
    #[inline]
    pub fn level_max(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }
    pub fn level_min(&self) -> u8
    {
        *self.level.iter().min().unwrap_or(&0)
    }
}

impl PartialEq for GridPointRef<'_>
{
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for GridPointRef<'_>{}

impl<'a> From<(&'a [u32], &'a [u8], &'a GridPointFlags)> for GridPoint
{
    fn from((index, level, flags): (&[u32], &[u8], &GridPointFlags)) -> Self {
        Self { index: index.to_owned(), level: level.to_owned(), flags: *flags }
    }
}

impl<'a> From<(&'a [u32], &'a [u8], &'a GridPointFlags)> for GridPointRef<'a>
{
    fn from((index, level, flags): (&'a [u32], &'a [u8], &'a GridPointFlags)) -> Self {
        Self { index, level, flags }
    }
}

impl From<GridPointRef<'_>> for GridPoint
{
    fn from(value: GridPointRef<'_>) -> Self {
        GridPoint { level: value.level.to_owned(), index: value.index.to_owned(), flags: *value.flags }
    }
}
