//!
//! Hash indexed storage of the points of a hierarchical sparse grid.
//!
//! Point data is kept as flat structure-of-arrays (`level`, `index`, `flags`),
//! addressed by a dense sequence number, and a hash map resolves a point's
//! `(level, index)` key to that sequence number.
//!
//! # Concurrency
//!
//! `SparseGridData` is not internally synchronized. Structural mutation
//! (`insert`, `remove`, refinement, coarsening) needs exclusive access, which
//! the borrow checker enforces through `&mut self`. Read-only sweeps over a
//! fixed point set (`find`, `nodes`, `points`, scoring) may run in parallel;
//! with the `rayon` feature `recalc_leaf_property` and the scoring pass of the
//! refinement engine do exactly that before writing back sequentially.
//!
mod bounding_box;
mod grid_point;
pub mod text_format;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::SGError;

pub use bounding_box::BoundingBox;
pub use grid_point::{GridPoint, GridPointFlags, GridPointRef, MAX_LEVEL};

pub type PointMap = FxHashMap<GridPoint, u32>;

/// Version tag written into serialized storage records.
pub const STORAGE_RECORD_VERSION: u32 = 1;

#[derive(Clone, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(into = "StorageRecord", try_from = "StorageRecord")]
pub struct SparseGridData
{
    pub bounding_box: BoundingBox,
    pub(crate) index: Vec<u32>,
    pub(crate) level: Vec<u8>,
    pub(crate) flags: Vec<GridPointFlags>,
    pub(crate) num_inputs: usize,
    pub(crate) map: PointMap,
    pub(crate) has_boundary: bool,
    pub(crate) algorithmic_dimensions: Vec<usize>,
}

impl Default for SparseGridData
{
    fn default() -> Self {
        Self::new(0)
    }
}

impl SparseGridData
{
    pub fn new(num_inputs: usize) -> Self
    {
        Self { bounding_box: BoundingBox::with_dim(num_inputs), index: Vec::new(), level: Vec::new(), flags: Vec::new(), num_inputs, map: PointMap::default(), has_boundary: false,
            algorithmic_dimensions: (0..num_inputs).collect() }
    }

    pub fn with_bounding_box(bounding_box: BoundingBox) -> Self
    {
        let mut storage = Self::new(bounding_box.num_inputs());
        storage.bounding_box = bounding_box;
        storage
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.num_inputs
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.flags.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.flags.len()
    }

    #[inline(always)]
    pub fn has_boundary(&self) -> bool
    {
        self.has_boundary
    }

    #[inline]
    pub fn set_has_boundary(&mut self, has_boundary: bool)
    {
        self.has_boundary = has_boundary;
    }

    ///
    /// Dimensions the operators sweep over. Defaults to every dimension.
    ///
    #[inline]
    pub fn algorithmic_dimensions(&self) -> &[usize]
    {
        &self.algorithmic_dimensions
    }

    ///
    /// Restrict the operator sweeps to `dims`. Each entry must name a distinct
    /// dimension of the grid.
    ///
    pub fn set_algorithmic_dimensions(&mut self, dims: &[usize]) -> Result<(), SGError>
    {
        if dims.len() > self.num_inputs
        {
            return Err(SGError::DimensionMismatch { expected: self.num_inputs, found: dims.len() });
        }
        let mut seen = vec![false; self.num_inputs];
        for &dim in dims
        {
            if dim >= self.num_inputs || std::mem::replace(&mut seen[dim], true)
            {
                return Err(SGError::InvalidParameter);
            }
        }
        self.algorithmic_dimensions = dims.to_vec();
        Ok(())
    }

    #[inline]
    fn range(&self, seq: usize) -> std::ops::Range<usize>
    {
        seq*self.num_inputs..(seq+1)*self.num_inputs
    }

    ///
    /// Owned copy of the point with sequence number `seq`.
    ///
    #[inline]
    pub fn point(&self, seq: usize) -> GridPoint
    {
        let range = self.range(seq);
        GridPoint::from((&self.index[range.clone()], &self.level[range], &self.flags[seq]))
    }

    #[inline]
    pub fn point_ref(&self, seq: usize) -> GridPointRef<'_>
    {
        let range = self.range(seq);
        GridPointRef::from((&self.index[range.clone()], &self.level[range], &self.flags[seq]))
    }

    #[inline]
    pub fn index(&self, seq: usize, dim: usize) -> u32
    {
        self.index[self.num_inputs*seq + dim]
    }

    #[inline(always)]
    pub fn level(&self, seq: usize, dim: usize) -> u8
    {
        self.level[self.num_inputs*seq + dim]
    }

    #[inline]
    pub fn get(&self, seq: usize, dim: usize) -> (u8, u32)
    {
        (self.level(seq, dim), self.index(seq, dim))
    }

    #[inline]
    pub fn is_leaf(&self, seq: usize) -> bool
    {
        self.flags[seq].is_leaf()
    }

    #[inline]
    pub fn set_is_leaf(&mut self, seq: usize, value: bool)
    {
        self.flags[seq].set_is_leaf(value);
    }

    #[inline]
    pub fn is_inner_point(&self, seq: usize) -> bool
    {
        self.flags[seq].is_inner()
    }

    #[inline]
    pub fn level_sum(&self, seq: usize) -> u32
    {
        self.level[self.range(seq)].iter().map(|&i| i as u32).sum()
    }

    #[inline]
    pub fn level_max(&self, seq: usize) -> u8
    {
        *self.level[self.range(seq)].iter().max().unwrap_or(&0)
    }

    #[inline]
    pub fn level_min(&self, seq: usize) -> u8
    {
        *self.level[self.range(seq)].iter().min().unwrap_or(&0)
    }

    ///
    /// Deepest level of any point in any dimension.
    ///
    pub fn max_level(&self) -> u8
    {
        self.level.iter().copied().max().unwrap_or(0)
    }

    pub fn num_inner_points(&self) -> usize
    {
        self.flags.iter().filter(|f| f.is_inner()).count()
    }

    ///
    /// Insert a point and return its sequence number. If an equal point is
    /// already stored nothing changes and the existing sequence number is
    /// returned.
    ///
    pub fn insert(&mut self, mut point: GridPoint) -> usize
    {
        debug_assert_eq!(point.dim(), self.num_inputs, "point dimension does not match storage");
        if let Some(&seq) = self.map.get(&point)
        {
            return seq as usize;
        }
        // make sure our is_inner flag is up-to-date...
        point.flags.update_is_inner(&point.level);
        let seq = self.flags.len();
        self.flags.push(point.flags);
        self.index.extend_from_slice(&point.index);
        self.level.extend_from_slice(&point.level);
        self.map.insert(point, seq as u32);
        seq
    }

    ///
    /// Replace the point stored at `seq`. Fails if `seq` is out of range or the
    /// new key already belongs to a different point.
    ///
    pub fn update(&mut self, mut point: GridPoint, seq: usize) -> Result<(), SGError>
    {
        if seq >= self.len()
        {
            return Err(SGError::InvalidIndex);
        }
        if point.dim() != self.num_inputs
        {
            return Err(SGError::DimensionMismatch { expected: self.num_inputs, found: point.dim() });
        }
        if let Some(&other) = self.map.get(&point)
        {
            if other as usize != seq
            {
                return Err(SGError::InvalidIndex);
            }
        }
        let old = self.point(seq);
        self.map.remove(&old);
        point.flags.update_is_inner(&point.level);
        let range = self.range(seq);
        self.index[range.clone()].copy_from_slice(&point.index);
        self.level[range].copy_from_slice(&point.level);
        self.flags[seq] = point.flags;
        self.map.insert(point, seq as u32);
        Ok(())
    }

    #[inline]
    pub fn find(&self, point: &GridPoint) -> Option<usize>
    {
        self.map.get(point).map(|&v| v as usize)
    }

    #[inline]
    pub fn contains(&self, point: &GridPoint) -> bool
    {
        self.map.contains_key(point)
    }

    ///
    /// Remove the most recently inserted point.
    ///
    pub fn delete_last(&mut self) -> Option<GridPoint>
    {
        let seq = self.len().checked_sub(1)?;
        let point = self.point(seq);
        self.map.remove(&point);
        self.flags.pop();
        let start = seq * self.num_inputs;
        self.index.truncate(start);
        self.level.truncate(start);
        Some(point)
    }

    ///
    /// Remove the point with sequence number `seq`. The relative order of the
    /// remaining points is kept, so every point stored after `seq` moves down
    /// by one. Sequence numbers held across this call are stale; re-resolve
    /// them through `find`.
    ///
    pub fn remove(&mut self, seq: usize) -> Option<GridPoint>
    {
        if seq >= self.len()
        {
            return None;
        }
        let point = self.point(seq);
        self.map.remove(&point);
        let range = self.range(seq);
        self.index.drain(range.clone());
        self.level.drain(range);
        self.flags.remove(seq);
        for value in self.map.values_mut()
        {
            if *value as usize > seq
            {
                *value -= 1;
            }
        }
        Some(point)
    }

    ///
    /// Remove a point by key, returning the sequence number it had.
    ///
    pub fn remove_point(&mut self, point: &GridPoint) -> Option<usize>
    {
        let seq = self.find(point)?;
        self.remove(seq);
        Some(seq)
    }

    ///
    /// Remove a batch of points given by sequence number, compact the storage in
    /// one pass and recompute all leaf flags. Returns, in the new order, the old
    /// sequence number of every remaining point.
    ///
    pub fn delete_points(&mut self, remove: &[usize]) -> Vec<usize>
    {
        let remove: IndexSet<usize> = remove.iter().copied().collect();
        let keep: IndexSet<usize> = (0..self.len()).filter(|seq| !remove.contains(seq)).collect();
        self.retain(&keep);
        self.recalc_leaf_property();
        keep.into_iter().collect()
    }

    ///
    /// Keep only the listed points (in the listed order) and rebuild the map.
    /// Leaf flags are copied as they are.
    ///
    pub fn retain(&mut self, points_to_keep: &IndexSet<usize>)
    {
        let mut indices = Vec::with_capacity(points_to_keep.len()*self.num_inputs);
        let mut levels = Vec::with_capacity(points_to_keep.len()*self.num_inputs);
        let mut flags = Vec::with_capacity(points_to_keep.len());
        for &i in points_to_keep
        {
            indices.extend_from_slice(&self.index[self.range(i)]);
            levels.extend_from_slice(&self.level[self.range(i)]);
            flags.push(self.flags[i]);
        }
        self.index = indices;
        self.level = levels;
        self.flags = flags;
        self.generate_map();
    }

    ///
    /// Remove all points. Sequence numbers restart at zero.
    ///
    pub fn clear(&mut self)
    {
        self.index.clear();
        self.level.clear();
        self.flags.clear();
        self.map.clear();
    }

    ///
    /// Iterate over `(key, sequence number)` pairs. The order is unspecified
    /// but stable while the storage is borrowed.
    ///
    pub fn iter(&self) -> impl Iterator<Item = (&GridPoint, usize)> + '_
    {
        self.map.iter().map(|(point, &seq)| (point, seq as usize))
    }

    ///
    /// Return the nodes in the grid, in sequence order.
    ///
    pub fn nodes(&self) -> NodeIterator<'_> {
        NodeIterator::new(self)
    }

    ///
    /// Return the real coordinates for each node...
    ///
    pub fn points(&self) -> PointIterator<'_>
    {
        PointIterator::new(self)
    }

    pub fn generate_map(&mut self)
    {
        let mut map = PointMap::default();
        map.reserve(self.len());
        for seq in 0..self.len()
        {
            map.insert(self.point(seq), seq as u32);
        }
        self.map = map;
    }

    #[inline]
    pub fn map(&self) -> &PointMap
    {
        &self.map
    }

    #[inline]
    pub fn map_initialized(&self) -> bool
    {
        self.len() == self.map.len()
    }

    ///
    /// Whether `point` has at least one child stored in any dimension. A
    /// level-zero coordinate only has the level-one child.
    ///
    pub fn has_children(&self, point: &GridPoint) -> bool
    {
        let mut neighbour = point.clone();
        for dim in 0..self.num_inputs
        {
            let (level, index) = point.get(dim);
            if level >= MAX_LEVEL
            {
                continue;
            }
            if level == 0
            {
                neighbour.set(dim, 1, 1);
                if self.contains(&neighbour)
                {
                    return true;
                }
            }
            else
            {
                neighbour.set(dim, level + 1, 2 * index - 1);
                if self.contains(&neighbour)
                {
                    return true;
                }
                neighbour.set(dim, level + 1, 2 * index + 1);
                if self.contains(&neighbour)
                {
                    return true;
                }
            }
            neighbour.set(dim, level, index);
        }
        false
    }

    ///
    /// Leaf test against the stored structure rather than the cached flag.
    ///
    #[inline]
    pub fn is_structural_leaf(&self, seq: usize) -> bool
    {
        !self.has_children(&self.point(seq))
    }

    ///
    /// Recompute every leaf flag from the stored structure.
    ///
    pub fn recalc_leaf_property(&mut self)
    {
        #[cfg(feature = "rayon")]
        let leaves: Vec<bool> = {
            use rayon::iter::{IntoParallelIterator, ParallelIterator};
            let storage = &*self;
            (0..storage.len()).into_par_iter().map(|seq| storage.is_structural_leaf(seq)).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let leaves: Vec<bool> = (0..self.len()).map(|seq| self.is_structural_leaf(seq)).collect();
        for (flag, is_leaf) in self.flags.iter_mut().zip(leaves)
        {
            flag.set_is_leaf(is_leaf);
        }
    }

    ///
    /// Recompute the leaf flag of a single point, resolved by key.
    ///
    pub(crate) fn update_leaf(&mut self, point: &GridPoint)
    {
        if let Some(seq) = self.find(point)
        {
            let is_leaf = !self.has_children(point);
            self.flags[seq].set_is_leaf(is_leaf);
        }
    }

    ///
    /// Diagnostic: the map and the point arrays describe the same set and every
    /// key maps back to its own slot.
    ///
    pub fn is_consistent(&self) -> bool
    {
        self.map.len() == self.len() &&
            self.index.len() == self.len() * self.num_inputs &&
            self.level.len() == self.len() * self.num_inputs &&
            (0..self.len()).all(|seq| self.find(&self.point(seq)) == Some(seq))
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox
    {
        &self.bounding_box
    }
    #[inline]
    pub fn bounding_box_mut(&mut self) -> &mut BoundingBox
    {
        &mut self.bounding_box
    }

    pub fn unit_coordinate(&self, seq: usize) -> Vec<f64>
    {
        self.point_ref(seq).unit_coordinate()
    }

    pub fn real_coordinate(&self, seq: usize) -> Vec<f64>
    {
        let mut point = self.unit_coordinate(seq);
        self.bounding_box.to_real_coordinate_in_place(&mut point);
        point
    }
}

pub struct NodeIterator<'a> {
    storage: &'a SparseGridData,
    current_seq: usize,
}
impl<'a> NodeIterator<'a>
{
    pub fn new( storage: &'a SparseGridData) -> Self
    {
        Self { storage, current_seq: 0 }
    }
}

impl<'a> Iterator for NodeIterator<'a> {
    type Item = GridPointRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_seq < self.storage.len() {
            let item = self.storage.point_ref(self.current_seq);
            self.current_seq += 1;
            Some(item)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.storage.len() - self.current_seq;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for NodeIterator<'_> {}

pub struct PointIterator<'a> {
    pub storage: &'a SparseGridData,
    current_seq: usize,
}
impl<'a> PointIterator<'a>
{
    pub fn new( storage: &'a SparseGridData) -> Self
    {
        Self { storage, current_seq: 0 }
    }
}

impl Iterator for PointIterator<'_> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_seq < self.storage.len() {
            let point = self.storage.real_coordinate(self.current_seq);
            self.current_seq += 1;
            Some(point)
        } else {
            None
        }
    }
}

///
/// Flat, map-free representation used by the serde formats. The hash map is
/// rebuilt on load.
///
#[derive(Serialize, Deserialize)]
struct StorageRecord
{
    version: u32,
    num_inputs: usize,
    has_boundary: bool,
    bounding_box: BoundingBox,
    level: Vec<u8>,
    index: Vec<u32>,
    leaf: Vec<bool>,
    #[serde(default)]
    algorithmic_dimensions: Option<Vec<usize>>,
}

impl From<SparseGridData> for StorageRecord
{
    fn from(storage: SparseGridData) -> Self {
        let leaf = storage.flags.iter().map(|f| f.is_leaf()).collect();
        Self { version: STORAGE_RECORD_VERSION, num_inputs: storage.num_inputs, has_boundary: storage.has_boundary,
            bounding_box: storage.bounding_box, level: storage.level, index: storage.index, leaf,
            algorithmic_dimensions: Some(storage.algorithmic_dimensions) }
    }
}

impl TryFrom<StorageRecord> for SparseGridData
{
    type Error = SGError;

    fn try_from(record: StorageRecord) -> Result<Self, Self::Error> {
        if record.version > STORAGE_RECORD_VERSION
        {
            return Err(SGError::UnsupportedFormat);
        }
        let expected = record.leaf.len().checked_mul(record.num_inputs).ok_or(SGError::DeserializationFailed)?;
        if record.level.len() != expected || record.index.len() != expected || record.bounding_box.num_inputs() != record.num_inputs
        {
            return Err(SGError::DeserializationFailed);
        }
        let mut storage = SparseGridData::with_bounding_box(record.bounding_box);
        storage.num_inputs = record.num_inputs;
        storage.has_boundary = record.has_boundary;
        if let Some(dims) = &record.algorithmic_dimensions
        {
            storage.set_algorithmic_dimensions(dims).map_err(|_| SGError::DeserializationFailed)?;
        }
        for (seq, &is_leaf) in record.leaf.iter().enumerate()
        {
            let range = seq*record.num_inputs..(seq+1)*record.num_inputs;
            let point = GridPoint::new(&record.level[range.clone()], &record.index[range], is_leaf);
            if !point.is_valid() || storage.insert(point) != seq
            {
                return Err(SGError::DeserializationFailed);
            }
        }
        Ok(storage)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn small_storage() -> SparseGridData
    {
        let mut storage = SparseGridData::new(2);
        storage.insert(GridPoint::new(&[1, 1], &[1, 1], false));
        storage.insert(GridPoint::new(&[2, 1], &[1, 1], true));
        storage.insert(GridPoint::new(&[2, 1], &[3, 1], true));
        storage.insert(GridPoint::new(&[1, 2], &[1, 1], true));
        storage
    }

    #[test]
    fn insert_is_idempotent()
    {
        let mut storage = small_storage();
        let len = storage.len();
        let seq = storage.insert(GridPoint::new(&[2, 1], &[3, 1], false));
        assert_eq!(seq, 2);
        assert_eq!(storage.len(), len);
        // the stored flag is untouched
        assert!(storage.is_leaf(2));
        assert!(storage.is_consistent());
    }

    #[test]
    fn find_and_contains()
    {
        let storage = small_storage();
        assert_eq!(storage.find(&GridPoint::new(&[1, 2], &[1, 1], false)), Some(3));
        assert!(!storage.contains(&GridPoint::new(&[1, 2], &[1, 3], false)));
        assert_eq!(storage.iter().count(), 4);
        for (point, seq) in storage.iter()
        {
            assert_eq!(&storage.point(seq), point);
        }
    }

    #[test]
    fn remove_renumbers_later_points()
    {
        let mut storage = small_storage();
        let removed = storage.remove(1).expect("point exists");
        assert_eq!(removed, GridPoint::new(&[2, 1], &[1, 1], true));
        assert_eq!(storage.len(), 3);
        assert_eq!(storage.find(&GridPoint::new(&[2, 1], &[3, 1], true)), Some(1));
        assert_eq!(storage.find(&GridPoint::new(&[1, 2], &[1, 1], true)), Some(2));
        assert!(storage.is_consistent());
        assert!(storage.remove(7).is_none());
    }

    #[test]
    fn delete_points_reports_survivors()
    {
        let mut storage = small_storage();
        let kept = storage.delete_points(&[1, 2]);
        assert_eq!(kept, vec![0, 3]);
        assert_eq!(storage.len(), 2);
        assert!(storage.is_consistent());
        // root still has the child in dimension 1
        assert!(!storage.is_leaf(0));
        storage.remove_point(&GridPoint::new(&[1, 2], &[1, 1], true));
        storage.recalc_leaf_property();
        assert!(storage.is_leaf(0));
    }

    #[test]
    fn delete_last_and_clear()
    {
        let mut storage = small_storage();
        assert_eq!(storage.delete_last(), Some(GridPoint::new(&[1, 2], &[1, 1], true)));
        assert_eq!(storage.len(), 3);
        assert!(storage.is_consistent());
        storage.clear();
        assert!(storage.is_empty());
        assert_eq!(storage.insert(GridPoint::root(2)), 0);
        assert!(storage.delete_last().is_some());
        assert!(storage.delete_last().is_none());
    }

    #[test]
    fn update_replaces_key()
    {
        let mut storage = small_storage();
        storage.update(GridPoint::new(&[1, 2], &[1, 3], true), 3).expect("valid update");
        assert_eq!(storage.find(&GridPoint::new(&[1, 2], &[1, 3], true)), Some(3));
        assert!(!storage.contains(&GridPoint::new(&[1, 2], &[1, 1], true)));
        assert_eq!(storage.update(GridPoint::new(&[1, 1], &[1, 1], true), 3), Err(SGError::InvalidIndex));
        assert_eq!(storage.update(GridPoint::root(2), 10), Err(SGError::InvalidIndex));
        assert!(storage.is_consistent());
    }

    #[test]
    fn leaf_recalculation()
    {
        let mut storage = small_storage();
        for seq in 0..storage.len()
        {
            storage.set_is_leaf(seq, false);
        }
        storage.recalc_leaf_property();
        assert!(!storage.is_leaf(0));
        assert!(storage.is_leaf(1) && storage.is_leaf(2) && storage.is_leaf(3));
    }

    #[test]
    fn boundary_children()
    {
        let mut storage = SparseGridData::new(1);
        storage.insert(GridPoint::new(&[0], &[0], true));
        storage.insert(GridPoint::new(&[0], &[1], true));
        assert!(storage.is_structural_leaf(0));
        storage.insert(GridPoint::new(&[1], &[1], true));
        assert!(!storage.is_structural_leaf(0));
        assert!(!storage.is_structural_leaf(1));
        assert_eq!(storage.num_inner_points(), 1);
        assert_eq!(storage.max_level(), 1);
    }

    #[test]
    fn real_coordinates()
    {
        let mut storage = SparseGridData::with_bounding_box(BoundingBox::new(&[0.0, -2.0], &[2.0, 2.0]));
        storage.insert(GridPoint::new(&[1, 2], &[1, 3], true));
        let points: Vec<_> = storage.points().collect();
        assert_eq!(points, vec![vec![1.0, 1.0]]);
    }

    #[test]
    fn algorithmic_dimensions()
    {
        let mut storage = SparseGridData::new(3);
        assert_eq!(storage.algorithmic_dimensions(), &[0, 1, 2]);
        storage.set_algorithmic_dimensions(&[2, 0]).unwrap();
        assert_eq!(storage.algorithmic_dimensions(), &[2, 0]);
        assert_eq!(storage.set_algorithmic_dimensions(&[0, 1, 2, 0]), Err(SGError::DimensionMismatch { expected: 3, found: 4 }));
        assert_eq!(storage.set_algorithmic_dimensions(&[3]), Err(SGError::InvalidParameter));
        assert_eq!(storage.set_algorithmic_dimensions(&[1, 1]), Err(SGError::InvalidParameter));
        assert_eq!(storage.algorithmic_dimensions(), &[2, 0]);

        let json = serde_json::to_string(&storage).unwrap();
        let copy: SparseGridData = serde_json::from_str(&json).unwrap();
        assert_eq!(copy.algorithmic_dimensions(), &[2, 0]);
    }

    #[test]
    fn oversized_records_are_rejected()
    {
        let mut storage = SparseGridData::new(1);
        storage.insert(GridPoint::root(1));
        let mut record = serde_json::to_value(&storage).unwrap();
        record["num_inputs"] = serde_json::json!(1u64 << 62);
        record["leaf"] = serde_json::json!([true, true, true, true]);
        let bytes = serde_json::to_vec(&record).unwrap();
        let result = crate::serialization::deserialize::<SparseGridData>(&bytes, crate::serialization::SerializationFormat::Json);
        assert_eq!(result.unwrap_err(), SGError::DeserializationFailed);

        let mut record = serde_json::to_value(&storage).unwrap();
        record.as_object_mut().unwrap().remove("algorithmic_dimensions");
        let copy: SparseGridData = serde_json::from_value(record).unwrap();
        assert_eq!(copy.algorithmic_dimensions(), &[0]);
    }
}
