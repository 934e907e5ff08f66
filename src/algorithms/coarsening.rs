use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::algorithms::selection::{select_best, Keep};
use crate::errors::SGError;
use crate::storage::{GridPoint, SparseGridData};

use super::refinement::RefinementFunctor;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseningOptions
{
    /// The first `protected_points` points are never removed.
    #[serde(default)]
    pub protected_points: usize,
    /// Only the first `n` points are candidates, e.g. the points that existed
    /// before the latest refinement.
    #[serde(default)]
    pub num_first_only: Option<usize>,
}

///
/// Outcome of a coarsening step. `kept` lists, in the new order, the old
/// sequence number of every remaining point, so per-point data can be
/// compacted the same way.
///
#[derive(Default, Debug, Clone)]
pub struct CoarseningResult
{
    pub removed: Vec<GridPoint>,
    pub kept: IndexSet<usize>,
}

impl CoarseningResult
{
    ///
    /// Compact per-point data with `stride` values per point.
    ///
    pub fn compact<T: Copy>(&self, data: &[T], stride: usize) -> Vec<T>
    {
        let mut compacted = Vec::with_capacity(self.kept.len() * stride);
        for &seq in &self.kept
        {
            compacted.extend_from_slice(&data[seq*stride..(seq+1)*stride]);
        }
        compacted
    }
}

///
/// Removes the leaves with the smallest indicator.
///
#[derive(Default, Debug, Clone)]
pub struct Coarsening
{
    pub options: CoarseningOptions,
}

impl Coarsening
{
    pub fn new(protected_points: usize) -> Self
    {
        Self { options: CoarseningOptions { protected_points, num_first_only: None } }
    }

    ///
    /// A point may be removed if it is a leaf, not protected by position and,
    /// on grids with boundary, an inner point.
    ///
    pub fn is_removable(&self, storage: &SparseGridData, seq: usize) -> bool
    {
        let end = self.options.num_first_only.unwrap_or(usize::MAX);
        seq >= self.options.protected_points && seq < end &&
            (!storage.has_boundary() || storage.is_inner_point(seq)) &&
            storage.is_structural_leaf(seq)
    }

    pub fn number_of_removable_points(&self, storage: &SparseGridData) -> Result<usize, SGError>
    {
        if storage.is_empty()
        {
            return Err(SGError::StorageEmpty);
        }
        Ok((0..storage.len()).filter(|&seq| self.is_removable(storage, seq)).count())
    }

    ///
    /// Remove up to `functor.refinements_num()` removable points with the
    /// smallest indicator, provided it is below `functor.threshold()`.
    ///
    pub fn free_coarsen(&self, storage: &mut SparseGridData, functor: &dyn RefinementFunctor) -> Result<CoarseningResult, SGError>
    {
        if storage.is_empty()
        {
            return Err(SGError::StorageEmpty);
        }
        let threshold = functor.threshold();
        let candidates = self.score_removable_points(storage, functor);
        let num_candidates = candidates.len();
        let remove: Vec<usize> = select_best(candidates, functor.refinements_num(), functor.start(), Keep::Smallest)
            .into_iter()
            .filter_map(|(seq, value)| (value < threshold).then_some(seq))
            .collect();
        let result = remove_leaves(storage, &remove);
        log::debug!("coarsening: {} removable points, {} removed", num_candidates, result.removed.len());
        Ok(result)
    }

    fn score_removable_points(&self, storage: &SparseGridData, functor: &dyn RefinementFunctor) -> Vec<(usize, f64)>
    {
        let is_candidate = |seq: usize| self.is_removable(storage, seq) && !functor.is_protected(storage, seq);
        #[cfg(feature = "rayon")]
        {
            use rayon::iter::{IntoParallelIterator, ParallelIterator};
            (0..storage.len()).into_par_iter()
                .filter(|&seq| is_candidate(seq))
                .map(|seq| (seq, functor.eval(storage, seq)))
                .collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            (0..storage.len())
                .filter(|&seq| is_candidate(seq))
                .map(|seq| (seq, functor.eval(storage, seq)))
                .collect()
        }
    }
}

///
/// Remove the given leaves (sorted sequence numbers) in one compaction, then
/// recompute the leaf flag of their parents, re-resolved by key.
///
fn remove_leaves(storage: &mut SparseGridData, remove: &[usize]) -> CoarseningResult
{
    if remove.is_empty()
    {
        return CoarseningResult { removed: Vec::new(), kept: (0..storage.len()).collect() };
    }
    let removed: Vec<GridPoint> = remove.iter().map(|&seq| storage.point(seq)).collect();
    let mut remove = remove.iter().peekable();
    let kept: IndexSet<usize> = (0..storage.len()).filter(|&seq|
    {
        if remove.peek() == Some(&&seq)
        {
            remove.next();
            false
        }
        else
        {
            true
        }
    }).collect();
    storage.retain(&kept);
    for point in &removed
    {
        log::trace!("removed point {:?} {:?}", point.level, point.index);
        for parent in point.parents()
        {
            storage.update_leaf(&parent);
        }
    }
    CoarseningResult { removed, kept }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::algorithms::refinement::{BaseRefinement, Refinement};
    use crate::generators::regular;

    struct Constant
    {
        value: f64,
        count: usize,
    }

    impl RefinementFunctor for Constant
    {
        fn eval(&self, _storage: &SparseGridData, _seq: usize) -> f64 {
            self.value
        }
        fn refinements_num(&self) -> usize {
            self.count
        }
        fn threshold(&self) -> f64 {
            0.0
        }
    }

    /// Coarsening indicator equal to the level sum, protecting deep points.
    struct LevelSum
    {
        protect_above: u32,
    }

    impl RefinementFunctor for LevelSum
    {
        fn eval(&self, storage: &SparseGridData, seq: usize) -> f64 {
            storage.level_sum(seq) as f64
        }
        fn start(&self) -> f64 {
            f64::MAX
        }
        fn refinements_num(&self) -> usize {
            10
        }
        fn threshold(&self) -> f64 {
            100.0
        }
        fn is_protected(&self, storage: &SparseGridData, seq: usize) -> bool {
            storage.level_sum(seq) > self.protect_above
        }
    }

    #[test]
    fn coarsening_undoes_refinement()
    {
        let mut storage = SparseGridData::new(1);
        storage.insert(GridPoint::root(1));
        let created = BaseRefinement::default().free_refine(&mut storage, &Constant { value: 1.0, count: 2 })
            .expect("refinement failed");
        assert_eq!(created, vec![1, 2]);
        let result = Coarsening::default().free_coarsen(&mut storage, &Constant { value: -1.0, count: 2 })
            .expect("coarsening failed");
        assert_eq!(result.removed, vec![GridPoint::new(&[2], &[1], true), GridPoint::new(&[2], &[3], true)]);
        assert_eq!(result.kept.iter().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(storage.len(), 1);
        assert!(storage.is_leaf(0));
        assert!(storage.is_consistent());
    }

    #[test]
    fn only_leaves_are_removed()
    {
        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 3, None).expect("Could not generate grid");
        let coarsening = Coarsening::default();
        let removable = coarsening.number_of_removable_points(&storage).expect("non-empty storage");
        // the twelve points on level sum 4
        assert_eq!(removable, 12);
        let result = coarsening.free_coarsen(&mut storage, &Constant { value: -1.0, count: 100 }).expect("coarsening failed");
        assert_eq!(result.removed.len(), 12);
        assert_eq!(storage.len(), 5);
        assert!(result.removed.iter().all(|p| p.level_sum() == 4));
        for seq in 0..storage.len()
        {
            assert_eq!(storage.is_leaf(seq), storage.is_structural_leaf(seq));
            assert_eq!(storage.is_leaf(seq), storage.level_sum(seq) == 3);
        }
    }

    #[test]
    fn protected_points_survive()
    {
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 3, None).expect("Could not generate grid");
        let alpha: Vec<f64> = (0..storage.len()).map(|seq| seq as f64).collect();
        // the first five points are protected by position, the rest by the functor
        let coarsening = Coarsening::new(5);
        let result = coarsening.free_coarsen(&mut storage, &LevelSum { protect_above: 2 }).expect("coarsening failed");
        assert!(result.removed.is_empty());
        assert_eq!(storage.len(), 7);
        let result = coarsening.free_coarsen(&mut storage, &LevelSum { protect_above: 3 }).expect("coarsening failed");
        assert_eq!(result.removed, vec![GridPoint::new(&[3], &[5], true), GridPoint::new(&[3], &[7], true)]);
        assert_eq!(result.compact(&alpha, 1), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn threshold_limits_removal()
    {
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        let result = Coarsening::default().free_coarsen(&mut storage, &Constant { value: 0.5, count: 2 }).expect("coarsening failed");
        // 0.5 never beats the start value of zero
        assert!(result.removed.is_empty());
        assert_eq!(result.kept.len(), 3);
        assert_eq!(storage.len(), 3);
    }

    #[test]
    fn first_only_window()
    {
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 3, None).expect("Could not generate grid");
        let coarsening = Coarsening { options: CoarseningOptions { protected_points: 0, num_first_only: Some(5) } };
        // leaves are (3,1), (3,3), (3,5), (3,7) at sequence numbers 3 to 6
        assert_eq!(coarsening.number_of_removable_points(&storage), Ok(2));
    }

    #[test]
    fn boundary_points_are_kept()
    {
        let mut storage = SparseGridData::new(1);
        storage.insert(GridPoint::new(&[0], &[0], true));
        storage.insert(GridPoint::new(&[0], &[1], true));
        storage.set_has_boundary(true);
        let coarsening = Coarsening::default();
        assert_eq!(coarsening.number_of_removable_points(&storage), Ok(0));
        storage.set_has_boundary(false);
        assert_eq!(coarsening.number_of_removable_points(&storage), Ok(2));
    }

    #[test]
    fn empty_storage_is_an_error()
    {
        let mut storage = SparseGridData::new(3);
        let coarsening = Coarsening::default();
        assert_eq!(coarsening.free_coarsen(&mut storage, &Constant { value: -1.0, count: 1 }).unwrap_err(), SGError::StorageEmpty);
        assert_eq!(coarsening.number_of_removable_points(&storage), Err(SGError::StorageEmpty));
    }
}
