use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::algorithms::selection::{select_best, Keep};
use crate::errors::SGError;
use crate::generators::for_each_index;
use crate::storage::{GridPoint, SparseGridData, MAX_LEVEL};

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementOptions
{
    /// Create the level-zero points a boundary grid needs alongside new points.
    #[serde(default)]
    pub has_boundary: bool,
    /// Per dimension maximum level. No child deeper than the limit is created.
    #[serde(default)]
    pub level_limits: Option<Vec<u8>>,
}

impl RefinementOptions
{
    pub fn new(has_boundary: bool) -> Self
    {
        Self { has_boundary, ..Default::default() }
    }
}

///
/// This trait defines the indicator used for refinement or coarsening. These
/// two operations are never done simultaneously, but provide a common
/// interface to allow user-specified criteria to control either operation.
///
pub trait RefinementFunctor : Send + Sync
{
    ///
    /// Indicator value of the point with sequence number `seq`. Must not depend
    /// on anything the refinement changes while a selection is running.
    ///
    fn eval(&self, storage: &SparseGridData, seq: usize) -> f64;

    ///
    /// Selection floor. Refinement only accepts absolute values greater than
    /// this, coarsening only raw values smaller.
    ///
    fn start(&self) -> f64
    {
        0.0
    }

    ///
    /// Maximum number of points refined (or removed) per call.
    ///
    fn refinements_num(&self) -> usize;

    ///
    /// Selected points are only acted upon if the absolute value of their
    /// indicator reaches this threshold (refinement) or if the indicator is
    /// below it (coarsening).
    ///
    fn threshold(&self) -> f64;

    ///
    /// Points for which this returns true are never removed by coarsening.
    ///
    fn is_protected(&self, _storage: &SparseGridData, _seq: usize) -> bool
    {
        false
    }
}

///
/// Refinement strategy. Implementors decide which children may be created and
/// which related points a new point needs; selection and expansion are shared.
/// Wrapping an implementation (see `decorators`) changes candidates or scores
/// but never the structure a new point requires.
///
pub trait Refinement : Send + Sync
{
    ///
    /// Check the configuration against the storage before refining.
    ///
    fn validate(&self, _storage: &SparseGridData) -> Result<(), SGError>
    {
        Ok(())
    }

    ///
    /// Whether children of `point` in direction `dim` may be created at all.
    ///
    fn admits_child(&self, point: &GridPoint, dim: usize) -> bool
    {
        point.level[dim] < MAX_LEVEL
    }

    ///
    /// Insert `point` together with every related point it requires.
    ///
    fn create_gridpoint(&self, storage: &mut SparseGridData, point: GridPoint);

    ///
    /// Indicator value used for selecting points to refine. Only its absolute
    /// value competes.
    ///
    fn score(&self, storage: &SparseGridData, seq: usize, functor: &dyn RefinementFunctor) -> f64
    {
        functor.eval(storage, seq)
    }

    ///
    /// A child of `point` in direction `dim` is admitted but missing.
    ///
    fn is_refinable_in_dim(&self, storage: &SparseGridData, point: &GridPoint, dim: usize) -> bool
    {
        self.admits_child(point, dim) &&
            (!storage.contains(&point.left_child(dim)) || !storage.contains(&point.right_child(dim)))
    }

    fn is_refinable(&self, storage: &SparseGridData, seq: usize) -> bool
    {
        let point = storage.point(seq);
        (0..storage.num_inputs()).any(|dim| self.is_refinable_in_dim(storage, &point, dim))
    }

    ///
    /// Create the missing children of `point` in direction `dim`. A level-zero
    /// coordinate only has the single level-one child.
    ///
    fn refine_1d(&self, storage: &mut SparseGridData, point: &GridPoint, dim: usize)
    {
        for mut child in [point.left_child(dim), point.right_child(dim)]
        {
            if !storage.contains(&child)
            {
                child.set_is_leaf(true);
                self.create_gridpoint(storage, child);
            }
        }
    }

    ///
    /// Refine the point with sequence number `seq` in every admitted direction.
    /// The point is no longer a leaf afterwards, even if all its children
    /// already existed.
    ///
    fn refine_gridpoint(&self, storage: &mut SparseGridData, seq: usize)
    {
        storage.set_is_leaf(seq, false);
        let point = storage.point(seq);
        for dim in 0..storage.num_inputs()
        {
            if self.admits_child(&point, dim)
            {
                self.refine_1d(storage, &point, dim);
            }
        }
    }

    ///
    /// Refine the `functor.refinements_num()` refinable points with the
    /// largest absolute indicator. Returns the sequence numbers of all new points in
    /// creation order.
    ///
    fn free_refine(&self, storage: &mut SparseGridData, functor: &dyn RefinementFunctor) -> Result<Vec<usize>, SGError>
    {
        if storage.is_empty()
        {
            return Err(SGError::StorageEmpty);
        }
        self.validate(storage)?;
        let original_len = storage.len();
        let start = functor.start();
        let threshold = functor.threshold();
        let candidates = score_refinable_points(self, storage, functor);
        let num_candidates = candidates.len();
        let selected = select_best(candidates, functor.refinements_num(), start, Keep::Largest);
        let mut num_refined = 0;
        for (seq, value) in selected
        {
            if value >= threshold
            {
                self.refine_gridpoint(storage, seq);
                num_refined += 1;
            }
        }
        update_leaves_of_new_points(storage, original_len);
        log::debug!("refinement: {} refinable points, {} refined, {} points created",
            num_candidates, num_refined, storage.len() - original_len);
        Ok((original_len..storage.len()).collect())
    }

    ///
    /// Number of points with at least one admitted but missing child.
    ///
    fn number_of_refinable_points(&self, storage: &SparseGridData) -> Result<usize, SGError>
    {
        if storage.is_empty()
        {
            return Err(SGError::StorageEmpty);
        }
        self.validate(storage)?;
        Ok((0..storage.len()).filter(|&seq| self.is_refinable(storage, seq)).count())
    }

    ///
    /// Subspace-wise refinement. The absolute indicator of every refinable point is
    /// added to the subspace (level vector) of its first missing child, and the
    /// `functor.refinements_num()` subspaces with the largest accumulated
    /// indicator are created completely.
    ///
    fn refine_subspace(&self, storage: &mut SparseGridData, functor: &dyn RefinementFunctor) -> Result<Vec<usize>, SGError>
    {
        if storage.is_empty()
        {
            return Err(SGError::StorageEmpty);
        }
        self.validate(storage)?;
        let original_len = storage.len();
        let mut subspaces: IndexMap<Vec<u8>, f64> = IndexMap::new();
        for seq in 0..storage.len()
        {
            let point = storage.point(seq);
            let missing = (0..storage.num_inputs())
                .filter(|&dim| self.admits_child(&point, dim))
                .flat_map(|dim| [point.left_child(dim), point.right_child(dim)])
                .find(|child| !storage.contains(child));
            if let Some(child) = missing
            {
                *subspaces.entry(child.level).or_insert(0.0) += self.score(storage, seq, functor).abs();
            }
        }
        let start = functor.start();
        let threshold = functor.threshold();
        let num_subspaces = subspaces.len();
        let selected = select_best(subspaces, functor.refinements_num(), start, Keep::Largest);
        let mut point = GridPoint::zero_index(storage.num_inputs());
        for (levels, value) in selected
        {
            if value >= threshold
            {
                for_each_index(&levels, |index|
                {
                    for (dim, (&l, &i)) in levels.iter().zip(index).enumerate()
                    {
                        point.set(dim, l, i);
                    }
                    if !storage.contains(&point)
                    {
                        point.set_is_leaf(true);
                        self.create_gridpoint(storage, point.clone());
                    }
                });
            }
        }
        update_leaves_of_new_points(storage, original_len);
        log::debug!("subspace refinement: {} refinable subspaces, {} points created", num_subspaces, storage.len() - original_len);
        Ok((original_len..storage.len()).collect())
    }
}

///
/// Absolute score of every refinable point, in sequence order. This is a
/// read-only sweep over a fixed point set, run in parallel with the `rayon`
/// feature.
///
fn score_refinable_points<R: Refinement + ?Sized>(refinement: &R, storage: &SparseGridData, functor: &dyn RefinementFunctor) -> Vec<(usize, f64)>
{
    #[cfg(feature = "rayon")]
    {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        (0..storage.len()).into_par_iter()
            .filter(|&seq| refinement.is_refinable(storage, seq))
            .map(|seq| (seq, refinement.score(storage, seq, functor).abs()))
            .collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..storage.len())
            .filter(|&seq| refinement.is_refinable(storage, seq))
            .map(|seq| (seq, refinement.score(storage, seq, functor).abs()))
            .collect()
    }
}

///
/// Leaf bookkeeping for points appended since `first_new`: a new point is a
/// leaf unless it already has children, and every parent of a new point is
/// not.
///
pub(crate) fn update_leaves_of_new_points(storage: &mut SparseGridData, first_new: usize)
{
    for seq in first_new..storage.len()
    {
        let point = storage.point(seq);
        let is_leaf = !storage.has_children(&point);
        storage.set_is_leaf(seq, is_leaf);
        for parent in point.parents()
        {
            if let Some(parent_seq) = storage.find(&parent)
            {
                storage.set_is_leaf(parent_seq, false);
            }
        }
    }
}

enum CreateTask
{
    /// Make sure the point exists, creating what it requires first.
    Ensure(GridPoint),
    Insert(GridPoint),
    /// Complete level-zero pairs after an insert on a boundary grid.
    LevelZeroConsistency(GridPoint),
}

///
/// Standard refinement engine. With `has_boundary` every new point on level
/// one in some direction also needs both boundary points of that direction,
/// and level-zero points always come in left/right pairs.
///
#[derive(Default, Debug, Clone)]
pub struct BaseRefinement
{
    pub has_boundary: bool,
    pub level_limits: Option<Vec<u8>>,
}

impl BaseRefinement
{
    pub fn new(has_boundary: bool) -> Self
    {
        Self { has_boundary, level_limits: None }
    }

    ///
    /// Engine matching the storage's boundary configuration.
    ///
    pub fn for_storage(storage: &SparseGridData) -> Self
    {
        Self::new(storage.has_boundary())
    }

    pub fn with_level_limits(mut self, level_limits: Vec<u8>) -> Self
    {
        self.level_limits = Some(level_limits);
        self
    }

    ///
    /// Points that must exist before `point` may be inserted.
    ///
    fn required_points(&self, point: &GridPoint) -> Vec<GridPoint>
    {
        let num_inputs = point.dim();
        let mut required = Vec::new();
        for dim in 0..num_inputs
        {
            let level = point.level[dim];
            if level > 1
            {
                required.push(point.parent(dim));
            }
            else if level == 1 && self.has_boundary && num_inputs > 1
            {
                for boundary_index in 0..2
                {
                    let mut boundary = point.clone();
                    boundary.set(dim, 0, boundary_index);
                    required.push(boundary);
                }
            }
        }
        required
    }

    ///
    /// Missing level-zero partners of `point`: for every direction on level
    /// zero the point with the opposite boundary index.
    ///
    fn level_zero_partners(&self, storage: &SparseGridData, point: &GridPoint) -> Vec<GridPoint>
    {
        if storage.num_inputs() == 1
        {
            return Vec::new();
        }
        let mut partners = Vec::new();
        for dim in 0..point.dim()
        {
            let (level, index) = point.get(dim);
            if level == 0
            {
                let mut partner = point.clone();
                partner.set(dim, 0, 1 - index);
                if !storage.contains(&partner)
                {
                    partners.push(partner);
                }
            }
        }
        partners
    }
}

impl From<RefinementOptions> for BaseRefinement
{
    fn from(options: RefinementOptions) -> Self {
        Self { has_boundary: options.has_boundary, level_limits: options.level_limits }
    }
}

impl Refinement for BaseRefinement
{
    fn validate(&self, storage: &SparseGridData) -> Result<(), SGError> {
        match &self.level_limits
        {
            Some(limits) if limits.len() != storage.num_inputs() =>
                Err(SGError::DimensionMismatch { expected: storage.num_inputs(), found: limits.len() }),
            _ => Ok(()),
        }
    }

    fn admits_child(&self, point: &GridPoint, dim: usize) -> bool {
        let limit = self.level_limits.as_ref()
            .and_then(|limits| limits.get(dim).copied())
            .unwrap_or(MAX_LEVEL)
            .min(MAX_LEVEL);
        point.level[dim] < limit
    }

    ///
    /// Worklist based creation: required points are ensured before the point
    /// itself is inserted, so arbitrarily long ancestor chains never recurse.
    ///
    fn create_gridpoint(&self, storage: &mut SparseGridData, point: GridPoint) {
        let mut tasks = vec![CreateTask::Ensure(point)];
        while let Some(task) = tasks.pop()
        {
            match task
            {
                CreateTask::Ensure(point) =>
                {
                    if storage.contains(&point)
                    {
                        continue;
                    }
                    let required: Vec<GridPoint> = self.required_points(&point).into_iter()
                        .filter(|p| !storage.contains(p))
                        .collect();
                    if self.has_boundary
                    {
                        tasks.push(CreateTask::LevelZeroConsistency(point.clone()));
                    }
                    tasks.push(CreateTask::Insert(point));
                    for mut ancestor in required
                    {
                        ancestor.set_is_leaf(false);
                        tasks.push(CreateTask::Ensure(ancestor));
                    }
                }
                CreateTask::Insert(point) =>
                {
                    log::trace!("create point {:?} {:?}", point.level, point.index);
                    storage.insert(point);
                }
                CreateTask::LevelZeroConsistency(point) =>
                {
                    for partner in self.level_zero_partners(storage, &point)
                    {
                        tasks.push(CreateTask::Ensure(partner));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::generators::{regular, regular_with_boundaries};

    struct ConstantFunctor
    {
        value: f64,
        refinements_num: usize,
        threshold: f64,
    }

    impl RefinementFunctor for ConstantFunctor
    {
        fn eval(&self, _storage: &SparseGridData, _seq: usize) -> f64 {
            self.value
        }
        fn refinements_num(&self) -> usize {
            self.refinements_num
        }
        fn threshold(&self) -> f64 {
            self.threshold
        }
    }

    /// Scores a single point, identified by key.
    struct SinglePointFunctor(GridPoint);

    impl RefinementFunctor for SinglePointFunctor
    {
        fn eval(&self, storage: &SparseGridData, seq: usize) -> f64 {
            if storage.point(seq) == self.0 { 1.0 } else { 0.0 }
        }
        fn refinements_num(&self) -> usize {
            1
        }
        fn threshold(&self) -> f64 {
            0.0
        }
    }

    fn assert_complete(storage: &SparseGridData, has_boundary: bool)
    {
        for seq in 0..storage.len()
        {
            let point = storage.point(seq);
            for parent in point.parents()
            {
                if has_boundary || parent.is_inner_point()
                {
                    assert!(storage.contains(&parent), "{:?} is missing its parent {:?}", point, parent);
                }
            }
        }
    }

    fn assert_leaves(storage: &SparseGridData)
    {
        for seq in 0..storage.len()
        {
            assert_eq!(storage.is_leaf(seq), storage.is_structural_leaf(seq), "wrong leaf flag on {:?}", storage.point(seq));
        }
    }

    #[test]
    fn refine_single_point()
    {
        let mut storage = SparseGridData::new(1);
        storage.insert(GridPoint::root(1));
        let functor = ConstantFunctor { value: 1.0, refinements_num: 1, threshold: 0.0 };
        let created = BaseRefinement::default().free_refine(&mut storage, &functor).expect("refinement failed");
        assert_eq!(created, vec![1, 2]);
        assert_eq!(storage.point(1), GridPoint::new(&[2], &[1], true));
        assert_eq!(storage.point(2), GridPoint::new(&[2], &[3], true));
        assert!(!storage.is_leaf(0));
        assert!(storage.is_leaf(1) && storage.is_leaf(2));
    }

    #[test]
    fn refine_point_with_existing_children()
    {
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        storage.set_is_leaf(0, true);
        let refinement = BaseRefinement::default();
        assert!(!refinement.is_refinable(&storage, 0));
        refinement.refine_gridpoint(&mut storage, 0);
        assert_eq!(storage.len(), 3);
        assert!(!storage.is_leaf(0));
    }

    #[test]
    fn ties_prefer_earliest_point()
    {
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        let functor = ConstantFunctor { value: 1.0, refinements_num: 1, threshold: 0.0 };
        let created = BaseRefinement::default().free_refine(&mut storage, &functor).expect("refinement failed");
        assert_eq!(created.len(), 2);
        assert!(storage.contains(&GridPoint::new(&[3], &[1], true)));
        assert!(storage.contains(&GridPoint::new(&[3], &[3], true)));
        assert!(!storage.is_leaf(1));
        assert!(storage.is_leaf(2));
    }

    #[test]
    fn negative_scores_compete_by_magnitude()
    {
        let mut storage = SparseGridData::new(1);
        storage.insert(GridPoint::root(1));
        let functor = ConstantFunctor { value: -1.0, refinements_num: 1, threshold: 0.5 };
        let created = BaseRefinement::default().free_refine(&mut storage, &functor).expect("refinement failed");
        assert_eq!(created, vec![1, 2]);
        assert!(storage.contains(&GridPoint::new(&[2], &[1], true)));
        assert!(storage.contains(&GridPoint::new(&[2], &[3], true)));

        // -0.7 outranks 0.5
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        let alpha = [0.0, 0.5, -0.7];
        let surplus = crate::refinement::SurplusRefinement::new(&alpha, 1, 1, 0.0);
        let created = BaseRefinement::default().free_refine(&mut storage, &surplus).expect("refinement failed");
        assert_eq!(created.len(), 2);
        assert!(storage.contains(&GridPoint::new(&[3], &[5], true)));
        assert!(storage.is_leaf(1));

        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        let functor = ConstantFunctor { value: -1.0, refinements_num: 1, threshold: 0.0 };
        let created = BaseRefinement::default().refine_subspace(&mut storage, &functor).expect("refinement failed");
        assert!(!created.is_empty());
    }

    #[test]
    fn threshold_and_exhaustion()
    {
        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        let refinement = BaseRefinement::default();
        let below = ConstantFunctor { value: 0.5, refinements_num: 3, threshold: 1.0 };
        assert!(refinement.free_refine(&mut storage, &below).expect("refinement failed").is_empty());
        let nothing = ConstantFunctor { value: 1.0, refinements_num: 0, threshold: 0.0 };
        assert!(refinement.free_refine(&mut storage, &nothing).expect("refinement failed").is_empty());
        // more refinements than refinable points
        let refinable = refinement.number_of_refinable_points(&storage).expect("non-empty storage");
        assert_eq!(refinable, 4);
        let all = ConstantFunctor { value: 1.0, refinements_num: 100, threshold: 0.0 };
        let created = refinement.free_refine(&mut storage, &all).expect("refinement failed");
        assert!(!created.is_empty());
        assert_complete(&storage, false);
        assert_leaves(&storage);
    }

    #[test]
    fn empty_storage_is_an_error()
    {
        let mut storage = SparseGridData::new(2);
        let functor = ConstantFunctor { value: 1.0, refinements_num: 1, threshold: 0.0 };
        let refinement = BaseRefinement::default();
        assert_eq!(refinement.free_refine(&mut storage, &functor), Err(SGError::StorageEmpty));
        assert_eq!(refinement.refine_subspace(&mut storage, &functor), Err(SGError::StorageEmpty));
        assert_eq!(refinement.number_of_refinable_points(&storage), Err(SGError::StorageEmpty));
    }

    #[test]
    fn missing_ancestors_are_created()
    {
        let mut storage = SparseGridData::new(2);
        storage.insert(GridPoint::root(2));
        storage.insert(GridPoint::new(&[2, 1], &[1, 1], true));
        let refinement = BaseRefinement::default();
        refinement.refine_gridpoint(&mut storage, 1);
        // the dimension 0 parents of the new (2, 2) points
        assert!(storage.contains(&GridPoint::new(&[1, 2], &[1, 1], false)));
        assert!(storage.contains(&GridPoint::new(&[1, 2], &[1, 3], false)));
        // ancestors are inserted before the point that needs them
        let ancestor = storage.find(&GridPoint::new(&[1, 2], &[1, 1], false)).expect("ancestor exists");
        let child = storage.find(&GridPoint::new(&[2, 2], &[1, 1], false)).expect("child exists");
        assert!(ancestor < child);
        assert_eq!(storage.len(), 2 + 2 + 4);
        update_leaves_of_new_points(&mut storage, 2);
        assert_complete(&storage, false);
        assert_leaves(&storage);
    }

    #[test]
    fn level_limits_stop_refinement()
    {
        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        let refinement = BaseRefinement::default().with_level_limits(vec![2, 3]);
        assert_eq!(refinement.number_of_refinable_points(&storage), Ok(4));
        let functor = ConstantFunctor { value: 1.0, refinements_num: 10, threshold: 0.0 };
        refinement.free_refine(&mut storage, &functor).expect("refinement failed");
        assert_eq!(storage.nodes().map(|p| p.level()[0]).max(), Some(2));
        assert_eq!(storage.nodes().map(|p| p.level()[1]).max(), Some(3));
        let mismatched = BaseRefinement::default().with_level_limits(vec![2]);
        assert_eq!(mismatched.free_refine(&mut storage, &functor), Err(SGError::DimensionMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn boundary_refinement_adds_boundary_points()
    {
        let mut storage = SparseGridData::new(2);
        regular_with_boundaries(&mut storage, 1, Some(1), None).expect("Could not generate grid");
        assert_eq!(storage.len(), 9);
        let refinement = BaseRefinement::for_storage(&storage);
        assert!(refinement.has_boundary);
        let functor = SinglePointFunctor(GridPoint::root(2));
        let created = refinement.free_refine(&mut storage, &functor).expect("refinement failed");
        assert!(storage.contains(&GridPoint::new(&[2, 1], &[1, 1], true)));
        assert!(storage.contains(&GridPoint::new(&[2, 0], &[1, 0], false)));
        assert!(storage.contains(&GridPoint::new(&[2, 0], &[3, 1], false)));
        assert!(storage.contains(&GridPoint::new(&[0, 2], &[1, 3], false)));
        // 4 children, each with 2 boundary points
        assert_eq!(created.len(), 12);
        assert_complete(&storage, true);
        assert_leaves(&storage);
    }

    #[test]
    fn subspace_refinement_creates_whole_subspace()
    {
        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 2, None).expect("Could not generate grid");
        let functor = SinglePointFunctor(GridPoint::new(&[2, 1], &[3, 1], false));
        let created = BaseRefinement::default().refine_subspace(&mut storage, &functor).expect("refinement failed");
        // the first missing child of (2,1)/(3,1) lies in subspace (3, 1)
        assert_eq!(created.len(), 4);
        for index in [1, 3, 5, 7]
        {
            assert!(storage.contains(&GridPoint::new(&[3, 1], &[index, 1], false)));
        }
        assert_complete(&storage, false);
        assert_leaves(&storage);
    }
}
