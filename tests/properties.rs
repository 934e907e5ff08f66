use std::collections::HashSet;

use proptest::prelude::*;

use sgadapt::algorithms::coarsening::Coarsening;
use sgadapt::algorithms::refinement::{BaseRefinement, Refinement, RefinementFunctor};
use sgadapt::generators::{regular, regular_with_boundaries};
use sgadapt::serialization::{deserialize, serialize, SerializationFormat};
use sgadapt::storage::{GridPoint, SparseGridData};

/// Pseudo random but reproducible indicator derived from the point position.
struct Wiggle
{
    seed: f64,
    count: usize,
    start: f64,
    threshold: f64,
}

impl RefinementFunctor for Wiggle
{
    fn eval(&self, storage: &SparseGridData, seq: usize) -> f64 {
        let x = storage.unit_coordinate(seq);
        let s: f64 = x.iter().enumerate().map(|(d, x)| (d + 1) as f64 * x).sum();
        (s * self.seed).sin().abs() + 1e-3
    }
    fn start(&self) -> f64 {
        self.start
    }
    fn refinements_num(&self) -> usize {
        self.count
    }
    fn threshold(&self) -> f64 {
        self.threshold
    }
}

fn generated(dim: usize, level: usize, boundary: bool) -> SparseGridData
{
    let mut storage = SparseGridData::new(dim);
    if boundary
    {
        regular_with_boundaries(&mut storage, level, None, None).unwrap();
    }
    else
    {
        regular(&mut storage, level, None).unwrap();
    }
    storage
}

fn refined(dim: usize, level: usize, boundary: bool, steps: usize, count: usize, seed: f64) -> SparseGridData
{
    let mut storage = generated(dim, level, boundary);
    let refinement = BaseRefinement::for_storage(&storage);
    let functor = Wiggle { seed, count, start: 0.0, threshold: 0.0 };
    for _ in 0..steps
    {
        refinement.free_refine(&mut storage, &functor).unwrap();
    }
    storage
}

fn assert_unique(storage: &SparseGridData)
{
    let keys: HashSet<GridPoint> = storage.nodes().map(|p| GridPoint::new(p.level(), p.index(), false)).collect();
    assert_eq!(keys.len(), storage.len());
    assert!(storage.is_consistent());
}

fn assert_leaves(storage: &SparseGridData)
{
    for seq in 0..storage.len()
    {
        assert_eq!(storage.is_leaf(seq), storage.is_structural_leaf(seq), "leaf flag of {:?}", storage.point(seq));
    }
}

/// Every hierarchical parent exists; on boundary grids also both boundary
/// points below each level one coordinate.
fn assert_complete(storage: &SparseGridData)
{
    for seq in 0..storage.len()
    {
        let point = storage.point(seq);
        for dim in 0..storage.num_inputs()
        {
            let level = point.level[dim];
            if level > 1
            {
                assert!(storage.contains(&point.parent(dim)), "parent of {:?} in {}", point, dim);
            }
            else if level == 1 && storage.has_boundary()
            {
                for index in 0..2
                {
                    let mut boundary = point.clone();
                    boundary.set(dim, 0, index);
                    assert!(storage.contains(&boundary), "boundary of {:?} in {}", point, dim);
                }
            }
        }
    }
}

fn grid_point(dim: usize) -> impl Strategy<Value = GridPoint>
{
    prop::collection::vec((1u8..7, any::<u32>()), dim).prop_map(|pairs|
    {
        let level: Vec<u8> = pairs.iter().map(|&(l, _)| l).collect();
        let index: Vec<u32> = pairs.iter().map(|&(l, raw)| 2 * (raw % (1 << (l - 1))) + 1).collect();
        GridPoint::new(&level, &index, true)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn refinement_keeps_grid_valid(
        dim in 1usize..4,
        level in 1usize..4,
        boundary in any::<bool>(),
        steps in 1usize..4,
        count in 1usize..4,
        seed in 0.5f64..20.0,
    ) {
        let mut storage = generated(dim, level, boundary);
        let refinement = BaseRefinement::for_storage(&storage);
        let functor = Wiggle { seed, count, start: 0.0, threshold: 0.0 };
        for _ in 0..steps
        {
            let before = storage.len();
            let refinable = refinement.number_of_refinable_points(&storage).unwrap();
            let created = refinement.free_refine(&mut storage, &functor).unwrap();
            prop_assert_eq!(created, (before..storage.len()).collect::<Vec<_>>());
            if refinable > 0
            {
                prop_assert!(storage.len() > before);
            }
            assert_unique(&storage);
            assert_leaves(&storage);
            assert_complete(&storage);
        }
    }

    #[test]
    fn coarsening_keeps_grid_valid(
        dim in 1usize..4,
        level in 1usize..3,
        boundary in any::<bool>(),
        count in 1usize..6,
        seed in 0.5f64..20.0,
    ) {
        let mut storage = refined(dim, level, boundary, 2, 2, seed);
        let before: Vec<GridPoint> = (0..storage.len()).map(|seq| storage.point(seq)).collect();
        let functor = Wiggle { seed: seed + 1.0, count, start: f64::MAX, threshold: 2.0 };
        let result = Coarsening::default().free_coarsen(&mut storage, &functor).unwrap();
        prop_assert!(result.removed.len() <= count);
        prop_assert_eq!(result.kept.len() + result.removed.len(), before.len());
        prop_assert_eq!(result.kept.len(), storage.len());
        for (new_seq, &old_seq) in result.kept.iter().enumerate()
        {
            prop_assert_eq!(&storage.point(new_seq), &before[old_seq]);
        }
        for point in &result.removed
        {
            prop_assert!(!storage.contains(point));
            if boundary
            {
                prop_assert!(point.is_inner_point());
            }
        }
        assert_unique(&storage);
        assert_leaves(&storage);
        assert_complete(&storage);
    }

    #[test]
    fn insert_is_idempotent(points in prop::collection::vec(grid_point(3), 1..40)) {
        let mut storage = SparseGridData::new(3);
        let seqs: Vec<usize> = points.iter().map(|p| storage.insert(p.clone())).collect();
        let len = storage.len();
        for (point, &seq) in points.iter().zip(&seqs)
        {
            prop_assert_eq!(storage.insert(point.clone()), seq);
            prop_assert_eq!(storage.find(point), Some(seq));
        }
        prop_assert_eq!(storage.len(), len);
        assert_unique(&storage);
    }

    #[test]
    fn serialization_roundtrip(
        dim in 1usize..4,
        level in 1usize..4,
        boundary in any::<bool>(),
        seed in 0.5f64..20.0,
    ) {
        let storage = refined(dim, level, boundary, 1, 3, seed);
        let text = storage.to_text().unwrap();
        let from_text = SparseGridData::from_text(&text).unwrap();
        let from_bytes: SparseGridData = deserialize(&serialize(&storage, SerializationFormat::BincodeLz4).unwrap(), SerializationFormat::BincodeLz4).unwrap();
        let from_json: SparseGridData = deserialize(&serialize(&storage, SerializationFormat::Json).unwrap(), SerializationFormat::Json).unwrap();
        for copy in [from_text, from_bytes, from_json]
        {
            prop_assert_eq!(copy.len(), storage.len());
            prop_assert_eq!(copy.has_boundary(), storage.has_boundary());
            for seq in 0..storage.len()
            {
                prop_assert_eq!(copy.point(seq), storage.point(seq));
                prop_assert_eq!(copy.is_leaf(seq), storage.is_leaf(seq));
            }
        }
    }
}
