//!
//! Non-adaptive construction of regular, truncated and full grids.
//!
mod level_vectors;

pub use level_vectors::LevelVectorRule;
pub(crate) use level_vectors::for_each_index;

use crate::errors::SGError;
use crate::storage::{GridPoint, SparseGridData, MAX_LEVEL};

pub trait Generator : Default
{
    ///
    /// Generates a regular sparse grid of level `level`, without boundaries.
    /// For details about T, See pages 8-9 of Griebel and Knapek's "Optimized
    /// Tensor-Product Approximation Spaces".
    ///
    #[allow(non_snake_case)]
    fn regular(&self, storage: &mut SparseGridData, level: usize, T: Option<f64>) -> Result<(), SGError>;
    ///
    /// Regular grid whose dimensions are grouped into fully connected cliques.
    /// Not supported.
    ///
    #[allow(non_snake_case)]
    fn cliques(&self, storage: &mut SparseGridData, level: usize, clique_size: usize, T: Option<f64>) -> Result<(), SGError>;
    ///
    /// Generates a full grid of level `level`, without boundaries
    ///
    fn full(&self, storage: &mut SparseGridData, level: usize) -> Result<(), SGError>;
    ///
    /// Full grid with a separate level per dimension, without boundaries.
    ///
    fn anisotropic_full(&self, storage: &mut SparseGridData, levels: &[usize]) -> Result<(), SGError>;
    ///
    /// Generates a full grid of level `level`, with boundary grid points.
    ///
    fn full_with_boundaries(&self, storage: &mut SparseGridData, level: usize) -> Result<(), SGError>;
    ///
    /// Regular grid containing only the given interaction terms, each a set of
    /// dimensions that may be refined together.
    ///
    #[allow(non_snake_case)]
    fn regular_interactions(&self, storage: &mut SparseGridData, level: usize, terms: &[Vec<usize>], T: Option<f64>) -> Result<(), SGError>;
    ///
    /// Generates a regular sparse grid of level `level`, with boundaries.
    /// `boundary_level` (default 1) controls how fine the boundary is resolved
    /// compared with the interior; 0 selects the plain `|l|_1 <= level` grid.
    ///
    #[allow(non_snake_case)]
    fn regular_with_boundaries(&self, storage: &mut SparseGridData, level: usize, boundary_level: Option<usize>, T: Option<f64>) -> Result<(), SGError>;
    ///
    /// Regular grid on a periodic domain: one boundary point per dimension.
    ///
    #[allow(non_snake_case)]
    fn regular_with_periodic_boundaries(&self, storage: &mut SparseGridData, level: usize, T: Option<f64>) -> Result<(), SGError>;
    ///
    /// Generalized truncated boundary grid: levels below `k` are counted as `k`.
    ///
    fn truncated(&self, storage: &mut SparseGridData, level: usize, k: usize) -> Result<(), SGError>;
}

#[derive(Default, Clone, Copy, Debug)]
pub struct StandardGenerator;

impl Generator for StandardGenerator
{
    #[allow(non_snake_case)]
    fn regular(&self, storage: &mut SparseGridData, level: usize, T: Option<f64>) -> Result<(), SGError> {
        regular(storage, level, T)
    }

    #[allow(non_snake_case)]
    fn cliques(&self, storage: &mut SparseGridData, level: usize, clique_size: usize, T: Option<f64>) -> Result<(), SGError> {
        cliques(storage, level, clique_size, T)
    }

    fn full(&self, storage: &mut SparseGridData, level: usize) -> Result<(), SGError> {
        full(storage, level)
    }

    fn anisotropic_full(&self, storage: &mut SparseGridData, levels: &[usize]) -> Result<(), SGError> {
        anisotropic_full(storage, levels)
    }

    fn full_with_boundaries(&self, storage: &mut SparseGridData, level: usize) -> Result<(), SGError> {
        full_with_boundaries(storage, level)
    }

    #[allow(non_snake_case)]
    fn regular_interactions(&self, storage: &mut SparseGridData, level: usize, terms: &[Vec<usize>], T: Option<f64>) -> Result<(), SGError> {
        regular_interactions(storage, level, terms, T)
    }

    #[allow(non_snake_case)]
    fn regular_with_boundaries(&self, storage: &mut SparseGridData, level: usize, boundary_level: Option<usize>, T: Option<f64>) -> Result<(), SGError> {
        regular_with_boundaries(storage, level, boundary_level, T)
    }

    #[allow(non_snake_case)]
    fn regular_with_periodic_boundaries(&self, storage: &mut SparseGridData, level: usize, T: Option<f64>) -> Result<(), SGError> {
        regular_with_periodic_boundaries(storage, level, T)
    }

    fn truncated(&self, storage: &mut SparseGridData, level: usize, k: usize) -> Result<(), SGError> {
        truncated(storage, level, k)
    }
}

fn to_level(level: usize) -> Result<u8, SGError>
{
    if level > MAX_LEVEL as usize
    {
        return Err(SGError::InvalidLevel);
    }
    Ok(level as u8)
}

///
/// Insert every point of every level vector admitted by `rule`, then fix up
/// the leaf flags in one post-pass.
///
pub fn generate(storage: &mut SparseGridData, rule: &LevelVectorRule) -> Result<(), SGError>
{
    if !storage.is_empty()
    {
        return Err(SGError::StorageNotEmpty);
    }
    let num_inputs = storage.num_inputs();
    rule.validate(num_inputs)?;
    let mut point = GridPoint::zero_index(num_inputs);
    for levels in rule.level_vectors(num_inputs)
    {
        level_vectors::for_each_index(&levels, |index|
        {
            if !rule.admits_index(&levels, index)
            {
                return;
            }
            for d in 0..num_inputs
            {
                point.set(d, levels[d], index[d]);
            }
            storage.insert(point.clone());
        });
    }
    storage.recalc_leaf_property();
    storage.set_has_boundary(rule.has_boundary());
    log::debug!("generated {} points ({} inner) for {:?}", storage.len(), storage.num_inner_points(), rule);
    Ok(())
}

#[allow(non_snake_case)]
pub fn regular(storage: &mut SparseGridData, level: usize, T: Option<f64>) -> Result<(), SGError>
{
    let t = T.unwrap_or(0.0); // default to zero (sparse grid)
    generate(storage, &LevelVectorRule::Regular { level: to_level(level)?, t })
}

#[allow(non_snake_case)]
pub fn cliques(_storage: &mut SparseGridData, _level: usize, _clique_size: usize, _T: Option<f64>) -> Result<(), SGError>
{
    Err(SGError::NotImplemented("cliques"))
}

pub fn full(storage: &mut SparseGridData, level: usize) -> Result<(), SGError>
{
    let levels = vec![level; storage.num_inputs()];
    anisotropic_full(storage, &levels)
}

pub fn anisotropic_full(storage: &mut SparseGridData, levels: &[usize]) -> Result<(), SGError>
{
    let levels = levels.iter().map(|&l| to_level(l)).collect::<Result<Vec<_>, _>>()?;
    generate(storage, &LevelVectorRule::Full { levels })
}

pub fn full_with_boundaries(storage: &mut SparseGridData, level: usize) -> Result<(), SGError>
{
    generate(storage, &LevelVectorRule::FullBoundary { level: to_level(level)? })
}

#[allow(non_snake_case)]
pub fn regular_interactions(storage: &mut SparseGridData, level: usize, terms: &[Vec<usize>], T: Option<f64>) -> Result<(), SGError>
{
    generate(storage, &LevelVectorRule::Interaction { level: to_level(level)?, t: T.unwrap_or(0.0), terms: terms.to_vec() })
}

#[allow(non_snake_case)]
pub fn regular_with_boundaries(storage: &mut SparseGridData, level: usize, boundary_level: Option<usize>, T: Option<f64>) -> Result<(), SGError>
{
    let boundary_level = to_level(boundary_level.unwrap_or(1))?;
    generate(storage, &LevelVectorRule::BoundaryTruncated { level: to_level(level)?, boundary_level, t: T.unwrap_or(0.0) })
}

#[allow(non_snake_case)]
pub fn regular_with_periodic_boundaries(storage: &mut SparseGridData, level: usize, T: Option<f64>) -> Result<(), SGError>
{
    generate(storage, &LevelVectorRule::Periodic { level: to_level(level)?, t: T.unwrap_or(0.0) })
}

pub fn truncated(storage: &mut SparseGridData, level: usize, k: usize) -> Result<(), SGError>
{
    generate(storage, &LevelVectorRule::Truncated { level: to_level(level)?, k: to_level(k)? })
}

#[test]
fn test_regular()
{
    let mut storage = SparseGridData::new(2);
    regular(&mut storage, 3, Some(0.0)).expect("Could not generate grid");
    assert_eq!(storage.len(), 17);
    assert!(!storage.has_boundary());
    assert_eq!(storage.find(&GridPoint::root(2)), Some(0));
    // leaves are exactly the points on the level sum n + d - 1
    for seq in 0..storage.len()
    {
        assert_eq!(storage.is_leaf(seq), storage.level_sum(seq) == 4);
    }
}

#[test]
fn test_regular_modifier()
{
    let mut storage = SparseGridData::new(1);
    regular(&mut storage, 3, None).expect("Could not generate grid");
    assert_eq!(storage.len(), 7);
    let mut storage = SparseGridData::new(2);
    regular(&mut storage, 3, Some(1.0)).expect("Could not generate grid");
    assert_eq!(storage.len(), 13);
    let mut storage = SparseGridData::new(2);
    regular(&mut storage, 3, Some(0.5)).expect("Could not generate grid");
    assert_eq!(storage.len(), 13);
    assert!(!storage.contains(&GridPoint::new(&[2, 2], &[1, 1], false)));
}

#[test]
fn test_regular_errors()
{
    let mut storage = SparseGridData::new(2);
    assert_eq!(regular(&mut storage, 0, None), Err(SGError::InvalidLevel));
    assert_eq!(regular(&mut storage, 32, None), Err(SGError::InvalidLevel));
    assert_eq!(regular(&mut storage, 2, Some(2.0)), Err(SGError::InvalidParameter));
    assert!(storage.is_empty());
    regular(&mut storage, 2, None).expect("Could not generate grid");
    assert_eq!(regular(&mut storage, 2, None), Err(SGError::StorageNotEmpty));
    assert_eq!(StandardGenerator.cliques(&mut SparseGridData::new(2), 2, 1, None), Err(SGError::NotImplemented("cliques")));
}

#[test]
fn test_truncated_boundaries_1d()
{
    let mut storage = SparseGridData::new(1);
    regular_with_boundaries(&mut storage, 2, Some(1), None).expect("Could not generate grid");
    assert_eq!(storage.len(), 5);
    assert!(storage.has_boundary());
}

#[test]
fn test_truncated_boundaries_2d()
{
    let mut storage = SparseGridData::new(2);
    regular_with_boundaries(&mut storage, 2, Some(1), None).expect("Could not generate grid");
    assert_eq!(storage.len(), 21);
    let mut storage2 = SparseGridData::new(2);
    regular_with_boundaries(&mut storage2, 3, Some(1), None).expect("Could not generate grid");
    assert_eq!(storage2.len(), 49);
    assert!(storage2.contains(&GridPoint::new(&[1,1], &[1,1], false)));
    assert!(storage2.contains(&GridPoint::new(&[1,2], &[1,1], false)));
    assert!(storage2.contains(&GridPoint::new(&[2,2], &[3,1], false)));
    assert!(!storage2.contains(&GridPoint::new(&[3,2], &[5,1], false)));
    assert!(storage2.contains(&GridPoint::new(&[3,1], &[5,1], false)));
    assert!(storage2.contains(&GridPoint::new(&[3,0], &[5,0], false)));
    assert!(storage2.contains(&GridPoint::new(&[0,0], &[0,0], false)));
}

#[test]
fn test_classic_boundaries()
{
    let mut storage = SparseGridData::new(2);
    regular_with_boundaries(&mut storage, 1, Some(0), None).expect("Could not generate grid");
    // (0,0), (0,1), (1,0): 4 + 2 + 2 points
    assert_eq!(storage.len(), 8);
    assert!(!storage.contains(&GridPoint::root(2)));
}

#[test]
fn test_truncated()
{
    let mut storage = SparseGridData::new(1);
    truncated(&mut storage, 2, 1).expect("Could not generate grid");
    assert_eq!(storage.len(), 5);
    let mut storage = SparseGridData::new(2);
    truncated(&mut storage, 2, 1).expect("Could not generate grid");
    assert_eq!(storage.len(), 21);
    let mut storage = SparseGridData::new(2);
    truncated(&mut storage, 3, 2).expect("Could not generate grid");
    assert_eq!(storage.len(), 65);
    assert!(storage.contains(&GridPoint::new(&[0, 3], &[1, 7], false)));
    assert!(!storage.contains(&GridPoint::new(&[3, 3], &[1, 1], false)));
}

#[test]
fn test_full()
{
    let mut storage = SparseGridData::new(2);
    full(&mut storage, 2).expect("Could not generate grid");
    assert_eq!(storage.len(), 9);
    let mut storage = SparseGridData::new(2);
    full_with_boundaries(&mut storage, 1).expect("Could not generate grid");
    assert_eq!(storage.len(), 9);
    assert_eq!(storage.num_inner_points(), 1);
    let mut storage = SparseGridData::new(2);
    anisotropic_full(&mut storage, &[1, 2]).expect("Could not generate grid");
    assert_eq!(storage.len(), 3);
    assert_eq!(anisotropic_full(&mut SparseGridData::new(2), &[1]), Err(SGError::DimensionMismatch { expected: 2, found: 1 }));
}

#[test]
fn test_leaf_flags_match_structure()
{
    let mut storage = SparseGridData::new(3);
    regular_with_boundaries(&mut storage, 3, Some(2), None).expect("Could not generate grid");
    for seq in 0..storage.len()
    {
        assert_eq!(storage.is_leaf(seq), storage.is_structural_leaf(seq));
    }
}

#[test]
fn test_boundary_modifier()
{
    let mut storage = SparseGridData::new(2);
    regular_with_boundaries(&mut storage, 3, Some(1), Some(1.0)).expect("Could not generate grid");
    // the (2, 2) subspace is the only one the modifier drops
    assert_eq!(storage.len(), 45);
    assert!(!storage.contains(&GridPoint::new(&[2, 2], &[1, 1], false)));
    assert!(storage.contains(&GridPoint::new(&[3, 0], &[5, 1], false)));
    assert_eq!(regular_with_boundaries(&mut SparseGridData::new(2), 3, Some(1), Some(1.5)), Err(SGError::InvalidParameter));
}

#[test]
fn test_regular_interactions()
{
    let mut storage = SparseGridData::new(3);
    StandardGenerator.regular_interactions(&mut storage, 3, &[vec![0], vec![1, 2]], None).expect("Could not generate grid");
    // 31 regular points minus the (2, 2, 1) and (2, 1, 2) subspaces
    assert_eq!(storage.len(), 23);
    assert!(!storage.has_boundary());
    assert!(storage.contains(&GridPoint::new(&[1, 2, 2], &[1, 3, 1], false)));
    assert!(!storage.contains(&GridPoint::new(&[2, 2, 1], &[1, 1, 1], false)));
    for seq in 0..storage.len()
    {
        assert_eq!(storage.is_leaf(seq), storage.is_structural_leaf(seq));
    }
    assert_eq!(regular_interactions(&mut SparseGridData::new(2), 2, &[vec![2]], None), Err(SGError::InvalidParameter));
}

#[test]
fn test_periodic_boundaries()
{
    let mut storage = SparseGridData::new(1);
    StandardGenerator.regular_with_periodic_boundaries(&mut storage, 2, None).expect("Could not generate grid");
    assert_eq!(storage.len(), 4);
    assert!(storage.contains(&GridPoint::new(&[0], &[0], false)));
    assert!(!storage.contains(&GridPoint::new(&[0], &[1], false)));
    assert!(!storage.is_leaf(storage.find(&GridPoint::new(&[0], &[0], false)).expect("boundary point")));
    let mut storage = SparseGridData::new(2);
    regular_with_periodic_boundaries(&mut storage, 2, None).expect("Could not generate grid");
    assert_eq!(storage.len(), 12);
    assert!(storage.contains(&GridPoint::new(&[0, 2], &[0, 3], false)));
    assert!(!storage.contains(&GridPoint::new(&[0, 2], &[1, 3], false)));
    assert_eq!(regular_with_periodic_boundaries(&mut SparseGridData::new(2), 0, None), Err(SGError::InvalidLevel));
}
