//!
//! Refinement decorators. Each wraps another `Refinement` and delegates point
//! creation to it, so the structure a new point requires is unchanged; only
//! the candidates or their scores differ.
//!
use crate::errors::SGError;
use crate::storage::{GridPoint, SparseGridData};

use super::refinement::{Refinement, RefinementFunctor};

///
/// Refine along a single direction only. Ancestors a new point needs in other
/// directions are still created by the wrapped engine.
///
#[derive(Debug, Clone)]
pub struct OneDimensionalRefinement<R: Refinement>
{
    pub refinement: R,
    pub dim: usize,
}

impl<R: Refinement> OneDimensionalRefinement<R>
{
    pub fn new(refinement: R, dim: usize) -> Self
    {
        Self { refinement, dim }
    }
}

impl<R: Refinement> Refinement for OneDimensionalRefinement<R>
{
    fn validate(&self, storage: &SparseGridData) -> Result<(), SGError> {
        if self.dim >= storage.num_inputs()
        {
            return Err(SGError::InvalidParameter);
        }
        self.refinement.validate(storage)
    }

    fn admits_child(&self, point: &GridPoint, dim: usize) -> bool {
        dim == self.dim && self.refinement.admits_child(point, dim)
    }

    fn create_gridpoint(&self, storage: &mut SparseGridData, point: GridPoint) {
        self.refinement.create_gridpoint(storage, point);
    }

    fn score(&self, storage: &SparseGridData, seq: usize, functor: &dyn RefinementFunctor) -> f64 {
        self.refinement.score(storage, seq, functor)
    }
}

///
/// Aggregate the indicator over several grids. The score of a point is its own
/// score plus, for every auxiliary grid containing the same point, the
/// auxiliary functor's value there.
///
pub struct MultiGridRefinement<'a, R: Refinement>
{
    pub refinement: R,
    auxiliary: Vec<(&'a SparseGridData, &'a dyn RefinementFunctor)>,
}

impl<'a, R: Refinement> MultiGridRefinement<'a, R>
{
    pub fn new(refinement: R) -> Self
    {
        Self { refinement, auxiliary: Vec::new() }
    }

    ///
    /// Add a grid whose indicator contributes to the scores. Fails if the
    /// dimensions differ.
    ///
    pub fn add_grid(&mut self, storage: &'a SparseGridData, functor: &'a dyn RefinementFunctor) -> Result<(), SGError>
    {
        if let Some((first, _)) = self.auxiliary.first()
        {
            if first.num_inputs() != storage.num_inputs()
            {
                return Err(SGError::DimensionMismatch { expected: first.num_inputs(), found: storage.num_inputs() });
            }
        }
        self.auxiliary.push((storage, functor));
        Ok(())
    }

    pub fn num_grids(&self) -> usize
    {
        self.auxiliary.len()
    }
}

impl<R: Refinement> Refinement for MultiGridRefinement<'_, R>
{
    fn validate(&self, storage: &SparseGridData) -> Result<(), SGError> {
        for (auxiliary, _) in &self.auxiliary
        {
            if auxiliary.num_inputs() != storage.num_inputs()
            {
                return Err(SGError::DimensionMismatch { expected: storage.num_inputs(), found: auxiliary.num_inputs() });
            }
        }
        self.refinement.validate(storage)
    }

    fn admits_child(&self, point: &GridPoint, dim: usize) -> bool {
        self.refinement.admits_child(point, dim)
    }

    fn create_gridpoint(&self, storage: &mut SparseGridData, point: GridPoint) {
        self.refinement.create_gridpoint(storage, point);
    }

    fn score(&self, storage: &SparseGridData, seq: usize, functor: &dyn RefinementFunctor) -> f64 {
        let own = self.refinement.score(storage, seq, functor);
        if self.auxiliary.is_empty()
        {
            return own;
        }
        let point = storage.point(seq);
        own + self.auxiliary.iter()
            .filter_map(|(auxiliary, aux_functor)| auxiliary.find(&point).map(|aux_seq| aux_functor.eval(auxiliary, aux_seq)))
            .sum::<f64>()
    }
}
