use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::algorithms::coarsening::{Coarsening, CoarseningResult};
use crate::algorithms::refinement::{BaseRefinement, Refinement, RefinementFunctor};
use crate::errors::SGError;
use crate::generators::{Generator, LevelVectorRule};
use crate::refinement::{SurplusCoarsening, SurplusRefinement};
use crate::serialization::{self, SerializationFormat};
use crate::storage::{BoundingBox, PointIterator, SparseGridData};

///
/// A grid together with `num_outputs` hierarchical coefficients per point.
/// The coefficient vector follows the storage through refinement (new points
/// start at zero) and coarsening (coefficients of removed points are dropped).
///
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SparseGrid
{
    pub(crate) storage: SparseGridData,
    pub(crate) alpha: Vec<f64>,
    pub(crate) num_outputs: usize,
}

impl SparseGrid
{
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self
    {
        SparseGrid { storage: SparseGridData::new(num_inputs), alpha: Vec::new(), num_outputs }
    }

    pub fn with_bounding_box(bounding_box: BoundingBox, num_outputs: usize) -> Self
    {
        SparseGrid { storage: SparseGridData::with_bounding_box(bounding_box), alpha: Vec::new(), num_outputs }
    }

    pub fn storage(&self) -> &SparseGridData
    {
        &self.storage
    }

    pub fn alpha(&self) -> &[f64]
    {
        &self.alpha
    }

    pub fn alpha_mut(&mut self) -> &mut [f64]
    {
        &mut self.alpha
    }

    ///
    /// Replace the coefficients. `alpha` must hold `num_outputs` values per point.
    ///
    pub fn set_alpha(&mut self, alpha: Vec<f64>) -> Result<(), SGError>
    {
        let expected = self.len() * self.num_outputs;
        if alpha.len() != expected
        {
            return Err(SGError::DimensionMismatch { expected, found: alpha.len() });
        }
        self.alpha = alpha;
        Ok(())
    }

    pub fn num_inputs(&self) -> usize
    {
        self.storage.num_inputs()
    }

    pub fn num_outputs(&self) -> usize
    {
        self.num_outputs
    }

    pub fn bounding_box(&self) -> &BoundingBox
    {
        self.storage.bounding_box()
    }

    pub fn bounding_box_mut(&mut self) -> &mut BoundingBox
    {
        self.storage.bounding_box_mut()
    }

    pub fn is_empty(&self) -> bool
    {
        self.storage.is_empty()
    }

    pub fn len(&self) -> usize
    {
        self.storage.len()
    }

    pub fn has_boundary(&self) -> bool
    {
        self.storage.has_boundary()
    }

    /// Real coordinates of all points.
    pub fn points(&self) -> PointIterator<'_>
    {
        self.storage.points()
    }

    ///
    /// Real coordinates of the points `seqs`, flattened point after point.
    /// Typically used with the sequence numbers returned by `refine`.
    ///
    pub fn coordinates(&self, seqs: &[usize]) -> Vec<f64>
    {
        let mut points = Vec::with_capacity(seqs.len() * self.num_inputs());
        for &seq in seqs
        {
            points.extend(self.storage.real_coordinate(seq));
        }
        points
    }

    fn generated(&mut self, result: Result<(), SGError>) -> Result<(), SGError>
    {
        result?;
        self.alpha = vec![0.0; self.len() * self.num_outputs];
        Ok(())
    }

    pub fn sparse_grid<GENERATOR: Generator>(&mut self, level: usize, generator: &GENERATOR) -> Result<(), SGError>
    {
        let result = generator.regular(&mut self.storage, level, None);
        self.generated(result)
    }

    pub fn sparse_grid_with_boundaries<GENERATOR: Generator>(&mut self, level: usize, generator: &GENERATOR) -> Result<(), SGError>
    {
        let result = generator.regular_with_boundaries(&mut self.storage, level, None, None);
        self.generated(result)
    }

    pub fn full_grid<GENERATOR: Generator>(&mut self, level: usize, generator: &GENERATOR) -> Result<(), SGError>
    {
        let result = generator.full(&mut self.storage, level);
        self.generated(result)
    }

    pub fn full_grid_with_boundaries<GENERATOR: Generator>(&mut self, level: usize, generator: &GENERATOR) -> Result<(), SGError>
    {
        let result = generator.full_with_boundaries(&mut self.storage, level);
        self.generated(result)
    }

    /// Generate the grid of an arbitrary level-vector rule.
    pub fn generate(&mut self, rule: &LevelVectorRule) -> Result<(), SGError>
    {
        let result = crate::generators::generate(&mut self.storage, rule);
        self.generated(result)
    }

    ///
    /// Refinement engine matching the grid: boundary aware if the grid has a
    /// boundary.
    ///
    pub fn base_refinement(&self) -> BaseRefinement
    {
        BaseRefinement::for_storage(&self.storage)
    }

    ///
    /// One refinement step. Returns the sequence numbers of the new points,
    /// whose coefficients are initialized with zero.
    ///
    pub fn refine(&mut self, refinement: &dyn Refinement, functor: &dyn RefinementFunctor) -> Result<Vec<usize>, SGError>
    {
        let created = refinement.free_refine(&mut self.storage, functor)?;
        self.alpha.resize(self.len() * self.num_outputs, 0.0);
        Ok(created)
    }

    ///
    /// One refinement step driven by the largest absolute coefficient of each
    /// point.
    ///
    pub fn refine_by_surplus(&mut self, refinement: &dyn Refinement, refinements_num: usize, threshold: f64) -> Result<Vec<usize>, SGError>
    {
        let functor = SurplusRefinement::new(&self.alpha, self.num_outputs, refinements_num, threshold);
        let created = refinement.free_refine(&mut self.storage, &functor)?;
        self.alpha.resize(self.len() * self.num_outputs, 0.0);
        Ok(created)
    }

    ///
    /// One coarsening step. Coefficients of removed points are dropped.
    ///
    pub fn coarsen(&mut self, coarsening: &Coarsening, functor: &dyn RefinementFunctor) -> Result<CoarseningResult, SGError>
    {
        let result = coarsening.free_coarsen(&mut self.storage, functor)?;
        self.alpha = result.compact(&self.alpha, self.num_outputs);
        Ok(result)
    }

    ///
    /// Coarsen repeatedly, removing leaves whose largest absolute coefficient
    /// is below `threshold`, until a step removes nothing. Returns the number
    /// of removed points.
    ///
    pub fn coarsen_by_surplus(&mut self, coarsening: &Coarsening, threshold: f64) -> Result<usize, SGError>
    {
        let mut total_num_removed = 0;
        loop
        {
            let functor = SurplusCoarsening::new(&self.alpha, self.num_outputs, usize::MAX, threshold);
            let result = coarsening.free_coarsen(&mut self.storage, &functor)?;
            if result.removed.is_empty()
            {
                break;
            }
            total_num_removed += result.removed.len();
            self.alpha = result.compact(&self.alpha, self.num_outputs);
            if self.storage.is_empty()
            {
                break;
            }
        }
        log::debug!("coarsened grid to {} points, {} removed", self.len(), total_num_removed);
        Ok(total_num_removed)
    }

    fn check(self) -> Result<Self, SGError>
    {
        if self.alpha.len() != self.len() * self.num_outputs
        {
            return Err(SGError::DeserializationFailed);
        }
        Ok(self)
    }

    pub fn to_buffer(&self, format: SerializationFormat) -> Result<Vec<u8>, SGError>
    {
        serialization::serialize(self, format)
    }

    pub fn write<Writer: Write>(&self, writer: Writer, format: SerializationFormat) -> Result<(), SGError>
    {
        serialization::write(self, writer, format)
    }

    /// Save data to path
    pub fn save(&self, path: &str, format: SerializationFormat) -> Result<(), SGError>
    {
        serialization::save(self, path, format)
    }

    pub fn read_buffer(buffer: &[u8], format: SerializationFormat) -> Result<Self, SGError>
    {
        serialization::deserialize::<Self>(buffer, format)?.check()
    }

    pub fn read<Reader: Read>(reader: Reader, format: SerializationFormat) -> Result<Self, SGError>
    {
        serialization::read::<Self, _>(reader, format)?.check()
    }

    /// Load data from path
    pub fn load(path: &str, format: SerializationFormat) -> Result<Self, SGError>
    {
        serialization::load::<Self>(path, format)?.check()
    }
}
