//!
//! Hash indexed storage for hierarchical sparse grids together with greedy
//! adaptive refinement and coarsening.
//!
pub mod algorithms;
pub mod errors;
pub mod generators;
pub mod grids;
pub mod refinement;
pub mod serialization;
pub mod storage;
