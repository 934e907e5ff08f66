pub mod coarsening;
pub mod decorators;
pub mod refinement;
mod selection;
