pub mod surplus;
pub mod user_defined;

pub use surplus::{SurplusCoarsening, SurplusRefinement};
pub use user_defined::{UserDefinedRefinement, UserRefinementFunction};
