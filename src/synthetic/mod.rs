//! Synthetic survey data with a prescribed correlation structure.

pub mod correlation;
pub mod mvn;
pub mod sampler;
