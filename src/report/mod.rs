//! Summary tables, correlations and the topic scatter plot.

pub mod plot;
pub mod summary;
