//! Survey tables, column naming, rescaling, reshaping and aggregation.

pub mod aggregate;
pub mod delimited;
pub mod dimensions;
pub mod naming;
pub mod rescale;
pub mod reshape;
pub mod table;
