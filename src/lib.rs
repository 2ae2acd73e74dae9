pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod synthetic;

pub use error::{Result, SurveyError};
