//! Crate-wide error type.
//!
//! Every variant carries enough context (column, participant, attempt count,
//! rejected matrix) to diagnose a failed run without re-running it.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SurveyError>;

#[derive(Error, Debug)]
pub enum SurveyError {
    /// Raw value outside the declared ordinal scale.
    #[error("value {value} outside scale [{min}, {max}]{}", location_suffix(.column, .participant))]
    Domain {
        value: f64,
        min: f64,
        max: f64,
        column: Option<String>,
        participant: Option<String>,
    },

    /// Dimension id without a configured name, or malformed configuration.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Correlation matrix still invalid after the retry budget.
    #[error(
        "correlation matrix failed validation after {attempts} attempt(s) \
         (smallest eigenvalue {min_eigenvalue:.6e})\nlast rejected matrix:\n{matrix}"
    )]
    Construction {
        attempts: u32,
        min_eigenvalue: f64,
        matrix: String,
    },

    /// Sampling failed for an otherwise valid matrix.
    #[error("numeric failure: {message}")]
    Numeric { message: String },

    /// Malformed delimited input.
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Table shape or identity violation (ragged row, duplicate id).
    #[error("table schema error: {message}")]
    Schema { message: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("plot rendering failed: {message}")]
    Plot { message: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

fn location_suffix(column: &Option<String>, participant: &Option<String>) -> String {
    match (column, participant) {
        (Some(c), Some(p)) => format!(" in column `{c}` for participant `{p}`"),
        (Some(c), None) => format!(" in column `{c}`"),
        (None, Some(p)) => format!(" for participant `{p}`"),
        (None, None) => String::new(),
    }
}

impl SurveyError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn numeric(message: impl Into<String>) -> Self {
        Self::Numeric {
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Attach column/participant context to a bare domain error.
    pub fn at(self, column: &str, participant: &str) -> Self {
        match self {
            Self::Domain {
                value, min, max, ..
            } => Self::Domain {
                value,
                min,
                max,
                column: Some(column.to_string()),
                participant: Some(participant.to_string()),
            },
            other => other,
        }
    }
}
