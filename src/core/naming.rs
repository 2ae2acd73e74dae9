//! core/naming.rs — wide column naming scheme.
//!
//! Evaluation columns look like `<prefix><topic>_<block>_<dimension>`, e.g.
//! `a12_matrix_2` is topic 12, dimension 2. Anything else is a metadata or
//! covariate column and is left to the caller.

use serde::{Deserialize, Serialize};

/// (topic_id, dimension_id) parsed out of a column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnKey {
    pub topic_id: u32,
    pub dimension_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingScheme {
    #[serde(default = "NamingScheme::default_prefix")]
    pub prefix: String,
    #[serde(default = "NamingScheme::default_block")]
    pub block: String,
}

impl NamingScheme {
    fn default_prefix() -> String {
        "a".to_string()
    }
    fn default_block() -> String {
        "matrix".to_string()
    }

    pub fn new(prefix: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            block: block.into(),
        }
    }

    /// Parse a column name; `None` for anything that does not conform.
    pub fn parse(&self, column: &str) -> Option<ColumnKey> {
        let rest = column.strip_prefix(self.prefix.as_str())?;
        let (topic, rest) = rest.split_once('_')?;
        let rest = rest.strip_prefix(self.block.as_str())?;
        let dimension = rest.strip_prefix('_')?;
        Some(ColumnKey {
            topic_id: parse_id(topic)?,
            dimension_id: parse_id(dimension)?,
        })
    }

    /// Inverse of [`parse`](Self::parse).
    pub fn format(&self, key: ColumnKey) -> String {
        format!(
            "{}{}_{}_{}",
            self.prefix, key.topic_id, self.block, key.dimension_id
        )
    }
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
            block: Self::default_block(),
        }
    }
}

/// Positive decimal integer, ASCII digits only. Leading zeros are accepted
/// (`007` is 7), so `format` does not reproduce them.
fn parse_id(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match s.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(v) => Some(v),
    }
}
