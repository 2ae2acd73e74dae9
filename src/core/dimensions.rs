//! Ordered per-dimension configuration: id `k` (1-based) names entry `k - 1`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub name: String,
    /// Flip polarity after rescaling so all dimensions read "more = more".
    #[serde(default)]
    pub inverted: bool,
}

impl DimensionSpec {
    pub fn new(name: impl Into<String>, inverted: bool) -> Self {
        Self {
            name: name.into(),
            inverted,
        }
    }
}

/// Validated, ordered set of dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSet {
    specs: Vec<DimensionSpec>,
}

impl DimensionSet {
    pub fn new(specs: Vec<DimensionSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(SurveyError::config("at least one dimension must be configured"));
        }
        for (i, spec) in specs.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(SurveyError::config(format!(
                    "dimension {} has an empty name",
                    i + 1
                )));
            }
            if specs[..i].iter().any(|s| s.name == spec.name) {
                return Err(SurveyError::config(format!(
                    "dimension name `{}` is configured more than once",
                    spec.name
                )));
            }
        }
        Ok(Self { specs })
    }

    /// `risk` (inverted) and `utility`.
    pub fn risk_utility() -> Self {
        Self {
            specs: vec![
                DimensionSpec::new("risk", true),
                DimensionSpec::new("utility", false),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, dimension_id: u32) -> Option<&DimensionSpec> {
        let idx = usize::try_from(dimension_id).ok()?.checked_sub(1)?;
        self.specs.get(idx)
    }

    pub fn lookup(&self, dimension_id: u32, column: &str) -> Result<&DimensionSpec> {
        self.get(dimension_id).ok_or_else(|| {
            SurveyError::config(format!(
                "column `{column}` refers to dimension {dimension_id}, but only {} dimension(s) are configured ({})",
                self.specs.len(),
                self.names().join(", ")
            ))
        })
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DimensionSpec> {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_based() {
        let dims = DimensionSet::risk_utility();
        assert_eq!(dims.get(1).map(|d| d.name.as_str()), Some("risk"));
        assert_eq!(dims.get(2).map(|d| d.name.as_str()), Some("utility"));
        assert!(dims.get(0).is_none());
        assert!(dims.get(3).is_none());
    }

    #[test]
    fn unknown_id_names_the_column() {
        let dims = DimensionSet::risk_utility();
        let err = dims.lookup(3, "a1_matrix_3").unwrap_err();
        assert!(matches!(err, SurveyError::Config { .. }));
        assert!(err.to_string().contains("a1_matrix_3"));
    }

    #[test]
    fn rejects_malformed_sets() {
        assert!(DimensionSet::new(vec![]).is_err());
        assert!(DimensionSet::new(vec![DimensionSpec::new(" ", false)]).is_err());
        assert!(
            DimensionSet::new(vec![
                DimensionSpec::new("risk", true),
                DimensionSpec::new("risk", false),
            ])
            .is_err()
        );
    }

    #[test]
    fn supports_more_than_two_dimensions() {
        let dims = DimensionSet::new(vec![
            DimensionSpec::new("risk", true),
            DimensionSpec::new("utility", false),
            DimensionSpec::new("trust", false),
        ])
        .unwrap();
        assert_eq!(dims.len(), 3);
        assert_eq!(dims.position("trust"), Some(2));
        assert!(dims.get(1).unwrap().inverted);
    }
}
