//! Wide survey table → long observations.
//!
//! Output row count is always `participants × evaluation columns`; missing
//! raw answers keep their row with a missing value.

use serde::Serialize;
use tracing::{debug, info};

use crate::core::delimited;
use crate::core::dimensions::DimensionSet;
use crate::core::naming::NamingScheme;
use crate::core::rescale::Scale;
use crate::core::table::{ParticipantId, Value, WideTable, format_opt};
use crate::error::{Result, SurveyError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub participant_id: ParticipantId,
    pub topic_id: u32,
    pub dimension: String,
    /// Rescaled score in [-1, 1].
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LongTable {
    /// Dimension names in configured order.
    pub dimensions: Vec<String>,
    pub observations: Vec<Observation>,
}

impl LongTable {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn to_delimited(&self, delimiter: char) -> String {
        let mut out = String::new();
        delimited::push_row(
            &mut out,
            &["participant_id", "topic_id", "dimension", "value"],
            delimiter,
        );
        for o in &self.observations {
            delimited::push_row(
                &mut out,
                &[
                    o.participant_id.to_string(),
                    o.topic_id.to_string(),
                    o.dimension.clone(),
                    format_opt(o.value),
                ],
                delimiter,
            );
        }
        out
    }
}

struct ResolvedColumn<'a> {
    idx: usize,
    name: &'a str,
    topic_id: u32,
    dimension: &'a str,
    inverted: bool,
}

pub struct Reshaper<'a> {
    scheme: &'a NamingScheme,
    dimensions: &'a DimensionSet,
    scale: Scale,
}

impl<'a> Reshaper<'a> {
    pub fn new(scheme: &'a NamingScheme, dimensions: &'a DimensionSet, scale: Scale) -> Self {
        Self {
            scheme,
            dimensions,
            scale,
        }
    }

    pub fn reshape(&self, wide: &WideTable) -> Result<LongTable> {
        self.scale.validate()?;
        let columns = self.resolve_columns(wide)?;
        let skipped = wide.columns.len() - columns.len();
        if skipped > 0 {
            debug!(
                skipped,
                "columns not matching `{}<topic>_{}_<dimension>` carried as covariates",
                self.scheme.prefix,
                self.scheme.block
            );
        }

        let mut observations = Vec::with_capacity(wide.len() * columns.len());
        for row in &wide.rows {
            for col in &columns {
                let raw = match &row.cells[col.idx] {
                    Value::Missing => None,
                    Value::Number(v) => Some(*v),
                    Value::Text(t) => {
                        return Err(SurveyError::Schema {
                            message: format!(
                                "non-numeric value `{t}` in column `{}` for participant `{}`",
                                col.name, row.id
                            ),
                        });
                    }
                };
                let value = self
                    .scale
                    .rescale(raw, col.inverted)
                    .map_err(|e| e.at(col.name, row.id.as_str()))?;
                observations.push(Observation {
                    participant_id: row.id.clone(),
                    topic_id: col.topic_id,
                    dimension: col.dimension.to_string(),
                    value,
                });
            }
        }

        info!(
            participants = wide.len(),
            columns = columns.len(),
            observations = observations.len(),
            "reshaped wide table to long form"
        );
        Ok(LongTable {
            dimensions: self.dimensions.names().into_iter().map(String::from).collect(),
            observations,
        })
    }

    fn resolve_columns<'w>(&'w self, wide: &'w WideTable) -> Result<Vec<ResolvedColumn<'w>>> {
        wide.evaluation_columns(self.scheme)
            .into_iter()
            .map(|(idx, key)| {
                let name = wide.columns[idx].as_str();
                let spec = self.dimensions.lookup(key.dimension_id, name)?;
                Ok(ResolvedColumn {
                    idx,
                    name,
                    topic_id: key.topic_id,
                    dimension: spec.name.as_str(),
                    inverted: spec.inverted,
                })
            })
            .collect()
    }
}
