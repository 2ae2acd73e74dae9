//! Per-dimension summaries over the topic view and Pearson correlations
//! between two dimensions, serialized as `summary.json`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::core::aggregate::{DimensionStats, TopicFactorTable, UserFactorTable};
use crate::core::delimited;
use crate::error::{Result, SurveyError};

/// Distribution of one dimension's topic means.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSummary {
    pub dimension: String,
    /// Topics with a mean on this dimension.
    pub n: usize,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DimensionSummary {
    pub fn from_means(dimension: impl Into<String>, means: &[f64]) -> Self {
        let stats = DimensionStats::from_values(means);
        Self {
            dimension: dimension.into(),
            n: stats.n,
            mean: stats.mean,
            sd: stats.sd,
            min: means.iter().copied().reduce(f64::min),
            max: means.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationReport {
    pub x: String,
    pub y: String,
    /// Over topic means.
    pub topics: Option<f64>,
    pub topic_pairs: usize,
    /// Over participant means.
    pub participants: Option<f64>,
    pub participant_pairs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub n_participants: usize,
    pub n_topics: usize,
    pub n_observations: usize,
    pub dimensions: Vec<DimensionSummary>,
    pub correlation: Option<CorrelationReport>,
}

impl Summary {
    pub fn build(
        topics: &TopicFactorTable,
        users: &UserFactorTable,
        n_observations: usize,
        plotted: Option<(&str, &str)>,
    ) -> Self {
        let dimensions = topics
            .dimensions
            .iter()
            .map(|d| {
                let means: Vec<f64> = topics
                    .rows
                    .iter()
                    .filter_map(|r| r.stats.get(d).and_then(|s| s.mean))
                    .collect();
                DimensionSummary::from_means(d.as_str(), &means)
            })
            .collect();

        let correlation = plotted.map(|(x, y)| {
            let topic_pairs = complete_pairs(topics.rows.iter().map(|r| &r.stats), x, y);
            let user_pairs = complete_pairs(users.rows.iter().map(|r| &r.stats), x, y);
            CorrelationReport {
                x: x.to_string(),
                y: y.to_string(),
                topics: pearson(&topic_pairs.0, &topic_pairs.1),
                topic_pairs: topic_pairs.0.len(),
                participants: pearson(&user_pairs.0, &user_pairs.1),
                participant_pairs: user_pairs.0.len(),
            }
        });

        Self {
            n_participants: users.rows.len(),
            n_topics: topics.rows.len(),
            n_observations,
            dimensions,
            correlation,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SurveyError::Serialization {
            message: format!("summary: {e}"),
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut text = self.to_json()?;
        text.push('\n');
        delimited::write(path, &text)
    }
}

fn complete_pairs<'a>(
    rows: impl Iterator<Item = &'a BTreeMap<String, DimensionStats>>,
    x: &str,
    y: &str,
) -> (Vec<f64>, Vec<f64>) {
    rows.filter_map(|stats| {
        let a = stats.get(x)?.mean?;
        let b = stats.get(y)?.mean?;
        Some((a, b))
    })
    .unzip()
}

/// Pearson r. `None` for fewer than three pairs, unequal lengths, or zero
/// variance on either side.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 3 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }
    let den = (den_x * den_y).sqrt();
    (den > 0.0 && den.is_finite()).then(|| (num / den).clamp(-1.0, 1.0))
}
