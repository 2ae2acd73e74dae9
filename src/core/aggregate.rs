//! Grouped mean / sample SD over long observations.
//!
//! Two views: by participant ("user factor", left-joined onto the source
//! participants and their covariates) and by topic ("topic factor",
//! left-joined with the label lookup). Rows come out in ascending key order.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::delimited;
use crate::core::naming::NamingScheme;
use crate::core::reshape::LongTable;
use crate::core::table::{ParticipantId, TopicLookup, Value, WideTable, format_opt};

/// Statistics of one (group, dimension) cell over non-missing values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DimensionStats {
    pub mean: Option<f64>,
    /// Sample SD (n - 1); missing for fewer than two values.
    pub sd: Option<f64>,
    pub n: usize,
}

impl DimensionStats {
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self::default();
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let sd = (n >= 2).then(|| {
            let ss = values
                .iter()
                .map(|v| {
                    let d = v - mean;
                    d * d
                })
                .sum::<f64>();
            (ss / (n as f64 - 1.0)).max(0.0).sqrt()
        });
        Self {
            mean: Some(mean),
            sd,
            n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Participant,
    Topic,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupValue {
    Participant(ParticipantId),
    Topic(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: GroupValue,
    pub stats: BTreeMap<String, DimensionStats>,
}

impl GroupStats {
    pub fn get(&self, dimension: &str) -> DimensionStats {
        self.stats.get(dimension).copied().unwrap_or_default()
    }
}

/// Group `long` by `key`; every group carries every configured dimension.
pub fn aggregate(long: &LongTable, key: GroupKey) -> Vec<GroupStats> {
    let mut groups: BTreeMap<GroupValue, BTreeMap<&str, Vec<f64>>> = BTreeMap::new();
    for obs in &long.observations {
        let group = match key {
            GroupKey::Participant => GroupValue::Participant(obs.participant_id.clone()),
            GroupKey::Topic => GroupValue::Topic(obs.topic_id),
        };
        let cells = groups.entry(group).or_default();
        let values = cells.entry(obs.dimension.as_str()).or_default();
        if let Some(v) = obs.value {
            values.push(v);
        }
    }

    groups
        .into_iter()
        .map(|(key, cells)| {
            let mut stats: BTreeMap<String, DimensionStats> = long
                .dimensions
                .iter()
                .map(|d| (d.clone(), DimensionStats::default()))
                .collect();
            for (dim, values) in cells {
                stats.insert(dim.to_string(), DimensionStats::from_values(&values));
            }
            GroupStats { key, stats }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserFactorRow {
    pub participant_id: ParticipantId,
    pub stats: BTreeMap<String, DimensionStats>,
    /// Aligned with [`UserFactorTable::covariate_names`].
    pub covariates: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserFactorTable {
    pub dimensions: Vec<String>,
    pub covariate_names: Vec<String>,
    pub rows: Vec<UserFactorRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicFactorRow {
    pub topic_id: u32,
    pub stats: BTreeMap<String, DimensionStats>,
    pub label: Option<String>,
    pub short_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicFactorTable {
    pub dimensions: Vec<String>,
    pub rows: Vec<TopicFactorRow>,
}

/// Per-participant view, left-joined onto every participant of `wide`.
pub fn user_factor(long: &LongTable, wide: &WideTable, scheme: &NamingScheme) -> UserFactorTable {
    let covariate_idx = wide.covariate_columns(scheme);
    let mut by_id: BTreeMap<ParticipantId, BTreeMap<String, DimensionStats>> =
        aggregate(long, GroupKey::Participant)
            .into_iter()
            .filter_map(|g| match g.key {
                GroupValue::Participant(id) => Some((id, g.stats)),
                GroupValue::Topic(_) => None,
            })
            .collect();

    let mut rows: Vec<UserFactorRow> = wide
        .rows
        .iter()
        .map(|row| {
            let stats = by_id
                .remove(&row.id)
                .unwrap_or_else(|| empty_stats(&long.dimensions));
            UserFactorRow {
                participant_id: row.id.clone(),
                stats,
                covariates: covariate_idx.iter().map(|&i| row.cells[i].clone()).collect(),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));

    if !by_id.is_empty() {
        warn!(
            orphans = by_id.len(),
            "observations for participants absent from the source table were dropped"
        );
    }
    debug!(rows = rows.len(), "user factor table built");
    UserFactorTable {
        dimensions: long.dimensions.clone(),
        covariate_names: covariate_idx.iter().map(|&i| wide.columns[i].clone()).collect(),
        rows,
    }
}

/// Per-topic view, left-joined with `lookup`.
pub fn topic_factor(long: &LongTable, lookup: &TopicLookup) -> TopicFactorTable {
    let rows: Vec<TopicFactorRow> = aggregate(long, GroupKey::Topic)
        .into_iter()
        .filter_map(|g| match g.key {
            GroupValue::Topic(topic_id) => {
                let label = lookup.get(topic_id);
                if label.is_none() {
                    debug!(topic_id, "topic has no entry in the label lookup");
                }
                Some(TopicFactorRow {
                    topic_id,
                    stats: g.stats,
                    label: label.map(|l| l.label.clone()),
                    short_label: label.map(|l| l.short_label.clone()),
                })
            }
            GroupValue::Participant(_) => None,
        })
        .collect();
    debug!(rows = rows.len(), "topic factor table built");
    TopicFactorTable {
        dimensions: long.dimensions.clone(),
        rows,
    }
}

/// Result of [`Aggregator::aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AggregateTable {
    Users(UserFactorTable),
    Topics(TopicFactorTable),
}

/// Join context for the two aggregate views.
pub struct Aggregator<'a> {
    pub wide: &'a WideTable,
    pub scheme: &'a NamingScheme,
    pub lookup: &'a TopicLookup,
}

impl Aggregator<'_> {
    pub fn aggregate(&self, long: &LongTable, key: GroupKey) -> AggregateTable {
        match key {
            GroupKey::Participant => {
                AggregateTable::Users(user_factor(long, self.wide, self.scheme))
            }
            GroupKey::Topic => AggregateTable::Topics(topic_factor(long, self.lookup)),
        }
    }
}

fn empty_stats(dimensions: &[String]) -> BTreeMap<String, DimensionStats> {
    dimensions
        .iter()
        .map(|d| (d.clone(), DimensionStats::default()))
        .collect()
}

fn stats_header(dimensions: &[String], out: &mut Vec<String>) {
    for d in dimensions {
        out.push(format!("{d}_mean"));
        out.push(format!("{d}_sd"));
        out.push(format!("{d}_n"));
    }
}

fn stats_fields(dimensions: &[String], stats: &BTreeMap<String, DimensionStats>, out: &mut Vec<String>) {
    for d in dimensions {
        let s = stats.get(d).copied().unwrap_or_default();
        out.push(format_opt(s.mean));
        out.push(format_opt(s.sd));
        out.push(s.n.to_string());
    }
}

impl UserFactorTable {
    pub fn get(&self, id: &ParticipantId) -> Option<&UserFactorRow> {
        self.rows.iter().find(|r| &r.participant_id == id)
    }

    pub fn to_delimited(&self, delimiter: char) -> String {
        let mut out = String::new();
        let mut header = vec!["participant_id".to_string()];
        stats_header(&self.dimensions, &mut header);
        header.extend(self.covariate_names.iter().cloned());
        delimited::push_row(&mut out, &header, delimiter);
        for row in &self.rows {
            let mut fields = vec![row.participant_id.to_string()];
            stats_fields(&self.dimensions, &row.stats, &mut fields);
            fields.extend(row.covariates.iter().map(Value::to_string));
            delimited::push_row(&mut out, &fields, delimiter);
        }
        out
    }
}

impl TopicFactorTable {
    pub fn get(&self, topic_id: u32) -> Option<&TopicFactorRow> {
        self.rows.iter().find(|r| r.topic_id == topic_id)
    }

    pub fn to_delimited(&self, delimiter: char) -> String {
        let mut out = String::new();
        let mut header = vec!["topic_id".to_string()];
        stats_header(&self.dimensions, &mut header);
        header.push("label".to_string());
        header.push("short_label".to_string());
        delimited::push_row(&mut out, &header, delimiter);
        for row in &self.rows {
            let mut fields = vec![row.topic_id.to_string()];
            stats_fields(&self.dimensions, &row.stats, &mut fields);
            fields.push(row.label.clone().unwrap_or_else(|| "NA".to_string()));
            fields.push(row.short_label.clone().unwrap_or_else(|| "NA".to_string()));
            delimited::push_row(&mut out, &fields, delimiter);
        }
        out
    }
}
