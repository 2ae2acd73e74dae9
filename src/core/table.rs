//! Typed wide survey table and topic label lookup.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::delimited::{self, Records};
use crate::core::naming::{ColumnKey, NamingScheme};
use crate::error::{Result, SurveyError};

const MISSING_TOKENS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

/// One cell of a delimited table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if MISSING_TOKENS.contains(&s) {
            return Self::Missing;
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Number(v),
            _ => Self::Text(s.to_string()),
        }
    }

    pub fn from_option(v: Option<f64>) -> Self {
        v.map_or(Self::Missing, Self::Number)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("NA"),
            Self::Number(v) => f.write_str(&format_number(*v)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Up to six decimals, trailing zeros trimmed.
pub fn format_number(x: f64) -> String {
    let mut s = format!("{x:.6}");
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s
    }
}

pub fn format_opt(x: Option<f64>) -> String {
    x.map_or_else(|| "NA".to_string(), format_number)
}

/// Participant identifier with natural ordering: numeric ids compare as
/// numbers and sort before non-numeric ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        if self.0.bytes().all(|b| b.is_ascii_digit()) {
            self.0.parse().ok()
        } else {
            None
        }
    }
}

impl Ord for ParticipantId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ParticipantId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRow {
    pub id: ParticipantId,
    /// Aligned with [`WideTable::columns`].
    pub cells: Vec<Value>,
}

/// One row per participant; `columns` excludes the id column.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    pub id_column: String,
    pub columns: Vec<String>,
    pub rows: Vec<ParticipantRow>,
}

impl WideTable {
    pub fn new(id_column: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            id_column: id_column.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, id: ParticipantId, cells: Vec<Value>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(SurveyError::Schema {
                message: format!(
                    "participant `{id}` has {} cells, table has {} columns",
                    cells.len(),
                    self.columns.len()
                ),
            });
        }
        if self.rows.iter().any(|r| r.id == id) {
            return Err(SurveyError::Schema {
                message: format!("participant id `{id}` appears more than once"),
            });
        }
        self.rows.push(ParticipantRow { id, cells });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Columns that parse as evaluation columns, in source order.
    pub fn evaluation_columns(&self, scheme: &NamingScheme) -> Vec<(usize, ColumnKey)> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| scheme.parse(c).map(|k| (i, k)))
            .collect()
    }

    /// Everything that is neither the id nor an evaluation column.
    pub fn covariate_columns(&self, scheme: &NamingScheme) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| scheme.parse(c).is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn from_records(records: Records, id_column: &str, path: &Path) -> Result<Self> {
        let id_idx = records.column(id_column).ok_or_else(|| {
            SurveyError::parse(path, 1, format!("missing id column `{id_column}`"))
        })?;
        let columns: Vec<String> = records
            .header
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_idx)
            .map(|(_, h)| h.clone())
            .collect();
        let mut table = Self::new(id_column, columns);
        let mut seen = HashSet::new();
        for record in records.rows {
            let id = record.fields[id_idx].trim().to_string();
            if id.is_empty() {
                return Err(SurveyError::parse(path, record.line, "empty participant id"));
            }
            if !seen.insert(id.clone()) {
                return Err(SurveyError::parse(
                    path,
                    record.line,
                    format!("duplicate participant id `{id}`"),
                ));
            }
            let cells = record
                .fields
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != id_idx)
                .map(|(_, f)| Value::parse(f))
                .collect();
            table.rows.push(ParticipantRow {
                id: ParticipantId::new(id),
                cells,
            });
        }
        Ok(table)
    }

    pub fn read(path: &Path, id_column: &str, delimiter: char) -> Result<Self> {
        Self::from_records(delimited::read(path, delimiter)?, id_column, path)
    }

    pub fn to_delimited(&self, delimiter: char) -> String {
        let mut out = String::new();
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(self.id_column.clone());
        header.extend(self.columns.iter().cloned());
        delimited::push_row(&mut out, &header, delimiter);
        for row in &self.rows {
            let mut fields = Vec::with_capacity(row.cells.len() + 1);
            fields.push(row.id.to_string());
            fields.extend(row.cells.iter().map(Value::to_string));
            delimited::push_row(&mut out, &fields, delimiter);
        }
        out
    }

    pub fn write(&self, path: &Path, delimiter: char) -> Result<()> {
        delimited::write(path, &self.to_delimited(delimiter))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicLabel {
    pub topic_id: u32,
    pub label: String,
    pub short_label: String,
}

/// Column names of the topic lookup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicColumns {
    #[serde(default = "TopicColumns::default_id")]
    pub id: String,
    #[serde(default = "TopicColumns::default_label")]
    pub label: String,
    #[serde(default = "TopicColumns::default_short_label")]
    pub short_label: String,
}

impl TopicColumns {
    fn default_id() -> String {
        "topic_id".to_string()
    }
    fn default_label() -> String {
        "label".to_string()
    }
    fn default_short_label() -> String {
        "short_label".to_string()
    }
}

impl Default for TopicColumns {
    fn default() -> Self {
        Self {
            id: Self::default_id(),
            label: Self::default_label(),
            short_label: Self::default_short_label(),
        }
    }
}

/// Immutable topic id → labels reference data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicLookup {
    labels: BTreeMap<u32, TopicLabel>,
}

impl TopicLookup {
    pub fn new(labels: impl IntoIterator<Item = TopicLabel>) -> Self {
        Self {
            labels: labels.into_iter().map(|l| (l.topic_id, l)).collect(),
        }
    }

    /// Placeholder labels `Topic N` / `TN` for topics `1..=n`.
    pub fn generated(n_topics: u32) -> Self {
        Self::new((1..=n_topics).map(|id| TopicLabel {
            topic_id: id,
            label: format!("Topic {id}"),
            short_label: format!("T{id}"),
        }))
    }

    pub fn get(&self, topic_id: u32) -> Option<&TopicLabel> {
        self.labels.get(&topic_id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopicLabel> {
        self.labels.values()
    }

    pub fn from_records(records: Records, columns: &TopicColumns, path: &Path) -> Result<Self> {
        let col = |name: &str| {
            records
                .column(name)
                .ok_or_else(|| SurveyError::parse(path, 1, format!("missing column `{name}`")))
        };
        let id_i = col(&columns.id)?;
        let label_i = col(&columns.label)?;
        let short_i = col(&columns.short_label)?;
        let mut labels = BTreeMap::new();
        for record in &records.rows {
            let raw_id = record.fields[id_i].trim();
            let topic_id = match raw_id.parse::<u32>() {
                Ok(id) if id > 0 => id,
                _ => {
                    return Err(SurveyError::parse(
                        path,
                        record.line,
                        format!("topic id `{raw_id}` is not a positive integer"),
                    ));
                }
            };
            let label = TopicLabel {
                topic_id,
                label: record.fields[label_i].trim().to_string(),
                short_label: record.fields[short_i].trim().to_string(),
            };
            if labels.insert(topic_id, label).is_some() {
                return Err(SurveyError::parse(
                    path,
                    record.line,
                    format!("topic id {topic_id} listed more than once"),
                ));
            }
        }
        Ok(Self { labels })
    }

    pub fn read(path: &Path, columns: &TopicColumns, delimiter: char) -> Result<Self> {
        Self::from_records(delimited::read(path, delimiter)?, columns, path)
    }

    pub fn to_delimited(&self, columns: &TopicColumns, delimiter: char) -> String {
        let mut out = String::new();
        delimited::push_row(
            &mut out,
            &[&columns.id, &columns.label, &columns.short_label],
            delimiter,
        );
        for l in self.labels.values() {
            delimited::push_row(
                &mut out,
                &[l.topic_id.to_string(), l.label.clone(), l.short_label.clone()],
                delimiter,
            );
        }
        out
    }
}
