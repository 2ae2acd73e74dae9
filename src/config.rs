use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::core::dimensions::{DimensionSet, DimensionSpec};
use crate::core::naming::NamingScheme;
use crate::core::rescale::Scale;
use crate::core::table::TopicColumns;
use crate::error::{Result, SurveyError};
use crate::report::plot::QuadrantLabels;
use crate::synthetic::correlation::{CorrelationMatrixBuilder, UniformRange};
use crate::synthetic::sampler::{CovariateSpec, Rounding};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "InputConfig::default_id_column")]
    pub id_column: String,
    #[serde(default = "InputConfig::default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub topic_columns: TopicColumns,
}

impl InputConfig {
    fn default_id_column() -> String {
        "participant_id".to_string()
    }
    fn default_delimiter() -> char {
        ','
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            id_column: Self::default_id_column(),
            delimiter: Self::default_delimiter(),
            topic_columns: TopicColumns::default(),
        }
    }
}

/// Target structure of one block of synthetic variables (one dimension
/// across all topics), on the signed [-1, 1] axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Uniform range of within-block correlations.
    pub low: f64,
    pub high: f64,
    pub mean: f64,
    pub sd: f64,
}

impl BlockConfig {
    pub fn range(&self) -> UniformRange {
        UniformRange::new(self.low, self.high)
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            low: 0.25,
            high: 0.45,
            mean: 0.0,
            sd: 0.45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    #[serde(default = "SynthConfig::default_n_topics")]
    pub n_topics: usize,
    #[serde(default = "SynthConfig::default_n_participants")]
    pub n_participants: usize,
    #[serde(default = "SynthConfig::default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub rounding: Rounding,
    #[serde(default = "SynthConfig::default_cross_block")]
    pub cross_block: f64,
    #[serde(default = "SynthConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "SynthConfig::default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "SynthConfig::default_block_a")]
    pub block_a: BlockConfig,
    #[serde(default = "SynthConfig::default_block_b")]
    pub block_b: BlockConfig,
    /// Set `enabled = false` under `[synth.covariate]` to omit it.
    #[serde(default)]
    pub covariate: CovariateSpec,
}

impl SynthConfig {
    fn default_n_topics() -> usize {
        12
    }
    fn default_n_participants() -> usize {
        200
    }
    fn default_seed() -> u64 {
        42
    }
    fn default_cross_block() -> f64 {
        -0.3
    }
    fn default_max_attempts() -> u32 {
        CorrelationMatrixBuilder::DEFAULT_MAX_ATTEMPTS
    }
    fn default_tolerance() -> f64 {
        CorrelationMatrixBuilder::DEFAULT_TOLERANCE
    }
    fn default_block_a() -> BlockConfig {
        BlockConfig {
            mean: 0.1,
            ..BlockConfig::default()
        }
    }
    fn default_block_b() -> BlockConfig {
        BlockConfig {
            mean: -0.2,
            ..BlockConfig::default()
        }
    }

    /// The covariate to generate, if enabled.
    pub fn active_covariate(&self) -> Option<&CovariateSpec> {
        Some(&self.covariate).filter(|c| c.enabled)
    }

    pub fn correlation_builder(&self) -> CorrelationMatrixBuilder {
        CorrelationMatrixBuilder::new(
            self.n_topics,
            [self.block_a.range(), self.block_b.range()],
            self.cross_block,
        )
        .with_max_attempts(self.max_attempts)
        .with_tolerance(self.tolerance)
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            n_topics: Self::default_n_topics(),
            n_participants: Self::default_n_participants(),
            seed: Self::default_seed(),
            rounding: Rounding::default(),
            cross_block: Self::default_cross_block(),
            max_attempts: Self::default_max_attempts(),
            tolerance: Self::default_tolerance(),
            block_a: Self::default_block_a(),
            block_b: Self::default_block_b(),
            covariate: CovariateSpec::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(default = "PlotConfig::default_x")]
    pub x: String,
    #[serde(default = "PlotConfig::default_y")]
    pub y: String,
    #[serde(default = "PlotConfig::default_title")]
    pub title: String,
    #[serde(default = "PlotConfig::default_size")]
    pub width: u32,
    #[serde(default = "PlotConfig::default_size")]
    pub height: u32,
    /// Overrides the labels derived from the dimension names.
    #[serde(default)]
    pub quadrant_labels: Option<QuadrantLabels>,
}

impl PlotConfig {
    fn default_x() -> String {
        "risk".to_string()
    }
    fn default_y() -> String {
        "utility".to_string()
    }
    fn default_title() -> String {
        "Topic means".to_string()
    }
    fn default_size() -> u32 {
        800
    }

    pub fn quadrants(&self) -> QuadrantLabels {
        self.quadrant_labels
            .clone()
            .unwrap_or_else(|| QuadrantLabels::from_dimensions(&self.x, &self.y))
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            x: Self::default_x(),
            y: Self::default_y(),
            title: Self::default_title(),
            width: Self::default_size(),
            height: Self::default_size(),
            quadrant_labels: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub naming: NamingScheme,
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub synth: SynthConfig,
    #[serde(default)]
    pub plot: PlotConfig,
    #[serde(default = "AppConfig::default_dimensions")]
    pub dimensions: Vec<DimensionSpec>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            naming: NamingScheme::default(),
            scale: Scale::default(),
            synth: SynthConfig::default(),
            plot: PlotConfig::default(),
            dimensions: Self::default_dimensions(),
        }
    }
}

impl AppConfig {
    fn default_dimensions() -> Vec<DimensionSpec> {
        vec![
            DimensionSpec::new("risk", true),
            DimensionSpec::new("utility", false),
        ]
    }

    pub fn dimension_set(&self) -> Result<DimensionSet> {
        DimensionSet::new(self.dimensions.clone())
    }

    pub fn validate(&self) -> Result<()> {
        let dims = self.dimension_set()?;
        self.scale.validate()?;
        if self.input.id_column.trim().is_empty() {
            return Err(SurveyError::config("input.id_column must not be empty"));
        }
        if matches!(self.input.delimiter, '"' | '\n' | '\r') {
            return Err(SurveyError::config(format!(
                "input.delimiter {:?} is not usable",
                self.input.delimiter
            )));
        }
        if self.naming.block.is_empty() {
            return Err(SurveyError::config("naming.block must not be empty"));
        }
        for axis in [&self.plot.x, &self.plot.y] {
            if dims.position(axis).is_none() {
                return Err(SurveyError::config(format!(
                    "plot axis `{axis}` is not a configured dimension (have {:?})",
                    dims.names()
                )));
            }
        }
        if self.synth.n_participants == 0 {
            return Err(SurveyError::config("synth.n_participants must be at least 1"));
        }
        for (which, block) in [("block_a", &self.synth.block_a), ("block_b", &self.synth.block_b)] {
            if !block.mean.is_finite() || !block.sd.is_finite() || block.sd < 0.0 {
                return Err(SurveyError::config(format!(
                    "synth.{which} needs a finite mean and sd >= 0"
                )));
            }
        }
        if let Some(cov) = self.synth.active_covariate() {
            self.validate_covariate(cov)?;
        }
        self.synth.correlation_builder().validate_params()
    }

    fn validate_covariate(&self, cov: &CovariateSpec) -> Result<()> {
        if cov.name.trim().is_empty() {
            return Err(SurveyError::config("synth.covariate.name must not be empty"));
        }
        if cov.name == self.input.id_column || self.naming.parse(&cov.name).is_some() {
            return Err(SurveyError::config(format!(
                "synth.covariate.name `{}` collides with the id column or an evaluation column",
                cov.name
            )));
        }
        if cov.decimals > CovariateSpec::MAX_DECIMALS {
            return Err(SurveyError::config(format!(
                "synth.covariate.decimals must be at most {}",
                CovariateSpec::MAX_DECIMALS
            )));
        }
        if !cov.mean.is_finite() || !cov.sd.is_finite() || cov.sd < 0.0 {
            return Err(SurveyError::config("synth.covariate needs a finite mean and sd >= 0"));
        }
        for column in &cov.columns {
            let in_range = self.naming.parse(column).is_some_and(|key| {
                key.dimension_id <= 2 && key.topic_id as usize <= self.synth.n_topics
            });
            if !in_range {
                return Err(SurveyError::config(format!(
                    "synth.covariate column `{column}` is not a generated response column"
                )));
            }
        }
        Ok(())
    }

    /// Strict load: the file must exist, parse and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| SurveyError::io(format!("reading config {}", path.display()), e))?;
        let cfg: Self = toml::from_str(&text).map_err(|e| SurveyError::Serialization {
            message: format!("config {}: {e}", path.display()),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        warn!("Failed to parse config {path}: {err}. Using defaults.");
                    }
                },
                Err(err) => {
                    warn!("Failed to read config {path}: {err}. Using defaults.");
                }
            }
            return Self::default();
        }

        // Missing file: write commented defaults and return them.
        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                if let Err(err) = fs::write(path_obj, Self::commented(&text)) {
                    warn!("Failed to write default config to {path}: {err}");
                } else {
                    info!("Wrote default config to {path}");
                }
            }
            Err(err) => warn!("Failed to serialize default config: {err}; continuing with defaults"),
        }
        default_cfg
    }

    /// Comment out every value. Only top-level `[section]` headers stay live:
    /// a live empty `[a.b]` table would replace the field default of `b` with
    /// the type's own default, so nested and `[[array]]` headers are commented.
    fn commented(text: &str) -> String {
        let mut out = String::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                out.push('\n');
            } else if trimmed.starts_with('[')
                && !trimmed.starts_with("[[")
                && trimmed.ends_with(']')
                && !trimmed.contains('=')
                && !trimmed.contains('.')
            {
                out.push_str(line);
                out.push('\n');
            } else {
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}
