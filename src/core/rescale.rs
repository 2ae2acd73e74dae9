//! core/rescale.rs — ordinal raw score → signed score in [-1, 1].
//!
//! The default mapping runs against the raw scale: `min → +1`, `max → -1`.
//! On the 1..7 scale this is `1 - (raw - 1) / 3`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyError};

/// Bounded ordinal response scale, e.g. a 7-point Likert item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    #[serde(default = "Scale::default_min")]
    pub min: f64,
    #[serde(default = "Scale::default_max")]
    pub max: f64,
}

impl Scale {
    fn default_min() -> f64 {
        1.0
    }
    fn default_max() -> f64 {
        7.0
    }

    pub fn new(min: f64, max: f64) -> Result<Self> {
        let scale = Self { min, max };
        scale.validate()?;
        Ok(scale)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min >= self.max {
            return Err(SurveyError::config(format!(
                "scale bounds must be finite with min < max (got {}..{})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    /// Signed score for `raw`; missing stays missing.
    pub fn rescale(&self, raw: Option<f64>, invert: bool) -> Result<Option<f64>> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        if !raw.is_finite() || raw < self.min || raw > self.max {
            return Err(SurveyError::Domain {
                value: raw,
                min: self.min,
                max: self.max,
                column: None,
                participant: None,
            });
        }
        let score = if raw == self.min {
            1.0
        } else if raw == self.max {
            -1.0
        } else {
            1.0 - 2.0 * (raw - self.min) / (self.max - self.min)
        };
        Ok(Some(if invert { -score } else { score }))
    }

    /// Raw value that [`rescale`](Self::rescale) maps to `score` (no inversion).
    pub fn raw_for(&self, score: f64) -> f64 {
        self.min + (1.0 - score) * 0.5 * (self.max - self.min)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            min: Self::default_min(),
            max: Self::default_max(),
        }
    }
}

/// `rescale(raw, min, max, invert)` with the crate's error type.
pub fn rescale(raw: Option<f64>, min: f64, max: f64, invert: bool) -> Result<Option<f64>> {
    Scale::new(min, max)?.rescale(raw, invert)
}
