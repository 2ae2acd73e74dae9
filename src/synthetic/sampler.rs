//! Synthetic wide survey table with a target mean/SD/correlation structure.
//!
//! Draws happen on the signed [-1, 1] score axis; each value is then clamped,
//! mapped affinely onto the raw scale (`-1 → min`, `+1 → max`) and rounded.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::naming::{ColumnKey, NamingScheme};
use crate::core::rescale::Scale;
use crate::core::table::{ParticipantId, Value, WideTable};
use crate::error::{Result, SurveyError};
use crate::synthetic::correlation::CorrelationMatrix;
use crate::synthetic::mvn::{MultivariateNormal, conditional_on};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rounding {
    /// 2.5 → 2, 5.5 → 6.
    #[default]
    HalfEven,
    /// 2.5 → 3, -2.5 → -3.
    HalfAwayFromZero,
}

impl Rounding {
    pub fn round(self, x: f64) -> f64 {
        match self {
            Self::HalfEven => x.round_ties_even(),
            Self::HalfAwayFromZero => x.round(),
        }
    }
}

/// Clamp a signed score to [-1, 1], map it onto `scale`, round.
pub fn discretize(score: f64, scale: &Scale, rounding: Rounding) -> f64 {
    let v = score.clamp(-1.0, 1.0);
    let raw = scale.min + (v + 1.0) * 0.5 * (scale.max - scale.min);
    rounding.round(raw)
}

/// Extra per-participant variable correlated with two response columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CovariateSpec {
    /// `false` generates the response columns only.
    pub enabled: bool,
    pub name: String,
    pub mean: f64,
    pub sd: f64,
    /// Target correlation with each of `columns`.
    pub correlation: f64,
    pub columns: [String; 2],
    pub decimals: u32,
}

impl CovariateSpec {
    /// Beyond this the rounding factor no longer fits an `f64` mantissa.
    pub const MAX_DECIMALS: u32 = 15;

    fn rounding_factor(&self) -> Result<f64> {
        if self.decimals > Self::MAX_DECIMALS {
            return Err(SurveyError::config(format!(
                "covariate `{}` decimals {} exceeds {}",
                self.name,
                self.decimals,
                Self::MAX_DECIMALS
            )));
        }
        Ok(10f64.powi(self.decimals as i32))
    }
}

impl Default for CovariateSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "tech_affinity".to_string(),
            mean: 3.5,
            sd: 1.0,
            correlation: 0.3,
            columns: ["a1_matrix_1".to_string(), "a1_matrix_2".to_string()],
            decimals: 1,
        }
    }
}

pub struct SyntheticSampler<'a> {
    pub scheme: &'a NamingScheme,
    pub scale: Scale,
    pub rounding: Rounding,
    pub id_column: &'a str,
    pub covariate: Option<&'a CovariateSpec>,
}

impl SyntheticSampler<'_> {
    /// Variables `0..n` are dimension 1 of topics `1..=n`, `n..2n` are
    /// dimension 2. Columns are written topic by topic.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n_topics: usize,
        n_participants: usize,
        target_means: &[f64],
        target_sds: &[f64],
        correlation: &CorrelationMatrix,
    ) -> Result<WideTable> {
        self.scale.validate()?;
        if n_topics == 0 || n_participants == 0 {
            return Err(SurveyError::config(
                "synthetic data needs at least one topic and one participant",
            ));
        }
        if correlation.dim() != 2 * n_topics {
            return Err(SurveyError::config(format!(
                "{n_topics} topics need a {0}x{0} correlation matrix, got {1}x{1}",
                2 * n_topics,
                correlation.dim()
            )));
        }
        let draws = MultivariateNormal::new(target_means, target_sds, correlation)?
            .sample(rng, n_participants);
        if draws.iter().any(|v| !v.is_finite()) {
            return Err(SurveyError::numeric("multivariate sample contains non-finite values"));
        }

        let mut columns = Vec::with_capacity(2 * n_topics);
        let mut var_index = Vec::with_capacity(2 * n_topics);
        for topic in 0..n_topics {
            for dim in 0..2 {
                columns.push(self.scheme.format(ColumnKey {
                    topic_id: topic as u32 + 1,
                    dimension_id: dim as u32 + 1,
                }));
                var_index.push(dim * n_topics + topic);
            }
        }
        let mut raw: Vec<Vec<f64>> = var_index
            .iter()
            .map(|&j| {
                draws
                    .column(j)
                    .iter()
                    .map(|&v| discretize(v, &self.scale, self.rounding))
                    .collect()
            })
            .collect();

        if let Some(spec) = self.covariate {
            if spec.name == self.id_column || columns.contains(&spec.name) {
                return Err(SurveyError::config(format!(
                    "covariate name `{}` collides with an existing column",
                    spec.name
                )));
            }
            let factor = spec.rounding_factor()?;
            let predictors = spec
                .columns
                .iter()
                .map(|name| {
                    columns
                        .iter()
                        .position(|c| c == name)
                        .map(|i| raw[i].clone())
                        .ok_or_else(|| {
                            SurveyError::config(format!(
                                "covariate `{}` refers to unknown column `{name}`",
                                spec.name
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            let values = conditional_on(
                rng,
                &predictors,
                &[spec.correlation, spec.correlation],
                spec.mean,
                spec.sd,
            )?
            .into_iter()
            .map(|v| (v * factor).round() / factor)
            .collect();
            columns.push(spec.name.clone());
            raw.push(values);
        }

        let mut table = WideTable::new(self.id_column, columns);
        for i in 0..n_participants {
            let cells = raw.iter().map(|col| Value::Number(col[i])).collect();
            table.push_row(ParticipantId::new((i + 1).to_string()), cells)?;
        }
        info!(
            topics = n_topics,
            participants = n_participants,
            columns = table.columns.len(),
            "synthetic survey table sampled"
        );
        Ok(table)
    }
}

/// Expand per-dimension (mean, sd) into per-variable targets.
pub fn block_targets(n_topics: usize, blocks: [(f64, f64); 2]) -> (Vec<f64>, Vec<f64>) {
    let means = blocks
        .iter()
        .flat_map(|&(m, _)| std::iter::repeat_n(m, n_topics))
        .collect();
    let sds = blocks
        .iter()
        .flat_map(|&(_, s)| std::iter::repeat_n(s, n_topics))
        .collect();
    (means, sds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::correlation::{CorrelationMatrixBuilder, UniformRange};
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn discretize_clamps_maps_and_rounds() {
        let s = Scale::default();
        let got: Vec<f64> = [-1.0, -0.5, 0.0, 0.5, 1.0]
            .iter()
            .map(|&v| discretize(v, &s, Rounding::HalfEven))
            .collect();
        assert_eq!(got, vec![1.0, 2.0, 4.0, 6.0, 7.0]);
        assert_eq!(discretize(-3.0, &s, Rounding::HalfEven), 1.0);
        assert_eq!(discretize(2.0, &s, Rounding::HalfEven), 7.0);
        assert_eq!(discretize(-0.5, &s, Rounding::HalfAwayFromZero), 3.0);
    }

    #[test]
    fn block_targets_expand_per_dimension() {
        let (m, s) = block_targets(3, [(0.1, 0.5), (-0.2, 0.4)]);
        assert_eq!(m, vec![0.1, 0.1, 0.1, -0.2, -0.2, -0.2]);
        assert_eq!(s, vec![0.5, 0.5, 0.5, 0.4, 0.4, 0.4]);
    }

    fn sampler<'a>(scheme: &'a NamingScheme, cov: Option<&'a CovariateSpec>) -> SyntheticSampler<'a> {
        SyntheticSampler {
            scheme,
            scale: Scale::default(),
            rounding: Rounding::HalfEven,
            id_column: "participant_id",
            covariate: cov,
        }
    }

    #[test]
    fn sampled_table_has_expected_shape() {
        let mut rng = StdRng::seed_from_u64(2024);
        let corr = CorrelationMatrixBuilder::new(
            4,
            [UniformRange::new(0.2, 0.4), UniformRange::new(0.2, 0.4)],
            -0.1,
        )
        .build(&mut rng)
        .unwrap();
        let (means, sds) = block_targets(4, [(0.2, 0.5), (-0.1, 0.5)]);
        let scheme = NamingScheme::default();
        let cov = CovariateSpec::default();
        let table = sampler(&scheme, Some(&cov))
            .sample(&mut rng, 4, 60, &means, &sds, &corr)
            .unwrap();

        assert_eq!(table.len(), 60);
        assert_eq!(table.columns.len(), 9);
        assert_eq!(&table.columns[..3], &["a1_matrix_1", "a1_matrix_2", "a2_matrix_1"]);
        assert_eq!(table.columns[8], "tech_affinity");
        assert_eq!(table.evaluation_columns(&scheme).len(), 8);
        assert_eq!(table.rows[0].id.as_str(), "1");
        assert_eq!(table.rows[59].id.as_str(), "60");
        for row in &table.rows {
            for cell in &row.cells[..8] {
                let v = cell.as_number().unwrap();
                assert!((1.0..=7.0).contains(&v) && v.fract() == 0.0, "{v}");
            }
        }
    }

    #[test]
    fn dimension_mismatch_is_config_error() {
        let scheme = NamingScheme::default();
        let corr = CorrelationMatrix::identity(4);
        let err = sampler(&scheme, None)
            .sample(&mut StdRng::seed_from_u64(0), 3, 10, &[0.0; 6], &[0.5; 6], &corr)
            .unwrap_err();
        assert!(matches!(err, SurveyError::Config { .. }));
    }

    #[test]
    fn unknown_covariate_column_is_config_error() {
        let scheme = NamingScheme::default();
        let corr = CorrelationMatrix::identity(2);
        let cov = CovariateSpec {
            columns: ["a1_matrix_1".into(), "a9_matrix_1".into()],
            ..CovariateSpec::default()
        };
        let err = sampler(&scheme, Some(&cov))
            .sample(&mut StdRng::seed_from_u64(0), 1, 10, &[0.0; 2], &[0.5; 2], &corr)
            .unwrap_err();
        assert!(err.to_string().contains("a9_matrix_1"));
    }

    #[test]
    fn covariate_name_must_not_shadow_a_column() {
        let scheme = NamingScheme::default();
        let corr = CorrelationMatrix::identity(2);
        for name in ["participant_id", "a1_matrix_2"] {
            let cov = CovariateSpec {
                name: name.into(),
                ..CovariateSpec::default()
            };
            let err = sampler(&scheme, Some(&cov))
                .sample(&mut StdRng::seed_from_u64(0), 1, 10, &[0.0; 2], &[0.5; 2], &corr)
                .unwrap_err();
            assert!(matches!(err, SurveyError::Config { .. }), "{name}: {err}");
        }
    }

    #[test]
    fn oversized_covariate_decimals_is_config_error() {
        let scheme = NamingScheme::default();
        let corr = CorrelationMatrix::identity(2);
        let cov = CovariateSpec {
            decimals: u32::MAX,
            ..CovariateSpec::default()
        };
        let err = sampler(&scheme, Some(&cov))
            .sample(&mut StdRng::seed_from_u64(0), 1, 10, &[0.0; 2], &[0.5; 2], &corr)
            .unwrap_err();
        assert!(err.to_string().contains("decimals"), "{err}");
    }

    #[test]
    fn same_seed_same_table() {
        let scheme = NamingScheme::default();
        let corr = CorrelationMatrix::identity(2);
        let run = || {
            sampler(&scheme, None)
                .sample(&mut StdRng::seed_from_u64(77), 1, 5, &[0.0; 2], &[0.5; 2], &corr)
                .unwrap()
        };
        assert_eq!(run(), run());
    }
}
