use std::fs;
use std::path::PathBuf;

use microscenario::config::{AppConfig, BlockConfig, InputConfig, PlotConfig, SynthConfig};
use microscenario::core::dimensions::DimensionSpec;
use microscenario::core::naming::NamingScheme;
use microscenario::core::rescale::Scale;
use microscenario::core::table::TopicColumns;
use microscenario::report::plot::QuadrantLabels;
use microscenario::synthetic::sampler::{CovariateSpec, Rounding};

fn unique_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "microscenario_config_restore_{}_{}",
        name,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    path
}

fn custom() -> AppConfig {
    AppConfig {
        input: InputConfig {
            id_column: "respondent".into(),
            delimiter: ';',
            topic_columns: TopicColumns {
                id: "id".into(),
                label: "name".into(),
                short_label: "abbr".into(),
            },
        },
        naming: NamingScheme::new("q", "grid"),
        scale: Scale { min: 1.0, max: 5.0 },
        synth: SynthConfig {
            n_topics: 6,
            n_participants: 90,
            seed: 1234,
            rounding: Rounding::HalfAwayFromZero,
            cross_block: -0.2,
            max_attempts: 25,
            tolerance: 1e-8,
            block_a: BlockConfig {
                low: 0.1,
                high: 0.3,
                mean: 0.2,
                sd: 0.3,
            },
            block_b: BlockConfig {
                low: 0.2,
                high: 0.4,
                mean: -0.1,
                sd: 0.35,
            },
            covariate: CovariateSpec {
                enabled: true,
                name: "age".into(),
                mean: 40.0,
                sd: 12.0,
                correlation: 0.2,
                columns: ["q1_grid_1".into(), "q2_grid_2".into()],
                decimals: 0,
            },
        },
        plot: PlotConfig {
            x: "benefit".into(),
            y: "harm".into(),
            title: "Benefit vs harm".into(),
            width: 1024,
            height: 768,
            quadrant_labels: Some(QuadrantLabels {
                top_right: "ambivalent".into(),
                top_left: "feared".into(),
                bottom_left: "irrelevant".into(),
                bottom_right: "welcome".into(),
            }),
        },
        dimensions: vec![
            DimensionSpec::new("benefit", false),
            DimensionSpec::new("harm", true),
        ],
    }
}

#[test]
fn config_roundtrip_default_toml() {
    let default_cfg = AppConfig::default();
    let text = toml::to_string_pretty(&default_cfg).expect("serialize default");
    let parsed: AppConfig = toml::from_str(&text).expect("parse default");
    assert_eq!(parsed, default_cfg);
}

#[test]
fn config_load_custom_values() {
    let path = unique_path("custom.toml");
    let cfg = custom();
    let text = toml::to_string_pretty(&cfg).expect("serialize custom");
    fs::write(&path, text).expect("write custom config");

    let lenient = AppConfig::load_or_default(&path.to_string_lossy());
    assert_eq!(lenient, cfg);
    let strict = AppConfig::load(&path).expect("strict load");
    assert_eq!(strict, cfg);

    let _ = fs::remove_file(&path);
}

#[test]
fn config_missing_file_fallback() {
    let path = unique_path("missing.toml");
    let _ = fs::remove_file(&path);

    let loaded = AppConfig::load_or_default(&path.to_string_lossy());
    assert!(path.exists(), "missing config should be created");
    assert_eq!(loaded, AppConfig::default());

    let _ = fs::remove_file(&path);
}

#[test]
fn strict_load_rejects_duplicate_dimensions() {
    let path = unique_path("dupes.toml");
    fs::write(
        &path,
        r#"
[[dimensions]]
name = "risk"

[[dimensions]]
name = "risk"
inverted = true
"#,
    )
    .unwrap();
    let err = AppConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("risk"), "{err}");
    let _ = fs::remove_file(&path);
}

#[test]
fn strict_load_rejects_missing_file() {
    let path = unique_path("absent.toml");
    assert!(AppConfig::load(&path).is_err());
    assert!(!path.exists());
}
