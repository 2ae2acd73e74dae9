use std::fs;
use std::path::PathBuf;

use microscenario::config::AppConfig;
use microscenario::core::table::WideTable;
use microscenario::pipeline::{self, Outputs};

fn unique_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "microscenario_pipeline_{}_{}",
        name,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn small_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.synth.n_topics = 4;
    cfg.synth.n_participants = 30;
    cfg
}

#[test]
fn demo_writes_every_output() {
    let dir = unique_dir("demo");
    let cfg = small_config();
    let analysis = pipeline::run_demo(&cfg, &dir, Some(11)).unwrap();

    let out = Outputs::in_dir(&dir);
    for path in [&out.long, &out.user_factor, &out.topic_factor, &out.summary, &out.plot] {
        assert!(path.exists(), "{} missing", path.display());
    }
    assert!(dir.join(pipeline::RESPONSES_FILE).exists());
    assert!(dir.join(pipeline::TOPICS_FILE).exists());

    let topic_csv = fs::read_to_string(&out.topic_factor).unwrap();
    assert!(topic_csv.starts_with("topic_id,risk_mean,risk_sd,risk_n,utility_mean"));
    assert_eq!(topic_csv.lines().count(), 5);
    assert!(topic_csv.contains("Topic 3,T3"));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out.summary).unwrap()).unwrap();
    assert_eq!(summary["n_participants"], 30);
    assert_eq!(summary["n_observations"], 30 * 8);
    assert_eq!(analysis.points.len(), 4);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn synth_then_analyze_matches_demo() {
    let dir = unique_dir("split");
    let cfg = small_config();
    let responses = dir.join("r.csv");
    let wide = pipeline::run_synth(&cfg, &responses, Some(11)).unwrap();
    let reread = WideTable::read(&responses, &cfg.input.id_column, cfg.input.delimiter).unwrap();
    assert_eq!(reread.columns, wide.columns);
    assert_eq!(reread.len(), 30);

    let demo_dir = dir.join("demo");
    let demo = pipeline::run_demo(&cfg, &demo_dir, Some(11)).unwrap();
    let direct = pipeline::analyze(
        &cfg,
        &reread,
        &microscenario::core::table::TopicLookup::generated(4),
    )
    .unwrap();
    assert_eq!(direct.topics, demo.topics);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn analyze_reports_missing_topic_file() {
    let dir = unique_dir("missing");
    let cfg = small_config();
    let responses = dir.join("r.csv");
    pipeline::run_synth(&cfg, &responses, None).unwrap();
    let err = pipeline::run_analyze(&cfg, &responses, &dir.join("nope.csv"), &dir).unwrap_err();
    assert!(err.to_string().contains("nope.csv"), "{err}");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn demo_without_covariate_reads_back() {
    let dir = unique_dir("no_covariate");
    let mut cfg = small_config();
    cfg.synth.covariate.enabled = false;
    let analysis = pipeline::run_demo(&cfg, &dir, Some(3)).unwrap();
    assert!(analysis.users.covariate_names.is_empty());

    let wide = WideTable::read(&dir.join(pipeline::RESPONSES_FILE), "participant_id", ',').unwrap();
    assert_eq!(wide.columns.len(), 8);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn covariate_named_like_id_column_fails_before_writing() {
    let dir = unique_dir("collide");
    let mut cfg = small_config();
    cfg.synth.covariate.name = "participant_id".into();
    assert!(cfg.validate().is_err());

    let err = pipeline::run_demo(&cfg, &dir, Some(3)).unwrap_err();
    assert!(err.to_string().contains("collides"), "{err}");
    assert!(!dir.join(pipeline::RESPONSES_FILE).exists());
    let _ = fs::remove_dir_all(&dir);
}
