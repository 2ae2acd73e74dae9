//! Batch stages behind the `synth`, `analyze` and `demo` subcommands.

use std::path::{Path, PathBuf};

use rand::{SeedableRng, rngs::StdRng};
use tracing::info;

use crate::config::AppConfig;
use crate::core::aggregate::{TopicFactorTable, UserFactorTable, topic_factor, user_factor};
use crate::core::delimited;
use crate::core::reshape::{LongTable, Reshaper};
use crate::core::table::{TopicLookup, WideTable};
use crate::error::{Result, SurveyError};
use crate::report::plot::{PlotSpec, ScatterPoint, render_svg, scatter_points};
use crate::report::summary::Summary;
use crate::synthetic::sampler::{SyntheticSampler, block_targets};

pub const LONG_FILE: &str = "long.csv";
pub const USER_FACTOR_FILE: &str = "user_factor.csv";
pub const TOPIC_FACTOR_FILE: &str = "topic_factor.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const PLOT_FILE: &str = "topic_scatter.svg";
pub const RESPONSES_FILE: &str = "responses.csv";
pub const TOPICS_FILE: &str = "topics.csv";

/// Build the correlation matrix and draw one synthetic response table.
pub fn synthesize(cfg: &AppConfig, seed: u64) -> Result<WideTable> {
    let synth = &cfg.synth;
    let mut rng = StdRng::seed_from_u64(seed);
    let correlation = synth.correlation_builder().build(&mut rng)?;
    let (means, sds) = block_targets(
        synth.n_topics,
        [
            (synth.block_a.mean, synth.block_a.sd),
            (synth.block_b.mean, synth.block_b.sd),
        ],
    );
    let sampler = SyntheticSampler {
        scheme: &cfg.naming,
        scale: cfg.scale,
        rounding: synth.rounding,
        id_column: &cfg.input.id_column,
        covariate: synth.active_covariate(),
    };
    sampler.sample(
        &mut rng,
        synth.n_topics,
        synth.n_participants,
        &means,
        &sds,
        &correlation,
    )
}

pub fn run_synth(cfg: &AppConfig, out: &Path, seed: Option<u64>) -> Result<WideTable> {
    let seed = seed.unwrap_or(cfg.synth.seed);
    info!(seed, out = %out.display(), "synthesizing responses");
    let wide = synthesize(cfg, seed)?;
    wide.write(out, cfg.input.delimiter)?;
    info!(rows = wide.len(), path = %out.display(), "synthetic responses written");
    Ok(wide)
}

/// Every derived view of one response table.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub long: LongTable,
    pub users: UserFactorTable,
    pub topics: TopicFactorTable,
    pub summary: Summary,
    pub points: Vec<ScatterPoint>,
}

/// Reshape, aggregate and summarize; no I/O.
pub fn analyze(cfg: &AppConfig, wide: &WideTable, lookup: &TopicLookup) -> Result<Analysis> {
    let dimensions = cfg.dimension_set()?;
    let long = Reshaper::new(&cfg.naming, &dimensions, cfg.scale).reshape(wide)?;
    let users = user_factor(&long, wide, &cfg.naming);
    let topics = topic_factor(&long, lookup);
    let plotted = (cfg.plot.x.as_str(), cfg.plot.y.as_str());
    let summary = Summary::build(&topics, &users, long.len(), Some(plotted));
    let points = scatter_points(&topics, plotted.0, plotted.1);
    info!(
        participants = users.rows.len(),
        topics = topics.rows.len(),
        plotted = points.len(),
        "analysis complete"
    );
    Ok(Analysis {
        long,
        users,
        topics,
        summary,
        points,
    })
}

/// Paths of the files written by [`write_analysis`].
#[derive(Debug, Clone, PartialEq)]
pub struct Outputs {
    pub long: PathBuf,
    pub user_factor: PathBuf,
    pub topic_factor: PathBuf,
    pub summary: PathBuf,
    pub plot: PathBuf,
}

impl Outputs {
    pub fn in_dir(outdir: &Path) -> Self {
        Self {
            long: outdir.join(LONG_FILE),
            user_factor: outdir.join(USER_FACTOR_FILE),
            topic_factor: outdir.join(TOPIC_FACTOR_FILE),
            summary: outdir.join(SUMMARY_FILE),
            plot: outdir.join(PLOT_FILE),
        }
    }
}

pub fn write_analysis(cfg: &AppConfig, analysis: &Analysis, outdir: &Path) -> Result<Outputs> {
    std::fs::create_dir_all(outdir)
        .map_err(|e| SurveyError::io(format!("creating {}", outdir.display()), e))?;
    let out = Outputs::in_dir(outdir);
    let d = cfg.input.delimiter;
    delimited::write(&out.long, &analysis.long.to_delimited(d))?;
    delimited::write(&out.user_factor, &analysis.users.to_delimited(d))?;
    delimited::write(&out.topic_factor, &analysis.topics.to_delimited(d))?;
    analysis.summary.write(&out.summary)?;
    let spec = PlotSpec {
        title: cfg.plot.title.clone(),
        x_label: cfg.plot.x.clone(),
        y_label: cfg.plot.y.clone(),
        width: cfg.plot.width,
        height: cfg.plot.height,
        quadrants: cfg.plot.quadrants(),
    };
    render_svg(&out.plot, &analysis.points, &spec)?;
    info!(outdir = %outdir.display(), "analysis outputs written");
    Ok(out)
}

pub fn run_analyze(
    cfg: &AppConfig,
    responses: &Path,
    topics: &Path,
    outdir: &Path,
) -> Result<Analysis> {
    let wide = WideTable::read(responses, &cfg.input.id_column, cfg.input.delimiter)?;
    let lookup = TopicLookup::read(topics, &cfg.input.topic_columns, cfg.input.delimiter)?;
    info!(
        participants = wide.len(),
        columns = wide.columns.len(),
        topics = lookup.len(),
        "inputs loaded"
    );
    let analysis = analyze(cfg, &wide, &lookup)?;
    write_analysis(cfg, &analysis, outdir)?;
    Ok(analysis)
}

/// Synthesize into `outdir`, then analyze the files just written.
pub fn run_demo(cfg: &AppConfig, outdir: &Path, seed: Option<u64>) -> Result<Analysis> {
    let responses = outdir.join(RESPONSES_FILE);
    let topics = outdir.join(TOPICS_FILE);
    run_synth(cfg, &responses, seed)?;
    let n_topics = u32::try_from(cfg.synth.n_topics)
        .map_err(|_| SurveyError::config("synth.n_topics does not fit in a topic id"))?;
    let lookup = TopicLookup::generated(n_topics);
    delimited::write(
        &topics,
        &lookup.to_delimited(&cfg.input.topic_columns, cfg.input.delimiter),
    )?;
    run_analyze(cfg, &responses, &topics, outdir)
}
