// Entry point: parse flags, install logging, dispatch one batch command.
use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use microscenario::cli::{Args, Command};
use microscenario::config::AppConfig;
use microscenario::pipeline;

const DEFAULT_CONFIG: &str = "config.toml";

fn load_config(path: Option<&str>) -> microscenario::Result<AppConfig> {
    match path {
        Some(p) => AppConfig::load(Path::new(p)),
        None => {
            let cfg = AppConfig::load_or_default(DEFAULT_CONFIG);
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

fn run(args: Args) -> microscenario::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    match args.command {
        Command::Synth { out, seed } => {
            pipeline::run_synth(&cfg, &out, seed)?;
        }
        Command::Analyze {
            responses,
            topics,
            outdir,
        } => {
            let analysis = pipeline::run_analyze(&cfg, &responses, &topics, &outdir)?;
            info!(topics = analysis.topics.rows.len(), "done");
        }
        Command::Demo { outdir, seed } => {
            let analysis = pipeline::run_demo(&cfg, &outdir, seed)?;
            info!(topics = analysis.topics.rows.len(), "done");
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
