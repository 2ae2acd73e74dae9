use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML. Without it `config.toml` is used, and written
    /// with commented defaults if missing.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a synthetic wide response table
    Synth {
        /// Output CSV path
        #[arg(long)]
        out: PathBuf,

        /// RNG seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Reshape, aggregate and report on a response table
    Analyze {
        /// Wide response CSV
        #[arg(long)]
        responses: PathBuf,

        /// Topic lookup CSV
        #[arg(long)]
        topics: PathBuf,

        /// Output directory for tables, summary and plot
        #[arg(long)]
        outdir: PathBuf,
    },
    /// Synthesize data and analyze it in one go
    Demo {
        /// Output directory
        #[arg(long)]
        outdir: PathBuf,

        /// RNG seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,
    },
}
