use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "rpilot - build, run and analyze jobs of a REINVENT-style molecule generation tool.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a run configuration from a recipe and write it as JSON.
    Config(ConfigArgs),
    /// Check an existing JSON run configuration.
    Validate(ValidateArgs),
    /// Build a configuration, launch the external tool and summarize its outputs.
    Run(RunArgs),
    /// Summarize transcripts and result tables of finished runs.
    Analyze(AnalyzeArgs),
}

/// Where a run configuration comes from and how to override it.
#[derive(Args, Debug, Clone, Default)]
pub struct RecipeArgs {
    /// Path to the recipe file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the run's output directory.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Override the job name.
    #[arg(long, value_name = "NAME")]
    pub job_name: Option<String>,

    // --- Reinforcement Learning Overrides ---
    /// Override the prior model checkpoint.
    #[arg(long, value_name = "PATH")]
    pub prior: Option<PathBuf>,

    /// Override the agent model checkpoint.
    #[arg(long, value_name = "PATH")]
    pub agent: Option<PathBuf>,

    /// Override the number of reinforcement learning steps.
    #[arg(short = 'n', long, value_name = "INT")]
    pub n_steps: Option<usize>,

    /// Override the batch size.
    #[arg(short, long, value_name = "INT")]
    pub batch_size: Option<usize>,

    /// Set a specific recipe value, overriding the recipe file.
    /// Can be used multiple times. Example: -S reinforcement-learning.sigma=64
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// How to invoke the external tool.
#[derive(Args, Debug, Clone, Default)]
pub struct LaunchArgs {
    /// Python interpreter used to start the tool.
    #[arg(long, value_name = "PATH")]
    pub python: Option<String>,

    /// The tool's entry script (e.g. input.py).
    #[arg(long, value_name = "PATH")]
    pub entry_point: Option<PathBuf>,

    /// Kill the tool after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Which step reports to print. At most one selector may be given.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
pub struct EpochArgs {
    /// Step numbers to print, e.g. "0,10,20-25".
    #[arg(long, value_name = "LIST")]
    pub epochs: Option<String>,

    /// Zero-based positions of the reports to print, e.g. "0,3".
    #[arg(long, value_name = "LIST")]
    pub positions: Option<String>,

    /// Print every Nth report.
    #[arg(long, value_name = "N")]
    pub every: Option<usize>,

    /// Print the last N reports.
    #[arg(long, value_name = "N")]
    pub last: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,

    /// Write the JSON here instead of printing it.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to a JSON run configuration.
    #[arg(required = true, value_name = "PATH")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,

    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Write the configuration and print the command line without launching.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub epochs: EpochArgs,

    /// Number of best molecules and scaffolds to list per table.
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Console transcript of a run (run.err).
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,

    /// Score table to summarize (memory.csv, scaffold_memory.csv). Can be repeated.
    #[arg(long = "table", value_name = "PATH")]
    pub tables: Vec<PathBuf>,

    /// SMILES file written by a sampling run.
    #[arg(long, value_name = "PATH")]
    pub sampled: Option<PathBuf>,

    #[command(flatten)]
    pub epochs: EpochArgs,

    /// Number of best molecules and scaffolds to list per table.
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub top: usize,
}
