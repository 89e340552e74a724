//! Command-line parsing for the ideal function matcher.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/mapping code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ifit", version, about = "Match training series to ideal functions and map test points")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit, map test points, print the report and optionally write results.
    Run(RunArgs),
    /// Fit only: print the best candidate per training column.
    Fit(DataArgs),
    /// Write a synthetic train/ideal/test CSV set.
    Generate(GenerateArgs),
    /// Run the full pipeline on a synthetic dataset held in memory.
    Demo(DemoArgs),
    /// Print a previously written run summary.
    Show(ShowArgs),
}

/// Where the input tables live and what shape they have.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Directory holding train.csv, ideal.csv and test.csv.
    ///
    /// Defaults to `$IFIT_DATA_DIR` (also read from `.env`), else `data`.
    #[arg(short = 'd', long)]
    pub data_dir: Option<PathBuf>,

    /// Training CSV (overrides `<data-dir>/train.csv`).
    #[arg(long)]
    pub train: Option<PathBuf>,

    /// Candidate ("ideal") CSV (overrides `<data-dir>/ideal.csv`).
    #[arg(long)]
    pub ideal: Option<PathBuf>,

    /// Test points CSV (overrides `<data-dir>/test.csv`).
    #[arg(long)]
    pub test: Option<PathBuf>,

    /// Expected number of training value columns.
    #[arg(long, default_value_t = 4)]
    pub training_columns: usize,

    /// Expected number of candidate value columns.
    #[arg(long, default_value_t = 50)]
    pub candidate_columns: usize,
}

/// Terminal output options.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Labeled rows to print.
    #[arg(long, default_value_t = 10)]
    pub rows: usize,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Write mapped_test_results.csv and fit_summary.json into this directory.
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,

    /// Load the inputs into this SQLite database, run from it, and save
    /// `mapped_test_results` there.
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,
}

/// Synthetic dataset options.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of test points.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub points: usize,

    /// Gaussian noise std dev for training columns and test points.
    #[arg(long, default_value_t = 0.3)]
    pub noise: f64,

    /// Share of test points drawn uniformly (likely unmatched).
    #[arg(long, default_value_t = 0.2)]
    pub outliers: f64,

    /// Training columns to generate.
    #[arg(long, default_value_t = 4)]
    pub training_columns: usize,

    /// Candidate columns to generate.
    #[arg(long, default_value_t = 50)]
    pub candidate_columns: usize,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    /// Output directory for train.csv, ideal.csv and test.csv.
    #[arg(short = 'o', long, default_value = "data")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Summary JSON produced by `ifit run --out`.
    #[arg(value_name = "JSON")]
    pub summary: PathBuf,
}
