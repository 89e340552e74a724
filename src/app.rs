//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (plus `.env` defaults)
//! - loads the input tables
//! - runs fitting + test point mapping
//! - prints reports/plots
//! - writes optional exports (CSV/JSON files, SQLite tables)

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{Command, DataArgs, DemoArgs, GenerateArgs, RunArgs, SampleArgs, ShowArgs};
use crate::data::{SampleConfig, generate_sample};
use crate::domain::{RunConfig, TableShape};
use crate::error::AppError;
use crate::fit::FunctionFitter;
use crate::io::export::{MAPPED_RESULTS_FILE, write_labeled_points_csv, write_observations_csv, write_series_csv};
use crate::io::sqlite::SqliteStore;
use crate::io::store::{CsvStore, MemoryStore};
use crate::io::summary::{RunSummary, SUMMARY_FILE, read_summary_json, write_summary_json};

pub mod pipeline;

/// Environment variable naming the default data directory.
pub const DATA_DIR_ENV: &str = "IFIT_DATA_DIR";

/// Entry point for the `ifit` binary.
pub fn run() -> Result<(), AppError> {
    // `ifit` and `ifit -d data` behave like `ifit run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Fit(args) => handle_fit(args),
        Command::Generate(args) => handle_generate(args),
        Command::Demo(args) => handle_demo(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    log::info!(
        "Inputs: train={} ideal={} test={}",
        config.train_path.display(),
        config.ideal_path.display(),
        config.test_path.display()
    );

    let csv = CsvStore::from_config(&config);
    let run = match &config.db_path {
        Some(db_path) => run_through_database(&csv, db_path, config.shape)?,
        None => pipeline::run_pipeline(&csv, config.shape)?,
    };

    print_report(&run, &config);
    if config.plot {
        print_plots(&run, &config);
    }

    if let Some(dir) = &config.out_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", dir.display())))?;
        write_labeled_points_csv(&dir.join(MAPPED_RESULTS_FILE), &run.mapping.points)?;
        let summary = RunSummary::new(config.shape, &run.fit, &run.mapping);
        write_summary_json(&dir.join(SUMMARY_FILE), &summary)?;
    }

    Ok(())
}

/// Load the CSV inputs into `db_path`, run from the database and save the results there.
fn run_through_database(csv: &CsvStore, db_path: &Path, shape: TableShape) -> Result<pipeline::RunOutput, AppError> {
    let db = SqliteStore::open(db_path)?;
    let skipped_rows = db.import_from(csv)?;

    let mut run = pipeline::run_pipeline(&db, shape)?;
    run.mapping.skipped_rows = skipped_rows;
    db.save_mapped_results(&run.mapping.points)?;
    Ok(run)
}

fn handle_fit(args: DataArgs) -> Result<(), AppError> {
    let (train_path, ideal_path, test_path) = resolve_paths(&args);
    let store = CsvStore::new(train_path, ideal_path, test_path);
    let fit = FunctionFitter::new(&store, shape_from_args(&args)).find_best_functions()?;
    println!("{}", crate::report::format_fit_summary(&fit));
    Ok(())
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let sample = generate_sample(&sample_config_from_args(&args.sample))?;

    std::fs::create_dir_all(&args.out)
        .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", args.out.display())))?;
    write_series_csv(&args.out.join("train.csv"), &sample.training)?;
    write_series_csv(&args.out.join("ideal.csv"), &sample.candidates)?;
    write_observations_csv(&args.out.join("test.csv"), &sample.observations)?;

    println!(
        "Wrote train.csv, ideal.csv and test.csv to {} (training built from {}).",
        args.out.display(),
        fmt_pool_columns(&sample.chosen)
    );
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let sample_config = sample_config_from_args(&args.sample);
    let sample = generate_sample(&sample_config)?;
    println!("Synthetic training built from {}.\n", fmt_pool_columns(&sample.chosen));

    let store = MemoryStore::new(sample.training, sample.candidates, sample.observations);
    let run = pipeline::run_pipeline(&store, sample_config.shape)?;

    let config = RunConfig {
        train_path: PathBuf::from("<memory>"),
        ideal_path: PathBuf::from("<memory>"),
        test_path: PathBuf::from("<memory>"),
        shape: sample_config.shape,
        out_dir: None,
        db_path: None,
        rows: args.output.rows,
        plot: !args.output.no_plot,
        plot_width: args.output.width,
        plot_height: args.output.height,
    };
    print_report(&run, &config);
    if config.plot {
        print_plots(&run, &config);
    }
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let summary = read_summary_json(&args.summary)?;
    println!("{}", crate::report::format_run_summary(&summary));
    Ok(())
}

fn print_report(run: &pipeline::RunOutput, config: &RunConfig) {
    println!("{}", crate::report::format_fit_summary(&run.fit));
    println!(
        "{}",
        crate::report::format_mapping_summary(&run.fit, &run.mapping, config.rows)
    );
    if run.mapping.skipped_rows > 0 {
        println!("({} malformed test rows skipped)\n", run.mapping.skipped_rows);
    }
}

fn print_plots(run: &pipeline::RunOutput, config: &RunConfig) {
    for m in &run.fit.matches {
        if let Some(plot) =
            crate::plot::render_overlay(&run.training, &run.candidates, m, config.plot_width, config.plot_height)
        {
            println!("{plot}");
        }
    }
    if !run.mapping.points.is_empty() {
        println!(
            "{}",
            crate::plot::render_mapped_points(
                &run.mapping.points,
                &run.fit.matches,
                config.plot_width,
                config.plot_height
            )
        );
    }
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    let (train_path, ideal_path, test_path) = resolve_paths(&args.data);
    RunConfig {
        train_path,
        ideal_path,
        test_path,
        shape: shape_from_args(&args.data),
        out_dir: args.out.clone(),
        db_path: args.db.clone(),
        rows: args.output.rows,
        plot: !args.output.no_plot,
        plot_width: args.output.width,
        plot_height: args.output.height,
    }
}

fn shape_from_args(args: &DataArgs) -> TableShape {
    TableShape::new(args.training_columns, args.candidate_columns)
}

fn sample_config_from_args(args: &SampleArgs) -> SampleConfig {
    SampleConfig {
        seed: args.seed,
        shape: TableShape::new(args.training_columns, args.candidate_columns),
        test_points: args.points,
        noise: args.noise,
        outlier_fraction: args.outliers,
    }
}

/// Input file paths: explicit flags win, then `--data-dir`, then `$IFIT_DATA_DIR`, then `data`.
fn resolve_paths(args: &DataArgs) -> (PathBuf, PathBuf, PathBuf) {
    let dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
    let pick = |explicit: &Option<PathBuf>, name: &str| explicit.clone().unwrap_or_else(|| dir.join(name));
    (
        pick(&args.train, "train.csv"),
        pick(&args.ideal, "ideal.csv"),
        pick(&args.test, "test.csv"),
    )
}

fn default_data_dir() -> PathBuf {
    dotenvy::dotenv().ok();
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new("data").to_path_buf())
}

fn fmt_pool_columns(chosen: &[usize]) -> String {
    let names: Vec<String> = chosen.iter().map(|k| format!("y{}", k + 1)).collect();
    names.join(", ")
}

/// Rewrite argv so `ifit` defaults to `ifit run`.
///
/// Rules:
/// - `ifit`                      -> `ifit run`
/// - `ifit -d data ...`          -> `ifit run -d data ...`
/// - `ifit --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "fit" | "generate" | "demo" | "show");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}
