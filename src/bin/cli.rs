//! Paddock CLI - train models and query predictions from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use paddock::analytics::Analytics;
use paddock::data::{FeatureTables, RawTables, ResultHistoryIndex};
use paddock::trainer::{train_task, TrainingReport};
use paddock::{AppConfig, Confidence, ModelStore, PredictionResult, Predictor, Task};

#[derive(Parser)]
#[command(name = "paddock")]
#[command(author, version, about = "Motorsport prediction CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory with the raw CSV tables (default: config / DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for model artifacts (default: config / MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train and save models
    Train {
        /// Task to train (podium, wdc-points, wdc, constructors); all when omitted
        #[arg(short, long)]
        task: Option<Task>,
    },

    /// Predict drivers' and constructors' champions for a season
    Championships {
        /// Season to predict
        year: i32,

        /// Feature season to reuse (default: latest)
        #[arg(long)]
        snapshot: Option<i32>,

        /// Number of entries to show per championship
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Heuristic season outlook from recent results
    Project {
        #[command(subcommand)]
        target: ProjectTarget,
    },

    /// List seasons in the data set
    Seasons,
}

#[derive(Subcommand)]
enum ProjectTarget {
    /// Project a driver
    Driver { driver_id: i64, year: i32 },
    /// Project a constructor
    Constructor { constructor_id: i64, year: i32 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut config = AppConfig::from_env().context("Failed to read configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.model_dir {
        config.model_dir = dir;
    }

    println!("{}", format!("Paddock CLI v{}", env!("CARGO_PKG_VERSION")).cyan().bold());
    println!();

    match cli.command {
        Commands::Train { task } => run_train(&config, task),
        Commands::Championships {
            year,
            snapshot,
            top,
        } => run_championships(&config, year, snapshot.or(config.snapshot_season), top),
        Commands::Project { target } => run_project(&config, target),
        Commands::Seasons => run_seasons(&config),
    }
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn load_tables(data_dir: &Path) -> Result<RawTables> {
    let pb = spinner("Loading race data...")?;
    let tables = RawTables::load(data_dir)
        .with_context(|| format!("Failed to load data from {:?}", data_dir))?;
    pb.finish_and_clear();
    Ok(tables)
}

fn run_train(config: &AppConfig, task: Option<Task>) -> Result<()> {
    let tables = load_tables(&config.data_dir)?;
    let features = FeatureTables::build(&tables);
    let store = ModelStore::new(&config.model_dir);

    let tasks = match task {
        Some(task) => vec![task],
        None => Task::ALL.to_vec(),
    };

    for task in tasks {
        let pb = spinner(&format!("Training {} model...", task))?;
        let (model, report) =
            train_task(task, &tables, &features).with_context(|| format!("Training {} failed", task))?;
        store
            .save(&model)
            .with_context(|| format!("Failed to save {} model", task))?;
        pb.finish_and_clear();

        print_report(&report);
    }

    println!(
        "{}: {:?}",
        "Models saved to".green(),
        store.dir()
    );
    Ok(())
}

fn print_report(report: &TrainingReport) {
    let m = &report.test_metrics;
    println!("{}", format!("{} model", report.task).yellow().bold());
    println!(
        "  rows: {} train / {} test ({} positive)",
        report.train_rows, report.test_rows, report.positives
    );
    println!(
        "  accuracy {:.4}  precision {:.4}  recall {:.4}",
        m.accuracy, m.precision, m.recall
    );
    println!(
        "  confusion matrix: [[{}, {}], [{}, {}]]",
        m.confusion_matrix[0][0],
        m.confusion_matrix[0][1],
        m.confusion_matrix[1][0],
        m.confusion_matrix[1][1]
    );
    match &report.cross_validation {
        Some(cv) => println!(
            "  cross-validation accuracy {:.4} (+/- {:.4})",
            cv.mean,
            cv.std * 2.0
        ),
        None => println!("  cross-validation skipped (too few rows)"),
    }
    println!();
}

fn colored_confidence(confidence: Confidence) -> colored::ColoredString {
    match confidence {
        Confidence::High => confidence.as_str().green(),
        Confidence::Medium => confidence.as_str().yellow(),
        Confidence::Low => confidence.as_str().red(),
    }
}

fn print_ranking(title: &str, results: &[PredictionResult], top: usize) {
    println!("{}", title.yellow().bold());
    if results.is_empty() {
        println!("{}", "  No entries.".red());
        println!();
        return;
    }

    println!("{:>4} {:<28} {:>12} {:>10}", "#", "Name", "Probability", "Confidence");
    println!("{}", "-".repeat(58));
    for (rank, result) in results.iter().take(top).enumerate() {
        let marker = if result.is_positive() { "*" } else { " " };
        println!(
            "{:>3}{} {:<28} {:>11.1}% {:>10}",
            rank + 1,
            marker,
            result.entity_name,
            result.probability * 100.0,
            colored_confidence(result.confidence)
        );
    }
    println!();
}

fn run_championships(config: &AppConfig, year: i32, snapshot: Option<i32>, top: usize) -> Result<()> {
    let tables = load_tables(&config.data_dir)?;
    let features = FeatureTables::build(&tables);
    let predictor = Predictor::load(&ModelStore::new(&config.model_dir));

    let predictions = predictor
        .predict_championships(year, &features, snapshot, &tables)
        .context("Championship prediction failed")?;

    println!(
        "{}: {} (features from {})",
        "Predicting championships".green(),
        year,
        predictions
            .snapshot_season
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!();

    print_ranking("World Drivers' Championship:", &predictions.drivers, top);
    print_ranking("Constructors' Championship:", &predictions.constructors, top);
    Ok(())
}

fn run_project(config: &AppConfig, target: ProjectTarget) -> Result<()> {
    let tables = load_tables(&config.data_dir)?;
    let history = ResultHistoryIndex::build(&tables);
    let analytics = Analytics::new(&tables, &history);

    match target {
        ProjectTarget::Driver { driver_id, year } => {
            let projection = analytics.project_driver(driver_id, year)?;
            println!("{} {} ({})", "Projection for".green(), projection.driver_name, year);
            println!("  points:                   {:.1}", projection.predictions.points);
            println!(
                "  podium probability:       {:.3}",
                projection.predictions.podium_probability
            );
            println!(
                "  championship probability: {:.3}",
                projection.predictions.championship_probability
            );
            println!("  confidence:               {}", colored_confidence(projection.confidence));
            if let Some(races) = projection.based_on_races {
                println!("  based on {} races", races);
            }
            if let Some(note) = projection.note {
                println!("  {}", note.yellow());
            }
        }
        ProjectTarget::Constructor {
            constructor_id,
            year,
        } => {
            let projection = analytics.project_constructor(constructor_id, year)?;
            println!(
                "{} {} ({})",
                "Projection for".green(),
                projection.constructor_name,
                year
            );
            println!("  points:                   {:.1}", projection.predictions.points);
            println!(
                "  championship probability: {:.3}",
                projection.predictions.championship_probability
            );
            println!("  confidence:               {}", colored_confidence(projection.confidence));
            if let Some(seasons) = projection.based_on_seasons {
                println!("  based on {} seasons", seasons);
            }
            if let Some(note) = projection.note {
                println!("  {}", note.yellow());
            }
        }
    }
    Ok(())
}

fn run_seasons(config: &AppConfig) -> Result<()> {
    let tables = load_tables(&config.data_dir)?;
    let history = ResultHistoryIndex::build(&tables);
    let seasons = Analytics::new(&tables, &history).seasons();

    if seasons.is_empty() {
        println!("{}", "No seasons found.".yellow());
        return Ok(());
    }

    for row in seasons.chunks(10) {
        let line: Vec<String> = row.iter().map(|s| s.to_string()).collect();
        println!("{}", line.join("  "));
    }
    println!();
    println!("Total: {} seasons", seasons.len());
    Ok(())
}
