//! carprice CLI Module
//!
//! Command-line interface for training, single predictions, serving and
//! dataset inspection.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifacts::FileArtifactStore;
use crate::config::AppConfig;
use crate::inference::{CarInput, PredictionService};
use crate::ingestion::{read_raw_dataset, CsvDatasetProvider, COMPANY, FUEL_TYPE, PRICE};
use crate::pipeline::{TrainingPipeline, TrainingSummary};
use crate::server::{run_server, ServerConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "carprice")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Used car price estimation: training pipeline and prediction service")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true, env = "CARPRICE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train all candidate models and persist the best one
    Train {
        /// Raw dataset CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output directory for artifacts
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Minimum held-out R² for the best model
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Price one car with the saved artifacts
    Predict {
        #[arg(long)]
        name: String,

        #[arg(long)]
        company: String,

        #[arg(long)]
        fuel_type: String,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        kms_driven: i64,

        /// Artifact directory
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
    },

    /// Start the prediction server
    Serve {
        /// Server port
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Dataset used for the company and name listings
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Show dataset information
    Info {
        /// Raw dataset CSV
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

/// Configuration file plus environment overrides
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    Ok(AppConfig::load(path)?)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(config: AppConfig) -> anyhow::Result<TrainingSummary> {
    section("Train");
    println!("  {:<12} {}", muted("Data"), config.data.source_path.display());
    println!("  {:<12} {}", muted("Artifacts"), config.artifacts.dir.display());
    println!(
        "  {:<12} {}",
        muted("Tracking"),
        config
            .tracking
            .as_ref()
            .map(|t| t.tracking_uri.clone())
            .unwrap_or_else(|| "disabled".to_string())
    );
    println!();

    step_run("Running training pipeline");
    let start = Instant::now();
    let summary = TrainingPipeline::from_config(config)?.run()?;
    step_done(&format!("{:.2?}", start.elapsed()));

    println!();
    println!("  {:<28} {:>10}", muted("Model"), muted("R²"));
    println!("  {}", dim(&"─".repeat(40)));
    for (name, score) in summary.report.iter() {
        let marker = if name == summary.best_model_name { ok("●") } else { dim("○") };
        println!("  {} {:<26} {:>10.4}", marker, name, score);
    }
    println!("  {}", dim(&"─".repeat(40)));

    println!();
    step_ok(&format!(
        "{} {} {:.4}  {} {:.2}  {} {:.2}",
        summary.best_model_name.white().bold(),
        muted("R²"),
        summary.metrics.r2,
        muted("RMSE"),
        summary.metrics.rmse,
        muted("MAE"),
        summary.metrics.mae,
    ));
    step_ok(&format!("artifacts saved to {}", summary.artifacts_dir.display()));
    println!();

    Ok(summary)
}

pub fn cmd_predict(config: &AppConfig, input: CarInput) -> anyhow::Result<f64> {
    section("Predict");

    step_run("Loading artifacts");
    let store = FileArtifactStore::new(&config.artifacts.dir);
    let service: PredictionService = PredictionService::load(&store, config.features.reference_year)?;
    step_done(&config.artifacts.dir.display().to_string());

    let price = service.predict(&input)?;
    println!();
    println!("  {:<16} {}", muted("Car"), format!("{} ({})", input.name, input.company.trim()));
    println!("  {:<16} {}", muted("Year"), input.year);
    println!("  {:<16} {}", muted("Kms driven"), input.kms_driven);
    println!("  {:<16} {}", muted("Price"), format!("{:.0}", price).white().bold());
    println!();

    Ok(price)
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let df = read_raw_dataset(&CsvDatasetProvider::new(data_path))?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    let price = df.column(PRICE)?.f64()?;
    println!();
    println!(
        "  {:<12} {}",
        muted("Companies"),
        df.column(COMPANY)?.n_unique().unwrap_or(0)
    );
    println!(
        "  {:<12} {}",
        muted("Fuel types"),
        df.column(FUEL_TYPE)?.n_unique().unwrap_or(0)
    );
    if let (Some(min), Some(max), Some(mean)) = (price.min(), price.max(), price.mean()) {
        println!(
            "  {:<12} {:.0} .. {:.0} {}",
            muted("Price"),
            min,
            max,
            dim(&format!("(mean {:.0})", mean))
        );
    }

    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(config: ServerConfig) -> anyhow::Result<()> {
    let base = format!("http://{}:{}", config.host, config.port);

    println!();
    line_box_top();
    line_box(&format!("{}", "carprice".white().bold()));
    line_box(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box("");
    line_box(&kv("Predict", &format!("{}/predict", base)));
    line_box(&kv("Company", &format!("{}/company", base)));
    line_box(&kv("Health ", &format!("{}/api/health", base)));
    line_box("");
    line_box(&format!("{}", dim("ctrl+c to stop")));
    line_box_bottom();
    println!();

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train() {
        let cli = Cli::try_parse_from([
            "carprice", "train", "--data", "cars.csv", "--threshold", "0.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Train { data, threshold, artifacts } => {
                assert_eq!(data, Some(PathBuf::from("cars.csv")));
                assert_eq!(threshold, Some(0.5));
                assert!(artifacts.is_none());
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from([
            "carprice", "predict", "--name", "Swift", "--company", "maruti",
            "--fuel-type", "Petrol", "--year", "2015", "--kms-driven", "45000",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Predict { year: 2015, kms_driven: 45000, .. }
        ));
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "x".red());
        assert_eq!(strip_ansi(&colored), "x");
    }
}
