//! Standings CLI binary.
//!
//! Provides command-line interface for the standings ranking engine.

mod import;
mod settings;

use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use settings::{Settings, open_store};
use standings::{RankingEngine, RunSummary};
use standings_data::{ReportPeriod, SourceTable, SqliteStore};
use standings_output::{ExportFormat, Exporter, RankingReport};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "standings")]
#[command(about = "Standings: quarterly peer rankings of financial metrics", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metrics, rank and diff one report period
    Run {
        /// Report year; defaults to the last completed quarter
        #[arg(long, requires = "quarter")]
        year: Option<i32>,

        /// Report quarter (1-4)
        #[arg(long, requires = "year")]
        quarter: Option<u32>,
    },

    /// List the ranked metrics and their sources
    Metrics,

    /// Print or export the rankings of a period
    Report {
        /// Report year
        #[arg(long)]
        year: i32,

        /// Report quarter (1-4)
        #[arg(long)]
        quarter: u32,

        /// Output format (csv, json, pretty-json or text)
        #[arg(long, default_value = "text")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Load raw facts from a CSV file
    Import {
        /// Raw fact table, e.g. financial_condition
        #[arg(long)]
        table: String,

        /// Report year
        #[arg(long)]
        year: i32,

        /// Report quarter (1-4)
        #[arg(long)]
        quarter: u32,

        /// CSV file with a company_name column
        file: PathBuf,
    },

    /// Manage the company directory
    Directory {
        #[command(subcommand)]
        action: DirectoryAction,
    },

    /// Show row counts of the store
    Status,
}

#[derive(Subcommand)]
enum DirectoryAction {
    /// Add companies
    Add {
        /// Company names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Remove companies
    Remove {
        /// Company names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List companies
    List,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load_or_default(cli.config.as_deref())?;
    let database = settings.database_path(cli.database.as_deref());

    match cli.command {
        Commands::Run { year, quarter } => {
            let period = ReportPeriod::resolve(year, quarter, Local::now().date_naive())?;
            let (start, end) = period.bounds()?.compact();
            info!(%period, %start, %end, "resolved report period");
            let store = open_store(&database)?;
            run_pipeline(&store, &settings, period)?;
        }
        Commands::Metrics => list_metrics(&settings)?,
        Commands::Report {
            year,
            quarter,
            format,
            output,
        } => {
            let period = ReportPeriod::from_parts(year, quarter)?;
            let format: ExportFormat = format.parse()?;
            let store = open_store(&database)?;
            write_report(&store, period, format, output.as_deref())?;
        }
        Commands::Import {
            table,
            year,
            quarter,
            file,
        } => {
            let table = SourceTable::from_table_name(&table)?;
            let period = ReportPeriod::from_parts(year, quarter)?;
            let store = open_store(&database)?;
            import_file(&store, table, period, &file)?;
        }
        Commands::Directory { action } => {
            let store = open_store(&database)?;
            manage_directory(&store, action)?;
        }
        Commands::Status => {
            let store = open_store(&database)?;
            let stats = store.stats()?;
            println!("Database: {}", database.display());
            println!("  Companies:          {}", stats.companies);
            println!("  Raw facts:          {}", stats.raw_facts);
            println!("  Calculated metrics: {}", stats.calculated_metrics);
            println!("  Ranked facts:       {}", stats.ranked_facts);
        }
    }

    Ok(())
}

fn run_pipeline(
    store: &SqliteStore,
    settings: &Settings,
    period: ReportPeriod,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = RankingEngine::new(store, settings.registry()?, store)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Ranking {}...", period));

    let summary = match engine.run(period) {
        Ok(summary) => {
            pb.finish_with_message(format!("Ranked {}", period));
            summary
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\nPeriod {}", summary.period);
    println!("{}", "=".repeat(40));
    println!(
        "  Calculated metrics: {} written, {} skipped, {} unnormalized",
        summary.compute.computed, summary.compute.skipped, summary.compute.unnormalized
    );
    println!(
        "  Ranked facts:       {} written, {} pruned, {} outside directory",
        summary.collect.written, summary.collect.pruned, summary.collect.excluded
    );
    println!("  Ranked:             {}", summary.rank.ranked);
    println!(
        "  Rank changes:       {} compared, {} without prior year",
        summary.diff.compared, summary.diff.unknown
    );
}

fn list_metrics(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let registry = settings.registry()?;

    println!("{:<22} {:<34} {}", "Metric", "Source", "Description");
    println!("{}", "-".repeat(80));
    for metric in registry.iter() {
        println!(
            "{:<22} {:<34} {}",
            metric.name,
            metric.source.to_string(),
            metric.description.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

fn write_report(
    store: &SqliteStore,
    period: ReportPeriod,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = RankingReport::from_facts(period, &store.ranked_facts(period)?);
    if report.is_empty() {
        return Err(format!("No ranked facts for {}; run the pipeline first", period).into());
    }

    match output {
        Some(path) => {
            report.export_to_file(path, format)?;
            info!(path = %path.display(), rows = report.row_count(), "wrote report");
        }
        None => println!("{}", report.export_to_string(format)?),
    }

    Ok(())
}

fn import_file(
    store: &SqliteStore,
    table: SourceTable,
    period: ReportPeriod,
    file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = std::fs::File::open(file)?;
    let facts = import::read_raw_facts(reader, table, period)?;
    let written = store.put_raw_facts(&facts)?;

    info!(%table, %period, written, "imported raw facts");
    println!("Imported {} {} rows for {}", written, table, period);
    Ok(())
}

fn manage_directory(
    store: &SqliteStore,
    action: DirectoryAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DirectoryAction::Add { names } => {
            for name in &names {
                store.add_company(name)?;
            }
            println!("Added {} companies", names.len());
        }
        DirectoryAction::Remove { names } => {
            let mut removed = 0;
            for name in &names {
                if store.remove_company(name)? {
                    removed += 1;
                }
            }
            println!("Removed {} companies", removed);
        }
        DirectoryAction::List => {
            let companies = store.companies()?;
            for company in &companies {
                println!("{}", company);
            }
            println!("\n{} companies", companies.len());
        }
    }

    Ok(())
}
