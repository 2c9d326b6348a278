//! CLI entry point for the timetable scraper.
//!
//! Provides subcommands for scraping the operator's timetable pages into the
//! raw store, reshaping a raw store into a GTFS directory, doing both in one
//! go, and inspecting day codes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use timetable_gtfs::{
    config::Settings,
    days,
    fetch::{BasicClient, CachedFetcher},
    operator::Operator,
    output::{print_json, print_pretty},
    reshape::{ReshapeOptions, reshape},
    stats::FeedSummary,
    timetable::{ScrapeSummary, scrape_to_raw_store},
};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "timetable_gtfs")]
#[command(about = "Scrape Metro timetables and reshape them into a GTFS feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every route page into the raw store
    Scrape {
        /// Directory the raw store is written to
        #[arg(short, long, default_value = "data")]
        output_dir: PathBuf,
    },
    /// Reshape a raw store into GTFS files
    Reshape {
        /// Raw store CSV produced by `scrape`
        #[arg(value_name = "RAW_CSV")]
        raw: PathBuf,

        /// Directory to write the feed files to
        #[arg(short, long, default_value = "feed")]
        output_dir: PathBuf,
    },
    /// Scrape, then reshape
    Run {
        /// Directory the raw store is written to
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Directory to write the feed files to
        #[arg(short, long, default_value = "feed")]
        output_dir: PathBuf,
    },
    /// Show how a day code is interpreted
    Days {
        #[arg(value_name = "CODE")]
        code: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/timetable_gtfs.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("timetable_gtfs.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let operator = Operator::translink_metro();

    match cli.command {
        Commands::Scrape { output_dir } => {
            let settings = Settings::from_env()?;
            let (raw_path, summary) = scrape(&settings, &operator, &output_dir)?;
            info!(path = %raw_path.display(), "Scrape complete");
            print_json(&summary)?;
        }
        Commands::Reshape { raw, output_dir } => {
            let settings = Settings::from_env()?;
            let summary = reshape(&raw, &output_dir, &reshape_options(&settings, operator))?;
            report(&summary)?;
        }
        Commands::Run {
            data_dir,
            output_dir,
        } => {
            let settings = Settings::from_env()?;
            let (raw_path, scraped) = scrape(&settings, &operator, &data_dir)?;
            let summary = reshape(&raw_path, &output_dir, &reshape_options(&settings, operator))?
                .with_scrape(scraped);
            report(&summary)?;
        }
        Commands::Days { code } => {
            let (name, weight) = days::name_and_weight(&code)?;
            let atomic: Vec<&str> = days::split_into_atomic_days(&code)?
                .map(|(_, day)| day)
                .collect();
            info!(code = %code, name, weight, days = ?atomic, "Day set");
        }
    }

    Ok(())
}

/// Scrapes the operator's pages into `<data_dir>/<raw store name>`.
#[tracing::instrument(skip(settings, operator))]
fn scrape(
    settings: &Settings,
    operator: &Operator,
    data_dir: &Path,
) -> Result<(PathBuf, ScrapeSummary)> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let raw_path = data_dir.join(operator.raw_store_name());

    let fetcher = CachedFetcher::new(BasicClient::new()?, settings.cache(), &settings.user_agent)?
        .with_retry(settings.retry_policy());
    info!(
        cache = %settings.cache_root.display(),
        index_pages = operator.index_urls.len(),
        "Scraping timetables"
    );
    let summary = scrape_to_raw_store(&fetcher, operator, &raw_path)?;
    Ok((raw_path, summary))
}

fn reshape_options(settings: &Settings, operator: Operator) -> ReshapeOptions {
    ReshapeOptions {
        operator,
        period: settings.period,
        coord_map: settings.coord_map.clone(),
        stop_fixes: settings.stop_fixes.clone(),
    }
}

fn report(summary: &FeedSummary) -> Result<()> {
    print_pretty(summary);
    info!(
        located_pct = summary.located_pct(),
        unmapped = summary.stops_unmapped,
        "Stop coverage"
    );
    print_json(summary)
}
