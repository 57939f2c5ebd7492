//! CLI entry point for the AQI pipeline.
//!
//! Provides subcommands for downloading hourly pollutant readings, turning a
//! saved raw file into daily/monthly/seasonal AQI tables, running the whole
//! pipeline for one or more cities, and printing the breakpoint tables.

mod infra;
mod services;

use crate::infra::open_meteo::client::OpenMeteoClient;
use crate::services::air_quality_source::AirQualitySource;
use anyhow::{Result, anyhow};
use aqi_pipeline::analyzers::analyzer::{Report, analyze_file, run_pipeline};
use aqi_pipeline::analyzers::breakpoints::BreakpointTables;
use aqi_pipeline::analyzers::types::HourlyReading;
use aqi_pipeline::config::PipelineConfig;
use aqi_pipeline::output::{
    print_json, raw_csv_path, write_hourly_csv, write_json_to, write_report,
};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "aqi_pipeline")]
#[command(about = "Daily AQI series and summaries from hourly pollutant readings", long_about = None)]
struct Cli {
    /// JSON file replacing the built-in breakpoint tables
    #[arg(long, global = true, value_name = "FILE")]
    breakpoints: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download hourly readings for one city and save them as raw CSV
    Fetch {
        /// City config JSON (defaults to Delhi, Q1 2024)
        #[arg(short, long)]
        config: Option<String>,

        /// Directory for raw downloads
        #[arg(short, long, default_value = "data")]
        data_dir: String,
    },
    /// Compute AQI tables from a previously saved raw hourly CSV
    Process {
        /// Raw hourly CSV written by `fetch`
        #[arg(short, long, value_name = "FILE")]
        input: String,

        /// City config JSON; without it the span is taken from the file
        #[arg(short, long)]
        config: Option<String>,

        /// Directory for report tables
        #[arg(short, long, default_value = "reports")]
        output_dir: String,
    },
    /// Fetch and process one or more cities concurrently
    Run {
        /// City config JSON, repeatable (defaults to Delhi, Q1 2024)
        #[arg(short, long)]
        config: Vec<String>,

        /// Directory for report tables, one `city=<name>` folder per city
        #[arg(short, long, default_value = "reports")]
        output_dir: String,

        /// Directory for raw downloads
        #[arg(short, long, default_value = "data")]
        data_dir: String,

        /// Maximum number of cities processed at once
        #[arg(short = 'n', long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Print the validated breakpoint tables as JSON
    Breakpoints,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing();

    let cli = Cli::parse();

    // Tables are validated once, before any data is touched.
    let tables = load_tables(cli.breakpoints.as_deref())?;
    info!(version = tables.version(), "Breakpoint tables loaded");

    match cli.command {
        Commands::Fetch { config, data_dir } => {
            let config = load_config(config.as_deref())?;
            let source = OpenMeteoClient::from_env()?;
            let (_, path) = fetch_city(&source, &config, Path::new(&data_dir)).await?;
            info!(path = %path.display(), "Raw hourly data saved");
        }
        Commands::Process {
            input,
            config,
            output_dir,
        } => {
            let config = config.as_deref().map(PipelineConfig::load).transpose()?;
            let report = analyze_file(
                config.as_ref(),
                &tables,
                Path::new(&input),
                Path::new(&output_dir),
            )?;
            print_json(&report.metrics)?;
        }
        Commands::Run {
            config,
            output_dir,
            data_dir,
            concurrency,
        } => {
            let configs = if config.is_empty() {
                vec![PipelineConfig::default()]
            } else {
                config
                    .iter()
                    .map(|path| PipelineConfig::load(path))
                    .collect::<Result<Vec<_>>>()?
            };
            let source = Arc::new(OpenMeteoClient::from_env()?);
            run_all(
                source,
                Arc::new(tables),
                configs,
                PathBuf::from(data_dir),
                PathBuf::from(output_dir),
                concurrency,
            )
            .await?;
        }
        Commands::Breakpoints => {
            write_json_to(std::io::stdout().lock(), &tables)?;
        }
    }

    Ok(())
}

/// Colored stderr plus a JSON daily-rolling log file. The returned guard
/// must live until exit so buffered file output is flushed.
fn init_tracing() -> WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/aqi_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aqi_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let json_filter =
        EnvFilter::try_from_env("RUST_LOG_JSON").unwrap_or_else(|_| EnvFilter::new("debug"));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(json_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

fn load_tables(path: Option<&str>) -> Result<BreakpointTables> {
    match path {
        Some(path) => BreakpointTables::load(path),
        None => Ok(BreakpointTables::national()?),
    }
}

fn load_config(path: Option<&str>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    }
}

/// Downloads hourly readings for `config` and saves them under `data_dir/raw`.
async fn fetch_city<S: AirQualitySource + ?Sized>(
    source: &S,
    config: &PipelineConfig,
    data_dir: &Path,
) -> Result<(Vec<HourlyReading>, PathBuf)> {
    config.validate()?;
    let readings = source.hourly_readings(config).await?;
    let path = raw_csv_path(data_dir, config);
    write_hourly_csv(&path, config, &readings)?;
    Ok((readings, path))
}

/// Fetches, processes and writes the report for a single city.
#[tracing::instrument(skip_all, fields(city = %config.city))]
async fn run_city<S: AirQualitySource + ?Sized>(
    source: &S,
    tables: &BreakpointTables,
    config: &PipelineConfig,
    data_dir: &Path,
    output_dir: &Path,
) -> Result<Report> {
    let (readings, raw_path) = fetch_city(source, config, data_dir).await?;
    info!(path = %raw_path.display(), rows = readings.len(), "Raw hourly data saved");

    let report = run_pipeline(config, tables, &readings)?;
    let city_dir = output_dir.join(format!("city={}", config.city_slug()));
    write_report(&report, &city_dir)?;
    Ok(report)
}

/// Rejects configs whose output directories would be empty or shared.
fn check_output_dirs(configs: &[PipelineConfig]) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for config in configs {
        let slug = config.city_slug();
        if slug.trim_matches('_').is_empty() {
            return Err(anyhow!("city name '{}' cannot name an output directory", config.city));
        }
        if let Some(other) = seen.insert(slug.clone(), &config.city) {
            return Err(anyhow!(
                "cities '{}' and '{}' would both write to city={slug}",
                other,
                config.city
            ));
        }
    }
    Ok(())
}

/// Runs every city independently, at most `concurrency` at a time.
/// Returns an error naming how many cities failed.
#[tracing::instrument(skip_all, fields(cities = configs.len(), concurrency = concurrency))]
async fn run_all<S: AirQualitySource + 'static>(
    source: Arc<S>,
    tables: Arc<BreakpointTables>,
    configs: Vec<PipelineConfig>,
    data_dir: PathBuf,
    output_dir: PathBuf,
    concurrency: usize,
) -> Result<Vec<Report>> {
    check_output_dirs(&configs)?;

    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
    let mut tasks = vec![];

    for config in configs {
        let sem = semaphore.clone();
        let source = source.clone();
        let tables = tables.clone();
        let data_dir = data_dir.clone();
        let output_dir = output_dir.clone();

        let city_span = tracing::info_span!("process_city", city = %config.city);

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire_owned().await?;
                run_city(source.as_ref(), &tables, &config, &data_dir, &output_dir).await
            }
            .instrument(city_span),
        );
        tasks.push(task);
    }

    let mut reports = Vec::new();
    let mut failed = 0usize;
    for task in tasks {
        match task.await {
            Ok(Ok(report)) => {
                info!(
                    city = %report.config.city,
                    aqi_mean = report.metrics.aqi_mean,
                    worst_day = ?report.metrics.worst_day,
                    "City processed successfully"
                );
                reports.push(report);
            }
            Ok(Err(e)) => {
                error!(error = %e, "City pipeline failed");
                failed += 1;
            }
            Err(e) => {
                error!(error = %e, "City task panicked");
                failed += 1;
            }
        }
    }

    info!(output_dir = %output_dir.display(), succeeded = reports.len(), failed, "Finished processing all cities");
    if failed > 0 {
        return Err(anyhow!("{failed} city pipeline(s) failed"));
    }
    Ok(reports)
}
