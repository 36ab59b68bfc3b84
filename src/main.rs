use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::de::DeserializeOwned;
use tracing::error;

use bundle_planner::config::{ConfigError, PlannerConfig};
use bundle_planner::model::{Estimate, RawJob};
use bundle_planner::osrm::{OsrmClient, OsrmConfig};
use bundle_planner::telemetry::{self, TelemetryError};
use bundle_planner::{PlanRequest, Planner};

/// Plan a bundle of utility work orders across crews and days.
#[derive(Debug, Parser)]
#[command(name = "bundle-planner", version, about)]
struct Cli {
    /// JSON array of job records.
    #[arg(long)]
    jobs: PathBuf,

    /// JSON object of estimates keyed by job id.
    #[arg(long)]
    estimates: Option<PathBuf>,

    #[arg(long, default_value_t = 12)]
    max_daily_hours: u32,

    /// profit, compliance or schedule.
    #[arg(long, default_value = "profit")]
    prioritize: String,

    #[arg(long, default_value_t = 3)]
    crews: usize,

    /// JSON planner configuration overriding the built-in tables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// OSRM base URL for road-network travel times (planar when omitted).
    #[arg(long)]
    osrm_url: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Pretty-print the result.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug)]
enum CliError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Config(ConfigError),
    Telemetry(TelemetryError),
    Router(reqwest::Error),
    Output(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Read { path, source } => {
                write!(f, "unable to read {}: {}", path.display(), source)
            }
            CliError::Parse { path, source } => {
                write!(f, "invalid JSON in {}: {}", path.display(), source)
            }
            CliError::Config(err) => write!(f, "{}", err),
            CliError::Telemetry(err) => write!(f, "{}", err),
            CliError::Router(err) => write!(f, "unable to build OSRM client: {}", err),
            CliError::Output(err) => write!(f, "unable to encode result: {}", err),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for CliError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn run(cli: Cli) -> Result<bool, CliError> {
    telemetry::init(&cli.log_level)?;

    let config = match &cli.config {
        Some(path) => PlannerConfig::from_json_file(path)?,
        None => PlannerConfig::default(),
    };
    let jobs: Vec<RawJob> = read_json(&cli.jobs)?;
    let estimates: HashMap<String, Estimate> = match &cli.estimates {
        Some(path) => read_json(path)?,
        None => HashMap::new(),
    };

    let request = PlanRequest {
        jobs: &jobs,
        estimates: &estimates,
        max_daily_hours: cli.max_daily_hours,
        prioritize: &cli.prioritize,
        num_crews: cli.crews,
    };
    let planner = Planner::from_config(config);
    let response = match &cli.osrm_url {
        Some(url) => {
            let router = OsrmClient::new(OsrmConfig::with_base_url(url.as_str()))
                .map_err(CliError::Router)?;
            planner.optimize_with_matrix(&request, &router, None)
        }
        None => planner.optimize(&request, None),
    };

    let output = if cli.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .map_err(CliError::Output)?;
    println!("{}", output);

    Ok(response.error().is_none())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            error!(error = %err, "bundle planning failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
