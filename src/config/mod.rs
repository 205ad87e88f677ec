mod file_config;

pub use file_config::{FileConfig, PollingConfig};

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::warn;

use crate::query::poller::PollSettings;

/// Hard bounds on per-call caps, matching what the engine will accept.
pub const MAX_RESULTS_CEILING: usize = 1000;
pub const MAX_WAIT_CEILING_SECS: u64 = 3600;

/// CLI arguments that take part in config resolution.
/// Mirrors the CLI surface; TOML values override these where present.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub catalog: Option<String>,
    pub database: Option<String>,
    pub workgroup: Option<String>,
    pub output_location: Option<String>,
    pub max_results: Option<usize>,
    pub max_wait_seconds: Option<u64>,
    pub request_timeout_sec: Option<u64>,
}

/// Immutable application configuration, resolved once at startup.
///
/// No other component reads the environment; everything ambient flows
/// through this value.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub region: String,
    /// Engine service endpoint, derived from the region unless overridden.
    pub endpoint: String,
    pub catalog: String,
    pub database: Option<String>,
    pub workgroup: String,
    pub output_location: Option<String>,
    /// Ambient credential passed through verbatim to the engine.
    pub auth_header: Option<String>,
    pub max_results: usize,
    pub max_wait_seconds: u64,
    pub request_timeout_sec: u64,
    pub poll: PollSettings,
}

/// Per-call defaults the tool dispatcher applies to unspecified parameters.
#[derive(Debug, Clone)]
pub struct QueryDefaults {
    pub catalog: String,
    pub database: Option<String>,
    pub workgroup: String,
    pub output_location: Option<String>,
    pub max_results: usize,
    pub max_wait_seconds: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments, an optional TOML file and
    /// the process environment. Precedence: file over CLI over environment
    /// over built-in defaults.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let host = file
            .host
            .or_else(|| cli.host.clone())
            .or_else(|| env_var("HOST"))
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let port = file
            .port
            .or(cli.port)
            .or_else(|| env_var("PORT").and_then(|p| p.parse().ok()))
            .unwrap_or(8050);

        let region = file
            .region
            .or_else(|| cli.region.clone())
            .or_else(|| env_var("AWS_REGION"))
            .unwrap_or_else(|| "us-east-1".to_string());

        let endpoint = file
            .endpoint
            .or_else(|| cli.endpoint.clone())
            .or_else(|| env_var("ATHENA_ENDPOINT"))
            .unwrap_or_else(|| format!("https://athena.{}.amazonaws.com", region));

        let catalog = file
            .catalog
            .or_else(|| cli.catalog.clone())
            .or_else(|| env_var("ATHENA_CATALOG"))
            .unwrap_or_else(|| "AwsDataCatalog".to_string());

        let database = file
            .database
            .or_else(|| cli.database.clone())
            .or_else(|| env_var("ATHENA_DATABASE"));

        let workgroup = file
            .workgroup
            .or_else(|| cli.workgroup.clone())
            .or_else(|| env_var("ATHENA_WORKGROUP"))
            .unwrap_or_else(|| "primary".to_string());

        let output_location = file
            .output_location
            .or_else(|| cli.output_location.clone())
            .or_else(|| env_var("ATHENA_OUTPUT_LOCATION"));

        match &output_location {
            None => warn!(
                "No default output location configured; execute_query calls \
                 must supply one"
            ),
            Some(loc) if !loc.starts_with("s3://") => {
                warn!(
                    output_location = %loc,
                    "Default output location does not use the s3:// scheme"
                );
            }
            Some(_) => {}
        }

        let auth_header = file.auth_header.or_else(|| env_var("ATHENA_AUTH_HEADER"));

        let max_results = file.max_results.or(cli.max_results).unwrap_or(100);
        if max_results == 0 || max_results > MAX_RESULTS_CEILING {
            bail!(
                "max_results must be between 1 and {}, got {}",
                MAX_RESULTS_CEILING,
                max_results
            );
        }

        let max_wait_seconds = file.max_wait_seconds.or(cli.max_wait_seconds).unwrap_or(300);
        if max_wait_seconds == 0 || max_wait_seconds > MAX_WAIT_CEILING_SECS {
            bail!(
                "max_wait_seconds must be between 1 and {}, got {}",
                MAX_WAIT_CEILING_SECS,
                max_wait_seconds
            );
        }

        let request_timeout_sec = file
            .request_timeout_sec
            .or(cli.request_timeout_sec)
            .unwrap_or(60);

        let poll_file = file.polling.unwrap_or_default();
        let poll_defaults = PollSettings::default();
        let poll = PollSettings {
            initial_interval: poll_file
                .initial_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(poll_defaults.initial_interval),
            max_interval: poll_file
                .max_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(poll_defaults.max_interval),
            multiplier: poll_file.multiplier.unwrap_or(poll_defaults.multiplier),
            jitter_fraction: poll_file
                .jitter_fraction
                .unwrap_or(poll_defaults.jitter_fraction),
            transient_retries: poll_file
                .transient_retries
                .unwrap_or(poll_defaults.transient_retries),
            transient_backoff: poll_file
                .transient_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(poll_defaults.transient_backoff),
        };
        if poll.multiplier < 1.0 {
            bail!(
                "polling multiplier must be >= 1.0, got {}",
                poll.multiplier
            );
        }
        if poll.max_interval < poll.initial_interval {
            bail!("polling max_interval_ms must be >= initial_interval_ms");
        }

        Ok(Self {
            host,
            port,
            region,
            endpoint,
            catalog,
            database,
            workgroup,
            output_location,
            auth_header,
            max_results,
            max_wait_seconds,
            request_timeout_sec,
            poll,
        })
    }

    pub fn query_defaults(&self) -> QueryDefaults {
        QueryDefaults {
            catalog: self.catalog.clone(),
            database: self.database.clone(),
            workgroup: self.workgroup.clone(),
            output_location: self.output_location.clone(),
            max_results: self.max_results,
            max_wait_seconds: self.max_wait_seconds,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
