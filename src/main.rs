use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use athena_mcp_server::config::{AppConfig, CliConfig, FileConfig};
use athena_mcp_server::engine::{AthenaClient, QueryEngine};
use athena_mcp_server::server::run_server;

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to an optional TOML config file. File values override CLI args.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Host to bind the server on.
    #[clap(long)]
    pub host: Option<String>,

    /// The port to listen on.
    #[clap(short, long)]
    pub port: Option<u16>,

    /// Engine region, used to derive the service endpoint.
    #[clap(long)]
    pub region: Option<String>,

    /// Explicit engine endpoint, overriding the region-derived one.
    #[clap(long)]
    pub endpoint: Option<String>,

    /// Default catalog for catalog and query operations.
    #[clap(long)]
    pub catalog: Option<String>,

    /// Default database for query execution.
    #[clap(long)]
    pub database: Option<String>,

    /// Default workgroup for query execution.
    #[clap(long)]
    pub workgroup: Option<String>,

    /// Default storage location for query output (e.g. s3://bucket/prefix/).
    #[clap(long)]
    pub output_location: Option<String>,

    /// Default cap on result rows per query.
    #[clap(long)]
    pub max_results: Option<usize>,

    /// Default wait budget per query in seconds.
    #[clap(long)]
    pub max_wait_seconds: Option<u64>,

    /// Timeout in seconds for individual engine requests.
    #[clap(long)]
    pub request_timeout_sec: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        host: cli_args.host,
        port: cli_args.port,
        region: cli_args.region,
        endpoint: cli_args.endpoint,
        catalog: cli_args.catalog,
        database: cli_args.database,
        workgroup: cli_args.workgroup,
        output_location: cli_args.output_location,
        max_results: cli_args.max_results,
        max_wait_seconds: cli_args.max_wait_seconds,
        request_timeout_sec: cli_args.request_timeout_sec,
    };

    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Engine endpoint: {}", config.endpoint);
    info!("Default catalog: {}", config.catalog);
    info!(
        "Default database: {}",
        config.database.as_deref().unwrap_or("Not set")
    );
    info!("Default workgroup: {}", config.workgroup);
    info!(
        "Default output location: {}",
        config.output_location.as_deref().unwrap_or("Not set")
    );

    let engine: Arc<dyn QueryEngine> = Arc::new(AthenaClient::new(
        config.endpoint.clone(),
        config.request_timeout_sec,
        config.auth_header.clone(),
    )?);

    info!("Ready to serve at port {}!", config.port);
    run_server(config, engine).await
}
