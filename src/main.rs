//! # ON24 Cog
//!
//! Runs the Cog gRPC server until interrupted.

use anyhow::Context;
use clap::Parser;
use on24_cog::config::{CogConfig, LogFormat};
use on24_cog::grpc::GrpcServer;
use on24_cog::logging::init_structured_logging;
use on24_cog::Cog;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "on24-cog")]
#[command(about = "Serve ON24 registrant steps to an automation host over gRPC")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (default: config/cog.{toml,yaml,json} when present)
    #[arg(short, long, env = "COG_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overriding server.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Log output format (pretty, json), overriding logging.format
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = CogConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate().context("validating configuration")?;

    init_structured_logging(&config.logging);
    info!(
        name = %config.cog.name,
        version = %config.cog.version,
        api = %config.api.base_url,
        "ON24 Cog starting"
    );

    let cog = Cog::from_config(&config).context("building Cog")?;
    GrpcServer::new(config.server, cog)
        .serve()
        .await
        .context("serving gRPC")?;

    info!("ON24 Cog stopped");
    Ok(())
}
