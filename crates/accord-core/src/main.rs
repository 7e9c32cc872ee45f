//! accord-stub: serve a contract artifact with the mock service.
//!
//! Usage:
//!   accord-stub pacts/web-api.json --port 8089
//!
//! Requests are answered until Ctrl-C; the verification report is then
//! printed to stdout as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use accord_core::{deserialize, logging, MockService, MockServiceConfig};

#[derive(Parser, Debug)]
#[command(name = "accord-stub")]
#[command(author, version, about = "Serve a contract artifact as a mock provider", long_about = None)]
struct Args {
    /// Contract artifact (JSON)
    contract: PathBuf,

    /// Address to bind
    #[arg(long, env = "ACCORD_HOST")]
    host: Option<String>,

    /// Port to bind (0 picks a free port)
    #[arg(short, long, env = "ACCORD_PORT")]
    port: Option<u16>,

    /// Mock service configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(&args.log_level);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = match &args.config {
        Some(path) => MockServiceConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MockServiceConfig::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let bytes = std::fs::read(&args.contract)
        .with_context(|| format!("reading contract {}", args.contract.display()))?;
    let contract = deserialize(&bytes)
        .with_context(|| format!("parsing contract {}", args.contract.display()))?;
    info!(
        "Loaded {} interaction(s) between '{}' and '{}'",
        contract.interactions().len(),
        contract.consumer(),
        contract.provider()
    );

    let mut service = MockService::new(Arc::new(contract), config);
    let addr = service.start().await?;
    info!("Serving on http://{} (Ctrl-C to stop)", addr);

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    service.stop().await;

    let report = service.verify();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_ok())
}
