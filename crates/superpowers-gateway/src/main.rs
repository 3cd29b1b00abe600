mod config;
mod service;

use anyhow::Result;
use clap::Parser;
use crate::config::Config;
use service::GatewayService;
use std::path::PathBuf;

/// Chat with a superpowers agent from the terminal
#[derive(Debug, Parser)]
#[command(name = "superpowers-gateway", version)]
struct Args {
    /// Agent id to talk to; defaults to the first agent by name
    #[arg(long, env = "SUPERPOWERS_AGENT")]
    agent: Option<String>,

    /// Extra config file layered over the global and local ones
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;

    let gateway = GatewayService::new(config, args.agent);
    gateway.run().await
}
