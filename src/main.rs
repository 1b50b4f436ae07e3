use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leilao::notify;
use leilao::server::{AuctionServer, DEFAULT_PORT, ServerConfig};

#[derive(Debug, Parser)]
#[command(version, about = "Auction server: TCP bids + UDP multicast notifications")]
struct Args {
    /// TCP listen port
    #[arg(env = "LEILAO_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Multicast group for accepted-bid notifications (addr:port)
    #[arg(long, env = "LEILAO_MULTICAST", default_value = notify::DEFAULT_GROUP)]
    multicast: String,
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let group = notify::parse_group(&args.multicast)?;
    let server = AuctionServer::bind(&ServerConfig {
        port: args.port,
        multicast: group,
    })?;
    info!(
        "auction server listening on {}, notifying {group}",
        server.local_addr()?
    );

    ctrlc::set_handler(|| {
        eprintln!("shutting down");
        std::process::exit(0);
    })
    .context("install Ctrl+C handler")?;

    server.serve()
}
