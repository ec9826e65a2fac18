//! Hex Dominion server
//!
//! Loads configuration and the card catalog, then serves newline-delimited
//! JSON sessions over TCP until interrupted.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use hex_dominion::cards::{DefaultDecks, StaticCatalog};
use hex_dominion::core::config::GameConfig;
use hex_dominion::core::error::ServerError;
use hex_dominion::net;
use hex_dominion::session::SessionRegistry;

/// Hex Dominion session server
#[derive(Parser, Debug)]
#[command(name = "hex-dominion")]
#[command(about = "Run the authoritative game session server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:7400")]
    bind: String,

    /// Game config (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Card catalog (TOML or JSON). The built-in starter set when omitted.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// RNG seed for dealing hands, overriding the config
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hex_dominion=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let catalog = match &args.catalog {
        Some(path) => StaticCatalog::load(path)?,
        None => StaticCatalog::with_defaults(),
    };
    tracing::info!("Loaded {} cards", catalog.len());
    let decks = DefaultDecks::from_catalog(&catalog);

    let registry = Arc::new(SessionRegistry::new(config, Arc::new(catalog), Arc::new(decks)));
    let (addr, server) = net::start(&args.bind, registry).await?;
    tracing::info!("Hex Dominion listening on {}", addr);

    tokio::select! {
        _ = server => tracing::warn!("Server task ended"),
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }
    Ok(())
}
