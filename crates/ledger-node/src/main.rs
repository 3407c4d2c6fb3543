mod api;

use clap::Parser;
use ledger_core::{
    constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY},
    Ledger, LedgerConfig,
};
use ledger_storage::sled_store::SledStore;
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Data directory for sled
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// Name of the ledger snapshot inside the data directory
    #[arg(long, default_value = "default")]
    ledger: String,

    /// Difficulty for newly appended blocks
    #[arg(
        long,
        default_value_t = DEFAULT_DIFFICULTY,
        value_parser = clap::value_parser!(u32).range(0..=MAX_DIFFICULTY as i64)
    )]
    difficulty: u32,

    /// Give up mining a block after this many nonces
    #[arg(long)]
    max_iterations: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let store = SledStore::open(&args.data_dir)?.named(&args.ledger);
    let config = LedgerConfig::default()
        .with_difficulty(args.difficulty)
        .with_max_iterations(args.max_iterations);
    let ledger = Ledger::open(&store, config)?;
    info!(ledger = %args.ledger, blocks = ledger.len(), "ledger ready");

    let state = api::AppState::new(ledger, Arc::new(store));
    let app = api::router(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("ledger-node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
    }
}
