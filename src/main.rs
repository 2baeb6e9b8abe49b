//! Order relay node.
//!
//! # Architecture Overview
//!
//! ```text
//!   stdin (JSON lines)                                     stdout (JSON lines)
//!        │                                                        ▲
//!        ▼                                                        │
//!   ┌─────────┐  mpsc<Order>  ┌──────────────────────┐  mpsc<OrderState>
//!   │ intake  │──────────────▶│       gateway        │──────────┘
//!   └─────────┘               │ base → sign → tokenS │
//!                             │ → tokenB → cutoff?   │
//!                             └──────────┬───────────┘
//!                                        │ cutoff lookup (in memory)
//!                                        ▼
//!                              ┌──────────────────┐     JSON-RPC
//!                              │  chain accessor  │◀──────────────▶ node
//!                              └──────────────────┘
//! ```
//!
//! With the cutoff filter enabled, cutoffs of the configured owners are loaded
//! on every protocol before the gateway starts, owners of accepted orders are
//! added as they appear, and all of them are re-read every
//! `gateway.cutoff.refresh_interval_secs`.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use order_relay::chain::{AccountStore, ChainAccessor};
use order_relay::config::load_config;
use order_relay::gateway::{forward_json_lines, CutoffCache, FilterChain, Gateway};
use order_relay::lifecycle::Shutdown;
use order_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "order-relay")]
#[command(about = "Admits signed orders and publishes the accepted ones", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(config = %args.config.display(), "order-relay v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let accounts = AccountStore::from_env()?;
    let accessor = ChainAccessor::connect(&config, accounts).await?;
    let block = accessor.block_number().await?;
    tracing::info!(block = block, "Node reachable");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let (inbound_tx, inbound_rx) = mpsc::channel(config.gateway.inbound_capacity);
    let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();

    let cutoffs = Arc::new(CutoffCache::new());
    if config.gateway.cutoff.enabled {
        let owners = &config.gateway.cutoff.owners;
        for protocol in accessor.protocols().iter() {
            cutoffs
                .refresh_from_chain(&accessor, protocol.implementation, owners.iter().copied())
                .await?;
        }
        tracing::info!(watched = cutoffs.watched_len(), with_cutoff = cutoffs.len(), "Cutoffs loaded");

        let period = Duration::from_secs(config.gateway.cutoff.refresh_interval_secs);
        tokio::spawn(refresh_cutoffs(cutoffs.clone(), accessor.clone(), period, shutdown.subscribe()));
    }

    let filters = FilterChain::from_config(&config.gateway, cutoffs.clone());
    let gateway = Gateway::new(filters, accepted_tx);
    let gateway_task = tokio::spawn(gateway.run(inbound_rx, shutdown.subscribe()));

    let intake_task = tokio::spawn(forward_json_lines(
        BufReader::new(tokio::io::stdin()),
        inbound_tx,
    ));

    // Stand-in for the order manager: print accepted orders and watch their owners' cutoffs
    while let Some(state) = accepted_rx.recv().await {
        println!("{}", serde_json::to_string(&state)?);

        if config.gateway.cutoff.enabled {
            let order = &state.raw_order;
            if let Err(e) = cutoffs
                .refresh_from_chain(&accessor, order.protocol, [order.owner])
                .await
            {
                tracing::warn!(owner = %order.owner, error = %e, "Cutoff refresh failed");
            }
        }
    }

    let stats = gateway_task.await?;
    intake_task.abort();

    tracing::info!(
        received = stats.received,
        accepted = stats.accepted,
        rejected = stats.rejected,
        "Shutdown complete"
    );
    Ok(())
}

async fn refresh_cutoffs(
    cutoffs: Arc<CutoffCache>,
    accessor: ChainAccessor,
    period: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                cutoffs.refresh_watched(&accessor).await;
            }
        }
    }
}
