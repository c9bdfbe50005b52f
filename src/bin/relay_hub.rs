//! relay-hub server binary
//!
//! ```bash
//! relay-hub --bind 0.0.0.0:8080 --peer http://10.0.0.2:8080
//! RELAY_HUB_PEERS=http://hub-b:8080,http://hub-c:8080 relay-hub
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use relay_hub::{FederationConfig, HubServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "relay-hub")]
#[command(about = "Signaling and frame relay hub for live broadcasters and viewers")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "RELAY_HUB_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Peer hub base URL (repeatable, or comma separated)
    #[arg(long = "peer", env = "RELAY_HUB_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// Per-request timeout for relayed frames
    #[arg(long, default_value_t = 1000)]
    federation_timeout_ms: u64,

    /// Maximum concurrent event-channel connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// Outbound events buffered per session
    #[arg(long, default_value_t = 256)]
    queue_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_hub=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let peers: Vec<String> = args
        .peers
        .into_iter()
        .map(|peer| peer.trim().to_string())
        .filter(|peer| !peer.is_empty())
        .collect();

    let federation = FederationConfig::default()
        .peers(peers)
        .request_timeout(Duration::from_millis(args.federation_timeout_ms));

    let config = ServerConfig::default()
        .bind(args.bind)
        .max_connections(args.max_connections)
        .session_queue_capacity(args.queue_capacity)
        .federation(federation);

    tracing::info!(
        bind = %config.bind_addr,
        peers = ?config.hub.federation.peers,
        max_connections = config.max_connections,
        "Starting relay hub"
    );

    let server = HubServer::new(config)?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Relay hub stopped");
    Ok(())
}
