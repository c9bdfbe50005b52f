//! Hub server listener
//!
//! Binds the HTTP listener and serves the event channel, health, device
//! list and federation ingress routes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::hub::Hub;
use crate::server::config::ServerConfig;
use crate::server::http::{router, AppState};

/// Relay hub server
pub struct HubServer {
    config: ServerConfig,
    hub: Arc<Hub>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl HubServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        let hub = Arc::new(Hub::new(config.hub.clone())?);

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Ok(Self {
            config,
            hub,
            connection_semaphore,
        })
    }

    /// Get a reference to the hub
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Build the router serving this hub
    pub fn router(&self) -> axum::Router {
        router(AppState {
            hub: Arc::clone(&self.hub),
            connections: self.connection_semaphore.clone(),
        })
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            peers = self.hub.federation().peer_count(),
            "Relay hub listening"
        );

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        // Stop outstanding federation relays on shutdown
        self.hub.shutdown().await;

        result?;
        Ok(())
    }
}
