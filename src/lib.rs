//! bananad - Banana Pro image generation gateway
//!
//! Forwards prompts and reference images to an OpenAI-compatible image
//! backend, recovers the generated image from whatever response shape the
//! backend uses, and keeps a shared gallery with owner-only deletion.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gallery;
pub mod generate;
pub mod image;
pub mod upstream;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use api::AppState;
pub use config::Config;

/// The bananad server instance
pub struct Server {
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a new server talking to the configured HTTP backend
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let state = AppState::new(config).await?;
        Ok(Self::from_state(state))
    }

    fn from_state(state: AppState) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            state,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown is signalled
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let config = &self.state.config;
        info!(
            "bananad listening on {} (model {} via {}, up to {} reference images)",
            listener.local_addr()?,
            config.model_name,
            config.api_url,
            config.max_images
        );

        let mut stop = self.shutdown_rx.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                // Also honours a shutdown requested before serving began
                while !*stop.borrow_and_update() {
                    if stop.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        info!("bananad stopped");
        Ok(())
    }

    /// Ask a running (or about to run) server to stop
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}
