use std::future::Future;

use anyhow::{Context, Result};
use axum::Router;
use parley_auth::Authenticator;
use parley_config::{AppConfig, RealtimeConfig};
use parley_database::initialize_database;
use parley_gateway::{create_router, GatewayState};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // stderr keeps command output on stdout clean.
        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    realtime: RealtimeConfig,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let authenticator = Authenticator::new(db_pool.clone(), &config.auth);

        info!(
            outbound_buffer = config.realtime.outbound_buffer,
            "backend services ready"
        );

        Ok(Self {
            db_pool,
            authenticator,
            realtime: config.realtime.clone(),
        })
    }

    /// Fresh gateway state: empty registry and presence set.
    pub fn gateway_state(&self) -> GatewayState {
        GatewayState::new(
            self.db_pool.clone(),
            self.authenticator.clone(),
            &self.realtime,
        )
    }

    pub fn router(&self) -> Router {
        create_router(self.gateway_state())
    }

    /// Serve HTTP and websocket traffic until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener
            .local_addr()
            .context("failed to read listener address")?;
        info!(%address, "http server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("http server error")
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
