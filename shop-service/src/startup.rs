//! Application startup and lifecycle management.

use crate::config::ShopConfig;
use crate::store::PgStore;
use crate::{build_router, AppState};
use axum::Router;
use secrecy::ExposeSecret;
use shop_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to PostgreSQL, apply migrations and bind the HTTP listener.
    pub async fn build(config: ShopConfig) -> Result<Self, AppError> {
        let store = PgStore::connect(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            AppError::DatabaseError(e.into())
        })?;

        store.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations");
            AppError::DatabaseError(e.into())
        })?;
        tracing::info!("Database migrations applied");

        if !config.flutterwave.is_configured() {
            tracing::warn!(
                "Flutterwave credentials not configured - Flutterwave checkout will be unavailable"
            );
        }
        if !config.paypal.is_configured() {
            tracing::warn!("PayPal credentials not configured - PayPal checkout will be unavailable");
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let state = AppState::new(config, Arc::new(store))?;
        let router = build_router(state);

        // Port 0 picks a random port for tests.
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!("Shop service: HTTP on port {}", http_port);

        Ok(Self {
            http_port,
            listener,
            router,
        })
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        axum::serve(self.listener, self.router).await
    }
}
