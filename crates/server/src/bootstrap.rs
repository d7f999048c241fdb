use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use bloodlink_core::config::{AppConfig, ConfigError};
use bloodlink_core::{BloodBank, DomainError, InMemoryAuditSink};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{api, health};

pub struct Application {
    pub config: AppConfig,
    pub bank: Arc<BloodBank>,
    pub audit: InMemoryAuditSink,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("ledger seeding failed: {0}")]
    Seed(#[source] DomainError),
    #[error("invalid CORS origin `{0}`")]
    CorsOrigin(String),
}

/// Builds the application from a config the caller already loaded, e.g. to
/// initialise logging first.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        listen_address = %config.listen_address(),
        "starting application bootstrap"
    );
    let audit = InMemoryAuditSink::default();
    let bank = BloodBank::seeded(config.inventory.seed, Arc::new(audit.clone()))
        .map_err(BootstrapError::Seed)?;
    info!(
        event_name = "system.bootstrap.ledger_ready",
        correlation_id = "bootstrap",
        seed = ?config.inventory.seed,
        "blood ledger ready"
    );

    Ok(Application { config, bank: Arc::new(bank), audit })
}

impl Application {
    /// Full HTTP surface: ledger routes, health, credentialed CORS for the
    /// dashboard origin and request tracing.
    pub fn router(&self) -> Result<Router, BootstrapError> {
        let origin = HeaderValue::from_str(&self.config.cors.frontend_url)
            .map_err(|_| BootstrapError::CorsOrigin(self.config.cors.frontend_url.clone()))?;
        // Credentialed CORS cannot use wildcard methods or headers.
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .allow_credentials(true);

        let state = api::ApiState::new(Arc::clone(&self.bank), self.audit.clone());
        Ok(api::router(state)
            .merge(health::router())
            .layer(cors)
            .layer(TraceLayer::new_for_http()))
    }
}
