//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes
//! - Authentication and capability middleware
//! - Request extractors
//! - Error responses

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;

use axum::Router;
use mbank_core::ledger::LedgerEngine;
use mbank_db::SeaLedgerStore;
use mbank_shared::{EmailService, JwtService, LedgerConfig};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// Email service for sending emails.
    pub email_service: Arc<EmailService>,
    /// Ledger defaults.
    pub ledger: LedgerConfig,
}

impl AppState {
    /// Builds a ledger engine over the shared connection pool.
    #[must_use]
    pub fn ledger_engine(&self) -> LedgerEngine<SeaLedgerStore> {
        LedgerEngine::with_holder_gate(SeaLedgerStore::new((*self.db).clone()))
            .with_max_page_size(self.ledger.max_page_size)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
