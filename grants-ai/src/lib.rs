//! grants-ai library interface
//!
//! Exposes the pipeline services and the HTTP router for the binary and
//! for integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::services::{ApplicationAssembler, RefreshOrchestrator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub assembler: ApplicationAssembler,
    /// `None` when the process serves the cache without refreshing it
    pub refresh: Option<Arc<RefreshOrchestrator>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(assembler: ApplicationAssembler, refresh: Option<Arc<RefreshOrchestrator>>) -> Self {
        Self {
            assembler,
            refresh,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::application_routes())
        .merge(api::refresh_routes())
        .merge(api::health_routes())
        .with_state(state)
}
