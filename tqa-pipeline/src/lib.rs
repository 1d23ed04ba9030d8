//! tqa-pipeline library interface
//!
//! Exposes the pipeline internals for integration testing.

pub mod api;
pub mod chunker;
pub mod config;
pub mod db;
pub mod error;
pub mod layers;
pub mod models;
pub mod scoring;
pub mod services;
pub mod workflow;

pub use crate::error::{PipelineError, PipelineResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tqa_common::events::EventBus;
use workflow::PipelineWorkflow;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for notifications and SSE consumers
    pub event_bus: EventBus,
    /// The pipeline workflow driving all runs
    pub workflow: Arc<PipelineWorkflow>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last run error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, workflow: Arc<PipelineWorkflow>) -> Self {
        Self {
            db,
            event_bus,
            workflow,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .merge(api::health_routes())
        .merge(api::pipeline_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
