//! DPGF compute service for the menuiserie ERP.
//!
//! The engine lives in [`dpgf`]; this crate also carries the thin HTTP
//! surface the rest of the application calls it through.

pub mod config;
pub mod dpgf;
pub mod error;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Application router: health check plus the DPGF API
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/dpgf", dpgf::router())
        .with_state(state)
}
