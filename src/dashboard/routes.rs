//! Status API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<SignalEngine>`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::control::InstrumentSnapshot;
use crate::engine::SignalEngine;

pub type AppState = Arc<SignalEngine>;

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub instruments: Vec<InstrumentSnapshot>,
    pub pending_orders: usize,
    pub probes_active: usize,
    pub currency_symbol: String,
}

/// GET /api/status
pub async fn get_status(State(engine): State<AppState>) -> Json<StatusResponse> {
    let instruments = engine.snapshot().await;
    let pending_orders = instruments.iter().filter(|s| s.state.has_pending()).count();
    let probes_active = instruments.iter().filter(|s| s.state.probe_mode).count();

    Json(StatusResponse {
        instruments,
        pending_orders,
        probes_active,
        currency_symbol: engine.settings().currency_symbol.clone(),
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}
