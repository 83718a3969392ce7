//! HTTP routes for the DPGF engine.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};

use crate::error::Result;
use crate::AppState;

use super::requests::ComputeDpgfRequest;
use super::responses::{serialize_for_storage, serialize_totals, SerializedDpgf, SerializedTotals};
use super::services::compute_dpgf;

/// Routes mounted under `/api/dpgf`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/compute", post(compute))
        .route("/totals", post(totals))
}

/// Full DPGF: lots, totals and metadata
async fn compute(
    State(state): State<AppState>,
    body: std::result::Result<Json<ComputeDpgfRequest>, JsonRejection>,
) -> Result<Json<SerializedDpgf>> {
    let Json(request) = body?;
    let (elements, options) = request.into_parts(state.config.default_tva_percentage)?;
    let data = compute_dpgf(&elements, &options)?;

    Ok(Json(serialize_for_storage(&data, &state.config.precision)))
}

/// Totals block only
async fn totals(
    State(state): State<AppState>,
    body: std::result::Result<Json<ComputeDpgfRequest>, JsonRejection>,
) -> Result<Json<SerializedTotals>> {
    let Json(request) = body?;
    let (elements, options) = request.into_parts(state.config.default_tva_percentage)?;
    let data = compute_dpgf(&elements, &options)?;

    Ok(Json(serialize_totals(&data.totals, &state.config.precision)))
}
