//! JSON endpoints.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use rcpt_core::{Receipt, ReceiptDraft, ReceiptSummary};

use crate::error::ApiError;
use crate::AppState;

const STYLESHEET: &str = include_str!("../../static/styles.css");

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

pub async fn list_receipts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReceiptSummary>>, ApiError> {
    Ok(Json(state.store.list_receipts().await?))
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Receipt>, ApiError> {
    state
        .store
        .get_receipt(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("receipt {} not found", id)))
}

/// Parse a plain-text body without storing anything.
pub async fn parse_text(State(state): State<AppState>, body: String) -> Json<ReceiptDraft> {
    Json(state.parser.parse(&body))
}
