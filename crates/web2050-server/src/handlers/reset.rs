//! Reset endpoint: delete a stored page so the next request regenerates it.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// Request body for POST /reset.
#[derive(Deserialize)]
pub(crate) struct ResetRequest {
    path: Option<String>,
}

/// Response for POST /reset.
#[derive(Serialize)]
pub(crate) struct ResetResponse {
    success: bool,
    /// Canonical key that was deleted.
    deleted: String,
}

/// Handle POST /reset.
pub(crate) async fn reset_page(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ResetRequest>, JsonRejection>,
) -> Result<Json<ResetResponse>, ServerError> {
    let Json(request) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let path = request
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing 'path' in body".to_owned()))?;

    let deleted = state.pipeline.delete(&path).await?;
    Ok(Json(ResetResponse {
        success: true,
        deleted,
    }))
}
