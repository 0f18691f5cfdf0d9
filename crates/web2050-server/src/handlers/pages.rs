//! Page endpoint.
//!
//! Serves stored pages directly and streams generated pages as they are
//! extracted.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use web2050_pipeline::Resolution;

use crate::error::ServerError;
use crate::state::AppState;

/// Content type for a canonical key, `text/html` when unknown.
pub(crate) fn content_type(key: &str) -> &'static str {
    mime_guess::from_path(key).first_raw().unwrap_or("text/html")
}

/// Handle GET /{*path}.
pub(crate) async fn get_page(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ServerError> {
    let resolution = state.pipeline.resolve(&path).await?;
    let content_type = content_type(resolution.key());

    let body = match resolution {
        Resolution::Stored(page) => Body::from(page.content),
        Resolution::Generated(stream) => Body::from_stream(stream.into_stream()),
    };

    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}
