//! Try-on route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use fitroom_core::{GenerateTryOnBody, TryOnRequest, TryOnSuccess};
use tracing::instrument;

use crate::error::{RelayError, Result};
use crate::state::AppState;

/// Liveness string served at `/`.
pub const LIVENESS: &str = "Fitroom try-on relay is running";

/// `GET /`.
pub async fn index() -> &'static str {
    LIVENESS
}

/// `POST /generate-tryon`.
///
/// Validates the body before any external call, then runs the pipeline.
#[instrument(skip_all)]
pub async fn generate(
    State(state): State<AppState>,
    body: std::result::Result<Json<GenerateTryOnBody>, JsonRejection>,
) -> Result<Json<TryOnSuccess>> {
    let Json(body) = body.map_err(|rejection| RelayError::invalid_json(&rejection))?;
    let request = TryOnRequest::from_body(&body)?;

    let url = state.pipeline().run(&request).await?;
    Ok(Json(TryOnSuccess::new(url)))
}
