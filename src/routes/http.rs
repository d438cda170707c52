//! HTTP endpoint handlers. These are thin wrappers that forward to the engine.
//! Each handler is instrumented and logs basic request/result info.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, FromRequest, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::{AIGenerationRequest, ValidationError};
use crate::protocol::*;
use crate::state::AppState;

/// Errors surfaced to HTTP callers. Generation failures never get here; only
/// contract violations in the request do.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("invalid request body: {}", .0.body_text())]
  Body(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Validation(_) | ApiError::Body(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(ErrorOut { error: self.to_string() })).into_response()
  }
}

/// `Json` whose rejection is an `ApiError`, so malformed bodies get the same
/// 400 `{ "error": ... }` shape as failed validation.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let available = state.engine.probe().await;
  Json(StatusOut {
    available,
    configured: state.engine.has_client(),
    model: state.engine.model().map(str::to_string),
  })
}

#[instrument(level = "info", skip(state, body), fields(age = body.child_profile.age, activity_type = %body.activity_type))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<AIGenerationRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = state.engine.generate(&body).await?;
  info!(target: "generation", source = ?outcome.source, "HTTP activity served");
  Ok(Json(outcome))
}

#[instrument(level = "info", skip(state, body), fields(count = body.count, variation = ?body.variation_type))]
pub async fn http_post_bulk(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<BulkIn>,
) -> Result<impl IntoResponse, ApiError> {
  let activities = state.engine.generate_bulk(&body.request, body.count, body.variation_type).await?;
  info!(target: "generation", requested = body.count, generated = activities.len(), "HTTP bulk served");
  Ok(Json(BulkOut { requested: body.count, activities }))
}

#[instrument(level = "info", skip(state, body), fields(count = body.count))]
pub async fn http_post_variations(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<VariationsIn>,
) -> impl IntoResponse {
  let variations = state.engine.generate_variations(&body.activity, body.count).await;
  Json(VariationsOut { variations })
}

#[instrument(level = "info", skip(state, body), fields(title_len = body.activity.title.len()))]
pub async fn http_post_analyze(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<AnalyzeIn>,
) -> impl IntoResponse {
  Json(state.engine.analyze(&body.activity).await)
}
