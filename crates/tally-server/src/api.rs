//! Thin HTTP ingress over [`MetricsService`](crate::service::MetricsService).

use crate::error::{ServiceError, ValidationError};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tally_common::{MetricEnvelope, MetricKind, MetricRecord};

/// Maps service errors to status codes; the body is the error text.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl From<tally_common::RecordError> for ApiError {
    fn from(err: tally_common::RecordError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::UnsupportedMetricKind(_) | ServiceError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure while serving request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.0.to_string()).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_metrics))
        .route("/ping", get(ping))
        .route("/ping/", get(ping))
        .route("/update/{kind}/{name}/{value}", post(update_from_path))
        .route("/update", post(update_from_json))
        .route("/update/", post(update_from_json))
        .route("/updates", post(updates_from_json))
        .route("/updates/", post(updates_from_json))
        .route("/value/{kind}/{name}", get(value_from_path))
        .route("/value", post(value_from_json))
        .route("/value/", post(value_from_json))
}

/// `name: value` lines sorted by name.
async fn list_metrics(State(state): State<AppState>) -> ApiResult<String> {
    let mut entries = state.metrics.list_all().await?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    let body = entries
        .iter()
        .map(|entry| format!("{}: {}\n", entry.name, entry.value))
        .collect();
    Ok(body)
}

async fn ping(State(state): State<AppState>) -> Response {
    match state.health.check_connection().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Storage health check failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn update_from_path(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> ApiResult<&'static str> {
    state.metrics.save(&kind, &name, &value).await?;
    Ok("OK")
}

/// Stores one record and echoes the resulting stored value (the new total
/// for counters).
async fn update_from_json(
    State(state): State<AppState>,
    Json(envelope): Json<MetricEnvelope>,
) -> ApiResult<Json<MetricEnvelope>> {
    let record = MetricRecord::try_from(envelope)?;
    state.metrics.save_record(&record).await?;
    let stored = state.metrics.get_record(record.kind(), &record.name).await?;
    Ok(Json(MetricEnvelope::from(&stored)))
}

async fn updates_from_json(
    State(state): State<AppState>,
    Json(envelopes): Json<Vec<MetricEnvelope>>,
) -> ApiResult<StatusCode> {
    let records = envelopes
        .into_iter()
        .map(MetricRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    state.metrics.save_records(&records).await?;
    tracing::debug!(count = records.len(), "Stored batch");
    Ok(StatusCode::OK)
}

async fn value_from_path(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<String> {
    Ok(state.metrics.get(&kind, &name).await?)
}

/// Looks up the metric named by `id` and `type`; value fields in the
/// request are ignored.
async fn value_from_json(
    State(state): State<AppState>,
    Json(envelope): Json<MetricEnvelope>,
) -> ApiResult<Json<MetricEnvelope>> {
    if envelope.id.is_empty() {
        return Err(ApiError(ValidationError::EmptyName.into()));
    }
    let kind: MetricKind = envelope.kind.parse()?;
    let record = state.metrics.get_record(kind, &envelope.id).await?;
    Ok(Json(MetricEnvelope::from(&record)))
}
