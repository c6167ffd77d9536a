//! HTTP handlers.
//!
//! Client handlers go through the coordinator; the internal storage
//! handlers touch the local replica only.

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use corelib::VersionVector;
use replication::{ConsistencyLevel, CoordinatorError, PeerClient, RequestOptions};
use storage::{ReplicaStore, StorageError};

use crate::error::ApiError;
use crate::protocol::{
    GetResponse, PutResponse, ReplicaGetResponse, ReplicateRequest, ReplicateResponse,
    CONTEXT_HEADER, READ_CONSISTENCY_HEADER, WRITE_CONSISTENCY_HEADER,
};
use crate::router::AppState;

/// Key from the request path. Undecodable paths are rejected with the
/// usual `{"error": ...}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath(pub String);

impl<St: Send + Sync> FromRequestParts<St> for KeyPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
        Path::<String>::from_request_parts(parts, state)
            .await
            .map(|Path(key)| KeyPath(key))
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn readyz<S: ReplicaStore, C: PeerClient>(
    State(state): State<AppState<S, C>>,
) -> (StatusCode, &'static str) {
    if state.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

pub async fn empty_key() -> ApiError {
    ApiError::BadRequest("key cannot be empty".into())
}

pub async fn get_kv<S: ReplicaStore, C: PeerClient>(
    State(state): State<AppState<S, C>>,
    KeyPath(key): KeyPath,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let options = request_options(&headers, READ_CONSISTENCY_HEADER);
    let result = state.coordinator.get(&key, options).await?;

    let status = if result.found {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(GetResponse::from(result))).into_response())
}

pub async fn put_kv<S: ReplicaStore, C: PeerClient>(
    State(state): State<AppState<S, C>>,
    KeyPath(key): KeyPath,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PutResponse>, ApiError> {
    let options = request_options(&headers, WRITE_CONSISTENCY_HEADER);
    let context = client_context(&headers)?;

    let version = state
        .coordinator
        .put(&key, body.to_vec(), context, options)
        .await?;
    Ok(Json(PutResponse { version }))
}

/// 204 on success. A missed quorum is a server-side failure here, not 503.
pub async fn delete_kv<S: ReplicaStore, C: PeerClient>(
    State(state): State<AppState<S, C>>,
    KeyPath(key): KeyPath,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let options = request_options(&headers, WRITE_CONSISTENCY_HEADER);
    let context = client_context(&headers)?;

    match state.coordinator.delete(&key, context, options).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(CoordinatorError::InvalidArgument(msg)) => Err(ApiError::BadRequest(msg)),
        Err(err) => Err(ApiError::Internal(err.to_string())),
    }
}

pub async fn get_replica<S: ReplicaStore, C: PeerClient>(
    State(state): State<AppState<S, C>>,
    KeyPath(key): KeyPath,
) -> Response {
    let records = state.coordinator.store().get_versioned(&key);
    let status = if records.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (status, Json(ReplicaGetResponse::from_records(&key, records))).into_response()
}

pub async fn put_replica<S: ReplicaStore, C: PeerClient>(
    State(state): State<AppState<S, C>>,
    KeyPath(key): KeyPath,
    body: Bytes,
) -> (StatusCode, Json<ReplicateResponse>) {
    let request: ReplicateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(key = %key, error = %err, "malformed replicate body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ReplicateResponse::failed("invalid request body")),
            );
        }
    };
    if !request.key.is_empty() && request.key != key {
        return (
            StatusCode::BAD_REQUEST,
            Json(ReplicateResponse::failed("key mismatch between path and body")),
        );
    }

    match state.coordinator.accept_replica(&key, request.into_write()) {
        Ok(outcome) => {
            tracing::trace!(key = %key, ?outcome, "replica write");
            (StatusCode::OK, Json(ReplicateResponse::ok()))
        }
        Err(StorageError::InvalidArgument(msg)) => {
            (StatusCode::BAD_REQUEST, Json(ReplicateResponse::failed(msg)))
        }
    }
}

/// Consistency override from `header`; unreadable values fall back to the
/// configured quorum.
fn request_options(headers: &HeaderMap, header: &str) -> RequestOptions {
    let consistency = headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| match value.parse::<ConsistencyLevel>() {
            Ok(level) => Some(level),
            Err(err) => {
                tracing::debug!(header, error = %err, "ignoring consistency override");
                None
            }
        });
    RequestOptions {
        consistency,
        timeout: None,
    }
}

fn client_context(headers: &HeaderMap) -> Result<Option<VersionVector>, ApiError> {
    let Some(raw) = headers.get(CONTEXT_HEADER) else {
        return Ok(None);
    };
    let raw = raw
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("{} is not valid UTF-8", CONTEXT_HEADER)))?;
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|err| ApiError::BadRequest(format!("invalid {}: {}", CONTEXT_HEADER, err)))
}
