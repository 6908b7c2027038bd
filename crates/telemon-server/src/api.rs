use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use std::fmt::Write;
use telemon_common::metric::{Metric, MetricKind, MetricValue};
use telemon_common::model::{parse_path_change, MetricUpdate};
use telemon_storage::error::StorageError;
use telemon_storage::MetricStore;

/// Two-step write lifecycle shared by the HTTP and gRPC handlers: create a
/// zero-valued metric of the declared kind when the id is new, then apply the
/// change. The window between the two steps is tolerated because insert
/// overwrites.
pub(crate) fn apply_update(
    store: &dyn MetricStore,
    kind: MetricKind,
    id: &str,
    change: MetricValue,
) -> Result<(), StorageError> {
    if !store.exists(id)? {
        store.insert(Metric::zero(kind, id))?;
    }
    store.update(id, change)
}

fn storage_error(operation: &str, id: &str, err: StorageError) -> Response {
    match err {
        StorageError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
        StorageError::KindMismatch { .. } => {
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        other => {
            tracing::error!(operation, id, error = %other, "storage failure");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, message.into()).into_response()
}

/// Reads the stored value back into the wire document after a write, so the
/// response shows the accumulated counter total rather than the delta.
fn echo_stored(store: &dyn MetricStore, kind: MetricKind, id: &str) -> Result<MetricUpdate, Response> {
    let rendered = store
        .value(kind, id)
        .map_err(|e| storage_error("read-back", id, e))?;
    match kind {
        MetricKind::Counter => {
            let total: i64 = rendered.parse().map_err(|_| {
                tracing::error!(id, value = %rendered, "stored counter is not an integer");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })?;
            Ok(MetricUpdate::counter(id, total))
        }
        MetricKind::Gauge => {
            let value: f64 = rendered.parse().map_err(|_| {
                tracing::error!(id, value = %rendered, "stored gauge is not a number");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })?;
            Ok(MetricUpdate::gauge(id, value))
        }
    }
}

/// GET `/` — HTML listing of every metric's canonical rendering, ordered by id.
pub async fn list_metrics(State(state): State<AppState>) -> Response {
    let all = match state.store.list_all() {
        Ok(all) => all,
        Err(e) => return storage_error("list", "-", e),
    };
    let mut html = String::from("<html><body>");
    for metric in all.values() {
        let _ = write!(html, "<p>{}</p>", metric.render());
    }
    html.push_str("</body></html>");
    Html(html).into_response()
}

/// GET `/ping` — storage liveness.
pub async fn ping(State(state): State<AppState>) -> Response {
    match state.store.ping() {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "storage ping failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn not_implemented(message: impl Into<String>) -> Response {
    (StatusCode::NOT_IMPLEMENTED, message.into()).into_response()
}

/// POST `/update/{kind}/{id}/{value}` — path-style single update. An unknown
/// kind answers 501, an unparseable value 400.
pub async fn update_path(
    State(state): State<AppState>,
    Path((kind, id, value)): Path<(String, String, String)>,
) -> Response {
    let kind: MetricKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return not_implemented(e),
    };
    let change = match parse_path_change(kind, &value) {
        Ok(change) => change,
        Err(e) => return bad_request(e),
    };
    match apply_update(&*state.store, kind, &id, change) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => storage_error("update", &id, e),
    }
}

/// POST `/update/` — JSON single update; echoes the post-update stored value.
/// An unknown kind answers 501 like the path-style route; a missing
/// delta/value field is a plain 400.
pub async fn update_json(State(state): State<AppState>, body: Bytes) -> Response {
    let update: MetricUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => return bad_request(format!("invalid update document: {e}")),
    };
    if update.kind.parse::<MetricKind>().is_err() {
        return not_implemented(format!("unknown metric kind: {}", update.kind));
    }
    let change = match update.change() {
        Ok(change) => change,
        Err(e) => return bad_request(e),
    };
    let kind = change.kind();
    if let Err(e) = apply_update(&*state.store, kind, &update.id, change) {
        return storage_error("update", &update.id, e);
    }
    match echo_stored(&*state.store, kind, &update.id) {
        Ok(echo) => Json(echo).into_response(),
        Err(response) => response,
    }
}

/// POST `/updates/` — ordered batch. Processing stops with 400 at the first
/// invalid entry; entries already applied stay applied.
pub async fn update_batch(State(state): State<AppState>, body: Bytes) -> Response {
    let updates: Vec<MetricUpdate> = match serde_json::from_slice(&body) {
        Ok(updates) => updates,
        Err(e) => return bad_request(format!("invalid batch document: {e}")),
    };
    for update in &updates {
        let change = match update.change() {
            Ok(change) => change,
            Err(e) => return bad_request(e),
        };
        if let Err(e) = apply_update(&*state.store, change.kind(), &update.id, change) {
            return storage_error("batch-update", &update.id, e);
        }
    }
    Json(serde_json::json!({"result": "ok"})).into_response()
}

/// POST `/value/` — JSON read; returns the document with delta/value filled in.
pub async fn value_json(State(state): State<AppState>, body: Bytes) -> Response {
    let query: MetricUpdate = match serde_json::from_slice(&body) {
        Ok(query) => query,
        Err(e) => return bad_request(format!("invalid read document: {e}")),
    };
    let kind: MetricKind = match query.kind.parse() {
        Ok(kind) => kind,
        Err(e) => return bad_request(e),
    };
    match echo_stored(&*state.store, kind, &query.id) {
        Ok(echo) => Json(echo).into_response(),
        Err(response) => response,
    }
}

/// GET `/value/{kind}/{id}` — plain-text value.
pub async fn value_path(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Response {
    let kind: MetricKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return bad_request(e),
    };
    match state.store.value(kind, &id) {
        Ok(value) => value.into_response(),
        Err(e) => storage_error("read", &id, e),
    }
}
