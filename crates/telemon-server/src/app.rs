use crate::state::AppState;
use crate::{api, logging, middleware as mw};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

/// Builds the HTTP router with the inbound middleware chain: request logging,
/// then RSA decryption, then HMAC verification, then the gzip codec, so the
/// handlers always see plaintext JSON.
pub fn build_http_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::list_metrics))
        .route("/ping", get(api::ping))
        .route("/update/", post(api::update_json))
        .route("/update/:kind/:id/:value", post(api::update_path))
        .route("/updates/", post(api::update_batch))
        .route("/value/", post(api::value_json))
        .route("/value/:kind/:id", get(api::value_path))
        .layer(middleware::from_fn(mw::gzip_codec))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw::verify_signature,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw::decrypt_request,
        ))
        .layer(middleware::from_fn(logging::request_logging))
        .with_state(state)
}
