use crate::state::AppState;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use telemon_payload::{gzip, signature, SIGNATURE_HEADER};

async fn buffer_body(req: Request) -> Result<(axum::http::request::Parts, Bytes), Response> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST.into_response())?;
    Ok((parts, bytes))
}

/// Decrypts the request body with the configured private key. Requests with
/// an empty body pass through untouched.
pub async fn decrypt_request(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(crypto) = state.crypto.clone() else {
        return next.run(req).await;
    };

    let (parts, bytes) = match buffer_body(req).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };
    if bytes.is_empty() {
        return next.run(Request::from_parts(parts, Body::empty())).await;
    }

    match crypto.decrypt(&bytes) {
        Ok(plain) => {
            next.run(Request::from_parts(parts, Body::from(plain)))
                .await
        }
        Err(e) => {
            tracing::warn!(error = %e, "rejecting undecryptable request");
            (StatusCode::BAD_REQUEST, "cannot decrypt request body").into_response()
        }
    }
}

/// Verifies the `HashSHA256` header against the request body. Requests
/// without the header are accepted unverified; the body passes through
/// unchanged either way.
pub async fn verify_signature(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(key) = state.hash_key.clone() else {
        return next.run(req).await;
    };
    let Some(header_value) = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
    else {
        return next.run(req).await;
    };

    let (parts, bytes) = match buffer_body(req).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };
    if let Err(e) = signature::verify(key.as_bytes(), &bytes, &header_value) {
        tracing::warn!(error = %e, "rejecting request with bad signature");
        return (StatusCode::BAD_REQUEST, "signature mismatch").into_response();
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn accepts_gzip(parts: &axum::http::request::Parts) -> bool {
    parts
        .headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("gzip"))
        .unwrap_or(false)
}

/// Transparent gzip codec: inflates request bodies declared with
/// `Content-Encoding: gzip` and compresses successful responses when the
/// client sent `Accept-Encoding: gzip`.
pub async fn gzip_codec(req: Request, next: Next) -> Response {
    let gzipped_request = req
        .headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("gzip"))
        .unwrap_or(false);

    let (mut parts, bytes) = match buffer_body(req).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };
    let respond_gzipped = accepts_gzip(&parts);

    let body = if gzipped_request && !bytes.is_empty() {
        parts.headers.remove(header::CONTENT_ENCODING);
        match gzip::decompress(&bytes) {
            Ok(plain) => Body::from(plain),
            Err(e) => {
                tracing::warn!(error = %e, "rejecting malformed gzip request");
                return (StatusCode::BAD_REQUEST, "invalid gzip body").into_response();
            }
        }
    } else {
        Body::from(bytes)
    };

    let response = next.run(Request::from_parts(parts, body)).await;
    if !respond_gzipped || !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if bytes.is_empty() {
        return Response::from_parts(parts, Body::empty());
    }

    match gzip::compress(&bytes) {
        Ok(compressed) => {
            parts
                .headers
                .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(compressed))
        }
        Err(e) => {
            tracing::error!(error = %e, "response compression failed");
            Response::from_parts(parts, Body::from(bytes))
        }
    }
}
