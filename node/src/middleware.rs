//! # Session Gate
//!
//! Middleware applied to protected routes. Reads the `token` cookie,
//! validates it, and attaches
//! [`AuthenticatedDid`](peerflash_protocol::auth::AuthenticatedDid) to the request
//! extensions for the handler.
//!
//! Rejections depend on who is asking. Browsers (an `Accept` header that
//! includes `text/html`) are sent to the login page with `303 See Other`.
//! Everything else gets `401` and `{"error": "unauthorized"}`. Neither
//! response says why the session was refused.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};

use peerflash_protocol::auth::SessionError;

use crate::api::{AppState, ErrorResponse};
use crate::cookie;

pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let result = cookie::session_token(request.headers())
        .ok_or(SessionError::Missing)
        .and_then(|token| state.validator.validate(&token));

    match result {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            state.metrics.sessions_rejected_total.inc();
            tracing::debug!(
                path = %request.uri().path(),
                reason = %e,
                "session rejected"
            );
            reject(request.headers(), &state.config.login_path)
        }
    }
}

fn reject(headers: &HeaderMap, login_path: &str) -> Response {
    if wants_html(headers) {
        return Redirect::to(login_path).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "unauthorized".into(),
        }),
    )
        .into_response()
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}
