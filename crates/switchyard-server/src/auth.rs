// ABOUTME: Bearer credential middleware resolving the caller's identity for protected routes
// ABOUTME: Charges the identity's rate limit and stores it as a request extension
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::error::error_response;
use crate::state::SharedState;

/// Middleware that authenticates `Authorization: Bearer <credential>`
///
/// On success the request carries an `Arc<ClientIdentity>` extension and one
/// unit of the identity's quota is spent. Missing or unknown credentials get
/// 401, an exhausted quota gets 429 with `Retry-After`.
pub async fn require_identity(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity = match state.guard().authenticate_header(header) {
        Ok(identity) => identity,
        Err(err) => {
            debug!(path = %request.uri().path(), "Rejected unauthenticated request");
            return error_response(None, &err);
        }
    };

    if let Err(err) = state.guard().check_rate(&identity) {
        debug!(identity = %identity.id, "Rate limit exceeded");
        return error_response(None, &err);
    }

    request.extensions_mut().insert(Arc::clone(&identity));
    next.run(request).await
}
