//! Bearer-token guard for mutating endpoints.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::auth::AuthError;

/// Reject requests without a valid `Authorization: Bearer` token. On success
/// the decoded claims are stored in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return ApiError::from(AuthError::MissingToken).into_response();
    };

    match state.tokens.validate(token) {
        Ok(claims) => {
            tracing::debug!(user = %claims.sub, "authenticated request");
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
