//! Capability checks for individual routes.
//!
//! Applied per route after authentication:
//!
//! ```ignore
//! post(deposit).route_layer(from_fn_with_state(Capability::Deposit, require_capability))
//! ```

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use mbank_core::auth::Capability;
use mbank_shared::Claims;
use serde_json::json;
use tracing::info;

use super::auth::caller_from_claims;

/// Rejects the request with 403 unless one of the caller's roles grants
/// `capability`.
pub async fn require_capability(
    State(capability): State<Capability>,
    request: Request,
    next: Next,
) -> Response {
    let Some(claims) = request.extensions().get::<Claims>() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "unauthorized",
                "message": "Authentication required"
            })),
        )
            .into_response();
    };

    let caller = caller_from_claims(claims);
    if !caller.has(capability) {
        info!(user_id = %caller.user_id, ?capability, "capability denied");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "forbidden",
                "message": format!("Missing permission: {capability:?}")
            })),
        )
            .into_response();
    }

    next.run(request).await
}
