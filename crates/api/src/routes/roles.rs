//! Role catalogue routes. Roles are fixed in code, so these never touch the
//! database.

use axum::{Json, Router, extract::Path, routing::get};
use mbank_core::auth::{Capability, Role};
use serde::Serialize;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
};

/// Creates the role routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).route_layer(require!(ReadReference)))
        .route(
            "/roles/{name}",
            get(get_role).route_layer(require!(ReadReference)),
        )
}

/// A role and what it grants.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    /// Upper-case name.
    pub name: Role,
    /// Granted capabilities.
    pub capabilities: &'static [Capability],
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            name: role,
            capabilities: role.capabilities(),
        }
    }
}

/// GET /roles - Lowest privilege first.
async fn list_roles() -> Json<Vec<RoleResponse>> {
    Json(Role::ALL.into_iter().map(RoleResponse::from).collect())
}

/// GET /roles/{name} - Accepts `ADMIN`, `admin` or `ROLE_ADMIN`.
async fn get_role(Path(name): Path<String>) -> ApiResult<Json<RoleResponse>> {
    let role: Role = name
        .parse()
        .map_err(|_| ApiError::not_found(format!("Role not found: {name}")))?;
    Ok(Json(role.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use mbank_shared::TokenType;

    use crate::routes::test_support::{app, body_json, send, token};

    #[tokio::test]
    async fn test_list_roles() {
        let (app, state) = app();
        let user = token(&state, &["USER"], TokenType::Access);
        let response = send(app, "GET", "/api/v1/roles", Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["USER", "CUSTOMER", "STAFF", "MANAGER", "ADMIN"]);
    }

    #[tokio::test]
    async fn test_get_role_by_prefixed_name() {
        let (app, state) = app();
        let user = token(&state, &["USER"], TokenType::Access);
        let response = send(app, "GET", "/api/v1/roles/ROLE_manager", Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "MANAGER");
        assert!(
            body["capabilities"]
                .as_array()
                .unwrap()
                .iter()
                .any(|c| c == "block_users")
        );
    }

    #[tokio::test]
    async fn test_unknown_role_is_not_found() {
        let (app, state) = app();
        let user = token(&state, &["USER"], TokenType::Access);
        let response = send(app, "GET", "/api/v1/roles/ROOT", Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
