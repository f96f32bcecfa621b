//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

/// Route layer admitting only callers whose roles grant the named capability.
macro_rules! require {
    ($capability:ident) => {
        axum::middleware::from_fn_with_state(
            mbank_core::auth::Capability::$capability,
            crate::middleware::require_capability,
        )
    };
}

pub mod account_types;
pub mod accounts;
pub mod auth;
pub mod branches;
pub mod card_types;
pub mod cards;
pub mod health;
pub mod roles;
pub mod transactions;
pub mod users;

/// Creates the API router with public and protected routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require an access token
    let protected_routes = Router::new()
        .merge(transactions::routes())
        .merge(accounts::routes())
        .merge(users::routes())
        .merge(cards::routes())
        .merge(account_types::routes())
        .merge(card_types::routes())
        .merge(branches::routes())
        .merge(roles::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Router fixtures that need no database.

    use std::sync::Arc;

    use axum::{Router, body::Body, http::Request, response::Response};
    use http_body_util::BodyExt;
    use mbank_shared::{
        EmailConfig, EmailService, JwtConfig, JwtService, LedgerConfig, TokenType,
    };
    use sea_orm::DatabaseConnection;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{AppState, create_router};

    pub fn state() -> AppState {
        AppState {
            db: Arc::new(DatabaseConnection::Disconnected),
            jwt_service: Arc::new(JwtService::new(JwtConfig {
                secret: "router-test-secret".to_string(),
                access_token_expiry_secs: 1800,
                refresh_token_expiry_secs: 604_800,
            })),
            email_service: Arc::new(EmailService::new(EmailConfig::default())),
            ledger: LedgerConfig::default(),
        }
    }

    pub fn app() -> (Router, AppState) {
        let state = state();
        (create_router(state.clone()), state)
    }

    /// Bearer token of the given type for a fresh user holding `roles`.
    pub fn token(state: &AppState, roles: &[&str], typ: TokenType) -> String {
        let roles = roles.iter().map(ToString::to_string).collect();
        let user_id = Uuid::new_v4();
        match typ {
            TokenType::Access => state.jwt_service.generate_access_token(user_id, roles),
            TokenType::Refresh => state.jwt_service.generate_refresh_token(user_id, roles),
        }
        .unwrap()
    }

    pub async fn send(
        app: Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        app.oneshot(request).await.unwrap()
    }

    pub async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use mbank_shared::TokenType;
    use rstest::rstest;

    use super::test_support::{app, body_json, send, token};

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let (app, _) = app();
        let response = send(app, "GET", "/api/v1/accounts/me", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "missing_token");
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_a_bearer_credential() {
        let (app, state) = app();
        let refresh = token(&state, &["CUSTOMER"], TokenType::Refresh);
        let response = send(app, "GET", "/api/v1/accounts/me", Some(&refresh), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "invalid_token");
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let (app, _) = app();
        let response = send(app, "GET", "/api/v1/users/me", Some("not.a.jwt"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[case("USER", "POST", "/api/v1/transactions/deposit")]
    #[case("USER", "POST", "/api/v1/transactions/withdraw")]
    #[case("CUSTOMER", "POST", "/api/v1/transactions/transfer")]
    #[case("CUSTOMER", "POST", "/api/v1/transactions/payment")]
    #[case("CUSTOMER", "GET", "/api/v1/transactions/history")]
    #[case("CUSTOMER", "GET", "/api/v1/accounts")]
    #[case("CUSTOMER", "PUT", "/api/v1/accounts/0001/limit")]
    #[case("USER", "POST", "/api/v1/accounts")]
    #[case("USER", "GET", "/api/v1/users")]
    #[case("STAFF", "PUT", "/api/v1/users/00000000-0000-0000-0000-000000000000/block")]
    #[case("ADMIN", "DELETE", "/api/v1/users/00000000-0000-0000-0000-000000000000")]
    #[case("STAFF", "GET", "/api/v1/cards")]
    #[case("STAFF", "POST", "/api/v1/account-types")]
    #[case("MANAGER", "DELETE", "/api/v1/account-types/saving-account")]
    #[case("MANAGER", "DELETE", "/api/v1/branches/00000000-0000-0000-0000-000000000000")]
    #[tokio::test]
    async fn test_capability_is_required(
        #[case] role: &str,
        #[case] method: &str,
        #[case] uri: &str,
    ) {
        let (app, state) = app();
        let access = token(&state, &[role], TokenType::Access);
        let response = send(app, method, uri, Some(&access), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{role} {method} {uri}");
        assert_eq!(body_json(response).await["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_health_reports_database_down() {
        let (app, _) = app();
        let response = send(app, "GET", "/api/v1/health", None, None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["database"], "down");
    }
}
