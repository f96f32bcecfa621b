//! Unit tests for JWT claims and token pairs.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{Claims, TokenPair, TokenType};

#[test]
fn test_claims_new_sets_correct_fields() {
    let user_id = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::hours(1);
    let roles = vec!["USER".to_string(), "CUSTOMER".to_string()];

    let claims = Claims::new(user_id, roles.clone(), TokenType::Access, expires_at);

    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.roles, roles);
    assert_eq!(claims.typ, TokenType::Access);
    assert!(claims.iat <= Utc::now().timestamp());
    assert_eq!(claims.exp, expires_at.timestamp());
}

#[test]
fn test_has_role_is_case_insensitive() {
    let claims = Claims::new(
        Uuid::new_v4(),
        vec!["MANAGER".to_string()],
        TokenType::Access,
        Utc::now() + Duration::minutes(5),
    );

    assert!(claims.has_role("MANAGER"));
    assert!(claims.has_role("manager"));
    assert!(!claims.has_role("ADMIN"));
}

#[test]
fn test_claims_serialize_token_type_snake_case() {
    let claims = Claims::new(
        Uuid::nil(),
        vec![],
        TokenType::Refresh,
        Utc::now() + Duration::days(7),
    );
    let json = serde_json::to_value(&claims).unwrap();
    assert_eq!(json["typ"], "refresh");
}

#[test]
fn test_token_pair_is_bearer() {
    let pair = TokenPair::new("a".into(), "r".into(), 1800);
    assert_eq!(pair.token_type, "Bearer");
    assert_eq!(pair.expires_in, 1800);
}
