//! JWT token generation and validation.
//!
//! Access and refresh tokens share a signing key and are told apart by the
//! `typ` claim.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{Claims, TokenPair, TokenType};
use crate::config::JwtConfig;

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token decoding failed.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token is valid but of the wrong type for this use.
    #[error("expected a {expected:?} token")]
    WrongType {
        /// Token type the caller required.
        expected: TokenType,
    },
}

/// JWT service for token operations.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_token_expiry_secs", &self.config.access_token_expiry_secs)
            .field("refresh_token_expiry_secs", &self.config.refresh_token_expiry_secs)
            .field("keys", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generates an access token for a user.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        roles: Vec<String>,
    ) -> Result<String, JwtError> {
        self.encode_claims(
            user_id,
            roles,
            TokenType::Access,
            self.config.access_token_expiry_secs,
        )
    }

    /// Generates a refresh token for a user.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn generate_refresh_token(
        &self,
        user_id: Uuid,
        roles: Vec<String>,
    ) -> Result<String, JwtError> {
        self.encode_claims(
            user_id,
            roles,
            TokenType::Refresh,
            self.config.refresh_token_expiry_secs,
        )
    }

    /// Generates an access and refresh token pair.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if either token cannot be encoded.
    pub fn generate_pair(&self, user_id: Uuid, roles: &[String]) -> Result<TokenPair, JwtError> {
        let access = self.generate_access_token(user_id, roles.to_vec())?;
        let refresh = self.generate_refresh_token(user_id, roles.to_vec())?;
        Ok(TokenPair::new(access, refresh, self.access_token_expires_in()))
    }

    fn encode_claims(
        &self,
        user_id: Uuid,
        roles: Vec<String>,
        typ: TokenType,
        ttl_secs: u64,
    ) -> Result<String, JwtError> {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let expires_at = Utc::now() + Duration::seconds(ttl);
        let claims = Claims::new(user_id, roles, typ, expires_at);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Validates and decodes a token of any type.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired.
    /// Returns `JwtError::DecodingError` if the token is malformed.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::default();

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::DecodingError(e.to_string()),
            })
    }

    /// Validates a token and requires it to be of the given type.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::WrongType` for a valid token of the other type.
    pub fn validate_typed(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.typ == expected {
            Ok(claims)
        } else {
            Err(JwtError::WrongType { expected })
        }
    }

    /// Returns the access token expiration in seconds.
    #[must_use]
    pub fn access_token_expires_in(&self) -> i64 {
        i64::try_from(self.config.access_token_expiry_secs).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            access_token_expiry_secs: 1800,
            refresh_token_expiry_secs: 604_800,
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let token = service
            .generate_access_token(user_id, vec!["CUSTOMER".to_string()])
            .unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.typ, TokenType::Access);
        assert!(claims.has_role("customer"));
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let service = create_test_service();
        let token = service
            .generate_refresh_token(Uuid::new_v4(), vec!["USER".to_string()])
            .unwrap();

        let result = service.validate_typed(&token, TokenType::Access);
        assert!(matches!(
            result,
            Err(JwtError::WrongType {
                expected: TokenType::Access
            })
        ));
        assert!(service.validate_typed(&token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn test_invalid_token() {
        let service = create_test_service();
        let result = service.validate_token("invalid.token.here");
        assert!(matches!(result, Err(JwtError::DecodingError(_))));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let service = create_test_service();
        let other = JwtService::new(JwtConfig {
            secret: "another-secret".to_string(),
            access_token_expiry_secs: 60,
            refresh_token_expiry_secs: 60,
        });
        let token = other
            .generate_access_token(Uuid::new_v4(), vec![])
            .unwrap();
        assert!(service.validate_token(&token).is_err());
    }
}
