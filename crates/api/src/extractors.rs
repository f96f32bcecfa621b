//! Request extractors.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use mbank_core::ledger::DEFAULT_MAX_PAGE_SIZE;
use mbank_shared::types::PageRequest;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use validator::Validate;

use crate::error::ApiError;

/// JSON body that is deserialized and then checked with `validator`.
///
/// Both malformed JSON and failed validation become a 400 `validation_error`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| ApiError::validation(errors.to_string()))?;
        Ok(Self(value))
    }
}

/// Query string parameters. A malformed query is a 400 `validation_error`.
#[derive(Debug, Clone, Copy)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Strict `?page=&size=` parameters for resource listings: both must be at
/// least 1. The size is capped.
#[derive(Debug, Clone, Copy)]
pub struct ListPage(pub PageRequest);

impl<S> FromRequestParts<S> for ListPage
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let QueryParams(page) = QueryParams::<PageRequest>::from_request_parts(parts, state).await?;
        page.validate().map_err(ApiError::validation)?;
        Ok(Self(page.normalized(DEFAULT_MAX_PAGE_SIZE)))
    }
}

/// Deserializes a nullable field so that an absent key stays `None` and an
/// explicit `null` becomes `Some(None)`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        alias: Option<Option<String>>,
    }

    #[test]
    fn test_double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.alias, None);

        let null: Patch = serde_json::from_str(r#"{"alias": null}"#).unwrap();
        assert_eq!(null.alias, Some(None));

        let set: Patch = serde_json::from_str(r#"{"alias": "Bills"}"#).unwrap();
        assert_eq!(set.alias, Some(Some("Bills".to_string())));
    }
}
