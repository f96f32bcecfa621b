//! Card type reference routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use mbank_core::lifecycle::LifecycleStatus;
use mbank_db::CardTypeRepository;
use mbank_db::entities::card_types;
use mbank_db::repositories::ReferenceError;
use mbank_db::repositories::reference::CARD_TYPE;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, error::ApiResult, extractors::ValidatedJson};

/// Creates the card type routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/card-types",
            get(list_card_types).route_layer(require!(ReadReference)),
        )
        .route(
            "/card-types",
            post(create_card_type).route_layer(require!(ManageReference)),
        )
        .route(
            "/card-types/{alias}",
            get(get_card_type).route_layer(require!(ReadReference)),
        )
        .route(
            "/card-types/{alias}",
            delete(delete_card_type).route_layer(require!(DeleteReference)),
        )
}

/// Request body for creating a card type.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCardTypeRequest {
    /// Display name, e.g. `Visa Debit`.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Unique alias.
    #[validate(length(min = 1, max = 100))]
    pub alias: String,
}

/// Card type response.
#[derive(Debug, Serialize)]
pub struct CardTypeResponse {
    /// Row ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Unique alias.
    pub alias: String,
    /// Lifecycle state.
    pub status: LifecycleStatus,
}

impl From<card_types::Model> for CardTypeResponse {
    fn from(model: card_types::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            alias: model.alias,
            status: model.status.into(),
        }
    }
}

async fn list_card_types(State(state): State<AppState>) -> ApiResult<Json<Vec<CardTypeResponse>>> {
    let types = CardTypeRepository::new((*state.db).clone()).list().await?;
    Ok(Json(types.into_iter().map(Into::into).collect()))
}

async fn get_card_type(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<Json<CardTypeResponse>> {
    let found = CardTypeRepository::new((*state.db).clone())
        .find_by_alias(&alias)
        .await?
        .ok_or(ReferenceError::NotFound {
            kind: CARD_TYPE,
            alias,
        })?;
    Ok(Json(found.into()))
}

async fn create_card_type(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCardTypeRequest>,
) -> ApiResult<impl IntoResponse> {
    let created = CardTypeRepository::new((*state.db).clone())
        .create(&payload.name, &payload.alias)
        .await?;
    Ok((StatusCode::CREATED, Json(CardTypeResponse::from(created))))
}

async fn delete_card_type(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<StatusCode> {
    CardTypeRepository::new((*state.db).clone())
        .delete(&alias)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
