//! Payment card routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use mbank_core::auth::{Capability, Caller};
use mbank_core::lifecycle::LifecycleStatus;
use mbank_db::CardRepository;
use mbank_db::repositories::{CardDetails, CardError, RegenerateCardInput};
use mbank_shared::types::PageResponse;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::users::require_user;
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extractors::{ListPage, ValidatedJson},
    middleware::AuthUser,
};

/// Creates the card routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/cards",
            post(issue_card).route_layer(require!(ManageOwnCards)),
        )
        .route("/cards", get(list_cards).route_layer(require!(ManageAllCards)))
        .route(
            "/cards/me",
            get(my_cards).route_layer(require!(ManageOwnCards)),
        )
        .route("/cards/{number}", get(get_card))
        .route("/cards/{number}", delete(delete_card))
        .route("/cards/{number}/regenerate", put(regenerate_card))
}

/// Request body for issuing a card.
#[derive(Debug, Deserialize, Validate)]
pub struct IssueCardRequest {
    /// Alias of the card type.
    #[validate(length(min = 1, message = "card_type is required"))]
    pub card_type: String,
    /// Name printed on the card. Defaults to the caller's name.
    pub holder: Option<String>,
}

/// Request body for regenerating a card.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RegenerateCardRequest {
    /// New card type alias.
    pub card_type: Option<String>,
    /// New holder name.
    pub holder: Option<String>,
}

/// Card type summary embedded in card responses.
#[derive(Debug, Serialize)]
pub struct CardTypeSummary {
    /// Display name.
    pub name: String,
    /// Stable alias.
    pub alias: String,
}

/// Card response.
#[derive(Debug, Serialize)]
pub struct CardResponse {
    /// Card ID.
    pub id: Uuid,
    /// 16-digit number.
    pub number: String,
    /// Verification value.
    pub cvv: String,
    /// Printed holder name.
    pub holder: String,
    /// Issue date.
    pub issued_at: NaiveDate,
    /// Expiry date.
    pub expires_at: NaiveDate,
    /// Card type.
    pub card_type: Option<CardTypeSummary>,
    /// Holding user.
    pub user_id: Uuid,
    /// Lifecycle state.
    pub status: LifecycleStatus,
}

impl From<CardDetails> for CardResponse {
    fn from(details: CardDetails) -> Self {
        let CardDetails { card, card_type } = details;
        Self {
            id: card.id,
            number: card.number,
            cvv: card.cvv,
            holder: card.holder,
            issued_at: card.issued_at,
            expires_at: card.expires_at,
            card_type: card_type.map(|t| CardTypeSummary {
                name: t.name,
                alias: t.alias,
            }),
            user_id: card.user_id,
            status: card.status.into(),
        }
    }
}

/// POST /cards - Issue a card to the caller.
async fn issue_card(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<IssueCardRequest>,
) -> ApiResult<impl IntoResponse> {
    let holder = match payload.holder {
        Some(holder) => holder,
        None => require_user(&state, auth.user_id()).await?.user.name,
    };

    let card = CardRepository::new((*state.db).clone())
        .issue(auth.user_id(), &holder, &payload.card_type)
        .await?;
    Ok((StatusCode::CREATED, Json(CardResponse::from(card))))
}

/// GET /cards - Every card, paginated.
async fn list_cards(
    State(state): State<AppState>,
    ListPage(page): ListPage,
) -> ApiResult<Json<PageResponse<CardResponse>>> {
    let cards = CardRepository::new((*state.db).clone())
        .list_all(page)
        .await?;
    Ok(Json(cards.map(CardResponse::from)))
}

/// GET /cards/me - The caller's cards.
async fn my_cards(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<CardResponse>>> {
    let cards = CardRepository::new((*state.db).clone())
        .list_for_user(auth.user_id())
        .await?;
    Ok(Json(cards.into_iter().map(CardResponse::from).collect()))
}

/// GET /cards/{number} - Holder or card administrators.
async fn get_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(number): Path<String>,
) -> ApiResult<Json<CardResponse>> {
    let repo = CardRepository::new((*state.db).clone());
    let card = accessible_card(&repo, &auth.caller(), &number, &[
        Capability::ReadCards,
        Capability::ManageOwnCards,
    ])
    .await?;
    Ok(Json(card.into()))
}

/// PUT /cards/{number}/regenerate - New number, CVV and validity window.
async fn regenerate_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(number): Path<String>,
    ValidatedJson(payload): ValidatedJson<RegenerateCardRequest>,
) -> ApiResult<Json<CardResponse>> {
    let repo = CardRepository::new((*state.db).clone());
    accessible_card(&repo, &auth.caller(), &number, &[Capability::ManageOwnCards]).await?;

    let card = repo
        .regenerate(
            &number,
            RegenerateCardInput {
                holder: payload.holder,
                card_type_alias: payload.card_type,
            },
        )
        .await?;

    info!(user_id = %auth.user_id(), card_id = %card.card.id, "card regenerated");
    Ok(Json(card.into()))
}

/// DELETE /cards/{number} - Soft delete.
async fn delete_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(number): Path<String>,
) -> ApiResult<StatusCode> {
    let repo = CardRepository::new((*state.db).clone());
    let card =
        accessible_card(&repo, &auth.caller(), &number, &[Capability::ManageOwnCards]).await?;
    repo.delete(&number).await?;

    info!(user_id = %auth.user_id(), card_id = %card.card.id, "card deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Loads a card the caller may act on: their own, with any of `own`, or
/// any card with `ManageAllCards`.
async fn accessible_card(
    repo: &CardRepository,
    caller: &Caller,
    number: &str,
    own: &[Capability],
) -> ApiResult<CardDetails> {
    if !may_touch_cards(caller, own) {
        return Err(ApiError::forbidden("Missing permission for cards"));
    }

    let card = repo
        .find_by_number(number)
        .await?
        .ok_or_else(|| CardError::CardNotFound(number.to_string()))?;

    let holds = card.card.user_id == caller.user_id.into_inner();
    if !caller.has(Capability::ManageAllCards) && !holds {
        return Err(ApiError::forbidden("Caller does not hold this card"));
    }
    Ok(card)
}

fn may_touch_cards(caller: &Caller, own: &[Capability]) -> bool {
    caller.has(Capability::ManageAllCards) || own.iter().any(|c| caller.has(*c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbank_core::auth::Role;
    use mbank_shared::types::UserId;

    #[test]
    fn test_may_touch_cards() {
        let staff = Caller::new(UserId::new(), vec![Role::Staff]);
        assert!(!may_touch_cards(&staff, &[Capability::ReadCards, Capability::ManageOwnCards]));

        let user = Caller::new(UserId::new(), vec![Role::User]);
        assert!(may_touch_cards(&user, &[Capability::ReadCards]));

        let manager = Caller::new(UserId::new(), vec![Role::Manager]);
        assert!(may_touch_cards(&manager, &[Capability::ManageOwnCards]));
    }
}
