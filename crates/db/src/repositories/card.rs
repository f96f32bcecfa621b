//! Payment card repository.

use chrono::Utc;
use mbank_core::card::{CardRuleError, IssuedCard, normalize_holder};
use mbank_shared::AppError;
use mbank_shared::types::{PageRequest, PageResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{card_types, cards, sea_orm_active_enums::LifecycleStatus};

/// Attempts at drawing an unused card number before giving up.
const MAX_NUMBER_ATTEMPTS: u32 = 5;

/// Error types for card operations.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    /// No active card type with this alias.
    #[error("Card type not found: {0}")]
    CardTypeNotFound(String),

    /// Card missing or soft-deleted.
    #[error("Card not found: {0}")]
    CardNotFound(String),

    /// Card rule violation.
    #[error(transparent)]
    Rule(#[from] CardRuleError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CardError> for AppError {
    fn from(err: CardError) -> Self {
        let message = err.to_string();
        match err {
            CardError::CardTypeNotFound(_) | CardError::CardNotFound(_) => {
                Self::NotFound(message)
            }
            CardError::Rule(CardRuleError::BlankHolder) => Self::Validation(message),
            CardError::Rule(CardRuleError::NumberSpaceExhausted(_)) => Self::Internal(message),
            CardError::Database(_) => Self::Database(message),
        }
    }
}

/// Card with its type.
#[derive(Debug, Clone)]
pub struct CardDetails {
    /// The card row.
    pub card: cards::Model,
    /// Its card type.
    pub card_type: Option<card_types::Model>,
}

/// Card fields to change on regeneration besides the secrets.
#[derive(Debug, Clone, Default)]
pub struct RegenerateCardInput {
    /// New holder name.
    pub holder: Option<String>,
    /// New card type alias.
    pub card_type_alias: Option<String>,
}

/// Payment card repository.
#[derive(Debug, Clone)]
pub struct CardRepository {
    db: DatabaseConnection,
}

impl CardRepository {
    /// Creates a new card repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Issues a new card to a user.
    ///
    /// # Errors
    ///
    /// `CardTypeNotFound`, `BlankHolder`, `NumberSpaceExhausted`, or a
    /// database error.
    pub async fn issue(
        &self,
        user_id: Uuid,
        holder: &str,
        card_type_alias: &str,
    ) -> Result<CardDetails, CardError> {
        let holder = normalize_holder(holder)?;
        let card_type = self.card_type(card_type_alias).await?;
        let secrets = self.unused_secrets().await?;

        let now = Utc::now();
        let card = cards::ActiveModel {
            id: Set(Uuid::now_v7()),
            number: Set(secrets.number),
            cvv: Set(secrets.cvv),
            holder: Set(holder),
            issued_at: Set(secrets.issued_at),
            expires_at: Set(secrets.expires_at),
            card_type_id: Set(card_type.id),
            user_id: Set(user_id),
            status: Set(LifecycleStatus::Active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await?;

        info!(card_id = %card.id, user_id = %user_id, "card issued");

        Ok(CardDetails {
            card,
            card_type: Some(card_type),
        })
    }

    /// Finds a non-deleted card by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_number(&self, number: &str) -> Result<Option<CardDetails>, DbErr> {
        Ok(cards::Entity::find()
            .filter(cards::Column::Number.eq(number))
            .filter(cards::Column::Status.ne(LifecycleStatus::Deleted))
            .find_also_related(card_types::Entity)
            .one(&self.db)
            .await?
            .map(|(card, card_type)| CardDetails { card, card_type }))
    }

    /// Lists a user's non-deleted cards, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CardDetails>, DbErr> {
        Ok(cards::Entity::find()
            .filter(cards::Column::UserId.eq(user_id))
            .filter(cards::Column::Status.ne(LifecycleStatus::Deleted))
            .order_by_desc(cards::Column::CreatedAt)
            .find_also_related(card_types::Entity)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|(card, card_type)| CardDetails { card, card_type })
            .collect())
    }

    /// Lists every non-deleted card, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self, page: PageRequest) -> Result<PageResponse<CardDetails>, DbErr> {
        let base =
            cards::Entity::find().filter(cards::Column::Status.ne(LifecycleStatus::Deleted));

        let total = base.clone().count(&self.db).await?;
        let data = base
            .order_by_desc(cards::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .find_also_related(card_types::Entity)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|(card, card_type)| CardDetails { card, card_type })
            .collect();

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Replaces number, CVV and validity window of a card, optionally
    /// changing its holder and type.
    ///
    /// # Errors
    ///
    /// `CardNotFound`, `CardTypeNotFound`, a rule violation, or a database
    /// error.
    pub async fn regenerate(
        &self,
        number: &str,
        input: RegenerateCardInput,
    ) -> Result<CardDetails, CardError> {
        let current = self
            .find_by_number(number)
            .await?
            .ok_or_else(|| CardError::CardNotFound(number.to_string()))?;

        let holder = input.holder.as_deref().map(normalize_holder).transpose()?;
        let card_type = match input.card_type_alias.as_deref() {
            Some(alias) => Some(self.card_type(alias).await?),
            None => current.card_type,
        };
        let secrets = self.unused_secrets().await?;

        let mut active: cards::ActiveModel = current.card.into();
        active.number = Set(secrets.number);
        active.cvv = Set(secrets.cvv);
        active.issued_at = Set(secrets.issued_at);
        active.expires_at = Set(secrets.expires_at);
        if let Some(holder) = holder {
            active.holder = Set(holder);
        }
        if let Some(card_type) = &card_type {
            active.card_type_id = Set(card_type.id);
        }
        active.updated_at = Set(Utc::now().into());
        let card = active.update(&self.db).await?;

        info!(card_id = %card.id, "card regenerated");

        Ok(CardDetails { card, card_type })
    }

    /// Soft-deletes a card.
    ///
    /// # Errors
    ///
    /// `CardNotFound` or a database error.
    pub async fn delete(&self, number: &str) -> Result<(), CardError> {
        let current = self
            .find_by_number(number)
            .await?
            .ok_or_else(|| CardError::CardNotFound(number.to_string()))?;

        let mut active: cards::ActiveModel = current.card.into();
        active.status = Set(LifecycleStatus::Deleted);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn card_type(&self, alias: &str) -> Result<card_types::Model, CardError> {
        card_types::Entity::find()
            .filter(card_types::Column::Alias.eq(alias))
            .filter(card_types::Column::Status.eq(LifecycleStatus::Active))
            .one(&self.db)
            .await?
            .ok_or_else(|| CardError::CardTypeNotFound(alias.to_string()))
    }

    async fn unused_secrets(&self) -> Result<IssuedCard, CardError> {
        let today = Utc::now().date_naive();
        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            let secrets = IssuedCard::generate(today);
            if !number_taken(&self.db, &secrets.number).await? {
                return Ok(secrets);
            }
            warn!(attempt, "generated card number already in use");
        }
        Err(CardRuleError::NumberSpaceExhausted(MAX_NUMBER_ATTEMPTS).into())
    }
}

async fn number_taken<C: ConnectionTrait>(conn: &C, number: &str) -> Result<bool, DbErr> {
    let count = cards::Entity::find()
        .filter(cards::Column::Number.eq(number))
        .count(conn)
        .await?;
    Ok(count > 0)
}
