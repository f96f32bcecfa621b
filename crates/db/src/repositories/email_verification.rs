//! Email verification code repository.
//!
//! Codes are six digits, stored as SHA-256 hashes and valid for five minutes.
//! Issuing a new code invalidates the user's outstanding ones.

use chrono::{Duration, Utc};
use mbank_core::auth::generate_verification_code;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::entities::{email_verifications, users};

/// Minutes a verification code stays valid.
pub const CODE_TTL_MINUTES: i64 = 5;

/// Email verification repository.
#[derive(Debug, Clone)]
pub struct EmailVerificationRepository {
    db: DatabaseConnection,
}

impl EmailVerificationRepository {
    /// Creates a new email verification repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hashes a verification code for storage.
    #[must_use]
    pub fn hash_code(code: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(code.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Issues a fresh code for a user and returns it in clear text, to be
    /// sent by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn issue_code(&self, user_id: Uuid) -> Result<String, DbErr> {
        self.invalidate_user_codes(user_id).await?;

        let code = generate_verification_code();
        let now = Utc::now();

        email_verifications::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(user_id),
            code_hash: Set(Self::hash_code(&code)),
            expires_at: Set((now + Duration::minutes(CODE_TTL_MINUTES)).into()),
            used_at: Set(None),
            created_at: Set(now.into()),
        }
        .insert(&self.db)
        .await?;

        Ok(code)
    }

    /// Consumes a code and marks the user verified. Returns false when the
    /// code is wrong, used or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn verify_code(&self, user_id: Uuid, code: &str) -> Result<bool, DbErr> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let found = email_verifications::Entity::find()
            .filter(email_verifications::Column::UserId.eq(user_id))
            .filter(email_verifications::Column::CodeHash.eq(Self::hash_code(code.trim())))
            .filter(email_verifications::Column::UsedAt.is_null())
            .filter(email_verifications::Column::ExpiresAt.gt(now))
            .order_by_desc(email_verifications::Column::CreatedAt)
            .one(&txn)
            .await?;

        let Some(verification) = found else {
            return Ok(false);
        };

        let mut active: email_verifications::ActiveModel = verification.into();
        active.used_at = Set(Some(now.into()));
        active.update(&txn).await?;

        users::Entity::update_many()
            .col_expr(users::Column::IsVerified, Expr::value(true))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }

    /// Invalidates every outstanding code of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn invalidate_user_codes(&self, user_id: Uuid) -> Result<u64, DbErr> {
        let result = email_verifications::Entity::update_many()
            .col_expr(email_verifications::Column::UsedAt, Expr::value(Utc::now()))
            .filter(email_verifications::Column::UserId.eq(user_id))
            .filter(email_verifications::Column::UsedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_code_is_stable_hex() {
        let hash = EmailVerificationRepository::hash_code("123456");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, EmailVerificationRepository::hash_code("123456"));
        assert_ne!(hash, EmailVerificationRepository::hash_code("123457"));
    }
}
