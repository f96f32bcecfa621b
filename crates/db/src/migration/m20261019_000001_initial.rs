//! Initial database migration.
//!
//! Creates enums, tables, indexes and the append-only guard on the
//! transaction log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: USERS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(USER_ROLES_SQL).await?;
        db.execute_unprepared(EMAIL_VERIFICATIONS_SQL).await?;

        // ============================================================
        // PART 3: ACCOUNTS & LEDGER
        // ============================================================
        db.execute_unprepared(ACCOUNT_TYPES_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(USER_ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 4: CARDS & BRANCHES
        // ============================================================
        db.execute_unprepared(CARD_TYPES_SQL).await?;
        db.execute_unprepared(CARDS_SQL).await?;
        db.execute_unprepared(BRANCHES_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE lifecycle_status AS ENUM ('active', 'disabled', 'deleted');

CREATE TYPE transaction_type AS ENUM ('deposit', 'withdraw', 'transfer', 'payment');

CREATE TYPE user_role AS ENUM ('user', 'customer', 'staff', 'manager', 'admin');

CREATE TYPE gender AS ENUM ('male', 'female', 'other');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id                  UUID PRIMARY KEY,
    name                VARCHAR(100) NOT NULL,
    gender              gender NOT NULL,
    phone_number        VARCHAR(20) NOT NULL UNIQUE,
    email               VARCHAR(255) NOT NULL UNIQUE,
    national_card_id    VARCHAR(50) NOT NULL UNIQUE,
    student_card_id     VARCHAR(50),
    dob                 DATE,
    profile_image       VARCHAR(500),
    password_hash       VARCHAR(255) NOT NULL,
    status              lifecycle_status NOT NULL DEFAULT 'active',
    is_verified         BOOLEAN NOT NULL DEFAULT false,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_users_status ON users(status);
";

const USER_ROLES_SQL: &str = r"
CREATE TABLE user_roles (
    id          UUID PRIMARY KEY,
    user_id     UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role        user_role NOT NULL,

    CONSTRAINT uq_user_roles UNIQUE (user_id, role)
);
";

const EMAIL_VERIFICATIONS_SQL: &str = r"
CREATE TABLE email_verifications (
    id          UUID PRIMARY KEY,
    user_id     UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    code_hash   VARCHAR(64) NOT NULL,
    expires_at  TIMESTAMPTZ NOT NULL,
    used_at     TIMESTAMPTZ,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_email_verifications_user ON email_verifications(user_id)
    WHERE used_at IS NULL;
";

const ACCOUNT_TYPES_SQL: &str = r"
CREATE TABLE account_types (
    id          UUID PRIMARY KEY,
    name        VARCHAR(100) NOT NULL,
    alias       VARCHAR(100) NOT NULL UNIQUE,
    description TEXT,
    status      lifecycle_status NOT NULL DEFAULT 'active',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id              UUID PRIMARY KEY,
    act_no          VARCHAR(32) NOT NULL UNIQUE,
    alias_name      VARCHAR(100),
    balance         NUMERIC(20, 2) NOT NULL DEFAULT 0,
    transfer_limit  NUMERIC(20, 2) NOT NULL,
    account_type_id UUID NOT NULL REFERENCES account_types(id),
    is_hidden       BOOLEAN NOT NULL DEFAULT false,
    status          lifecycle_status NOT NULL DEFAULT 'active',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_accounts_balance CHECK (balance >= 0),
    CONSTRAINT chk_accounts_transfer_limit CHECK (transfer_limit > 0)
);

CREATE INDEX idx_accounts_created ON accounts(created_at DESC);
";

const USER_ACCOUNTS_SQL: &str = r"
CREATE TABLE user_accounts (
    id          UUID PRIMARY KEY,
    user_id     UUID NOT NULL REFERENCES users(id),
    account_id  UUID NOT NULL UNIQUE REFERENCES accounts(id),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_user_accounts_user ON user_accounts(user_id);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id                  UUID PRIMARY KEY,
    owner_act_no        VARCHAR(32) NOT NULL REFERENCES accounts(act_no),
    receiver_act_no     VARCHAR(32) REFERENCES accounts(act_no),
    payment_receiver    VARCHAR(100),
    amount              NUMERIC(20, 2) NOT NULL,
    transaction_type    transaction_type NOT NULL,
    remark              VARCHAR(255),
    transaction_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    status              BOOLEAN NOT NULL DEFAULT true,
    lifecycle           lifecycle_status NOT NULL DEFAULT 'active',

    CONSTRAINT chk_transactions_amount CHECK (amount > 0)
);

CREATE INDEX idx_transactions_owner ON transactions(owner_act_no, transaction_at DESC);
CREATE INDEX idx_transactions_receiver ON transactions(receiver_act_no, transaction_at DESC)
    WHERE receiver_act_no IS NOT NULL;
CREATE INDEX idx_transactions_at ON transactions(transaction_at DESC);
";

const CARD_TYPES_SQL: &str = r"
CREATE TABLE card_types (
    id          UUID PRIMARY KEY,
    name        VARCHAR(100) NOT NULL,
    alias       VARCHAR(100) NOT NULL UNIQUE,
    status      lifecycle_status NOT NULL DEFAULT 'active',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const CARDS_SQL: &str = r"
CREATE TABLE cards (
    id              UUID PRIMARY KEY,
    number          CHAR(16) NOT NULL UNIQUE,
    cvv             CHAR(3) NOT NULL,
    holder          VARCHAR(100) NOT NULL,
    issued_at       DATE NOT NULL,
    expires_at      DATE NOT NULL,
    card_type_id    UUID NOT NULL REFERENCES card_types(id),
    user_id         UUID NOT NULL REFERENCES users(id),
    status          lifecycle_status NOT NULL DEFAULT 'active',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_cards_expiry CHECK (expires_at > issued_at)
);

CREATE INDEX idx_cards_user ON cards(user_id);
";

const BRANCHES_SQL: &str = r"
CREATE TABLE branches (
    id              UUID PRIMARY KEY,
    name            VARCHAR(100) NOT NULL,
    address         VARCHAR(200) NOT NULL,
    city            VARCHAR(100),
    province        VARCHAR(100),
    latitude        NUMERIC(9, 6),
    longitude       NUMERIC(9, 6),
    phone_number    VARCHAR(20),
    email           VARCHAR(100),
    open_time       TIME NOT NULL,
    close_time      TIME NOT NULL,
    work_days       VARCHAR(50),
    status          lifecycle_status NOT NULL DEFAULT 'active',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_branches_hours CHECK (open_time < close_time)
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_transaction_modification
-- Ledger records are append-only; only the lifecycle column may change
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_transaction_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF NEW.owner_act_no IS DISTINCT FROM OLD.owner_act_no
        OR NEW.receiver_act_no IS DISTINCT FROM OLD.receiver_act_no
        OR NEW.payment_receiver IS DISTINCT FROM OLD.payment_receiver
        OR NEW.amount IS DISTINCT FROM OLD.amount
        OR NEW.transaction_type IS DISTINCT FROM OLD.transaction_type
        OR NEW.remark IS DISTINCT FROM OLD.remark
        OR NEW.transaction_at IS DISTINCT FROM OLD.transaction_at
        OR NEW.status IS DISTINCT FROM OLD.status THEN
        RAISE EXCEPTION 'Transaction records are append-only.';
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_transaction_mod
BEFORE UPDATE ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_transaction_modification();

CREATE OR REPLACE FUNCTION prevent_transaction_delete()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Transaction records cannot be deleted.';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_transaction_delete
BEFORE DELETE ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_transaction_delete();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_prevent_transaction_delete ON transactions;
DROP TRIGGER IF EXISTS trg_prevent_transaction_mod ON transactions;
DROP FUNCTION IF EXISTS prevent_transaction_delete();
DROP FUNCTION IF EXISTS prevent_transaction_modification();

DROP TABLE IF EXISTS branches CASCADE;
DROP TABLE IF EXISTS cards CASCADE;
DROP TABLE IF EXISTS card_types CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS user_accounts CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS account_types CASCADE;
DROP TABLE IF EXISTS email_verifications CASCADE;
DROP TABLE IF EXISTS user_roles CASCADE;
DROP TABLE IF EXISTS users CASCADE;

DROP TYPE IF EXISTS gender;
DROP TYPE IF EXISTS user_role;
DROP TYPE IF EXISTS transaction_type;
DROP TYPE IF EXISTS lifecycle_status;
";
