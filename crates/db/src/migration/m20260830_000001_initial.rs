//! Initial database migration.
//!
//! Creates all enums and tables for the personal ledger: users, accounts,
//! categories, credit cards, invoices, series, and transactions.

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
        // PART 2: USERS & ACCOUNTS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: CATEGORIES
        // ============================================================
        db.execute_unprepared(CATEGORY_GROUPS_SQL).await?;
        db.execute_unprepared(CATEGORIES_SQL).await?;

        // ============================================================
        // PART 4: CARDS & INVOICES
        // ============================================================
        db.execute_unprepared(CREDIT_CARDS_SQL).await?;
        db.execute_unprepared(INVOICES_SQL).await?;

        // ============================================================
        // PART 5: SERIES & TRANSACTIONS
        // ============================================================
        db.execute_unprepared(SERIES_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(INVOICE_SETTLEMENT_FK_SQL).await?;

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
-- Account types
CREATE TYPE account_kind AS ENUM (
    'checking',
    'savings',
    'wallet',
    'investment'
);

-- Category direction
CREATE TYPE category_kind AS ENUM ('income', 'expense');

-- Transaction kind
CREATE TYPE transaction_kind AS ENUM ('income', 'expense', 'transfer');

-- How a transaction entered the ledger
CREATE TYPE transaction_origin AS ENUM (
    'manual',
    'card_purchase',
    'invoice_settlement'
);

-- Invoice lifecycle
CREATE TYPE invoice_status AS ENUM ('open', 'closed', 'paid', 'overdue');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    kind account_kind NOT NULL,
    opening_balance NUMERIC(15, 2) NOT NULL DEFAULT 0,
    current_balance NUMERIC(15, 2) NOT NULL DEFAULT 0,
    color VARCHAR(16),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_accounts_user ON accounts(user_id);
";

const CATEGORY_GROUPS_SQL: &str = r"
CREATE TABLE category_groups (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_category_groups_user ON category_groups(user_id);
";

const CATEGORIES_SQL: &str = r"
CREATE TABLE categories (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    group_id UUID REFERENCES category_groups(id) ON DELETE SET NULL,
    name VARCHAR(255) NOT NULL,
    kind category_kind NOT NULL,
    color VARCHAR(16),
    icon VARCHAR(64),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_categories_user ON categories(user_id);
";

const CREDIT_CARDS_SQL: &str = r"
CREATE TABLE credit_cards (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    credit_limit NUMERIC(15, 2) NOT NULL,
    used_limit NUMERIC(15, 2) NOT NULL DEFAULT 0,
    closing_day SMALLINT NOT NULL CHECK (closing_day BETWEEN 1 AND 31),
    due_day SMALLINT NOT NULL CHECK (due_day BETWEEN 1 AND 31),
    brand VARCHAR(32),
    last_digits VARCHAR(4),
    color VARCHAR(16),
    account_id UUID REFERENCES accounts(id) ON DELETE SET NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_credit_cards_user ON credit_cards(user_id);
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY,
    card_id UUID NOT NULL REFERENCES credit_cards(id) ON DELETE CASCADE,
    reference_month SMALLINT NOT NULL CHECK (reference_month BETWEEN 1 AND 12),
    reference_year INTEGER NOT NULL,
    closing_date DATE NOT NULL,
    due_date DATE NOT NULL,
    total NUMERIC(15, 2) NOT NULL DEFAULT 0,
    amount_paid NUMERIC(15, 2) NOT NULL DEFAULT 0,
    status invoice_status NOT NULL DEFAULT 'open',
    account_id UUID REFERENCES accounts(id) ON DELETE SET NULL,
    settlement_transaction_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    -- One invoice per card per billing period
    CONSTRAINT uq_invoices_card_period UNIQUE (card_id, reference_month, reference_year)
);

CREATE INDEX idx_invoices_card ON invoices(card_id);
CREATE INDEX idx_invoices_status ON invoices(status);
";

const SERIES_SQL: &str = r"
CREATE TABLE series (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    description VARCHAR(255) NOT NULL,
    kind transaction_kind NOT NULL,
    start_date DATE NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_series_user ON series(user_id);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    description VARCHAR(255) NOT NULL,
    amount NUMERIC(15, 2) NOT NULL CHECK (amount >= 0),
    kind transaction_kind NOT NULL,
    origin transaction_origin NOT NULL DEFAULT 'manual',
    accrual_date DATE NOT NULL,
    settlement_date DATE,
    paid BOOLEAN NOT NULL DEFAULT FALSE,
    notes TEXT,
    account_id UUID REFERENCES accounts(id) ON DELETE SET NULL,
    category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
    invoice_id UUID REFERENCES invoices(id) ON DELETE CASCADE,
    series_id UUID REFERENCES series(id) ON DELETE SET NULL,
    series_ordinal INTEGER,
    installment_number INTEGER,
    installment_total INTEGER,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_transactions_user ON transactions(user_id);
CREATE INDEX idx_transactions_account ON transactions(account_id);
CREATE INDEX idx_transactions_invoice ON transactions(invoice_id);
CREATE INDEX idx_transactions_series ON transactions(series_id, series_ordinal);
CREATE INDEX idx_transactions_accrual ON transactions(accrual_date);
";

// Added after transactions exists because the two tables reference each other.
const INVOICE_SETTLEMENT_FK_SQL: &str = r"
ALTER TABLE invoices
    ADD CONSTRAINT fk_invoices_settlement_transaction
    FOREIGN KEY (settlement_transaction_id)
    REFERENCES transactions(id)
    ON DELETE SET NULL;
";

const DROP_ALL_SQL: &str = r"
ALTER TABLE invoices DROP CONSTRAINT IF EXISTS fk_invoices_settlement_transaction;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS series CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS credit_cards CASCADE;
DROP TABLE IF EXISTS categories CASCADE;
DROP TABLE IF EXISTS category_groups CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TYPE IF EXISTS invoice_status;
DROP TYPE IF EXISTS transaction_origin;
DROP TYPE IF EXISTS transaction_kind;
DROP TYPE IF EXISTS category_kind;
DROP TYPE IF EXISTS account_kind;
";
