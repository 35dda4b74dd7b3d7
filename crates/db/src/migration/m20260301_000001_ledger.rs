//! Ledger schema: entries, sub-accounts, period balances and lines.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ACCOUNTING_ENTRIES_SQL).await?;
        db.execute_unprepared(SUBACCOUNTS_SQL).await?;
        db.execute_unprepared(SUBACCOUNT_PERIOD_BALANCES_SQL).await?;
        db.execute_unprepared(ACCOUNTING_LINES_SQL).await?;
        db.execute_unprepared(INDEXES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ACCOUNTING_ENTRIES_SQL: &str = r"
CREATE TABLE accounting_entries (
    id UUID PRIMARY KEY,
    number BIGINT NOT NULL,
    posting_date DATE NOT NULL,
    concept VARCHAR(255) NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const SUBACCOUNTS_SQL: &str = r"
CREATE TABLE subaccounts (
    id UUID PRIMARY KEY,
    code VARCHAR(32) NOT NULL UNIQUE,
    description VARCHAR(255) NOT NULL DEFAULT '',
    debit NUMERIC(18, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(18, 4) NOT NULL DEFAULT 0,
    balance NUMERIC(18, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const SUBACCOUNT_PERIOD_BALANCES_SQL: &str = r"
CREATE TABLE subaccount_period_balances (
    subaccount_id UUID NOT NULL REFERENCES subaccounts(id) ON DELETE CASCADE,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    debit NUMERIC(18, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(18, 4) NOT NULL DEFAULT 0,
    balance NUMERIC(18, 4) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (subaccount_id, year, month)
);
";

const ACCOUNTING_LINES_SQL: &str = r"
CREATE TABLE accounting_lines (
    id UUID PRIMARY KEY,
    entry_id UUID NOT NULL REFERENCES accounting_entries(id) ON DELETE RESTRICT,
    subaccount_id UUID NOT NULL REFERENCES subaccounts(id),
    subaccount_code VARCHAR(32) NOT NULL,
    counterpart_id UUID REFERENCES subaccounts(id),
    counterpart_code VARCHAR(32),
    concept VARCHAR(255) NOT NULL CHECK (char_length(concept) BETWEEN 1 AND 255),
    debit NUMERIC(18, 4) NOT NULL DEFAULT 0 CHECK (debit >= 0),
    credit NUMERIC(18, 4) NOT NULL DEFAULT 0 CHECK (credit >= 0),
    tax_base NUMERIC(18, 4) NOT NULL DEFAULT 0,
    vat NUMERIC(6, 2) NOT NULL DEFAULT 0,
    surcharge NUMERIC(6, 2) NOT NULL DEFAULT 0,
    currency CHAR(3) NOT NULL,
    conversion_rate NUMERIC(18, 6) NOT NULL DEFAULT 1,
    tax_id VARCHAR(64),
    document VARCHAR(255),
    series_code VARCHAR(16),
    invoice VARCHAR(255),
    sort_order INTEGER NOT NULL DEFAULT 0,
    reconciled BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT chk_line_has_amount CHECK (debit > 0 OR credit > 0)
);
";

const INDEXES_SQL: &str = r"
CREATE INDEX idx_accounting_lines_entry ON accounting_lines(entry_id);
CREATE INDEX idx_accounting_lines_subaccount ON accounting_lines(subaccount_id, sort_order);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS accounting_lines CASCADE;
DROP TABLE IF EXISTS subaccount_period_balances CASCADE;
DROP TABLE IF EXISTS subaccounts CASCADE;
DROP TABLE IF EXISTS accounting_entries CASCADE;
";
