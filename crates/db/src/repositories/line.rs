//! Accounting line repository.
//!
//! Each mutating operation opens a transaction, runs the ledger inside it and
//! commits. Any error drops the transaction, which rolls back the line write
//! together with every balance write made before the failure.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use saldo_core::ledger::{
    AccountingEntry, AccountingLine, AccountingLineLedger, BalanceAudit, LedgerError, SubAccount,
};
use saldo_shared::types::{EntryId, LineId, SubaccountId};
use saldo_shared::{AppError, LedgerConfig};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};

use super::ledger_store::{
    SeaOrmLedgerStore, entry_from_model, line_from_model, subaccount_from_model,
};
use crate::entities::{accounting_entries, accounting_lines, subaccounts};

/// Error types for accounting line operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A ledger rule rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Another sub-account already uses the code.
    #[error("Sub-account code already exists: {0}")]
    DuplicateCode(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Ledger(e) => e.into(),
            RepositoryError::DuplicateCode(code) => {
                Self::Validation(format!("sub-account code already exists: {code}"))
            }
            RepositoryError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating an accounting entry.
#[derive(Debug, Clone)]
pub struct CreateEntryInput {
    /// Entry number.
    pub number: i64,
    /// Posting date.
    pub posting_date: NaiveDate,
    /// Entry concept.
    pub concept: String,
}

/// Input for creating a sub-account.
#[derive(Debug, Clone)]
pub struct CreateSubaccountInput {
    /// Sub-account code.
    pub code: String,
    /// Description.
    pub description: String,
    /// Opening debit total.
    pub opening_debit: Decimal,
    /// Opening credit total.
    pub opening_credit: Decimal,
}

/// Database-backed accounting line operations.
#[derive(Debug, Clone)]
pub struct AccountingLineRepository {
    db: DatabaseConnection,
    config: LedgerConfig,
}

impl AccountingLineRepository {
    /// Creates a new repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Creates an empty line carrying the configured default currency.
    #[must_use]
    pub fn new_line(&self) -> AccountingLine {
        AccountingLine::new(self.config.default_currency)
    }

    /// Creates an accounting entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_entry(
        &self,
        input: CreateEntryInput,
    ) -> Result<AccountingEntry, RepositoryError> {
        let entry = accounting_entries::ActiveModel {
            id: Set(EntryId::new().into_inner()),
            number: Set(input.number),
            posting_date: Set(input.posting_date),
            concept: Set(input.concept),
            created_at: Set(Utc::now().into()),
        };

        let entry = entry_from_model(entry.insert(&self.db).await?);
        info!(entry_id = %entry.id, number = entry.number, "Accounting entry created");
        Ok(entry)
    }

    /// Creates a sub-account with optional opening totals.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCode` if the code is taken, or a database error.
    pub async fn create_subaccount(
        &self,
        input: CreateSubaccountInput,
    ) -> Result<SubAccount, RepositoryError> {
        let existing = subaccounts::Entity::find()
            .filter(subaccounts::Column::Code.eq(input.code.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(RepositoryError::DuplicateCode(input.code));
        }

        let now = Utc::now().into();
        let subaccount = subaccounts::ActiveModel {
            id: Set(SubaccountId::new().into_inner()),
            code: Set(input.code),
            description: Set(input.description),
            debit: Set(input.opening_debit),
            credit: Set(input.opening_credit),
            balance: Set(input.opening_debit - input.opening_credit),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let subaccount = subaccount_from_model(subaccount.insert(&self.db).await?);
        info!(subaccount_id = %subaccount.id, code = %subaccount.code, "Sub-account created");
        Ok(subaccount)
    }

    /// Finds a sub-account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_subaccount(
        &self,
        id: SubaccountId,
    ) -> Result<Option<SubAccount>, RepositoryError> {
        let model = subaccounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?;
        Ok(model.map(subaccount_from_model))
    }

    /// Finds a sub-account by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_subaccount_by_code(
        &self,
        code: &str,
    ) -> Result<Option<SubAccount>, RepositoryError> {
        let model = subaccounts::Entity::find()
            .filter(subaccounts::Column::Code.eq(code))
            .one(&self.db)
            .await?;
        Ok(model.map(subaccount_from_model))
    }

    /// Finds an accounting entry by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_entry_by_number(
        &self,
        number: i64,
    ) -> Result<Option<AccountingEntry>, RepositoryError> {
        let model = accounting_entries::Entity::find()
            .filter(accounting_entries::Column::Number.eq(number))
            .order_by_asc(accounting_entries::Column::CreatedAt)
            .one(&self.db)
            .await?;
        Ok(model.map(entry_from_model))
    }

    /// Lists the lines of an entry in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is malformed.
    pub async fn lines_for_entry(
        &self,
        entry_id: EntryId,
    ) -> Result<Vec<AccountingLine>, RepositoryError> {
        let models = accounting_lines::Entity::find()
            .filter(accounting_lines::Column::EntryId.eq(entry_id.into_inner()))
            .order_by_asc(accounting_lines::Column::SortOrder)
            .order_by_asc(accounting_lines::Column::Id)
            .all(&self.db)
            .await?;
        let lines = models
            .into_iter()
            .map(line_from_model)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Lists every sub-account ID ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_subaccount_ids(&self) -> Result<Vec<SubaccountId>, RepositoryError> {
        let ids: Vec<uuid::Uuid> = subaccounts::Entity::find()
            .select_only()
            .column(subaccounts::Column::Id)
            .order_by_asc(subaccounts::Column::Code)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids.into_iter().map(SubaccountId::from_uuid).collect())
    }

    /// Persists a new line and adds it to its sub-account.
    ///
    /// # Errors
    ///
    /// Returns a ledger error or a database error. Nothing is written on error.
    pub async fn insert_line(
        &self,
        line: AccountingLine,
    ) -> Result<AccountingLine, RepositoryError> {
        let txn = self.db.begin().await?;
        let store = SeaOrmLedgerStore::new(&txn);
        let inserted = AccountingLineLedger::new(&store, self.config.clone())
            .insert_line(line)
            .await?;
        txn.commit().await?;

        info!(
            line_id = %inserted.id,
            debit = %inserted.debit,
            credit = %inserted.credit,
            "Accounting line inserted"
        );
        Ok(inserted)
    }

    /// Replaces a line, moving balances by the difference from `before`.
    ///
    /// # Errors
    ///
    /// Returns a ledger error (including `StaleLine` when `before` no longer
    /// matches the stored row) or a database error.
    pub async fn update_line(
        &self,
        before: &AccountingLine,
        after: AccountingLine,
    ) -> Result<AccountingLine, RepositoryError> {
        let txn = self.db.begin().await?;
        let store = SeaOrmLedgerStore::new(&txn);
        let updated = AccountingLineLedger::new(&store, self.config.clone())
            .update_line(before, after)
            .await?;
        txn.commit().await?;

        info!(line_id = %updated.id, "Accounting line updated");
        Ok(updated)
    }

    /// Deletes a line and removes its amounts from its sub-account.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` or a database error.
    pub async fn delete_line(&self, line_id: LineId) -> Result<AccountingLine, RepositoryError> {
        let txn = self.db.begin().await?;
        let store = SeaOrmLedgerStore::new(&txn);
        let deleted = AccountingLineLedger::new(&store, self.config.clone())
            .delete_line(line_id)
            .await?;
        txn.commit().await?;

        info!(line_id = %deleted.id, "Accounting line deleted");
        Ok(deleted)
    }

    /// Deletes an entry after removing each of its lines from its
    /// sub-account, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, a ledger error or a database error. Nothing
    /// is deleted on error.
    pub async fn delete_entry(
        &self,
        entry_id: EntryId,
    ) -> Result<Vec<AccountingLine>, RepositoryError> {
        let txn = self.db.begin().await?;
        let store = SeaOrmLedgerStore::new(&txn);
        let deleted = AccountingLineLedger::new(&store, self.config.clone())
            .delete_entry(entry_id)
            .await?;
        txn.commit().await?;

        info!(%entry_id, lines = deleted.len(), "Accounting entry deleted");
        Ok(deleted)
    }

    /// Sets the reconciliation flag of a line.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` or a database error.
    pub async fn set_reconciled(
        &self,
        line_id: LineId,
        reconciled: bool,
    ) -> Result<AccountingLine, RepositoryError> {
        let txn = self.db.begin().await?;
        let store = SeaOrmLedgerStore::new(&txn);
        let line = AccountingLineLedger::new(&store, self.config.clone())
            .set_reconciled(line_id, reconciled)
            .await?;
        txn.commit().await?;
        Ok(line)
    }

    /// Compares a sub-account's stored balance with its lines.
    ///
    /// The sub-account row stays locked while its lines are read.
    ///
    /// # Errors
    ///
    /// Returns `SubaccountNotFound` or a database error.
    pub async fn audit_subaccount(
        &self,
        subaccount_id: SubaccountId,
    ) -> Result<BalanceAudit, RepositoryError> {
        let txn = self.db.begin().await?;
        let store = SeaOrmLedgerStore::new(&txn);
        let audit = AccountingLineLedger::new(&store, self.config.clone())
            .audit_subaccount(subaccount_id)
            .await?;
        txn.commit().await?;
        Ok(audit)
    }

    /// Audits every sub-account.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub async fn audit_all(&self) -> Result<Vec<BalanceAudit>, RepositoryError> {
        let mut audits = Vec::new();
        for id in self.list_subaccount_ids().await? {
            audits.push(self.audit_subaccount(id).await?);
        }

        let drifting = audits.iter().filter(|a| !a.is_consistent()).count();
        if drifting > 0 {
            warn!(total = audits.len(), drifting, "Balance audit found drift");
        } else {
            info!(total = audits.len(), "Balance audit clean");
        }
        Ok(audits)
    }
}
