//! Storage collaborator for the ledger.
//!
//! A store loads and saves entries, sub-accounts, period balances and lines.
//! A write is considered durable once its future resolves successfully.

use async_trait::async_trait;
use saldo_shared::types::{EntryId, LineId, SubaccountId};

use super::error::LedgerResult;
use super::types::{AccountingEntry, AccountingLine, PeriodBalance, PeriodKey, SubAccount};

/// Persistence operations needed by [`super::AccountingLineLedger`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Loads an accounting entry.
    async fn find_entry(&self, id: EntryId) -> LedgerResult<Option<AccountingEntry>>;

    /// Deletes an accounting entry that no longer has lines.
    async fn delete_entry(&self, id: EntryId) -> LedgerResult<()>;

    /// Loads a sub-account. Implementations backed by a database lock the row
    /// for the rest of the surrounding transaction.
    async fn find_subaccount(&self, id: SubaccountId) -> LedgerResult<Option<SubAccount>>;

    /// Saves the totals of an existing sub-account.
    async fn save_subaccount(&self, subaccount: &SubAccount) -> LedgerResult<()>;

    /// Loads the balance of one period.
    async fn find_period_balance(
        &self,
        id: SubaccountId,
        period: PeriodKey,
    ) -> LedgerResult<Option<PeriodBalance>>;

    /// Inserts or replaces a period balance.
    async fn save_period_balance(&self, balance: &PeriodBalance) -> LedgerResult<()>;

    /// Lists every period balance of a sub-account, oldest first.
    async fn list_period_balances(&self, id: SubaccountId) -> LedgerResult<Vec<PeriodBalance>>;

    /// Loads an accounting line. Database-backed implementations lock the row
    /// for the rest of the surrounding transaction.
    async fn find_line(&self, id: LineId) -> LedgerResult<Option<AccountingLine>>;

    /// Inserts a new line.
    async fn insert_line(&self, line: &AccountingLine) -> LedgerResult<()>;

    /// Replaces a stored line.
    async fn update_line(&self, line: &AccountingLine) -> LedgerResult<()>;

    /// Deletes a stored line.
    async fn delete_line(&self, id: LineId) -> LedgerResult<()>;

    /// Lists every line referencing a sub-account.
    async fn lines_for_subaccount(&self, id: SubaccountId) -> LedgerResult<Vec<AccountingLine>>;

    /// Lists every line of an entry, in visual order.
    async fn lines_for_entry(&self, id: EntryId) -> LedgerResult<Vec<AccountingLine>>;
}
