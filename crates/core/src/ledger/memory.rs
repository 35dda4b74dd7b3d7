//! In-memory [`LedgerStore`].
//!
//! Writes are applied one at a time with no transaction around them, so a
//! failure between the line write and the balance write leaves a drift that
//! [`super::AccountingLineLedger::audit_subaccount`] reports.

use async_trait::async_trait;
use dashmap::DashMap;
use saldo_shared::types::{EntryId, LineId, SubaccountId};

use super::error::{LedgerError, LedgerResult};
use super::store::LedgerStore;
use super::types::{AccountingEntry, AccountingLine, PeriodBalance, PeriodKey, SubAccount};

/// Ledger store holding everything in concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    entries: DashMap<EntryId, AccountingEntry>,
    subaccounts: DashMap<SubaccountId, SubAccount>,
    periods: DashMap<(SubaccountId, PeriodKey), PeriodBalance>,
    lines: DashMap<LineId, AccountingLine>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an accounting entry.
    pub fn add_entry(&self, entry: AccountingEntry) {
        self.entries.insert(entry.id, entry);
    }

    /// Adds or replaces a sub-account.
    pub fn add_subaccount(&self, subaccount: SubAccount) {
        self.subaccounts.insert(subaccount.id, subaccount);
    }

    /// Returns a copy of a sub-account.
    #[must_use]
    pub fn subaccount(&self, id: SubaccountId) -> Option<SubAccount> {
        self.subaccounts.get(&id).map(|s| s.clone())
    }

    /// Returns a copy of a line.
    #[must_use]
    pub fn line(&self, id: LineId) -> Option<AccountingLine> {
        self.lines.get(&id).map(|l| l.clone())
    }

    /// Returns true if the entry exists.
    #[must_use]
    pub fn has_entry(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of stored lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_entry(&self, id: EntryId) -> LedgerResult<Option<AccountingEntry>> {
        Ok(self.entries.get(&id).map(|e| e.clone()))
    }

    async fn find_subaccount(&self, id: SubaccountId) -> LedgerResult<Option<SubAccount>> {
        Ok(self.subaccount(id))
    }

    async fn delete_entry(&self, id: EntryId) -> LedgerResult<()> {
        if self.lines.iter().any(|l| l.entry_id == Some(id)) {
            return Err(LedgerError::persistence(format!(
                "accounting entry {id} still has lines"
            )));
        }
        self.entries
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::EntryNotFound(id))
    }

    async fn save_subaccount(&self, subaccount: &SubAccount) -> LedgerResult<()> {
        let mut stored = self
            .subaccounts
            .get_mut(&subaccount.id)
            .ok_or(LedgerError::SubaccountNotFound(subaccount.id))?;
        *stored = subaccount.clone();
        Ok(())
    }

    async fn find_period_balance(
        &self,
        id: SubaccountId,
        period: PeriodKey,
    ) -> LedgerResult<Option<PeriodBalance>> {
        Ok(self.periods.get(&(id, period)).map(|p| p.clone()))
    }

    async fn save_period_balance(&self, balance: &PeriodBalance) -> LedgerResult<()> {
        self.periods
            .insert((balance.subaccount_id, balance.period), balance.clone());
        Ok(())
    }

    async fn list_period_balances(&self, id: SubaccountId) -> LedgerResult<Vec<PeriodBalance>> {
        let mut balances: Vec<PeriodBalance> = self
            .periods
            .iter()
            .filter(|p| p.subaccount_id == id)
            .map(|p| p.value().clone())
            .collect();
        balances.sort_by_key(|p| p.period);
        Ok(balances)
    }

    async fn find_line(&self, id: LineId) -> LedgerResult<Option<AccountingLine>> {
        Ok(self.line(id))
    }

    async fn insert_line(&self, line: &AccountingLine) -> LedgerResult<()> {
        if self.lines.contains_key(&line.id) {
            return Err(LedgerError::persistence(format!(
                "duplicate accounting line {}",
                line.id
            )));
        }
        self.lines.insert(line.id, line.clone());
        Ok(())
    }

    async fn update_line(&self, line: &AccountingLine) -> LedgerResult<()> {
        let mut stored = self
            .lines
            .get_mut(&line.id)
            .ok_or(LedgerError::LineNotFound(line.id))?;
        *stored = line.clone();
        Ok(())
    }

    async fn delete_line(&self, id: LineId) -> LedgerResult<()> {
        self.lines
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::LineNotFound(id))
    }

    async fn lines_for_subaccount(&self, id: SubaccountId) -> LedgerResult<Vec<AccountingLine>> {
        let mut lines: Vec<AccountingLine> = self
            .lines
            .iter()
            .filter(|l| l.subaccount_id == Some(id))
            .map(|l| l.value().clone())
            .collect();
        lines.sort_by_key(|l| (l.order, l.id));
        Ok(lines)
    }

    async fn lines_for_entry(&self, id: EntryId) -> LedgerResult<Vec<AccountingLine>> {
        let mut lines: Vec<AccountingLine> = self
            .lines
            .iter()
            .filter(|l| l.entry_id == Some(id))
            .map(|l| l.value().clone())
            .collect();
        lines.sort_by_key(|l| (l.order, l.id));
        Ok(lines)
    }
}
