//! Accounting line ledger.
//!
//! Keeps every sub-account balance equal to the sum of `debit - credit`
//! over the lines referencing it. Lines are inserted, changed and deleted
//! through this service; each operation persists the line and then applies
//! an incremental [`BalanceDelta`] through [`AccountingLineLedger::apply_delta`],
//! which is the only place balances are written.
//!
//! The service runs its steps one after another against the store. It is
//! all-or-nothing only when the store itself is transactional (see
//! `saldo_db::repositories::line`).

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use saldo_shared::LedgerConfig;
use saldo_shared::types::{EntryId, LineId, SubaccountId};
use tracing::{debug, warn};

use super::balance::BalanceDelta;
use super::error::{LedgerError, LedgerResult};
use super::sanitize::sanitize_line;
use super::store::LedgerStore;
use super::types::{
    AccountingEntry, AccountingLine, BalanceAudit, PeriodBalance, PeriodDrift, PeriodKey,
    SubAccount,
};
use super::validation::{LineValidationError, line_references, validate_line};

/// Owns every balance mutation caused by accounting lines.
pub struct AccountingLineLedger<'a, S: LedgerStore + ?Sized> {
    store: &'a S,
    config: LedgerConfig,
}

impl<'a, S: LedgerStore + ?Sized> AccountingLineLedger<'a, S> {
    /// Creates a ledger over a store.
    #[must_use]
    pub fn new(store: &'a S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Returns a line with default values and the configured currency.
    #[must_use]
    pub fn new_line(&self) -> AccountingLine {
        AccountingLine::new(self.config.default_currency)
    }

    /// Validates a line without touching the store.
    ///
    /// A sanitized copy is checked, so the answer matches what
    /// [`Self::insert_line`] and [`Self::update_line`] decide.
    ///
    /// # Errors
    ///
    /// Returns the first validation rule the line breaks.
    pub fn validate(line: &AccountingLine) -> Result<(), LineValidationError> {
        let mut sanitized = line.clone();
        sanitize_line(&mut sanitized);
        validate_line(&sanitized)
    }

    /// Adds `delta` to a sub-account, dated at `date`.
    ///
    /// The sub-account is always re-loaded from the store. When period
    /// balances are enabled, the period containing `date` is adjusted too.
    ///
    /// # Errors
    ///
    /// Returns `SubaccountNotFound` if the sub-account does not exist, or the
    /// store's error if a save fails.
    pub async fn apply_delta(
        &self,
        subaccount_id: SubaccountId,
        delta: BalanceDelta,
        date: NaiveDate,
    ) -> LedgerResult<SubAccount> {
        let mut subaccount = self
            .store
            .find_subaccount(subaccount_id)
            .await?
            .ok_or(LedgerError::SubaccountNotFound(subaccount_id))?;

        debug!(
            subaccount_id = %subaccount_id,
            debit = %delta.debit,
            credit = %delta.credit,
            %date,
            "Applying balance delta"
        );

        delta.apply_to_subaccount(&mut subaccount);
        self.store.save_subaccount(&subaccount).await?;

        if self.config.track_period_balances {
            let period = PeriodKey::from_date(date);
            let mut balance = self
                .store
                .find_period_balance(subaccount_id, period)
                .await?
                .unwrap_or_else(|| PeriodBalance::empty(subaccount_id, period));
            delta.apply_to_period(&mut balance);
            self.store.save_period_balance(&balance).await?;
        }

        Ok(subaccount)
    }

    /// Inserts a new line and adds its contribution to the sub-account.
    ///
    /// The line is sanitized and validated, the entry and sub-account are
    /// resolved, then the line is written and the balance adjusted at the
    /// entry's posting date.
    ///
    /// # Errors
    ///
    /// Returns a validation error, a reference error if the entry or
    /// sub-account is missing (nothing is written), or a store error.
    pub async fn insert_line(&self, mut line: AccountingLine) -> LedgerResult<AccountingLine> {
        sanitize_line(&mut line);
        validate_line(&line)?;

        let (entry, subaccount_id) = self.resolve(&line).await?;

        self.store.insert_line(&line).await?;
        self.apply_delta(subaccount_id, BalanceDelta::for_insert(&line), entry.posting_date)
            .await?;

        Ok(line)
    }

    /// Replaces a line, given its previous and new state.
    ///
    /// When only the amounts changed, the difference is applied. When the
    /// line moved to another sub-account or entry, the old contribution is
    /// reversed where it was and the new one applied where it is now. When
    /// neither amounts nor references changed, balances are untouched.
    ///
    /// `before` must match the stored line. Replaying a change that was
    /// already applied therefore fails with `StaleLine` instead of adjusting
    /// the balance twice.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `LineMismatch`, `LineNotFound`,
    /// `StaleLine`, a reference error, or a store error.
    pub async fn update_line(
        &self,
        before: &AccountingLine,
        mut after: AccountingLine,
    ) -> LedgerResult<AccountingLine> {
        if before.id != after.id {
            return Err(LedgerError::LineMismatch {
                before: before.id,
                after: after.id,
            });
        }

        sanitize_line(&mut after);
        validate_line(&after)?;

        let stored = self
            .store
            .find_line(before.id)
            .await?
            .ok_or(LedgerError::LineNotFound(before.id))?;
        if !same_posting(&stored, before) {
            return Err(LedgerError::StaleLine(before.id));
        }

        let (new_entry, new_subaccount) = self.resolve(&after).await?;
        let moved =
            before.entry_id != after.entry_id || before.subaccount_id != after.subaccount_id;

        if moved {
            let (old_entry, old_subaccount) = self.resolve(before).await?;
            self.store.update_line(&after).await?;
            self.apply_delta(
                old_subaccount,
                BalanceDelta::for_delete(before),
                old_entry.posting_date,
            )
            .await?;
            self.apply_delta(
                new_subaccount,
                BalanceDelta::for_insert(&after),
                new_entry.posting_date,
            )
            .await?;
            return Ok(after);
        }

        self.store.update_line(&after).await?;
        let delta = BalanceDelta::between(before, &after);
        if !delta.is_zero() {
            self.apply_delta(new_subaccount, delta, new_entry.posting_date)
                .await?;
        }

        Ok(after)
    }

    /// Deletes a line and removes its contribution from the sub-account.
    ///
    /// The contribution removed is the one of the line as currently stored.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound`, a reference error, or a store error.
    pub async fn delete_line(&self, line_id: LineId) -> LedgerResult<AccountingLine> {
        let line = self
            .store
            .find_line(line_id)
            .await?
            .ok_or(LedgerError::LineNotFound(line_id))?;

        let (entry, subaccount_id) = self.resolve(&line).await?;

        self.store.delete_line(line_id).await?;
        self.apply_delta(subaccount_id, BalanceDelta::for_delete(&line), entry.posting_date)
            .await?;

        Ok(line)
    }

    /// Deletes an entry together with its lines.
    ///
    /// Every line goes through [`Self::delete_line`], so each one removes its
    /// contribution before the entry itself is deleted.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, any error of `delete_line`, or a store error.
    pub async fn delete_entry(&self, entry_id: EntryId) -> LedgerResult<Vec<AccountingLine>> {
        if self.store.find_entry(entry_id).await?.is_none() {
            return Err(LedgerError::EntryNotFound(entry_id));
        }

        let mut deleted = Vec::new();
        for line in self.store.lines_for_entry(entry_id).await? {
            deleted.push(self.delete_line(line.id).await?);
        }
        self.store.delete_entry(entry_id).await?;

        debug!(%entry_id, lines = deleted.len(), "Accounting entry deleted");
        Ok(deleted)
    }

    /// Sets the reconciliation flag of a line. Balances are not touched.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` or a store error.
    pub async fn set_reconciled(
        &self,
        line_id: LineId,
        reconciled: bool,
    ) -> LedgerResult<AccountingLine> {
        let mut line = self
            .store
            .find_line(line_id)
            .await?
            .ok_or(LedgerError::LineNotFound(line_id))?;

        if line.reconciled != reconciled {
            line.reconciled = reconciled;
            self.store.update_line(&line).await?;
        }

        Ok(line)
    }

    /// Recomputes a sub-account's balance from its lines and compares it
    /// with the stored one. Nothing is repaired.
    ///
    /// # Errors
    ///
    /// Returns `SubaccountNotFound`, `EntryNotFound` for a line whose entry
    /// is gone, or a store error.
    pub async fn audit_subaccount(
        &self,
        subaccount_id: SubaccountId,
    ) -> LedgerResult<BalanceAudit> {
        let subaccount = self
            .store
            .find_subaccount(subaccount_id)
            .await?
            .ok_or(LedgerError::SubaccountNotFound(subaccount_id))?;
        let lines = self.store.lines_for_subaccount(subaccount_id).await?;

        let computed_balance: Decimal = lines.iter().map(AccountingLine::net_amount).sum();
        let drift = subaccount.balance - computed_balance;

        let period_drifts = if self.config.track_period_balances {
            self.period_drifts(subaccount_id, &lines).await?
        } else {
            Vec::new()
        };

        let audit = BalanceAudit {
            subaccount_id,
            code: subaccount.code,
            line_count: lines.len(),
            stored_balance: subaccount.balance,
            computed_balance,
            drift,
            period_drifts,
        };

        if !audit.is_consistent() {
            warn!(
                subaccount_id = %subaccount_id,
                code = %audit.code,
                drift = %audit.drift,
                drifting_periods = audit.period_drifts.len(),
                "Sub-account balance drift detected"
            );
        }

        Ok(audit)
    }

    async fn period_drifts(
        &self,
        subaccount_id: SubaccountId,
        lines: &[AccountingLine],
    ) -> LedgerResult<Vec<PeriodDrift>> {
        let mut dates: HashMap<EntryId, NaiveDate> = HashMap::new();
        let mut computed: HashMap<PeriodKey, Decimal> = HashMap::new();

        for line in lines {
            let entry_id = line.entry_id.ok_or(LineValidationError::MissingEntry)?;
            let date = match dates.get(&entry_id) {
                Some(date) => *date,
                None => {
                    let entry = self
                        .store
                        .find_entry(entry_id)
                        .await?
                        .ok_or(LedgerError::EntryNotFound(entry_id))?;
                    dates.insert(entry_id, entry.posting_date);
                    entry.posting_date
                }
            };
            *computed.entry(PeriodKey::from_date(date)).or_default() += line.net_amount();
        }

        let mut stored: HashMap<PeriodKey, Decimal> = self
            .store
            .list_period_balances(subaccount_id)
            .await?
            .into_iter()
            .map(|p| (p.period, p.balance))
            .collect();

        let mut drifts = Vec::new();
        for (period, computed_balance) in computed {
            let stored_balance = stored.remove(&period).unwrap_or_default();
            if stored_balance != computed_balance {
                drifts.push(PeriodDrift {
                    period,
                    stored_balance,
                    computed_balance,
                });
            }
        }
        for (period, stored_balance) in stored {
            if !stored_balance.is_zero() {
                drifts.push(PeriodDrift {
                    period,
                    stored_balance,
                    computed_balance: Decimal::ZERO,
                });
            }
        }
        drifts.sort_by_key(|d| d.period);

        Ok(drifts)
    }

    /// Loads the entry and checks the sub-account of a line, including that
    /// the line carries the sub-account's code.
    async fn resolve(
        &self,
        line: &AccountingLine,
    ) -> LedgerResult<(AccountingEntry, SubaccountId)> {
        let (entry_id, subaccount_id) = line_references(line)?;

        let entry = self
            .store
            .find_entry(entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;

        let subaccount = self
            .store
            .find_subaccount(subaccount_id)
            .await?
            .ok_or(LedgerError::SubaccountNotFound(subaccount_id))?;
        if subaccount.code != line.subaccount_code {
            return Err(LedgerError::SubaccountCodeMismatch {
                subaccount_id,
                expected: subaccount.code,
                actual: line.subaccount_code.clone(),
            });
        }

        Ok((entry, subaccount_id))
    }
}

/// Returns true if two states of a line contribute identically to balances.
fn same_posting(a: &AccountingLine, b: &AccountingLine) -> bool {
    a.entry_id == b.entry_id
        && a.subaccount_id == b.subaccount_id
        && a.debit == b.debit
        && a.credit == b.credit
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use saldo_shared::types::CurrencyCode;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::ledger::memory::InMemoryLedgerStore;
    use crate::ledger::validation::CONCEPT_MAX_LEN;

    struct Fixture {
        store: InMemoryLedgerStore,
        entry: AccountingEntry,
        bank: SubAccount,
    }

    fn entry_on(date: NaiveDate, number: i64) -> AccountingEntry {
        AccountingEntry {
            id: EntryId::new(),
            number,
            posting_date: date,
            concept: format!("Entry {number}"),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture(opening: Decimal) -> Fixture {
        let store = InMemoryLedgerStore::new();
        let entry = entry_on(date(2024, 1, 15), 1);
        let bank = SubAccount::new(SubaccountId::new(), "5720000001", "Bank")
            .with_totals(opening, Decimal::ZERO);
        store.add_entry(entry.clone());
        store.add_subaccount(bank.clone());
        Fixture { store, entry, bank }
    }

    fn ledger(store: &InMemoryLedgerStore) -> AccountingLineLedger<'_, InMemoryLedgerStore> {
        AccountingLineLedger::new(store, LedgerConfig::default())
    }

    fn line_for(f: &Fixture, debit: Decimal, credit: Decimal) -> AccountingLine {
        AccountingLine::new(CurrencyCode::EUR)
            .posted_to(f.entry.id, &f.bank)
            .with_concept("Customer payment")
            .with_amounts(debit, credit)
    }

    fn balance(f: &Fixture) -> Decimal {
        f.store.subaccount(f.bank.id).unwrap().balance
    }

    #[tokio::test]
    async fn test_insert_change_delete_walkthrough() {
        let f = fixture(dec!(500));
        let ledger = ledger(&f.store);

        let inserted = ledger
            .insert_line(line_for(&f, dec!(100), dec!(0)))
            .await
            .unwrap();
        assert_eq!(balance(&f), dec!(600));

        let mut changed = inserted.clone();
        changed.debit = dec!(40);
        ledger.update_line(&inserted, changed).await.unwrap();
        assert_eq!(balance(&f), dec!(540));

        ledger.delete_line(inserted.id).await.unwrap();
        assert_eq!(balance(&f), dec!(500));
        assert_eq!(f.store.line_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_line_rejected_without_balance_change() {
        let f = fixture(dec!(500));
        let err = ledger(&f.store)
            .insert_line(line_for(&f, dec!(0), dec!(0)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Validation(LineValidationError::ZeroAmount)
        ));
        assert_eq!(balance(&f), dec!(500));
        assert_eq!(f.store.line_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_subaccount_is_reference_error() {
        let f = fixture(dec!(500));
        let ghost = SubAccount::new(SubaccountId::new(), "9999999999", "Ghost");
        let line = AccountingLine::new(CurrencyCode::EUR)
            .posted_to(f.entry.id, &ghost)
            .with_concept("Nowhere")
            .with_amounts(dec!(10), dec!(0));

        let err = ledger(&f.store).insert_line(line).await.unwrap_err();

        assert!(matches!(err, LedgerError::SubaccountNotFound(id) if id == ghost.id));
        assert!(err.is_reference_error());
        assert_eq!(balance(&f), dec!(500));
        assert_eq!(f.store.line_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_entry_is_reference_error() {
        let f = fixture(Decimal::ZERO);
        let mut line = line_for(&f, dec!(10), dec!(0));
        let missing = EntryId::new();
        line.entry_id = Some(missing);

        let err = ledger(&f.store).insert_line(line).await.unwrap_err();

        assert!(matches!(err, LedgerError::EntryNotFound(id) if id == missing));
        assert_eq!(balance(&f), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_insert_sanitizes_concept() {
        let f = fixture(Decimal::ZERO);
        let mut line = line_for(&f, dec!(1), dec!(0));
        line.concept = "  <script>  ".into();

        let inserted = ledger(&f.store).insert_line(line).await.unwrap();

        assert_eq!(inserted.concept, "&lt;script&gt;");
        assert_eq!(f.store.line(inserted.id).unwrap().concept, "&lt;script&gt;");
    }

    #[test]
    fn test_validate_checks_the_sanitized_concept() {
        let f = fixture(Decimal::ZERO);
        let mut blank = line_for(&f, dec!(1), dec!(0));
        blank.concept = "   ".into();
        let mut escaped = line_for(&f, dec!(1), dec!(0));
        escaped.concept = "<".repeat(CONCEPT_MAX_LEN);

        for line in [blank, escaped] {
            let err = AccountingLineLedger::<InMemoryLedgerStore>::validate(&line).unwrap_err();
            assert!(matches!(err, LineValidationError::ConceptLength { .. }));
        }
    }

    #[tokio::test]
    async fn test_empty_subaccount_code_rejected() {
        let f = fixture(dec!(500));
        let mut line = line_for(&f, dec!(10), dec!(0));
        line.subaccount_code = String::new();

        let err = ledger(&f.store).insert_line(line).await.unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Validation(LineValidationError::MissingSubaccountCode)
        ));
        assert_eq!(balance(&f), dec!(500));
        assert_eq!(f.store.line_count(), 0);
    }

    #[tokio::test]
    async fn test_code_of_another_subaccount_rejected() {
        let f = fixture(dec!(500));
        let cash = SubAccount::new(SubaccountId::new(), "5700000001", "Cash");
        f.store.add_subaccount(cash.clone());
        let mut line = line_for(&f, dec!(10), dec!(0));
        line.subaccount_code = cash.code.clone();

        let err = ledger(&f.store).insert_line(line).await.unwrap_err();

        assert!(matches!(
            err,
            LedgerError::SubaccountCodeMismatch { subaccount_id, ref expected, ref actual }
                if subaccount_id == f.bank.id && expected == "5720000001" && actual == "5700000001"
        ));
        assert_eq!(balance(&f), dec!(500));
        assert_eq!(f.store.subaccount(cash.id).unwrap().balance, Decimal::ZERO);
        assert_eq!(f.store.line_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_entry_reverses_every_line() {
        let f = fixture(dec!(500));
        let ledger = ledger(&f.store);
        ledger
            .insert_line(line_for(&f, dec!(100), dec!(0)))
            .await
            .unwrap();
        ledger
            .insert_line(line_for(&f, dec!(0), dec!(30)))
            .await
            .unwrap();
        assert_eq!(balance(&f), dec!(570));

        let deleted = ledger.delete_entry(f.entry.id).await.unwrap();

        assert_eq!(deleted.len(), 2);
        assert_eq!(balance(&f), dec!(500));
        assert_eq!(f.store.line_count(), 0);
        assert!(!f.store.has_entry(f.entry.id));
        let audit = ledger.audit_subaccount(f.bank.id).await.unwrap();
        assert_eq!(audit.line_count, 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_entry() {
        let f = fixture(Decimal::ZERO);
        let missing = EntryId::new();

        let err = ledger(&f.store).delete_entry(missing).await.unwrap_err();

        assert!(matches!(err, LedgerError::EntryNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_concept_only_change_leaves_balance() {
        let f = fixture(Decimal::ZERO);
        let ledger = ledger(&f.store);
        let inserted = ledger
            .insert_line(line_for(&f, dec!(75), dec!(0)))
            .await
            .unwrap();

        let mut renamed = inserted.clone();
        renamed.concept = "Corrected description".into();
        let updated = ledger.update_line(&inserted, renamed).await.unwrap();

        assert_eq!(updated.concept, "Corrected description");
        assert_eq!(balance(&f), dec!(75));
    }

    #[tokio::test]
    async fn test_credit_change() {
        let f = fixture(Decimal::ZERO);
        let ledger = ledger(&f.store);
        let inserted = ledger
            .insert_line(line_for(&f, dec!(0), dec!(30)))
            .await
            .unwrap();
        assert_eq!(balance(&f), dec!(-30));

        let mut changed = inserted.clone();
        changed.credit = dec!(45.50);
        ledger.update_line(&inserted, changed).await.unwrap();

        let bank = f.store.subaccount(f.bank.id).unwrap();
        assert_eq!(bank.credit, dec!(45.50));
        assert_eq!(bank.balance, dec!(-45.50));
    }

    #[tokio::test]
    async fn test_replayed_change_is_stale() {
        let f = fixture(dec!(500));
        let ledger = ledger(&f.store);
        let inserted = ledger
            .insert_line(line_for(&f, dec!(100), dec!(0)))
            .await
            .unwrap();

        let mut changed = inserted.clone();
        changed.debit = dec!(40);
        ledger.update_line(&inserted, changed.clone()).await.unwrap();
        let err = ledger.update_line(&inserted, changed).await.unwrap_err();

        assert!(matches!(err, LedgerError::StaleLine(id) if id == inserted.id));
        assert_eq!(balance(&f), dec!(540));
    }

    #[tokio::test]
    async fn test_update_rejects_mismatched_pair() {
        let f = fixture(Decimal::ZERO);
        let ledger = ledger(&f.store);
        let inserted = ledger
            .insert_line(line_for(&f, dec!(1), dec!(0)))
            .await
            .unwrap();
        let other = line_for(&f, dec!(2), dec!(0));

        let err = ledger.update_line(&inserted, other).await.unwrap_err();
        assert!(matches!(err, LedgerError::LineMismatch { .. }));
    }

    #[tokio::test]
    async fn test_invalid_update_changes_nothing() {
        let f = fixture(Decimal::ZERO);
        let ledger = ledger(&f.store);
        let inserted = ledger
            .insert_line(line_for(&f, dec!(20), dec!(0)))
            .await
            .unwrap();

        let mut zeroed = inserted.clone();
        zeroed.debit = Decimal::ZERO;
        let err = ledger.update_line(&inserted, zeroed).await.unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Validation(LineValidationError::ZeroAmount)
        ));
        assert_eq!(balance(&f), dec!(20));
        assert_eq!(f.store.line(inserted.id).unwrap().debit, dec!(20));
    }

    #[tokio::test]
    async fn test_moving_line_between_subaccounts() {
        let f = fixture(Decimal::ZERO);
        let cash = SubAccount::new(SubaccountId::new(), "5700000001", "Cash");
        f.store.add_subaccount(cash.clone());
        let ledger = ledger(&f.store);

        let inserted = ledger
            .insert_line(line_for(&f, dec!(80), dec!(0)))
            .await
            .unwrap();

        let mut moved = inserted.clone();
        moved.subaccount_id = Some(cash.id);
        moved.subaccount_code.clone_from(&cash.code);
        moved.debit = dec!(90);
        ledger.update_line(&inserted, moved).await.unwrap();

        assert_eq!(balance(&f), Decimal::ZERO);
        assert_eq!(f.store.subaccount(cash.id).unwrap().balance, dec!(90));
    }

    #[tokio::test]
    async fn test_moving_line_between_entries_moves_period() {
        let f = fixture(Decimal::ZERO);
        let march = entry_on(date(2024, 3, 2), 2);
        f.store.add_entry(march.clone());
        let ledger = ledger(&f.store);

        let inserted = ledger
            .insert_line(line_for(&f, dec!(10), dec!(0)))
            .await
            .unwrap();
        let mut moved = inserted.clone();
        moved.entry_id = Some(march.id);
        ledger.update_line(&inserted, moved).await.unwrap();

        let january = PeriodKey { year: 2024, month: 1 };
        let march_key = PeriodKey { year: 2024, month: 3 };
        let jan_balance = f
            .store
            .find_period_balance(f.bank.id, january)
            .await
            .unwrap()
            .unwrap();
        let mar_balance = f
            .store
            .find_period_balance(f.bank.id, march_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(jan_balance.balance, Decimal::ZERO);
        assert_eq!(mar_balance.balance, dec!(10));
        assert_eq!(balance(&f), dec!(10));
    }

    #[tokio::test]
    async fn test_period_balances_follow_entry_date() {
        let f = fixture(Decimal::ZERO);
        let february = entry_on(date(2024, 2, 29), 2);
        f.store.add_entry(february.clone());
        let ledger = ledger(&f.store);

        ledger
            .insert_line(line_for(&f, dec!(100), dec!(0)))
            .await
            .unwrap();
        let mut feb_line = line_for(&f, dec!(0), dec!(30));
        feb_line.entry_id = Some(february.id);
        ledger.insert_line(feb_line).await.unwrap();

        let periods = f.store.list_period_balances(f.bank.id).await.unwrap();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].period, PeriodKey { year: 2024, month: 1 });
        assert_eq!(periods[0].balance, dec!(100));
        assert_eq!(periods[1].period, PeriodKey { year: 2024, month: 2 });
        assert_eq!(periods[1].credit, dec!(30));
        assert_eq!(periods[1].balance, dec!(-30));
        assert_eq!(balance(&f), dec!(70));
    }

    #[tokio::test]
    async fn test_period_tracking_can_be_disabled() {
        let f = fixture(Decimal::ZERO);
        let config = LedgerConfig {
            track_period_balances: false,
            ..LedgerConfig::default()
        };
        let ledger = AccountingLineLedger::new(&f.store, config);

        ledger
            .insert_line(line_for(&f, dec!(5), dec!(0)))
            .await
            .unwrap();

        assert!(f.store.list_period_balances(f.bank.id).await.unwrap().is_empty());
        assert_eq!(balance(&f), dec!(5));
    }

    #[tokio::test]
    async fn test_reconciling_leaves_balance() {
        let f = fixture(Decimal::ZERO);
        let ledger = ledger(&f.store);
        let inserted = ledger
            .insert_line(line_for(&f, dec!(12), dec!(0)))
            .await
            .unwrap();

        let reconciled = ledger.set_reconciled(inserted.id, true).await.unwrap();

        assert!(reconciled.reconciled);
        assert!(f.store.line(inserted.id).unwrap().reconciled);
        assert_eq!(balance(&f), dec!(12));
    }

    #[tokio::test]
    async fn test_delete_unknown_line() {
        let f = fixture(Decimal::ZERO);
        let missing = LineId::new();
        let err = ledger(&f.store).delete_line(missing).await.unwrap_err();
        assert!(matches!(err, LedgerError::LineNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_new_line_uses_configured_currency() {
        let store = InMemoryLedgerStore::new();
        let config = LedgerConfig {
            default_currency: CurrencyCode::USD,
            ..LedgerConfig::default()
        };
        let line = AccountingLineLedger::new(&store, config).new_line();
        assert_eq!(line.currency, CurrencyCode::USD);
    }

    #[tokio::test]
    async fn test_audit_consistent_ledger() {
        let f = fixture(Decimal::ZERO);
        let ledger = ledger(&f.store);
        ledger
            .insert_line(line_for(&f, dec!(100), dec!(0)))
            .await
            .unwrap();
        ledger
            .insert_line(line_for(&f, dec!(0), dec!(25)))
            .await
            .unwrap();

        let audit = ledger.audit_subaccount(f.bank.id).await.unwrap();

        assert!(audit.is_consistent());
        assert_eq!(audit.line_count, 2);
        assert_eq!(audit.computed_balance, dec!(75));
        assert_eq!(audit.stored_balance, dec!(75));
    }

    /// Store that fails sub-account saves once armed.
    struct FlakyStore {
        inner: InMemoryLedgerStore,
        fail_saves: AtomicBool,
    }

    #[async_trait]
    impl LedgerStore for FlakyStore {
        async fn find_entry(&self, id: EntryId) -> LedgerResult<Option<AccountingEntry>> {
            self.inner.find_entry(id).await
        }
        async fn delete_entry(&self, id: EntryId) -> LedgerResult<()> {
            self.inner.delete_entry(id).await
        }
        async fn find_subaccount(&self, id: SubaccountId) -> LedgerResult<Option<SubAccount>> {
            self.inner.find_subaccount(id).await
        }
        async fn save_subaccount(&self, subaccount: &SubAccount) -> LedgerResult<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(LedgerError::Persistence("connection reset".into()));
            }
            self.inner.save_subaccount(subaccount).await
        }
        async fn find_period_balance(
            &self,
            id: SubaccountId,
            period: PeriodKey,
        ) -> LedgerResult<Option<PeriodBalance>> {
            self.inner.find_period_balance(id, period).await
        }
        async fn save_period_balance(&self, balance: &PeriodBalance) -> LedgerResult<()> {
            self.inner.save_period_balance(balance).await
        }
        async fn list_period_balances(
            &self,
            id: SubaccountId,
        ) -> LedgerResult<Vec<PeriodBalance>> {
            self.inner.list_period_balances(id).await
        }
        async fn find_line(&self, id: LineId) -> LedgerResult<Option<AccountingLine>> {
            self.inner.find_line(id).await
        }
        async fn insert_line(&self, line: &AccountingLine) -> LedgerResult<()> {
            self.inner.insert_line(line).await
        }
        async fn update_line(&self, line: &AccountingLine) -> LedgerResult<()> {
            self.inner.update_line(line).await
        }
        async fn delete_line(&self, id: LineId) -> LedgerResult<()> {
            self.inner.delete_line(id).await
        }
        async fn lines_for_subaccount(
            &self,
            id: SubaccountId,
        ) -> LedgerResult<Vec<AccountingLine>> {
            self.inner.lines_for_subaccount(id).await
        }
        async fn lines_for_entry(&self, id: EntryId) -> LedgerResult<Vec<AccountingLine>> {
            self.inner.lines_for_entry(id).await
        }
    }

    #[tokio::test]
    async fn test_failed_balance_save_leaves_detectable_drift() {
        let f = fixture(Decimal::ZERO);
        let store = FlakyStore {
            inner: f.store,
            fail_saves: AtomicBool::new(true),
        };
        let ledger = AccountingLineLedger::new(&store, LedgerConfig::default());
        let line = AccountingLine::new(CurrencyCode::EUR)
            .posted_to(f.entry.id, &f.bank)
            .with_concept("Half-applied")
            .with_amounts(dec!(40), dec!(0));

        let err = ledger.insert_line(line).await.unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)));
        assert_eq!(store.inner.line_count(), 1);

        store.fail_saves.store(false, Ordering::SeqCst);
        let audit = ledger.audit_subaccount(f.bank.id).await.unwrap();

        assert!(!audit.is_consistent());
        assert_eq!(audit.stored_balance, Decimal::ZERO);
        assert_eq!(audit.computed_balance, dec!(40));
        assert_eq!(audit.drift, dec!(-40));
        assert_eq!(audit.period_drifts.len(), 1);
        assert_eq!(audit.period_drifts[0].computed_balance, dec!(40));
    }
}
