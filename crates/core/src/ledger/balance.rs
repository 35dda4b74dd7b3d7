//! Balance deltas: the only way sub-account totals change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{AccountingLine, PeriodBalance, SubAccount};

/// A change to the debit and credit totals of a sub-account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceDelta {
    /// Amount added to the debit total (may be negative).
    pub debit: Decimal,
    /// Amount added to the credit total (may be negative).
    pub credit: Decimal,
}

impl BalanceDelta {
    /// Creates a delta.
    #[must_use]
    pub const fn new(debit: Decimal, credit: Decimal) -> Self {
        Self { debit, credit }
    }

    /// The contribution of a newly persisted line.
    #[must_use]
    pub fn for_insert(line: &AccountingLine) -> Self {
        Self::new(line.debit, line.credit)
    }

    /// Removes the contribution of a deleted line.
    #[must_use]
    pub fn for_delete(line: &AccountingLine) -> Self {
        Self::new(-line.debit, -line.credit)
    }

    /// The difference between two states of the same line.
    #[must_use]
    pub fn between(before: &AccountingLine, after: &AccountingLine) -> Self {
        Self::new(after.debit - before.debit, after.credit - before.credit)
    }

    /// Returns true if applying the delta changes nothing.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.debit.is_zero() && self.credit.is_zero()
    }

    /// Net effect on the balance (`debit - credit`).
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }

    /// Applies the delta to a sub-account.
    pub fn apply_to_subaccount(&self, subaccount: &mut SubAccount) {
        subaccount.debit += self.debit;
        subaccount.credit += self.credit;
        subaccount.balance = subaccount.debit - subaccount.credit;
    }

    /// Applies the delta to a period balance.
    pub fn apply_to_period(&self, period: &mut PeriodBalance) {
        period.debit += self.debit;
        period.credit += self.credit;
        period.balance = period.debit - period.credit;
    }
}
