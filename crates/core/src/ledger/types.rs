//! Ledger domain types.
//!
//! An [`AccountingEntry`] (asiento) groups [`AccountingLine`]s (partidas).
//! Each line moves money in or out of one [`SubAccount`] (subcuenta).

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use saldo_shared::types::{CurrencyCode, EntryId, LineId, SubaccountId};
use serde::{Deserialize, Serialize};

/// A journal entry. Its posting date dates every balance adjustment made
/// by its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingEntry {
    /// Unique identifier.
    pub id: EntryId,
    /// Sequential entry number within the fiscal year.
    pub number: i64,
    /// Posting date.
    pub posting_date: NaiveDate,
    /// Entry description.
    pub concept: String,
}

/// A sub-account with its running totals.
///
/// `balance` is always `debit - credit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAccount {
    /// Unique identifier.
    pub id: SubaccountId,
    /// Sub-account code (e.g. "4300000001").
    pub code: String,
    /// Human readable description.
    pub description: String,
    /// Cumulative debit.
    pub debit: Decimal,
    /// Cumulative credit.
    pub credit: Decimal,
    /// Net balance.
    pub balance: Decimal,
}

impl SubAccount {
    /// Creates a sub-account with zero totals.
    #[must_use]
    pub fn new(id: SubaccountId, code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            description: description.into(),
            debit: Decimal::ZERO,
            credit: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }

    /// Sets opening totals, recomputing the balance.
    #[must_use]
    pub fn with_totals(mut self, debit: Decimal, credit: Decimal) -> Self {
        self.debit = debit;
        self.credit = credit;
        self.balance = debit - credit;
        self
    }
}

/// A calendar month of posting dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
}

impl PeriodKey {
    /// Returns the period containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Totals of one sub-account restricted to one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBalance {
    /// The sub-account.
    pub subaccount_id: SubaccountId,
    /// The period.
    pub period: PeriodKey,
    /// Debit posted in the period.
    pub debit: Decimal,
    /// Credit posted in the period.
    pub credit: Decimal,
    /// `debit - credit`.
    pub balance: Decimal,
}

impl PeriodBalance {
    /// Creates an empty period balance.
    #[must_use]
    pub fn empty(subaccount_id: SubaccountId, period: PeriodKey) -> Self {
        Self {
            subaccount_id,
            period,
            debit: Decimal::ZERO,
            credit: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }
}

/// One debit/credit movement against a sub-account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingLine {
    /// Unique identifier.
    pub id: LineId,
    /// Owning accounting entry.
    pub entry_id: Option<EntryId>,
    /// Referenced sub-account.
    pub subaccount_id: Option<SubaccountId>,
    /// Code of the referenced sub-account.
    pub subaccount_code: String,
    /// Counterpart sub-account.
    pub counterpart_id: Option<SubaccountId>,
    /// Code of the counterpart sub-account.
    pub counterpart_code: Option<String>,
    /// Line description, 1-255 characters.
    pub concept: String,
    /// Debit amount (non-negative).
    pub debit: Decimal,
    /// Credit amount (non-negative).
    pub credit: Decimal,
    /// Tax base amount.
    pub tax_base: Decimal,
    /// VAT percentage.
    pub vat: Decimal,
    /// Equivalence surcharge percentage.
    pub surcharge: Decimal,
    /// Currency the line was posted in.
    pub currency: CurrencyCode,
    /// Conversion rate to the accounting currency.
    pub conversion_rate: Decimal,
    /// Tax identifier (CIF/NIF) of the counterparty.
    pub tax_id: Option<String>,
    /// Source document reference.
    pub document: Option<String>,
    /// Document series code.
    pub series_code: Option<String>,
    /// Invoice reference.
    pub invoice: Option<String>,
    /// Visual order inside the entry.
    pub order: i32,
    /// Reconciliation flag (punteada).
    pub reconciled: bool,
}

impl AccountingLine {
    /// Creates an empty line with default values.
    #[must_use]
    pub fn new(currency: CurrencyCode) -> Self {
        Self {
            id: LineId::new(),
            entry_id: None,
            subaccount_id: None,
            subaccount_code: String::new(),
            counterpart_id: None,
            counterpart_code: None,
            concept: String::new(),
            debit: Decimal::ZERO,
            credit: Decimal::ZERO,
            tax_base: Decimal::ZERO,
            vat: Decimal::ZERO,
            surcharge: Decimal::ZERO,
            currency,
            conversion_rate: Decimal::ONE,
            tax_id: None,
            document: None,
            series_code: None,
            invoice: None,
            order: 0,
            reconciled: false,
        }
    }

    /// Attaches the line to an entry and a sub-account.
    #[must_use]
    pub fn posted_to(mut self, entry_id: EntryId, subaccount: &SubAccount) -> Self {
        self.entry_id = Some(entry_id);
        self.subaccount_id = Some(subaccount.id);
        self.subaccount_code.clone_from(&subaccount.code);
        self
    }

    /// Sets the concept.
    #[must_use]
    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = concept.into();
        self
    }

    /// Sets debit and credit.
    #[must_use]
    pub fn with_amounts(mut self, debit: Decimal, credit: Decimal) -> Self {
        self.debit = debit;
        self.credit = credit;
        self
    }

    /// Returns the line's contribution to its sub-account balance.
    #[must_use]
    pub fn net_amount(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Result of comparing a stored balance against its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAudit {
    /// The audited sub-account.
    pub subaccount_id: SubaccountId,
    /// Its code.
    pub code: String,
    /// Number of lines referencing it.
    pub line_count: usize,
    /// Balance stored on the sub-account.
    pub stored_balance: Decimal,
    /// Sum of `debit - credit` over its lines.
    pub computed_balance: Decimal,
    /// `stored_balance - computed_balance`.
    pub drift: Decimal,
    /// Periods whose stored balance disagrees with their lines.
    pub period_drifts: Vec<PeriodDrift>,
}

impl BalanceAudit {
    /// Returns true when neither the total nor any period drifts.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero() && self.period_drifts.is_empty()
    }
}

/// A period whose stored balance disagrees with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDrift {
    /// The period.
    pub period: PeriodKey,
    /// Stored period balance (zero when no row exists).
    pub stored_balance: Decimal,
    /// Sum over the lines dated in the period.
    pub computed_balance: Decimal,
}
