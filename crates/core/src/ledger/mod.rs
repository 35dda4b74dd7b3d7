//! Sub-account balance ledger.
//!
//! This module implements the accounting line ledger:
//! - Domain types for entries, sub-accounts, period balances and lines
//! - Sanitization and validation of lines
//! - Balance deltas
//! - The storage collaborator trait and an in-memory store
//! - The ledger service that owns every balance mutation

pub mod balance;
pub mod error;
pub mod memory;
pub mod sanitize;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;

pub use balance::BalanceDelta;
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use memory::InMemoryLedgerStore;
pub use service::AccountingLineLedger;
pub use store::LedgerStore;
pub use types::{
    AccountingEntry, AccountingLine, BalanceAudit, PeriodBalance, PeriodDrift, PeriodKey,
    SubAccount,
};
pub use validation::{
    AMOUNT_MAX_SCALE, CONCEPT_MAX_LEN, CONCEPT_MIN_LEN, LineValidationError, validate_line,
};
