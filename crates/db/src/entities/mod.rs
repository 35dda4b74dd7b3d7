//! `SeaORM` entity definitions.

pub mod accounting_entries;
pub mod accounting_lines;
pub mod subaccount_period_balances;
pub mod subaccounts;

/// Re-exports of every entity.
pub mod prelude {
    pub use super::accounting_entries::Entity as AccountingEntries;
    pub use super::accounting_lines::Entity as AccountingLines;
    pub use super::subaccount_period_balances::Entity as SubaccountPeriodBalances;
    pub use super::subaccounts::Entity as Subaccounts;
}
