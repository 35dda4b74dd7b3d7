//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod ledger_store;
pub mod line;

pub use ledger_store::SeaOrmLedgerStore;
pub use line::{
    AccountingLineRepository, CreateEntryInput, CreateSubaccountInput, RepositoryError,
};
