//! Core ledger logic for Saldo.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Domain types, validation rules and balance propagation live here; storage is
//! reached only through the [`ledger::LedgerStore`] trait.
//!
//! # Modules
//!
//! - `ledger` - Accounting lines and sub-account balance propagation

pub mod ledger;
