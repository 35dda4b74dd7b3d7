//! Property-based tests for AccountingLineLedger.
//!
//! - Property 1: Balance equals the sum of persisted lines
//! - Property 2: Period balances partition the total
//! - Property 3: Rejected lines never move a balance

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use saldo_shared::LedgerConfig;
use saldo_shared::types::{CurrencyCode, EntryId, SubaccountId};

use super::memory::InMemoryLedgerStore;
use super::service::AccountingLineLedger;
use super::store::LedgerStore;
use super::types::{AccountingEntry, AccountingLine, SubAccount};

/// A mutation applied to the ledger.
#[derive(Debug, Clone)]
enum Op {
    Insert { debit: Decimal, credit: Decimal, entry: usize },
    Change { index: usize, debit: Decimal, credit: Decimal },
    Delete { index: usize },
}

/// Strategy for a non-negative amount (0.00 to 10,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a (debit, credit) pair that is never both zero.
fn amounts() -> impl Strategy<Value = (Decimal, Decimal)> {
    (amount(), amount()).prop_map(|(debit, credit)| {
        if debit.is_zero() && credit.is_zero() {
            (Decimal::ONE, Decimal::ZERO)
        } else {
            (debit, credit)
        }
    })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (amounts(), 0usize..3)
            .prop_map(|((debit, credit), entry)| Op::Insert { debit, credit, entry }),
        2 => (any::<usize>(), amounts())
            .prop_map(|(index, (debit, credit))| Op::Change { index, debit, credit }),
        1 => any::<usize>().prop_map(|index| Op::Delete { index }),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn entries() -> Vec<AccountingEntry> {
    [(2024, 1, 10), (2024, 2, 20), (2025, 1, 5)]
        .into_iter()
        .enumerate()
        .map(|(i, (y, m, d))| AccountingEntry {
            id: EntryId::new(),
            number: i64::try_from(i).unwrap() + 1,
            posting_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            concept: "Generated".to_string(),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property 1 and 2: after any sequence of inserts, changes and deletes,
    /// the balance equals the sum of `debit - credit` over the persisted
    /// lines, and the period balances add up to it.
    #[test]
    fn prop_balance_equals_sum_of_lines(ops in prop::collection::vec(op_strategy(), 1..40)) {
        runtime().block_on(async {
            let store = InMemoryLedgerStore::new();
            let entries = entries();
            for entry in &entries {
                store.add_entry(entry.clone());
            }
            let subaccount = SubAccount::new(SubaccountId::new(), "4300000001", "Customer");
            store.add_subaccount(subaccount.clone());
            let ledger = AccountingLineLedger::new(&store, LedgerConfig::default());

            let mut live: Vec<AccountingLine> = Vec::new();
            for op in ops {
                match op {
                    Op::Insert { debit, credit, entry } => {
                        let line = AccountingLine::new(CurrencyCode::EUR)
                            .posted_to(entries[entry].id, &subaccount)
                            .with_concept("Generated line")
                            .with_amounts(debit, credit);
                        live.push(ledger.insert_line(line).await.unwrap());
                    }
                    Op::Change { index, debit, credit } => {
                        if live.is_empty() {
                            continue;
                        }
                        let slot = index % live.len();
                        let before = live[slot].clone();
                        let after = before.clone().with_amounts(debit, credit);
                        live[slot] = ledger.update_line(&before, after).await.unwrap();
                    }
                    Op::Delete { index } => {
                        if live.is_empty() {
                            continue;
                        }
                        let removed = live.remove(index % live.len());
                        ledger.delete_line(removed.id).await.unwrap();
                    }
                }
            }

            let expected: Decimal = live.iter().map(AccountingLine::net_amount).sum();
            let stored = store.subaccount(subaccount.id).unwrap();
            prop_assert_eq!(stored.balance, expected);
            prop_assert_eq!(stored.balance, stored.debit - stored.credit);
            prop_assert_eq!(store.line_count(), live.len());

            let periods = store.list_period_balances(subaccount.id).await.unwrap();
            let period_total: Decimal = periods.iter().map(|p| p.balance).sum();
            prop_assert_eq!(period_total, expected);

            let audit = ledger.audit_subaccount(subaccount.id).await.unwrap();
            prop_assert!(audit.is_consistent());
            Ok(())
        })?;
    }

    /// Property 3: a line with an invalid concept never changes the balance.
    #[test]
    fn prop_rejected_lines_leave_balance(
        (debit, credit) in amounts(),
        extra in 1usize..50,
    ) {
        runtime().block_on(async {
            let store = InMemoryLedgerStore::new();
            let entry = entries().remove(0);
            store.add_entry(entry.clone());
            let subaccount = SubAccount::new(SubaccountId::new(), "4000000001", "Supplier")
                .with_totals(Decimal::new(50_000, 2), Decimal::ZERO);
            store.add_subaccount(subaccount.clone());
            let ledger = AccountingLineLedger::new(&store, LedgerConfig::default());

            let line = AccountingLine::new(CurrencyCode::EUR)
                .posted_to(entry.id, &subaccount)
                .with_concept("x".repeat(255 + extra))
                .with_amounts(debit, credit);

            prop_assert!(ledger.insert_line(line).await.is_err());
            prop_assert_eq!(store.subaccount(subaccount.id).unwrap().balance, subaccount.balance);
            prop_assert_eq!(store.line_count(), 0);
            Ok(())
        })?;
    }
}
