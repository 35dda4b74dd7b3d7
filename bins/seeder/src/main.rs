//! Development data seeder for the Saldo ledger.
//!
//! Creates a customer, a sales and a VAT sub-account, one invoice entry and
//! its three lines. Each step looks for its row first, so a rerun completes
//! an interrupted seed and a finished seed is left as it is.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use saldo_core::ledger::{AccountingEntry, SubAccount};
use saldo_db::AccountingLineRepository;
use saldo_db::repositories::{CreateEntryInput, CreateSubaccountInput};
use saldo_shared::AppConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CUSTOMER_CODE: &str = "4300000001";
const SALES_CODE: &str = "7000000001";
const VAT_CODE: &str = "4770000021";
const ENTRY_NUMBER: i64 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saldo=info,seeder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = saldo_db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let repo = AccountingLineRepository::new(db, config.ledger);

    seed(&repo).await?;
    Ok(())
}

/// Creates whatever part of the seed data is missing and returns the number
/// of lines inserted.
async fn seed(repo: &AccountingLineRepository) -> anyhow::Result<usize> {
    let customer = ensure_subaccount(repo, CUSTOMER_CODE, "Demo customer").await?;
    let sales = ensure_subaccount(repo, SALES_CODE, "Sales of goods").await?;
    let vat = ensure_subaccount(repo, VAT_CODE, "Output VAT 21%").await?;
    let entry = ensure_entry(repo).await?;
    let existing: Vec<i32> = repo
        .lines_for_entry(entry.id)
        .await?
        .iter()
        .map(|line| line.order)
        .collect();

    let base = Decimal::new(100_000, 2);
    let tax = Decimal::new(21_000, 2);
    let lines = [
        (&customer, base + tax, Decimal::ZERO, 1),
        (&sales, Decimal::ZERO, base, 2),
        (&vat, Decimal::ZERO, tax, 3),
    ];

    let mut inserted = 0;
    for (subaccount, debit, credit, order) in lines {
        if existing.contains(&order) {
            continue;
        }
        let mut line = repo
            .new_line()
            .posted_to(entry.id, subaccount)
            .with_concept("Invoice FAC2024A1")
            .with_amounts(debit, credit);
        line.order = order;
        line.invoice = Some("FAC2024A1".to_string());
        if subaccount.id == vat.id {
            line.tax_base = base;
            line.vat = Decimal::new(21, 0);
        }
        repo.insert_line(line).await?;
        inserted += 1;
    }

    info!(entry_id = %entry.id, inserted, "Seeding complete");
    Ok(inserted)
}

async fn ensure_subaccount(
    repo: &AccountingLineRepository,
    code: &str,
    description: &str,
) -> anyhow::Result<SubAccount> {
    if let Some(subaccount) = repo.find_subaccount_by_code(code).await? {
        info!(code, "Sub-account already present");
        return Ok(subaccount);
    }
    Ok(repo
        .create_subaccount(subaccount_input(code, description))
        .await?)
}

async fn ensure_entry(repo: &AccountingLineRepository) -> anyhow::Result<AccountingEntry> {
    if let Some(entry) = repo.find_entry_by_number(ENTRY_NUMBER).await? {
        info!(number = ENTRY_NUMBER, "Accounting entry already present");
        return Ok(entry);
    }

    let posting_date =
        NaiveDate::from_ymd_opt(2024, 1, 15).context("invalid seed posting date")?;
    Ok(repo
        .create_entry(CreateEntryInput {
            number: ENTRY_NUMBER,
            posting_date,
            concept: "Invoice FAC2024A1".to_string(),
        })
        .await?)
}

fn subaccount_input(code: &str, description: &str) -> CreateSubaccountInput {
    CreateSubaccountInput {
        code: code.to_string(),
        description: description.to_string(),
        opening_debit: Decimal::ZERO,
        opening_credit: Decimal::ZERO,
    }
}
