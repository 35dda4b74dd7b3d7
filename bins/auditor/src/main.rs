//! Balance auditor.
//!
//! Compares every stored sub-account balance with the sum of its lines and
//! prints the results as JSON. Exits with status 1 when any drift is found
//! and with status 2 when the audit itself fails. Balances are reported,
//! never repaired.
//!
//! Usage:
//!   auditor                  - Audit every sub-account
//!   auditor <SUBACCOUNT_ID>  - Audit one sub-account

use std::process::ExitCode;

use anyhow::Context;
use saldo_db::AccountingLineRepository;
use saldo_shared::types::SubaccountId;
use saldo_shared::{AppConfig, AppError};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saldo=info,auditor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let target = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<SubaccountId>())
        .transpose()
        .context("Invalid sub-account ID")?;

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = saldo_db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let repo = AccountingLineRepository::new(db, config.ledger);

    let result = match target {
        Some(id) => repo.audit_subaccount(id).await.map(|audit| vec![audit]),
        None => repo.audit_all().await,
    };
    let audits = match result {
        Ok(audits) => audits,
        Err(err) => {
            let err = AppError::from(err);
            error!(code = err.error_code(), error = %err, "Audit failed");
            return Ok(ExitCode::from(2));
        }
    };

    println!("{}", serde_json::to_string_pretty(&audits)?);

    if audits.iter().all(|audit| audit.is_consistent()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
