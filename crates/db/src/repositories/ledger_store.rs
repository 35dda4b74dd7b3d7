//! [`LedgerStore`] backed by an open database transaction.
//!
//! Every read and write goes through the same `DatabaseTransaction`, so the
//! line write and the balance writes of one ledger operation commit or roll
//! back together. Sub-account and line rows are loaded with
//! `SELECT ... FOR UPDATE`, so concurrent operations on the same sub-account
//! or line wait for each other and see each other's committed rows.

use async_trait::async_trait;
use chrono::Utc;
use saldo_core::ledger::{
    AccountingEntry, AccountingLine, LedgerError, LedgerResult, LedgerStore, PeriodBalance,
    PeriodKey, SubAccount,
};
use saldo_shared::types::{CurrencyCode, EntryId, LineId, SubaccountId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, Set, Unchanged,
};

use crate::entities::{
    accounting_entries, accounting_lines, subaccount_period_balances, subaccounts,
};

/// Ledger storage scoped to one database transaction.
pub struct SeaOrmLedgerStore<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> SeaOrmLedgerStore<'a> {
    /// Wraps an open transaction.
    #[must_use]
    pub const fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }
}

fn persistence(err: DbErr) -> LedgerError {
    LedgerError::persistence(err)
}

pub(crate) fn entry_from_model(model: accounting_entries::Model) -> AccountingEntry {
    AccountingEntry {
        id: EntryId::from_uuid(model.id),
        number: model.number,
        posting_date: model.posting_date,
        concept: model.concept,
    }
}

pub(crate) fn subaccount_from_model(model: subaccounts::Model) -> SubAccount {
    SubAccount {
        id: SubaccountId::from_uuid(model.id),
        code: model.code,
        description: model.description,
        debit: model.debit,
        credit: model.credit,
        balance: model.balance,
    }
}

#[allow(clippy::cast_possible_wrap)]
fn month_column(period: PeriodKey) -> i32 {
    period.month as i32
}

pub(crate) fn period_from_model(
    model: subaccount_period_balances::Model,
) -> LedgerResult<PeriodBalance> {
    let month = u32::try_from(model.month)
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| {
            LedgerError::persistence(format!(
                "invalid month {} stored for sub-account {}",
                model.month, model.subaccount_id
            ))
        })?;

    Ok(PeriodBalance {
        subaccount_id: SubaccountId::from_uuid(model.subaccount_id),
        period: PeriodKey {
            year: model.year,
            month,
        },
        debit: model.debit,
        credit: model.credit,
        balance: model.balance,
    })
}

pub(crate) fn line_from_model(model: accounting_lines::Model) -> LedgerResult<AccountingLine> {
    let currency: CurrencyCode = model.currency.parse().map_err(|e| {
        LedgerError::persistence(format!("line {} has {e}", model.id))
    })?;

    Ok(AccountingLine {
        id: LineId::from_uuid(model.id),
        entry_id: Some(EntryId::from_uuid(model.entry_id)),
        subaccount_id: Some(SubaccountId::from_uuid(model.subaccount_id)),
        subaccount_code: model.subaccount_code,
        counterpart_id: model.counterpart_id.map(SubaccountId::from_uuid),
        counterpart_code: model.counterpart_code,
        concept: model.concept,
        debit: model.debit,
        credit: model.credit,
        tax_base: model.tax_base,
        vat: model.vat,
        surcharge: model.surcharge,
        currency,
        conversion_rate: model.conversion_rate,
        tax_id: model.tax_id,
        document: model.document,
        series_code: model.series_code,
        invoice: model.invoice,
        order: model.sort_order,
        reconciled: model.reconciled,
    })
}

/// Builds the active model for a line. Unresolved references are rejected
/// since the columns are not nullable.
pub(crate) fn line_to_active_model(
    line: &AccountingLine,
) -> LedgerResult<accounting_lines::ActiveModel> {
    let entry_id = line
        .entry_id
        .ok_or_else(|| LedgerError::persistence(format!("line {} has no entry", line.id)))?;
    let subaccount_id = line.subaccount_id.ok_or_else(|| {
        LedgerError::persistence(format!("line {} has no sub-account", line.id))
    })?;
    let now = Utc::now().into();

    Ok(accounting_lines::ActiveModel {
        id: Set(line.id.into_inner()),
        entry_id: Set(entry_id.into_inner()),
        subaccount_id: Set(subaccount_id.into_inner()),
        subaccount_code: Set(line.subaccount_code.clone()),
        counterpart_id: Set(line.counterpart_id.map(SubaccountId::into_inner)),
        counterpart_code: Set(line.counterpart_code.clone()),
        concept: Set(line.concept.clone()),
        debit: Set(line.debit),
        credit: Set(line.credit),
        tax_base: Set(line.tax_base),
        vat: Set(line.vat),
        surcharge: Set(line.surcharge),
        currency: Set(line.currency.to_string()),
        conversion_rate: Set(line.conversion_rate),
        tax_id: Set(line.tax_id.clone()),
        document: Set(line.document.clone()),
        series_code: Set(line.series_code.clone()),
        invoice: Set(line.invoice.clone()),
        sort_order: Set(line.order),
        reconciled: Set(line.reconciled),
        created_at: Set(now),
        updated_at: Set(now),
    })
}

#[async_trait]
impl LedgerStore for SeaOrmLedgerStore<'_> {
    async fn find_entry(&self, id: EntryId) -> LedgerResult<Option<AccountingEntry>> {
        let model = accounting_entries::Entity::find_by_id(id.into_inner())
            .one(self.txn)
            .await
            .map_err(persistence)?;
        Ok(model.map(entry_from_model))
    }

    async fn delete_entry(&self, id: EntryId) -> LedgerResult<()> {
        let result = accounting_entries::Entity::delete_by_id(id.into_inner())
            .exec(self.txn)
            .await
            .map_err(persistence)?;

        if result.rows_affected == 0 {
            return Err(LedgerError::EntryNotFound(id));
        }
        Ok(())
    }

    async fn find_subaccount(&self, id: SubaccountId) -> LedgerResult<Option<SubAccount>> {
        let model = subaccounts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(self.txn)
            .await
            .map_err(persistence)?;
        Ok(model.map(subaccount_from_model))
    }

    async fn save_subaccount(&self, subaccount: &SubAccount) -> LedgerResult<()> {
        let model = subaccounts::ActiveModel {
            id: Unchanged(subaccount.id.into_inner()),
            debit: Set(subaccount.debit),
            credit: Set(subaccount.credit),
            balance: Set(subaccount.balance),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        match model.update(self.txn).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(LedgerError::SubaccountNotFound(subaccount.id)),
            Err(e) => Err(persistence(e)),
        }
    }

    async fn find_period_balance(
        &self,
        id: SubaccountId,
        period: PeriodKey,
    ) -> LedgerResult<Option<PeriodBalance>> {
        let model = subaccount_period_balances::Entity::find_by_id((
            id.into_inner(),
            period.year,
            month_column(period),
        ))
        .one(self.txn)
        .await
        .map_err(persistence)?;

        model.map(period_from_model).transpose()
    }

    async fn save_period_balance(&self, balance: &PeriodBalance) -> LedgerResult<()> {
        let key = (
            balance.subaccount_id.into_inner(),
            balance.period.year,
            month_column(balance.period),
        );
        let existing = subaccount_period_balances::Entity::find_by_id(key)
            .one(self.txn)
            .await
            .map_err(persistence)?;

        let now = Utc::now().into();
        let mut model = subaccount_period_balances::ActiveModel {
            subaccount_id: Set(key.0),
            year: Set(key.1),
            month: Set(key.2),
            debit: Set(balance.debit),
            credit: Set(balance.credit),
            balance: Set(balance.balance),
            updated_at: Set(now),
        };

        if existing.is_some() {
            model.subaccount_id = Unchanged(key.0);
            model.year = Unchanged(key.1);
            model.month = Unchanged(key.2);
            model.update(self.txn).await.map_err(persistence)?;
        } else {
            model.insert(self.txn).await.map_err(persistence)?;
        }
        Ok(())
    }

    async fn list_period_balances(&self, id: SubaccountId) -> LedgerResult<Vec<PeriodBalance>> {
        subaccount_period_balances::Entity::find()
            .filter(subaccount_period_balances::Column::SubaccountId.eq(id.into_inner()))
            .order_by_asc(subaccount_period_balances::Column::Year)
            .order_by_asc(subaccount_period_balances::Column::Month)
            .all(self.txn)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(period_from_model)
            .collect()
    }

    async fn find_line(&self, id: LineId) -> LedgerResult<Option<AccountingLine>> {
        let model = accounting_lines::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(self.txn)
            .await
            .map_err(persistence)?;
        model.map(line_from_model).transpose()
    }

    async fn insert_line(&self, line: &AccountingLine) -> LedgerResult<()> {
        line_to_active_model(line)?
            .insert(self.txn)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn update_line(&self, line: &AccountingLine) -> LedgerResult<()> {
        let mut model = line_to_active_model(line)?;
        model.id = Unchanged(line.id.into_inner());
        model.created_at = NotSet;

        match model.update(self.txn).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(LedgerError::LineNotFound(line.id)),
            Err(e) => Err(persistence(e)),
        }
    }

    async fn delete_line(&self, id: LineId) -> LedgerResult<()> {
        let result = accounting_lines::Entity::delete_by_id(id.into_inner())
            .exec(self.txn)
            .await
            .map_err(persistence)?;

        if result.rows_affected == 0 {
            return Err(LedgerError::LineNotFound(id));
        }
        Ok(())
    }

    async fn lines_for_subaccount(&self, id: SubaccountId) -> LedgerResult<Vec<AccountingLine>> {
        accounting_lines::Entity::find()
            .filter(accounting_lines::Column::SubaccountId.eq(id.into_inner()))
            .order_by_asc(accounting_lines::Column::SortOrder)
            .order_by_asc(accounting_lines::Column::Id)
            .all(self.txn)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(line_from_model)
            .collect()
    }

    async fn lines_for_entry(&self, id: EntryId) -> LedgerResult<Vec<AccountingLine>> {
        accounting_lines::Entity::find()
            .filter(accounting_lines::Column::EntryId.eq(id.into_inner()))
            .order_by_asc(accounting_lines::Column::SortOrder)
            .order_by_asc(accounting_lines::Column::Id)
            .all(self.txn)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(line_from_model)
            .collect()
    }
}
