//! `SeaORM` Entity for subaccounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "subaccounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub debit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub credit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub balance: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::accounting_lines::Entity")]
    AccountingLines,
    #[sea_orm(has_many = "super::subaccount_period_balances::Entity")]
    SubaccountPeriodBalances,
}

impl Related<super::accounting_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountingLines.def()
    }
}

impl Related<super::subaccount_period_balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubaccountPeriodBalances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
