//! `SeaORM` Entity for subaccount_period_balances table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "subaccount_period_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub subaccount_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub year: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub month: i32,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub debit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub credit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub balance: Decimal,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subaccounts::Entity",
        from = "Column::SubaccountId",
        to = "super::subaccounts::Column::Id"
    )]
    Subaccounts,
}

impl Related<super::subaccounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subaccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
