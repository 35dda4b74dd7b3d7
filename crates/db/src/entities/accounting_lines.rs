//! `SeaORM` Entity for accounting_lines table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounting_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entry_id: Uuid,
    pub subaccount_id: Uuid,
    pub subaccount_code: String,
    pub counterpart_id: Option<Uuid>,
    pub counterpart_code: Option<String>,
    pub concept: String,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub debit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub credit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub tax_base: Decimal,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub vat: Decimal,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub surcharge: Decimal,
    pub currency: String,
    #[sea_orm(column_type = "Decimal(Some((18, 6)))")]
    pub conversion_rate: Decimal,
    pub tax_id: Option<String>,
    pub document: Option<String>,
    pub series_code: Option<String>,
    pub invoice: Option<String>,
    pub sort_order: i32,
    pub reconciled: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounting_entries::Entity",
        from = "Column::EntryId",
        to = "super::accounting_entries::Column::Id",
        on_delete = "Restrict"
    )]
    AccountingEntries,
    #[sea_orm(
        belongs_to = "super::subaccounts::Entity",
        from = "Column::SubaccountId",
        to = "super::subaccounts::Column::Id"
    )]
    Subaccounts,
}

impl Related<super::accounting_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountingEntries.def()
    }
}

impl Related<super::subaccounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subaccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
