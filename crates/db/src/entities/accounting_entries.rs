//! `SeaORM` Entity for accounting_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounting_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub number: i64,
    pub posting_date: Date,
    pub concept: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::accounting_lines::Entity")]
    AccountingLines,
}

impl Related<super::accounting_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountingLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
