//! `SeaORM` Entity for project_budgets table.
//!
//! Rows are append-only; a revision is a new row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "project_budgets")]
#[allow(missing_docs)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub subsidiary_id: Option<Uuid>,
    pub period_start: Date,
    pub period_end: Date,
    pub revision_number: i32,
    pub total_budget: Decimal,
    /// Serialized `Vec<CategoryAllocation>`.
    #[sea_orm(column_type = "JsonBinary")]
    pub categories: Json,
    pub approval_required: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
