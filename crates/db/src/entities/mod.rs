//! `SeaORM` entity definitions.

pub mod chart_of_accounts;
pub mod cost_allocations;
pub mod cost_centers;
pub mod journal_entries;
pub mod journal_entry_lines;
pub mod project_budgets;
pub mod sea_orm_active_enums;
