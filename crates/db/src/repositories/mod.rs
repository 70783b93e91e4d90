//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Business rules live in `kontra-core`; repositories load what those rules
//! need, call them, and persist the outcome inside one transaction.

pub mod account;
pub mod aggregation;
pub mod budget;
pub mod cost_center;
pub mod journal;

pub use account::{AccountError, AccountFilter, AccountRepository};
pub use aggregation::{AggregationRepository, ReportError};
pub use budget::{BudgetError, BudgetRepository};
pub use cost_center::{CostCenterError, CostCenterFilter, CostCenterRepository};
pub use journal::{
    EntryFilter, JournalEntryWithLines, JournalError, JournalRepository, ReversalResult, ReverseEntryInput,
};
