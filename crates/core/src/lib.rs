//! Accounting domain logic for Kontra.
//!
//! This crate contains pure business logic with no web or database
//! dependencies. Repositories in `kontra-db` load rows, call into these
//! modules, and persist what they return.
//!
//! # Modules
//!
//! - `coa` - Chart of accounts and hierarchical code allocation
//! - `ledger` - Double-entry journal validation, posting and reversal
//! - `aggregation` - Budget variance, cost centers, dashboards and other reports

pub mod aggregation;
pub mod coa;
pub mod ledger;
