//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Journal entry and line types
//! - Entry validation (balance, line numbering, posting targets)
//! - Balance recomputation from posted lines
//! - Compensating entries for reversals
//! - Entry number allocation
//! - Error types for ledger operations

pub mod balance;
pub mod entry_number;
pub mod error;
pub mod reversal;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use balance::{AccountBalance, recompute_balances, touched_accounts};
pub use entry_number::EntryNumberFormat;
pub use error::LedgerError;
pub use reversal::{REVERSAL_MEMO_PREFIX, ReversalInput, ReversalOutput, ReversalService};
pub use service::{AccountInfo, LedgerService, MAX_AMOUNT, MAX_AMOUNT_SCALE};
pub use types::{CreateEntryInput, EntryStatus, EntryTotals, JournalLineInput, PostingLine};
