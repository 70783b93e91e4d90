//! Chart of accounts.
//!
//! - PSAK account types and normal balances
//! - Deterministic hierarchical code allocation
//! - Structural validation of the account tree
//! - Reporting hierarchy and posting-target selection

pub mod code;
pub mod error;
pub mod hierarchy;
pub mod service;
pub mod types;

#[cfg(test)]
mod code_props;

pub use code::{AccountCode, CodeGenerator, CodeRequest};
pub use error::CoaError;
pub use hierarchy::{AccountNode, build_hierarchy, transactional_accounts};
pub use service::{AccountService, ParentAction};
pub use types::{
    AccountProperties, AccountRecord, AccountSpec, AccountType, MAX_LEVEL, MIN_LEVEL, NewAccount,
    NormalBalance, ParentInfo,
};
