//! Chart-of-accounts domain types.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest account level (top of the tree).
pub const MIN_LEVEL: u8 = 1;
/// Deepest account level (dot-suffixed codes).
pub const MAX_LEVEL: u8 = 4;

/// PSAK account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Resources owned (prefix 1).
    Asset,
    /// Obligations (prefix 2).
    Liability,
    /// Owner's equity (prefix 3).
    Equity,
    /// Income (prefix 4).
    Revenue,
    /// Costs and expenses (prefix 5).
    Expense,
}

impl AccountType {
    /// All account types in prefix order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// Leading digit of every code of this type.
    #[must_use]
    pub const fn prefix(self) -> u32 {
        match self {
            Self::Asset => 1,
            Self::Liability => 2,
            Self::Equity => 3,
            Self::Revenue => 4,
            Self::Expense => 5,
        }
    }

    /// Side on which balances of this type normally grow.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Upper-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown account type: {s}"))
    }
}

/// Normal balance side of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalBalance {
    /// Balance += debit - credit.
    Debit,
    /// Balance += credit - debit.
    Credit,
}

impl NormalBalance {
    /// Signed change a debit/credit pair applies to an account of this side.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Request to create an account.
#[derive(Debug, Clone)]
pub struct AccountSpec {
    /// Explicit code. `None` delegates to the code generator.
    pub code: Option<String>,
    /// Display name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Free-form classification, e.g. `CASH_AND_BANK`.
    pub sub_type: Option<String>,
    /// Level 1-4.
    pub level: u8,
    /// Parent account, required iff `level > 1`.
    pub parent_id: Option<Uuid>,
    /// Overrides the type's default normal balance.
    pub normal_balance: Option<NormalBalance>,
    /// Overrides the suggested control flag.
    pub is_control_account: Option<bool>,
}

/// The part of a parent account needed to validate a new child.
#[derive(Debug, Clone)]
pub struct ParentInfo {
    /// Parent ID.
    pub id: Uuid,
    /// Parent code.
    pub code: String,
    /// Parent level.
    pub level: u8,
    /// Parent type.
    pub account_type: AccountType,
    /// Whether the parent is active.
    pub is_active: bool,
    /// Whether the parent is already a control account.
    pub is_control_account: bool,
}

/// Account as seen by hierarchy and listing operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account ID.
    pub id: Uuid,
    /// Unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Free-form classification.
    pub sub_type: Option<String>,
    /// Level 1-4.
    pub level: u8,
    /// Parent account.
    pub parent_id: Option<Uuid>,
    /// Normal balance side.
    pub normal_balance: NormalBalance,
    /// Aggregates children; never posted to.
    pub is_control_account: bool,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Balance recomputed from posted lines.
    pub current_balance: Decimal,
}

/// Fully resolved fields of an account about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Code, explicit or generated.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Sub-type, explicit or suggested.
    pub sub_type: Option<String>,
    /// Level 1-4.
    pub level: u8,
    /// Parent account.
    pub parent_id: Option<Uuid>,
    /// Normal balance side.
    pub normal_balance: NormalBalance,
    /// Control flag.
    pub is_control_account: bool,
}

/// Properties suggested for a code when the caller leaves them unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountProperties {
    /// Normal balance side.
    pub normal_balance: NormalBalance,
    /// Whether the account should be a control account.
    pub is_control_account: bool,
    /// Sub-type inferred from the code prefix.
    pub sub_type: Option<&'static str>,
}
