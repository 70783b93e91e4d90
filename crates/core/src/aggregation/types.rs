//! Shared report inputs: the reporting window and posted ledger lines.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AggregationError;
use crate::coa::{AccountType, NormalBalance};

/// Inclusive reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    /// First day included.
    pub start: NaiveDate,
    /// Last day included.
    pub end: NaiveDate,
}

impl ReportPeriod {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AggregationError> {
        if start > end {
            return Err(AggregationError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns true if `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns true if `[start, end]` shares at least one day with the window.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end && end >= self.start
    }
}

/// A posted journal line joined with its account and entry.
///
/// Produced by the snapshot read; every report consumes these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    /// Account posted to.
    pub account_id: Uuid,
    /// Account code.
    pub account_code: String,
    /// Account name.
    pub account_name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Account sub-type.
    pub sub_type: Option<String>,
    /// Account normal balance side.
    pub normal_balance: NormalBalance,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Line project tag, falling back to the entry's.
    pub project_id: Option<Uuid>,
    /// Cost center tag.
    pub cost_center_id: Option<Uuid>,
}

impl ReportLine {
    /// Debit minus credit.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Percentage of `part` in `whole` at full precision; zero when `whole` is zero.
///
/// Status thresholds compare against this value, never the rounded one.
#[must_use]
pub fn exact_percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part / whole * Decimal::ONE_HUNDRED
}

/// [`exact_percent_of`] rounded to 2 dp for display.
#[must_use]
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    exact_percent_of(part, whole).round_dp(2)
}

/// `numerator / denominator` rounded to `dp`; zero when the denominator is zero.
#[must_use]
pub fn ratio(numerator: Decimal, denominator: Decimal, dp: u32) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    (numerator / denominator).round_dp(dp)
}
