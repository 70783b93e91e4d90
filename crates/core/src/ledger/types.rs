//! Ledger domain types for journal entry creation and validation.
//!
//! Amounts are `Decimal` with at most two fractional digits, so every
//! comparison here is exact.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a journal entry.
///
/// `Draft -> Posted` is one-way. `Reversed` is only a marker on a posted
/// entry whose compensating entry has been posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// Entry can still be deleted; does not affect balances.
    Draft,
    /// Entry is part of the permanent ledger.
    Posted,
    /// Entry is posted and has been reversed by a compensating entry.
    Reversed,
}

impl EntryStatus {
    /// Returns true if the entry can be deleted.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the entry's lines count toward account balances.
    #[must_use]
    pub const fn affects_balances(self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }

    /// Upper-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Reversed => "REVERSED",
        }
    }
}

/// Input for a single journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLineInput {
    /// Account to post to.
    pub account_id: Uuid,
    /// Debit amount, zero on credit lines.
    pub debit: Decimal,
    /// Credit amount, zero on debit lines.
    pub credit: Decimal,
    /// Position within the entry, 1..N.
    pub line_number: u32,
    /// Optional line memo.
    pub description: Option<String>,
    /// Project tag.
    pub project_id: Option<Uuid>,
    /// Cost center tag.
    pub cost_center_id: Option<Uuid>,
    /// Informational tax amount; never part of totals.
    pub tax_amount: Option<Decimal>,
    /// Informational tax type.
    pub tax_type: Option<String>,
}

impl JournalLineInput {
    /// A debit line with no tags.
    #[must_use]
    pub const fn debit(line_number: u32, account_id: Uuid, amount: Decimal) -> Self {
        Self::untagged(line_number, account_id, amount, Decimal::ZERO)
    }

    /// A credit line with no tags.
    #[must_use]
    pub const fn credit(line_number: u32, account_id: Uuid, amount: Decimal) -> Self {
        Self::untagged(line_number, account_id, Decimal::ZERO, amount)
    }

    const fn untagged(line_number: u32, account_id: Uuid, debit: Decimal, credit: Decimal) -> Self {
        Self {
            account_id,
            debit,
            credit,
            line_number,
            description: None,
            project_id: None,
            cost_center_id: None,
            tax_amount: None,
            tax_type: None,
        }
    }
}

/// Input for creating a journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryInput {
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Entry description.
    pub description: String,
    /// Project tag applied to untagged lines in reports.
    pub project_id: Option<Uuid>,
    /// Subsidiary tag.
    pub subsidiary_id: Option<Uuid>,
    /// Candidate lines, in any order.
    pub lines: Vec<JournalLineInput>,
    /// User creating the entry.
    pub created_by: Option<Uuid>,
}

/// A line reduced to what posting needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingLine {
    /// Account posted to.
    pub account_id: Uuid,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

impl From<&JournalLineInput> for PostingLine {
    fn from(line: &JournalLineInput) -> Self {
        Self {
            account_id: line.account_id,
            debit: line.debit,
            credit: line.credit,
        }
    }
}

/// Entry totals, computed from lines and never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of line debits.
    pub total_debit: Decimal,
    /// Sum of line credits.
    pub total_credit: Decimal,
    /// Exact equality of the two sums.
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from summed amounts.
    #[must_use]
    pub fn new(total_debit: Decimal, total_credit: Decimal) -> Self {
        Self {
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }

    /// Sums debit/credit pairs; `None` if either sum overflows `Decimal`.
    pub fn from_amounts<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        let (debit, credit) = amounts
            .into_iter()
            .try_fold((Decimal::ZERO, Decimal::ZERO), |(d, c), (ld, lc)| {
                Some((d.checked_add(ld)?, c.checked_add(lc)?))
            })?;
        Some(Self::new(debit, credit))
    }

    /// Debit minus credit.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.total_debit - self.total_credit
    }
}
