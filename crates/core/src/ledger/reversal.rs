//! Compensating entries for posted journal entries.
//!
//! A reversal never edits the original. It produces a new entry whose lines
//! swap debit and credit, so the pair nets every touched account to zero.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use kontra_shared::types::{JournalEntryId, UserId};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::service::LedgerService;
use super::types::{CreateEntryInput, EntryTotals, JournalLineInput};

/// Memo prefix carried by every compensating line.
pub const REVERSAL_MEMO_PREFIX: &str = "Reversal: ";

/// Input for reversing a posted entry.
#[derive(Debug, Clone)]
pub struct ReversalInput {
    /// The entry being reversed.
    pub original_entry_id: JournalEntryId,
    /// Its human-readable number.
    pub original_entry_number: String,
    /// Its project tag.
    pub project_id: Option<Uuid>,
    /// Its subsidiary tag.
    pub subsidiary_id: Option<Uuid>,
    /// Its lines, as stored.
    pub original_lines: Vec<JournalLineInput>,
    /// Accounting date of the compensating entry.
    pub reversal_date: NaiveDate,
    /// Why the entry is reversed.
    pub reason: String,
    /// The user reversing the entry.
    pub reversed_by: Option<UserId>,
}

/// The compensating entry to persist and post.
#[derive(Debug, Clone)]
pub struct ReversalOutput {
    /// Entry to insert; lines are already swapped.
    pub entry: CreateEntryInput,
    /// Back-link stored on the compensating entry.
    pub reversal_of_entry_id: JournalEntryId,
    /// Totals of the compensating entry.
    pub totals: EntryTotals,
}

/// Stateless service for creating reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Build the compensating entry.
    ///
    /// For each original line:
    /// - Debits become credits and credits become debits
    /// - Line number, project, cost center and tax fields are preserved
    /// - The memo is prefixed with "Reversal: "
    ///
    /// # Errors
    ///
    /// Returns `EmptyReversalReason` for a blank reason, or
    /// `ImbalancedEntry` if the original lines do not balance.
    pub fn create_reversing_entry(input: &ReversalInput) -> Result<ReversalOutput, LedgerError> {
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::EmptyReversalReason);
        }
        if input.original_lines.len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }

        let original_totals = Self::totals(&input.original_lines)?;
        if !original_totals.is_balanced {
            return Err(LedgerError::ImbalancedEntry {
                debit: original_totals.total_debit,
                credit: original_totals.total_credit,
            });
        }

        let mut lines: Vec<JournalLineInput> = input
            .original_lines
            .iter()
            .map(|line| JournalLineInput {
                debit: line.credit,
                credit: line.debit,
                description: Some(format!(
                    "{REVERSAL_MEMO_PREFIX}{}",
                    line.description.as_deref().unwrap_or(&input.original_entry_number)
                )),
                ..line.clone()
            })
            .collect();
        lines.sort_by_key(|l| l.line_number);

        let totals = Self::totals(&lines)?;

        Ok(ReversalOutput {
            entry: CreateEntryInput {
                entry_date: input.reversal_date,
                description: format!(
                    "Reversal of journal entry {}. Reason: {reason}",
                    input.original_entry_number
                ),
                project_id: input.project_id,
                subsidiary_id: input.subsidiary_id,
                lines,
                created_by: input.reversed_by.map(UserId::into_inner),
            },
            reversal_of_entry_id: input.original_entry_id,
            totals,
        })
    }

    fn totals(lines: &[JournalLineInput]) -> Result<EntryTotals, LedgerError> {
        LedgerService::totals_within_range(lines.iter().map(|l| (l.debit, l.credit)))
    }

    /// Net effect on each account of an entry and its reversal, which must
    /// be zero everywhere.
    #[must_use]
    pub fn net_effect(original: &[JournalLineInput], reversal: &[JournalLineInput]) -> Vec<(Uuid, Decimal)> {
        let mut net: BTreeMap<Uuid, Decimal> = BTreeMap::new();
        for line in original.iter().chain(reversal) {
            *net.entry(line.account_id).or_default() += line.debit - line.credit;
        }
        net.into_iter().collect()
    }
}
