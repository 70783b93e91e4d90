//! Human-readable journal entry numbers: `{prefix}{YYYYMM}{seq:04}`.

use chrono::{Datelike, NaiveDate};

use super::error::LedgerError;

/// Highest sequence number within one month.
pub const MAX_SEQUENCE: u32 = 9999;

/// Entry number allocator for one prefix.
#[derive(Debug, Clone)]
pub struct EntryNumberFormat {
    prefix: String,
}

impl EntryNumberFormat {
    /// Creates a format with the given prefix, e.g. `"JE"`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Prefix shared by every number of the entry's month, e.g. `JE202601`.
    #[must_use]
    pub fn month_prefix(&self, entry_date: NaiveDate) -> String {
        format!("{}{:04}{:02}", self.prefix, entry_date.year(), entry_date.month())
    }

    /// Formats a number from a month and sequence.
    #[must_use]
    pub fn format(&self, entry_date: NaiveDate, sequence: u32) -> String {
        format!("{}{sequence:04}", self.month_prefix(entry_date))
    }

    /// Sequence part of `number` if it belongs to the entry's month.
    #[must_use]
    pub fn sequence_of(&self, entry_date: NaiveDate, number: &str) -> Option<u32> {
        let month_prefix = self.month_prefix(entry_date);
        let seq = number.strip_prefix(month_prefix.as_str())?;
        if seq.len() != 4 || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        seq.parse().ok()
    }

    /// Next number after the month's highest existing number.
    ///
    /// `attempt` skips forward past numbers lost to concurrent inserts.
    ///
    /// # Errors
    ///
    /// Returns `EntryNumberExhausted` once the month's sequence is used up.
    pub fn next(&self, entry_date: NaiveDate, last: Option<&str>, attempt: u32) -> Result<String, LedgerError> {
        let last_seq = last
            .and_then(|n| self.sequence_of(entry_date, n))
            .unwrap_or(0);
        let sequence = last_seq + 1 + attempt;
        if sequence > MAX_SEQUENCE {
            return Err(LedgerError::EntryNumberExhausted { attempts: attempt + 1 });
        }
        Ok(self.format(entry_date, sequence))
    }
}
