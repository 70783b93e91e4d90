//! Ledger error types for validation and state errors.
//!
//! Every variant rejects the operation outright: the entry is either never
//! created or left exactly as it was.

use kontra_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 lines.
    #[error("Journal entry must have at least 2 lines")]
    InsufficientLines,

    /// Entry description is blank.
    #[error("Journal entry description cannot be empty")]
    EmptyDescription,

    /// Line carries neither or both of debit and credit.
    #[error("Line {line_number} must have exactly one of debit or credit greater than zero")]
    InvalidLineAmounts {
        /// Offending line.
        line_number: u32,
    },

    /// Line carries a negative amount.
    #[error("Line {line_number} has a negative amount")]
    NegativeAmount {
        /// Offending line.
        line_number: u32,
    },

    /// Line amount has more than two fractional digits.
    #[error("Line {line_number} amount has {scale} decimal places, at most 2 allowed")]
    ExcessPrecision {
        /// Offending line.
        line_number: u32,
        /// Fractional digits found.
        scale: u32,
    },

    /// Line amount does not fit a ledger amount column.
    #[error("Line {line_number} amount exceeds the maximum of {max}")]
    AmountOutOfRange {
        /// Offending line.
        line_number: u32,
        /// Largest accepted amount.
        max: Decimal,
    },

    /// Tax amount is negative or too precise.
    #[error("Line {line_number} has an invalid tax amount")]
    InvalidTaxAmount {
        /// Offending line.
        line_number: u32,
    },

    /// Reversal reason is blank.
    #[error("Reversal reason cannot be empty")]
    EmptyReversalReason,

    /// Line numbers are not a contiguous 1..N sequence.
    #[error("Line numbers must run 1..N without gaps or duplicates: expected {expected}, found {found}")]
    LineNumberSequence {
        /// Number expected at this position.
        expected: u32,
        /// Number found.
        found: u32,
    },

    // ========== Posting Rule Errors ==========
    /// Debits and credits differ.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    ImbalancedEntry {
        /// Total debit.
        debit: Decimal,
        /// Total credit.
        credit: Decimal,
    },

    /// Debit or credit total does not fit a ledger amount column.
    #[error("Journal entry totals exceed the maximum of {max}")]
    TotalOutOfRange {
        /// Largest accepted total.
        max: Decimal,
    },

    /// Account does not exist or is inactive.
    #[error("Account {0} does not exist or is inactive")]
    UnknownAccount(Uuid),

    /// Account is a control account.
    #[error("Account {0} is a control account and cannot receive postings")]
    ControlAccountPosting(Uuid),

    // ========== State Errors ==========
    /// Entry is not in draft status.
    #[error("Journal entry {0} is already posted")]
    AlreadyPosted(Uuid),

    /// Reversal requested on an unposted entry.
    #[error("Journal entry {0} is not posted and cannot be reversed")]
    NotPosted(Uuid),

    /// Reversal requested twice.
    #[error("Journal entry {0} has already been reversed")]
    AlreadyReversed(Uuid),

    /// Reversal requested on a compensating entry.
    #[error("Journal entry {0} is itself a reversal and cannot be reversed")]
    CannotReverseReversal(Uuid),

    /// Delete requested on a non-draft entry.
    #[error("Can only delete draft journal entries, {0} is not a draft")]
    CanOnlyDeleteDraft(Uuid),

    /// Entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(Uuid),

    // ========== Concurrency Errors ==========
    /// Entry number allocation hit its retry ceiling.
    #[error("Unable to allocate a unique entry number after {attempts} attempts")]
    EntryNumberExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// Concurrent modification detected.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Infrastructure ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::EmptyDescription => "EMPTY_DESCRIPTION",
            Self::EmptyReversalReason => "EMPTY_REVERSAL_REASON",
            Self::InvalidLineAmounts { .. } => "INVALID_LINE_AMOUNTS",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::ExcessPrecision { .. } => "EXCESS_PRECISION",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::InvalidTaxAmount { .. } => "INVALID_TAX_AMOUNT",
            Self::LineNumberSequence { .. } => "LINE_NUMBER_SEQUENCE",
            Self::ImbalancedEntry { .. } => "IMBALANCED_ENTRY",
            Self::TotalOutOfRange { .. } => "TOTAL_OUT_OF_RANGE",
            Self::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
            Self::ControlAccountPosting(_) => "CONTROL_ACCOUNT_POSTING",
            Self::AlreadyPosted(_) => "ALREADY_POSTED",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::CanOnlyDeleteDraft(_) => "CAN_ONLY_DELETE_DRAFT",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::EntryNumberExhausted { .. } => "ENTRY_NUMBER_EXHAUSTED",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - caller can fix the input
            Self::InsufficientLines
            | Self::EmptyDescription
            | Self::EmptyReversalReason
            | Self::InvalidLineAmounts { .. }
            | Self::NegativeAmount { .. }
            | Self::ExcessPrecision { .. }
            | Self::AmountOutOfRange { .. }
            | Self::InvalidTaxAmount { .. }
            | Self::LineNumberSequence { .. }
            | Self::NotPosted(_)
            | Self::CanOnlyDeleteDraft(_) => 400,

            // 404 Not Found
            Self::EntryNotFound(_) => 404,

            // 409 Conflict - state or concurrency
            Self::AlreadyPosted(_)
            | Self::AlreadyReversed(_)
            | Self::EntryNumberExhausted { .. }
            | Self::ConcurrentModification => 409,

            // 422 Unprocessable - ledger rules
            Self::ImbalancedEntry { .. }
            | Self::TotalOutOfRange { .. }
            | Self::UnknownAccount(_)
            | Self::ControlAccountPosting(_)
            | Self::CannotReverseReversal(_) => 422,

            // 500 Internal Server Error
            Self::Database(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            422 => Self::BusinessRule(message),
            _ => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::InsufficientLines.error_code(), "INSUFFICIENT_LINES");
        assert_eq!(
            LedgerError::ImbalancedEntry {
                debit: Decimal::new(500_000, 0),
                credit: Decimal::new(400_000, 0),
            }
            .error_code(),
            "IMBALANCED_ENTRY"
        );
        assert_eq!(
            LedgerError::ControlAccountPosting(Uuid::nil()).error_code(),
            "CONTROL_ACCOUNT_POSTING"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            LedgerError::LineNumberSequence { expected: 2, found: 3 }.http_status_code(),
            400
        );
        assert_eq!(LedgerError::EntryNotFound(Uuid::nil()).http_status_code(), 404);
        assert_eq!(LedgerError::AlreadyPosted(Uuid::nil()).http_status_code(), 409);
        assert_eq!(LedgerError::UnknownAccount(Uuid::nil()).http_status_code(), 422);
        assert_eq!(LedgerError::Database("x".into()).http_status_code(), 500);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::ConcurrentModification.is_retryable());
        assert!(!LedgerError::AlreadyPosted(Uuid::nil()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::ImbalancedEntry {
            debit: Decimal::new(50_000_000, 2),
            credit: Decimal::new(40_000_000, 2),
        };
        assert_eq!(
            err.to_string(),
            "Journal entry is not balanced. Debit: 500000.00, Credit: 400000.00"
        );
    }

    #[test]
    fn test_conversion_to_app_error() {
        assert!(matches!(
            AppError::from(LedgerError::ImbalancedEntry {
                debit: Decimal::ONE,
                credit: Decimal::ZERO
            }),
            AppError::BusinessRule(_)
        ));
        assert!(matches!(
            AppError::from(LedgerError::AlreadyPosted(Uuid::nil())),
            AppError::Conflict(_)
        ));
    }
}
