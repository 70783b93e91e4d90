//! Chart-of-accounts error types.

use kontra_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use super::types::AccountType;

/// Errors raised by the account registry and the code generator.
#[derive(Debug, Error)]
pub enum CoaError {
    // ========== Validation Errors ==========
    /// Level outside 1-4.
    #[error("Account level must be between 1 and 4, got {0}")]
    InvalidLevel(u8),

    /// Account name is blank.
    #[error("Account name cannot be empty")]
    EmptyName,

    /// Code does not match the PSAK shape for its type and level.
    #[error("Invalid account code '{code}': {reason}")]
    InvalidCode {
        /// The rejected code.
        code: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Level > 1 without a parent.
    #[error("Level {0} accounts require a parent account")]
    ParentRequired(u8),

    /// Level 1 with a parent.
    #[error("Level 1 accounts cannot have a parent account")]
    ParentNotAllowed,

    /// Parent ID does not resolve to an account.
    #[error("Parent account not found: {0}")]
    ParentNotFound(Uuid),

    /// Parent sits at the wrong level.
    #[error("Parent account must be at level {expected}, found level {actual}")]
    ParentLevelMismatch {
        /// Required parent level.
        expected: u8,
        /// Actual parent level.
        actual: u8,
    },

    /// Parent has a different type.
    #[error("Parent account type {actual} does not match {expected}")]
    ParentTypeMismatch {
        /// Type of the new account.
        expected: AccountType,
        /// Type of the parent.
        actual: AccountType,
    },

    /// Parent is deactivated.
    #[error("Parent account {0} is inactive")]
    ParentInactive(Uuid),

    /// Code lies outside the range its parent owns.
    #[error("Account code '{code}' is outside the range of parent '{parent}'")]
    CodeOutsideParent {
        /// The child code.
        code: String,
        /// The parent code.
        parent: String,
    },

    // ========== Conflict Errors ==========
    /// Code already taken.
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),

    /// Deactivation blocked by active children.
    #[error("Account {account_id} has {count} active child accounts")]
    HasActiveChildren {
        /// The account being deactivated.
        account_id: Uuid,
        /// Number of active children.
        count: u64,
    },

    /// Parent already carries journal lines and cannot become a control account.
    #[error("Account {0} already has journal lines and cannot take child accounts")]
    ParentHasPostings(Uuid),

    /// Automatic code generation hit its retry ceiling.
    #[error("Unable to generate unique code after {attempts} attempts. Please create manually.")]
    GenerationExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// No codes left in the range after the given code.
    #[error("No codes left after '{after}' at this level. Please create manually.")]
    CodeRangeExhausted {
        /// Last code in range.
        after: String,
    },

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    // ========== Infrastructure ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl CoaError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidLevel(_) => "INVALID_LEVEL",
            Self::EmptyName => "EMPTY_NAME",
            Self::InvalidCode { .. } => "INVALID_ACCOUNT_CODE",
            Self::ParentRequired(_) => "PARENT_REQUIRED",
            Self::ParentNotAllowed => "PARENT_NOT_ALLOWED",
            Self::ParentNotFound(_) => "PARENT_NOT_FOUND",
            Self::ParentLevelMismatch { .. } => "PARENT_LEVEL_MISMATCH",
            Self::ParentTypeMismatch { .. } => "PARENT_TYPE_MISMATCH",
            Self::ParentInactive(_) => "PARENT_INACTIVE",
            Self::CodeOutsideParent { .. } => "CODE_OUTSIDE_PARENT",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::HasActiveChildren { .. } => "HAS_ACTIVE_CHILDREN",
            Self::ParentHasPostings(_) => "PARENT_HAS_POSTINGS",
            Self::GenerationExhausted { .. } => "GENERATION_EXHAUSTED",
            Self::CodeRangeExhausted { .. } => "CODE_RANGE_EXHAUSTED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidLevel(_)
            | Self::EmptyName
            | Self::InvalidCode { .. }
            | Self::ParentRequired(_)
            | Self::ParentNotAllowed
            | Self::ParentNotFound(_)
            | Self::ParentLevelMismatch { .. }
            | Self::ParentTypeMismatch { .. }
            | Self::ParentInactive(_)
            | Self::CodeOutsideParent { .. } => 400,

            Self::AccountNotFound(_) => 404,

            Self::DuplicateCode(_)
            | Self::HasActiveChildren { .. }
            | Self::ParentHasPostings(_)
            | Self::GenerationExhausted { .. }
            | Self::CodeRangeExhausted { .. } => 409,

            Self::Database(_) => 500,
        }
    }

    /// True for structural violations the caller can fix by correcting input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        self.http_status_code() == 400
    }
}

impl From<CoaError> for AppError {
    fn from(err: CoaError) -> Self {
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_exhausted_message() {
        let err = CoaError::GenerationExhausted { attempts: 10 };
        assert_eq!(
            err.to_string(),
            "Unable to generate unique code after 10 attempts. Please create manually."
        );
        assert_eq!(err.error_code(), "GENERATION_EXHAUSTED");
    }

    #[test]
    fn test_taxonomy_maps_to_app_error() {
        assert!(matches!(
            AppError::from(CoaError::ParentRequired(2)),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(CoaError::DuplicateCode("1100".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(CoaError::HasActiveChildren {
                account_id: Uuid::nil(),
                count: 2
            }),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(CoaError::AccountNotFound(Uuid::nil())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(CoaError::Database("boom".into())),
            AppError::Database(_)
        ));
    }

    #[test]
    fn test_is_validation() {
        assert!(CoaError::EmptyName.is_validation());
        assert!(!CoaError::GenerationExhausted { attempts: 10 }.is_validation());
    }
}
