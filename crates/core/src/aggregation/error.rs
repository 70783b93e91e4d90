//! Aggregation error types.

use chrono::NaiveDate;
use kontra_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by budget, cost-center and report operations.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// Report window ends before it starts.
    #[error("Invalid period: {start} is after {end}")]
    InvalidPeriod {
        /// Window start.
        start: NaiveDate,
        /// Window end.
        end: NaiveDate,
    },

    /// Budget total must be positive.
    #[error("Total budget must be greater than zero, got {0}")]
    InvalidBudgetTotal(Decimal),

    /// Category percentage is negative.
    #[error("Budget percentage for {category} cannot be negative")]
    NegativePercentage {
        /// Offending category.
        category: &'static str,
    },

    /// Category percentages do not add up.
    #[error("Budget percentages must sum to 100, got {0}")]
    PercentagesNotHundred(Decimal),

    /// A category appears twice in the breakdown.
    #[error("Budget category {0} is listed more than once")]
    DuplicateCategory(&'static str),

    /// Budget not found.
    #[error("Budget not found: {0}")]
    BudgetNotFound(Uuid),

    /// A budget already covers this project and period.
    #[error("Budget already exists for project {project_id} from {period_start} to {period_end}")]
    DuplicateBudget {
        /// Project budgeted.
        project_id: Uuid,
        /// First day covered.
        period_start: NaiveDate,
        /// Last day covered.
        period_end: NaiveDate,
    },

    /// Another revision of the same budget was stored concurrently.
    #[error("Budget {0} was revised concurrently")]
    RevisionConflict(Uuid),

    /// Cost center code or name is blank.
    #[error("Cost center {0} cannot be empty")]
    EmptyField(&'static str),

    /// Cost center budget limit is negative.
    #[error("Cost center budget limit cannot be negative")]
    NegativeBudgetLimit,

    /// Cost center code already exists.
    #[error("Cost center code already exists: {0}")]
    DuplicateCostCenterCode(String),

    /// Cost center not found.
    #[error("Cost center not found: {0}")]
    CostCenterNotFound(Uuid),

    /// Allocation amount must be positive.
    #[error("Allocation amount must be greater than zero")]
    InvalidAllocationAmount,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl AggregationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::InvalidBudgetTotal(_) => "INVALID_BUDGET_TOTAL",
            Self::NegativePercentage { .. } => "NEGATIVE_PERCENTAGE",
            Self::PercentagesNotHundred(_) => "PERCENTAGES_NOT_HUNDRED",
            Self::DuplicateCategory(_) => "DUPLICATE_CATEGORY",
            Self::BudgetNotFound(_) => "BUDGET_NOT_FOUND",
            Self::DuplicateBudget { .. } => "DUPLICATE_BUDGET",
            Self::RevisionConflict(_) => "REVISION_CONFLICT",
            Self::EmptyField(_) => "EMPTY_FIELD",
            Self::NegativeBudgetLimit => "NEGATIVE_BUDGET_LIMIT",
            Self::DuplicateCostCenterCode(_) => "DUPLICATE_COST_CENTER_CODE",
            Self::CostCenterNotFound(_) => "COST_CENTER_NOT_FOUND",
            Self::InvalidAllocationAmount => "INVALID_ALLOCATION_AMOUNT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidPeriod { .. }
            | Self::InvalidBudgetTotal(_)
            | Self::NegativePercentage { .. }
            | Self::PercentagesNotHundred(_)
            | Self::DuplicateCategory(_)
            | Self::EmptyField(_)
            | Self::NegativeBudgetLimit
            | Self::InvalidAllocationAmount => 400,
            Self::BudgetNotFound(_) | Self::CostCenterNotFound(_) => 404,
            Self::DuplicateBudget { .. } | Self::RevisionConflict(_) | Self::DuplicateCostCenterCode(_) => 409,
            Self::Database(_) => 500,
        }
    }

    /// Reports are read-only; nothing here is worth retrying blindly.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

impl From<AggregationError> for AppError {
    fn from(err: AggregationError) -> Self {
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
    use rstest::rstest;

    #[rstest]
    #[case(AggregationError::PercentagesNotHundred(Decimal::new(99, 0)), 400, "PERCENTAGES_NOT_HUNDRED")]
    #[case(AggregationError::BudgetNotFound(Uuid::nil()), 404, "BUDGET_NOT_FOUND")]
    #[case(AggregationError::DuplicateCostCenterCode("CC-01".into()), 409, "DUPLICATE_COST_CENTER_CODE")]
    #[case(AggregationError::Database("boom".into()), 500, "DATABASE_ERROR")]
    fn test_status_and_code(#[case] err: AggregationError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.http_status_code(), status);
        assert_eq!(err.error_code(), code);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conversion_to_app_error() {
        assert!(matches!(
            AppError::from(AggregationError::InvalidAllocationAmount),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(AggregationError::CostCenterNotFound(Uuid::nil())),
            AppError::NotFound(_)
        ));
    }
}
