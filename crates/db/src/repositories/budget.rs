//! Budget repository.
//!
//! Budgets are append-only: a revision is a new row with the next
//! `revision_number` for the same project and period.

use kontra_core::aggregation::{
    AggregationError, BudgetPlan, BudgetRecord, BudgetService, CategoryAllocation, CreateBudgetInput, ReportPeriod,
    ReviseBudgetInput,
};
use kontra_shared::AppError;
use kontra_shared::config::AggregationConfig;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::project_budgets;
use crate::retry::is_unique_violation;

/// Default approval threshold, in whole currency units.
pub const DEFAULT_APPROVAL_THRESHOLD: i64 = 1_000_000_000;

/// Error types for budget operations.
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    /// A budget rule rejected the request.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Stored categories could not be decoded.
    #[error("Invalid budget categories: {0}")]
    Categories(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::Aggregation(e) => e.into(),
            BudgetError::Categories(e) => Self::Internal(e.to_string()),
            BudgetError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

impl TryFrom<project_budgets::Model> for BudgetRecord {
    type Error = serde_json::Error;

    fn try_from(model: project_budgets::Model) -> Result<Self, Self::Error> {
        let categories: Vec<CategoryAllocation> = serde_json::from_value(model.categories)?;
        Ok(Self {
            id: model.id,
            project_id: model.project_id,
            subsidiary_id: model.subsidiary_id,
            period_start: model.period_start,
            period_end: model.period_end,
            // The table CHECK keeps revisions at 1 or above.
            revision_number: u32::try_from(model.revision_number).unwrap_or(1),
            plan: BudgetPlan {
                total_budget: model.total_budget,
                categories,
                approval_required: model.approval_required,
            },
        })
    }
}

/// Budget repository.
#[derive(Debug, Clone)]
pub struct BudgetRepository {
    db: DatabaseConnection,
    approval_threshold: Decimal,
}

impl BudgetRepository {
    /// Creates a new budget repository with the default approval threshold.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            approval_threshold: Decimal::from(DEFAULT_APPROVAL_THRESHOLD),
        }
    }

    /// Creates a repository using the configured approval threshold.
    #[must_use]
    pub fn with_config(db: DatabaseConnection, config: &AggregationConfig) -> Self {
        Self {
            db,
            approval_threshold: Decimal::from(config.budget_approval_threshold),
        }
    }

    /// Stores revision 1 of a project budget.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an inverted period, a non-positive
    /// total or bad percentages, and `DuplicateBudget` if the project
    /// already has a budget for exactly this period.
    #[instrument(skip(self, input), fields(project_id = %input.project_id))]
    pub async fn create(&self, input: CreateBudgetInput, created_by: Option<Uuid>) -> Result<BudgetRecord, BudgetError> {
        ReportPeriod::new(input.period_start, input.period_end)?;
        let plan = BudgetService::plan(input.total_budget, input.categories.as_deref(), self.approval_threshold)?;

        let record = BudgetRecord {
            id: Uuid::new_v4(),
            project_id: input.project_id,
            subsidiary_id: input.subsidiary_id,
            period_start: input.period_start,
            period_end: input.period_end,
            revision_number: 1,
            plan,
        };

        match self.insert(&record, created_by).await {
            Err(BudgetError::Database(err)) if is_unique_violation(&err) => Err(AggregationError::DuplicateBudget {
                project_id: record.project_id,
                period_start: record.period_start,
                period_end: record.period_end,
            }
            .into()),
            Err(err) => Err(err),
            Ok(()) => {
                info!(
                    budget_id = %record.id,
                    total = %record.plan.total_budget,
                    approval_required = record.plan.approval_required,
                    "Budget created"
                );
                Ok(record)
            }
        }
    }

    /// Appends the next revision of the budget `budget_id` belongs to.
    ///
    /// The revision starts from the latest stored revision of the same
    /// project and period, not necessarily `budget_id` itself.
    ///
    /// # Errors
    ///
    /// Returns `BudgetNotFound`, the validation errors of
    /// [`BudgetRepository::create`], or `RevisionConflict` if another
    /// revision was stored at the same time.
    #[instrument(skip(self, input))]
    pub async fn revise(
        &self,
        budget_id: Uuid,
        input: ReviseBudgetInput,
        created_by: Option<Uuid>,
    ) -> Result<BudgetRecord, BudgetError> {
        let current = project_budgets::Entity::find_by_id(budget_id)
            .one(&self.db)
            .await?
            .ok_or(AggregationError::BudgetNotFound(budget_id))?;

        let latest = project_budgets::Entity::find()
            .filter(project_budgets::Column::ProjectId.eq(current.project_id))
            .filter(project_budgets::Column::PeriodStart.eq(current.period_start))
            .filter(project_budgets::Column::PeriodEnd.eq(current.period_end))
            .order_by_desc(project_budgets::Column::RevisionNumber)
            .one(&self.db)
            .await?
            .unwrap_or(current);
        let latest = BudgetRecord::try_from(latest)?;

        let (revision_number, plan) = BudgetService::revise(&latest, &input, self.approval_threshold)?;
        let record = BudgetRecord {
            id: Uuid::new_v4(),
            revision_number,
            plan,
            ..latest
        };

        match self.insert(&record, created_by).await {
            Err(BudgetError::Database(err)) if is_unique_violation(&err) => {
                Err(AggregationError::RevisionConflict(budget_id).into())
            }
            Err(err) => Err(err),
            Ok(()) => {
                info!(
                    budget_id = %record.id,
                    revision = record.revision_number,
                    total = %record.plan.total_budget,
                    "Budget revised"
                );
                Ok(record)
            }
        }
    }

    async fn insert(&self, record: &BudgetRecord, created_by: Option<Uuid>) -> Result<(), BudgetError> {
        let revision_number = i32::try_from(record.revision_number)
            .map_err(|_| DbErr::Custom(format!("revision {} out of range", record.revision_number)))?;
        project_budgets::ActiveModel {
            id: Set(record.id),
            project_id: Set(record.project_id),
            subsidiary_id: Set(record.subsidiary_id),
            period_start: Set(record.period_start),
            period_end: Set(record.period_end),
            revision_number: Set(revision_number),
            total_budget: Set(record.plan.total_budget),
            categories: Set(serde_json::to_value(&record.plan.categories)?),
            approval_required: Set(record.plan.approval_required),
            created_by: Set(created_by),
            created_at: Set(chrono::Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    /// Finds a budget revision by ID.
    ///
    /// # Errors
    ///
    /// Returns `BudgetNotFound` if the budget does not exist.
    pub async fn get(&self, budget_id: Uuid) -> Result<BudgetRecord, BudgetError> {
        let model = project_budgets::Entity::find_by_id(budget_id)
            .one(&self.db)
            .await?
            .ok_or(AggregationError::BudgetNotFound(budget_id))?;
        Ok(BudgetRecord::try_from(model)?)
    }

    /// Every revision of every budget of a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<BudgetRecord>, BudgetError> {
        let models = project_budgets::Entity::find()
            .filter(project_budgets::Column::ProjectId.eq(project_id))
            .order_by_asc(project_budgets::Column::PeriodStart)
            .order_by_asc(project_budgets::Column::RevisionNumber)
            .all(&self.db)
            .await?;
        models
            .into_iter()
            .map(|m| BudgetRecord::try_from(m).map_err(BudgetError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kontra_core::aggregation::BudgetCategory;
    use rust_decimal_macros::dec;

    fn model(categories: serde_json::Value) -> project_budgets::Model {
        project_budgets::Model {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            subsidiary_id: None,
            period_start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            revision_number: 2,
            total_budget: dec!(100000000),
            categories,
            approval_required: false,
            created_by: None,
            created_at: chrono::Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_stored_categories_decode() {
        let plan = BudgetService::plan(dec!(100000000), None, dec!(1000000000)).unwrap();
        let record = BudgetRecord::try_from(model(serde_json::to_value(&plan.categories).unwrap())).unwrap();

        assert_eq!(record.revision_number, 2);
        assert_eq!(record.plan, plan);
        assert_eq!(record.plan.amount_for(BudgetCategory::Materials), dec!(40000000));
    }

    #[test]
    fn test_corrupt_categories_are_reported() {
        let err = BudgetRecord::try_from(model(serde_json::json!({"materials": "lots"}))).unwrap_err();
        let app: AppError = BudgetError::from(err).into();
        assert!(matches!(app, AppError::Internal(_)));
    }
}
