//! Cost center repository: centers and their append-only allocations.

use chrono::NaiveDate;
use kontra_core::aggregation::{
    AggregationError, AllocationRecord, CostCenterRecord, CostCenterService, CostCenterType, CreateCostCenterInput,
    RecordAllocationInput,
};
use kontra_shared::AppError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{cost_allocations, cost_centers, sea_orm_active_enums};
use crate::retry::is_unique_violation;

/// Error types for cost center operations.
#[derive(Debug, thiserror::Error)]
pub enum CostCenterError {
    /// A cost center rule rejected the request.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CostCenterError> for AppError {
    fn from(err: CostCenterError) -> Self {
        match err {
            CostCenterError::Aggregation(e) => e.into(),
            CostCenterError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Filter options for listing cost centers.
#[derive(Debug, Clone, Default)]
pub struct CostCenterFilter {
    /// Filter by type.
    pub cost_center_type: Option<CostCenterType>,
    /// Filter by project.
    pub project_id: Option<Uuid>,
    /// Filter by subsidiary.
    pub subsidiary_id: Option<Uuid>,
    /// Filter by active status.
    pub is_active: Option<bool>,
}

impl From<cost_centers::Model> for CostCenterRecord {
    fn from(model: cost_centers::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            cost_center_type: model.cost_center_type.into(),
            project_id: model.project_id,
            subsidiary_id: model.subsidiary_id,
            budget_limit: model.budget_limit,
            is_active: model.is_active,
        }
    }
}

impl From<cost_allocations::Model> for AllocationRecord {
    fn from(model: cost_allocations::Model) -> Self {
        Self {
            id: model.id,
            cost_center_id: model.cost_center_id,
            project_id: model.project_id,
            amount: model.amount,
            allocation_type: model.allocation_type.into(),
            allocation_basis: model.allocation_basis,
            effective_date: model.effective_date,
        }
    }
}

/// Cost center repository.
#[derive(Debug, Clone)]
pub struct CostCenterRepository {
    db: DatabaseConnection,
}

impl CostCenterRepository {
    /// Creates a new cost center repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a cost center. Codes are stored upper-cased.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank code or name or a negative
    /// limit, and `DuplicateCostCenterCode` if the code is taken.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: CreateCostCenterInput) -> Result<CostCenterRecord, CostCenterError> {
        let input = CostCenterService::validate_new(&input)?;

        let existing = cost_centers::Entity::find()
            .filter(cost_centers::Column::Code.eq(&input.code))
            .count(&self.db)
            .await?;
        if existing > 0 {
            return Err(AggregationError::DuplicateCostCenterCode(input.code).into());
        }

        let now = chrono::Utc::now().fixed_offset();
        let center = cost_centers::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(input.code.clone()),
            name: Set(input.name),
            cost_center_type: Set(input.cost_center_type.into()),
            project_id: Set(input.project_id),
            subsidiary_id: Set(input.subsidiary_id),
            budget_limit: Set(input.budget_limit),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let center = match center.insert(&self.db).await {
            Ok(center) => center,
            Err(err) if is_unique_violation(&err) => {
                return Err(AggregationError::DuplicateCostCenterCode(input.code).into());
            }
            Err(err) => return Err(err.into()),
        };

        info!(cost_center_id = %center.id, code = %center.code, "Cost center created");
        Ok(center.into())
    }

    /// Finds a cost center by ID.
    ///
    /// # Errors
    ///
    /// Returns `CostCenterNotFound` if the cost center does not exist.
    pub async fn get(&self, id: Uuid) -> Result<CostCenterRecord, CostCenterError> {
        cost_centers::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(CostCenterRecord::from)
            .ok_or_else(|| AggregationError::CostCenterNotFound(id).into())
    }

    /// Lists cost centers ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, filter: CostCenterFilter) -> Result<Vec<CostCenterRecord>, CostCenterError> {
        let mut query = cost_centers::Entity::find().order_by_asc(cost_centers::Column::Code);

        if let Some(cost_center_type) = filter.cost_center_type {
            query = query.filter(
                cost_centers::Column::CostCenterType.eq(sea_orm_active_enums::CostCenterType::from(cost_center_type)),
            );
        }
        if let Some(project_id) = filter.project_id {
            query = query.filter(cost_centers::Column::ProjectId.eq(project_id));
        }
        if let Some(subsidiary_id) = filter.subsidiary_id {
            query = query.filter(cost_centers::Column::SubsidiaryId.eq(subsidiary_id));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(cost_centers::Column::IsActive.eq(is_active));
        }

        let centers = query.all(&self.db).await?;
        Ok(centers.into_iter().map(CostCenterRecord::from).collect())
    }

    /// Records an allocation from a cost center to a project.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAllocationAmount` unless the amount is positive, and
    /// `CostCenterNotFound` for an unknown center.
    #[instrument(skip(self, input), fields(cost_center_id = %input.cost_center_id, project_id = %input.project_id))]
    pub async fn record_allocation(&self, input: RecordAllocationInput) -> Result<AllocationRecord, CostCenterError> {
        let basis = CostCenterService::resolve_allocation(&input)?;

        let center = cost_centers::Entity::find_by_id(input.cost_center_id)
            .count(&self.db)
            .await?;
        if center == 0 {
            return Err(AggregationError::CostCenterNotFound(input.cost_center_id).into());
        }

        let allocation = cost_allocations::ActiveModel {
            id: Set(Uuid::new_v4()),
            cost_center_id: Set(input.cost_center_id),
            project_id: Set(input.project_id),
            amount: Set(input.amount),
            allocation_type: Set(input.allocation_type.into()),
            allocation_basis: Set(basis),
            effective_date: Set(input.effective_date),
            created_at: Set(chrono::Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await?;

        info!(
            allocation_id = %allocation.id,
            amount = %allocation.amount,
            allocation_type = input.allocation_type.as_str(),
            "Cost allocation recorded"
        );
        Ok(allocation.into())
    }

    /// Allocations matching the optional filters, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn allocations(
        &self,
        cost_center_id: Option<Uuid>,
        project_id: Option<Uuid>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AllocationRecord>, CostCenterError> {
        let mut query = cost_allocations::Entity::find()
            .order_by_asc(cost_allocations::Column::EffectiveDate)
            .order_by_asc(cost_allocations::Column::CreatedAt);

        if let Some(cost_center_id) = cost_center_id {
            query = query.filter(cost_allocations::Column::CostCenterId.eq(cost_center_id));
        }
        if let Some(project_id) = project_id {
            query = query.filter(cost_allocations::Column::ProjectId.eq(project_id));
        }
        if let Some(from) = from {
            query = query.filter(cost_allocations::Column::EffectiveDate.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(cost_allocations::Column::EffectiveDate.lte(to));
        }

        let allocations = query.all(&self.db).await?;
        Ok(allocations.into_iter().map(AllocationRecord::from).collect())
    }
}
