//! Report repository: snapshot reads feeding the aggregation engines.
//!
//! Every report opens one `REPEATABLE READ, READ ONLY` transaction and
//! reads all of its lines, budgets and allocations through it, so a report
//! never mixes data from two points in time. Lines are read with a single
//! join of lines, entries and accounts filtered in SQL; no entry id list is
//! ever bound. Nothing here writes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use kontra_core::aggregation::{
    AggregationError, AllocationRecord, AllocationReport, BudgetRecord, BudgetService, CostCenterPerformance,
    CostCenterRecord, CostCenterService, DashboardBuilder, PortfolioDashboard, ProfitabilityEngine,
    ProfitabilityReport, ReportLine, ReportPeriod, TrialBalance, VarianceEngine, VarianceReport,
};
use kontra_shared::AppError;
use rust_decimal::Decimal;
use sea_orm::{
    AccessMode, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    FromQueryResult, IsolationLevel, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    TransactionTrait,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::{
    chart_of_accounts, cost_allocations, cost_centers, journal_entries, journal_entry_lines, project_budgets,
    sea_orm_active_enums::{AccountType, EntryStatus, NormalBalance},
};

/// Error types for report operations.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// A report rule rejected the request.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Stored budget categories could not be decoded.
    #[error("Invalid budget categories: {0}")]
    Categories(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Aggregation(e) => e.into(),
            ReportError::Categories(e) => Self::Internal(e.to_string()),
            ReportError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Entry statuses whose lines count toward balances and reports.
const BALANCE_STATUSES: [EntryStatus; 2] = [EntryStatus::Posted, EntryStatus::Reversed];

/// Largest project set bound into one report query.
const PROJECT_BATCH: usize = 1_000;

/// One joined line/entry/account row.
#[derive(Debug, FromQueryResult)]
struct ReportLineRow {
    account_id: Uuid,
    code: String,
    name: String,
    account_type: AccountType,
    sub_type: Option<String>,
    normal_balance: NormalBalance,
    debit_amount: Decimal,
    credit_amount: Decimal,
    entry_date: NaiveDate,
    line_project_id: Option<Uuid>,
    entry_project_id: Option<Uuid>,
    cost_center_id: Option<Uuid>,
}

impl From<ReportLineRow> for ReportLine {
    fn from(row: ReportLineRow) -> Self {
        Self {
            account_id: row.account_id,
            account_code: row.code,
            account_name: row.name,
            account_type: row.account_type.into(),
            sub_type: row.sub_type,
            normal_balance: row.normal_balance.into(),
            debit: row.debit_amount,
            credit: row.credit_amount,
            entry_date: row.entry_date,
            // An untagged line belongs to its entry's project
            project_id: row.line_project_id.or(row.entry_project_id),
            cost_center_id: row.cost_center_id,
        }
    }
}

/// Which lines a report reads.
#[derive(Debug, Clone, Copy)]
enum LineScope<'a> {
    /// Every line.
    All,
    /// Lines whose effective project is in the set.
    Projects(&'a [Uuid]),
    /// Lines tagged with the cost center.
    CostCenter(Uuid),
}

/// Lines whose own project, or their entry's when untagged, is in `ids`.
fn project_condition(ids: &[Uuid]) -> Condition {
    Condition::any()
        .add(journal_entry_lines::Column::ProjectId.is_in(ids.iter().copied()))
        .add(
            Condition::all()
                .add(journal_entry_lines::Column::ProjectId.is_null())
                .add(journal_entries::Column::ProjectId.is_in(ids.iter().copied())),
        )
}

/// Repository for read-only reports.
#[derive(Debug, Clone)]
pub struct AggregationRepository {
    db: DatabaseConnection,
}

impl AggregationRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn snapshot(&self) -> Result<DatabaseTransaction, DbErr> {
        self.db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
            .await
    }

    /// Budget variance of one project.
    ///
    /// A project without a budget overlapping the window reports zero
    /// budgets and its actuals.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` if `start` is after `end`.
    #[instrument(skip(self))]
    pub async fn variance_analysis(
        &self,
        project_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<VarianceReport, ReportError> {
        let period = ReportPeriod::new(start, end)?;

        let txn = self.snapshot().await?;
        let lines = Self::report_lines(&txn, Some(start), end, LineScope::Projects(&[project_id])).await?;
        let budgets = Self::budgets_of(&txn, &[project_id]).await?;
        txn.commit().await?;

        let budget = BudgetService::select_for_period(&budgets, &period);
        let report = VarianceEngine::analyze(project_id, period, budget, &lines);
        debug!(
            lines = lines.len(),
            budget_id = ?budget.map(|b| b.id),
            total_variance = %report.summary.total_variance,
            "Variance analysis computed"
        );
        Ok(report)
    }

    /// Spend of one cost center against its limit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` or `CostCenterNotFound`.
    #[instrument(skip(self))]
    pub async fn cost_center_performance(
        &self,
        cost_center_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CostCenterPerformance, ReportError> {
        let period = ReportPeriod::new(start, end)?;

        let txn = self.snapshot().await?;
        let center: CostCenterRecord = cost_centers::Entity::find_by_id(cost_center_id)
            .one(&txn)
            .await?
            .ok_or(AggregationError::CostCenterNotFound(cost_center_id))?
            .into();
        let lines = Self::report_lines(&txn, Some(start), end, LineScope::CostCenter(cost_center_id)).await?;
        txn.commit().await?;

        let performance = CostCenterService::performance(&center, period, &lines);
        debug!(code = %center.code, actual = %performance.actual, "Cost center performance computed");
        Ok(performance)
    }

    /// Variance of every project of a subsidiary, aggregated.
    ///
    /// The project set is the union of projects with a budget of the
    /// subsidiary overlapping the window and projects on posted entries of
    /// the subsidiary inside the window.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` if `start` is after `end`.
    #[instrument(skip(self))]
    pub async fn portfolio_dashboard(
        &self,
        subsidiary_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PortfolioDashboard, ReportError> {
        let period = ReportPeriod::new(start, end)?;

        let txn = self.snapshot().await?;

        let mut projects: BTreeSet<Uuid> = project_budgets::Entity::find()
            .select_only()
            .column(project_budgets::Column::ProjectId)
            .filter(project_budgets::Column::SubsidiaryId.eq(subsidiary_id))
            .filter(project_budgets::Column::PeriodStart.lte(end))
            .filter(project_budgets::Column::PeriodEnd.gte(start))
            .into_tuple::<Uuid>()
            .all(&txn)
            .await?
            .into_iter()
            .collect();
        projects.extend(Self::subsidiary_projects(&txn, subsidiary_id, start, end).await?);

        let project_ids: Vec<Uuid> = projects.into_iter().collect();
        let lines = Self::report_lines(&txn, Some(start), end, LineScope::Projects(&project_ids)).await?;
        let budgets = Self::budgets_of(&txn, &project_ids).await?;
        txn.commit().await?;

        let mut by_project: BTreeMap<Uuid, Vec<BudgetRecord>> = BTreeMap::new();
        for budget in budgets {
            by_project.entry(budget.project_id).or_default().push(budget);
        }

        let reports: Vec<VarianceReport> = project_ids
            .iter()
            .map(|project_id| {
                let budget = by_project
                    .get(project_id)
                    .and_then(|b| BudgetService::select_for_period(b, &period));
                VarianceEngine::analyze(*project_id, period, budget, &lines)
            })
            .collect();

        let dashboard = DashboardBuilder::build(subsidiary_id, period, &reports);
        debug!(
            projects = reports.len(),
            critical = dashboard.metrics.critical_projects,
            "Portfolio dashboard computed"
        );
        Ok(dashboard)
    }

    /// Revenue against cost of one project.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` if `start` is after `end`.
    #[instrument(skip(self))]
    pub async fn project_profitability(
        &self,
        project_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ProfitabilityReport, ReportError> {
        let period = ReportPeriod::new(start, end)?;

        let txn = self.snapshot().await?;
        let lines = Self::report_lines(&txn, Some(start), end, LineScope::Projects(&[project_id])).await?;
        txn.commit().await?;

        let report = ProfitabilityEngine::compute(project_id, period, &lines);
        debug!(revenue = %report.total_revenue, costs = %report.total_costs, "Project profitability computed");
        Ok(report)
    }

    /// Trial balance over every balance-affecting entry dated on or before
    /// `as_of`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[instrument(skip(self))]
    pub async fn trial_balance(&self, as_of: NaiveDate) -> Result<TrialBalance, ReportError> {
        let txn = self.snapshot().await?;
        let lines = Self::report_lines(&txn, None, as_of, LineScope::All).await?;
        txn.commit().await?;

        let trial_balance = TrialBalance::build(as_of, &lines);
        debug!(
            rows = trial_balance.rows.len(),
            total_debit = %trial_balance.total_debit,
            balanced = trial_balance.is_balanced(),
            "Trial balance computed"
        );
        Ok(trial_balance)
    }

    /// Allocation totals by type, project and month.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` if `start` is after `end`.
    #[instrument(skip(self))]
    pub async fn allocation_report(
        &self,
        cost_center_id: Option<Uuid>,
        project_id: Option<Uuid>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AllocationReport, ReportError> {
        let period = ReportPeriod::new(start, end)?;

        let txn = self.snapshot().await?;
        let mut query = cost_allocations::Entity::find()
            .filter(cost_allocations::Column::EffectiveDate.gte(start))
            .filter(cost_allocations::Column::EffectiveDate.lte(end));
        if let Some(cost_center_id) = cost_center_id {
            query = query.filter(cost_allocations::Column::CostCenterId.eq(cost_center_id));
        }
        if let Some(project_id) = project_id {
            query = query.filter(cost_allocations::Column::ProjectId.eq(project_id));
        }
        let allocations: Vec<AllocationRecord> = query
            .all(&txn)
            .await?
            .into_iter()
            .map(AllocationRecord::from)
            .collect();
        txn.commit().await?;

        Ok(CostCenterService::allocation_report(
            &allocations,
            cost_center_id,
            project_id,
            period,
        ))
    }

    /// Balance-affecting lines dated in `[from, to]` within `scope`.
    ///
    /// A project set is bound in batches of [`PROJECT_BATCH`]; every batch
    /// reads the same snapshot.
    async fn report_lines(
        txn: &DatabaseTransaction,
        from: Option<NaiveDate>,
        to: NaiveDate,
        scope: LineScope<'_>,
    ) -> Result<Vec<ReportLine>, DbErr> {
        match scope {
            LineScope::All => Self::joined_lines(txn, from, to, None).await,
            LineScope::CostCenter(cost_center_id) => {
                let condition = Condition::all().add(journal_entry_lines::Column::CostCenterId.eq(cost_center_id));
                Self::joined_lines(txn, from, to, Some(condition)).await
            }
            LineScope::Projects(project_ids) => {
                let mut lines = Vec::new();
                for batch in project_ids.chunks(PROJECT_BATCH) {
                    lines.extend(Self::joined_lines(txn, from, to, Some(project_condition(batch))).await?);
                }
                Ok(lines)
            }
        }
    }

    async fn joined_lines(
        txn: &DatabaseTransaction,
        from: Option<NaiveDate>,
        to: NaiveDate,
        condition: Option<Condition>,
    ) -> Result<Vec<ReportLine>, DbErr> {
        let mut query = journal_entry_lines::Entity::find()
            .select_only()
            .column(journal_entry_lines::Column::AccountId)
            .column(chart_of_accounts::Column::Code)
            .column(chart_of_accounts::Column::Name)
            .column(chart_of_accounts::Column::AccountType)
            .column(chart_of_accounts::Column::SubType)
            .column(chart_of_accounts::Column::NormalBalance)
            .column(journal_entry_lines::Column::DebitAmount)
            .column(journal_entry_lines::Column::CreditAmount)
            .column(journal_entries::Column::EntryDate)
            .column_as(journal_entry_lines::Column::ProjectId, "line_project_id")
            .column_as(journal_entries::Column::ProjectId, "entry_project_id")
            .column(journal_entry_lines::Column::CostCenterId)
            .join(JoinType::InnerJoin, journal_entry_lines::Relation::JournalEntries.def())
            .join(JoinType::InnerJoin, journal_entry_lines::Relation::ChartOfAccounts.def())
            .filter(journal_entries::Column::Status.is_in(BALANCE_STATUSES))
            .filter(journal_entries::Column::EntryDate.lte(to));
        if let Some(from) = from {
            query = query.filter(journal_entries::Column::EntryDate.gte(from));
        }
        if let Some(condition) = condition {
            query = query.filter(condition);
        }

        let rows = query
            .order_by_asc(journal_entries::Column::EntryDate)
            .order_by_asc(journal_entry_lines::Column::JournalEntryId)
            .order_by_asc(journal_entry_lines::Column::LineNumber)
            .into_model::<ReportLineRow>()
            .all(txn)
            .await?;
        Ok(rows.into_iter().map(ReportLine::from).collect())
    }

    /// Every budget revision of the given projects, bound in batches of
    /// [`PROJECT_BATCH`].
    async fn budgets_of(txn: &DatabaseTransaction, project_ids: &[Uuid]) -> Result<Vec<BudgetRecord>, ReportError> {
        let mut models = Vec::new();
        for batch in project_ids.chunks(PROJECT_BATCH) {
            models.extend(
                project_budgets::Entity::find()
                    .filter(project_budgets::Column::ProjectId.is_in(batch.iter().copied()))
                    .all(txn)
                    .await?,
            );
        }
        models
            .into_iter()
            .map(|m| BudgetRecord::try_from(m).map_err(ReportError::from))
            .collect()
    }

    /// Projects tagged on posted entries of a subsidiary, or on their lines.
    async fn subsidiary_projects(
        txn: &DatabaseTransaction,
        subsidiary_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeSet<Uuid>, DbErr> {
        let tags: Vec<(Option<Uuid>, Option<Uuid>)> = journal_entry_lines::Entity::find()
            .select_only()
            .column_as(journal_entry_lines::Column::ProjectId, "line_project_id")
            .column_as(journal_entries::Column::ProjectId, "entry_project_id")
            .join(JoinType::InnerJoin, journal_entry_lines::Relation::JournalEntries.def())
            .filter(journal_entries::Column::SubsidiaryId.eq(subsidiary_id))
            .filter(journal_entries::Column::Status.is_in(BALANCE_STATUSES))
            .filter(journal_entries::Column::EntryDate.gte(start))
            .filter(journal_entries::Column::EntryDate.lte(end))
            .filter(
                Condition::any()
                    .add(journal_entry_lines::Column::ProjectId.is_not_null())
                    .add(journal_entries::Column::ProjectId.is_not_null()),
            )
            .distinct()
            .into_tuple()
            .all(txn)
            .await?;

        Ok(tags
            .into_iter()
            .flat_map(|(line, entry)| [line, entry])
            .flatten()
            .collect())
    }
}
