//! Read-only reporting over posted ledger lines.
//!
//! Every report is a pure function of one snapshot of lines, budgets,
//! cost centers and allocations. Budget and cost-center rules live here
//! too since they only feed the reports.

pub mod budget;
pub mod classify;
pub mod cost_center;
pub mod dashboard;
pub mod error;
pub mod profitability;
pub mod trial_balance;
pub mod types;
pub mod variance;

#[cfg(test)]
mod tests;

pub use budget::{
    BudgetPlan, BudgetRecord, BudgetService, CategoryAllocation, CreateBudgetInput, DEFAULT_PERCENTAGES,
    ReviseBudgetInput,
};
pub use classify::{BudgetCategory, Classification, classify};
pub use cost_center::{
    AllocationRecord, AllocationReport, AllocationType, CostCenterPerformance, CostCenterRecord, CostCenterService,
    CostCenterStatus, CostCenterType, CreateCostCenterInput, EfficiencyTier, RecordAllocationInput,
};
pub use dashboard::{
    Alert, AlertLevel, CostControlIndex, DashboardBuilder, DashboardKpis, PortfolioDashboard, PortfolioMetrics,
    ProjectPerformance, TOP_VARIANCE_LIMIT,
};
pub use error::AggregationError;
pub use profitability::{ProfitabilityEngine, ProfitabilityReport, RevenueShare};
pub use trial_balance::{TrialBalance, TrialBalanceRow};
pub use types::{ReportLine, ReportPeriod};
pub use variance::{
    CategoryVariance, CostEfficiency, PerformanceMetrics, Priority, Recommendation, SummaryStatus,
    UnclassifiedActual, VarianceEngine, VarianceReport, VarianceStatus, VarianceSummary,
};
