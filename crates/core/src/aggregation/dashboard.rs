//! Portfolio dashboard across the projects of a subsidiary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{ReportPeriod, exact_percent_of, percent_of};
use super::variance::{PerformanceMetrics, SummaryStatus, VarianceReport, VarianceSummary};

/// Maximum number of entries in `top_variances`.
pub const TOP_VARIANCE_LIMIT: usize = 5;

/// One project's line on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPerformance {
    /// Project.
    pub project_id: Uuid,
    /// Its variance totals.
    pub summary: VarianceSummary,
    /// Its derived metrics.
    pub performance: PerformanceMetrics,
}

/// Portfolio-wide aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// Projects analysed.
    pub total_projects: usize,
    /// Σ project budgets.
    pub total_budget: Decimal,
    /// Σ project actuals.
    pub total_actual: Decimal,
    /// Mean of project variance percentages.
    pub average_variance_percent: Decimal,
    /// Projects with variance % > 0.
    pub projects_over_budget: usize,
    /// Projects with variance % < 0.
    pub projects_under_budget: usize,
    /// Projects in CRITICAL status.
    pub critical_projects: usize,
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// A single project is critical.
    Critical,
    /// A large share of the portfolio is critical.
    Warning,
}

/// Dashboard alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Severity.
    pub level: AlertLevel,
    /// Project concerned, `None` for portfolio alerts.
    pub project_id: Option<Uuid>,
    /// Human-readable message.
    pub message: String,
}

/// Cost control grade from |average variance %|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostControlIndex {
    /// < 5.
    Excellent,
    /// < 10.
    Good,
    /// < 15.
    Fair,
    /// Otherwise.
    Poor,
}

impl CostControlIndex {
    /// Grade of an average variance percentage.
    #[must_use]
    pub fn from_average(average_variance_percent: Decimal) -> Self {
        let abs = average_variance_percent.abs();
        if abs < Decimal::from(5) {
            Self::Excellent
        } else if abs < Decimal::TEN {
            Self::Good
        } else if abs < Decimal::from(15) {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Headline indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardKpis {
    /// `total_actual / total_budget * 100`.
    pub budget_efficiency: Decimal,
    /// Share of non-critical projects, in percent.
    pub on_budget_percentage: Decimal,
    /// Cost control grade.
    pub cost_control_index: CostControlIndex,
}

/// Portfolio dashboard for a subsidiary and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioDashboard {
    /// Subsidiary.
    pub subsidiary_id: Uuid,
    /// Report window.
    pub period: ReportPeriod,
    /// Aggregates.
    pub metrics: PortfolioMetrics,
    /// Per-project lines, in project id order.
    pub projects: Vec<ProjectPerformance>,
    /// |%| > 5, largest first.
    pub top_variances: Vec<ProjectPerformance>,
    /// Alerts.
    pub alerts: Vec<Alert>,
    /// Headline indicators.
    pub kpis: DashboardKpis,
}

impl ProjectPerformance {
    fn exact_variance_percent(&self) -> Decimal {
        exact_percent_of(self.summary.total_variance, self.summary.total_budget)
    }
}

/// Builds dashboards from per-project variance reports.
pub struct DashboardBuilder;

impl DashboardBuilder {
    /// Aggregates `reports`, which must all cover `period`.
    #[must_use]
    pub fn build(subsidiary_id: Uuid, period: ReportPeriod, reports: &[VarianceReport]) -> PortfolioDashboard {
        let mut projects: Vec<ProjectPerformance> = reports
            .iter()
            .map(|r| ProjectPerformance {
                project_id: r.project_id,
                summary: r.summary,
                performance: r.performance,
            })
            .collect();
        projects.sort_by_key(|p| p.project_id);

        let metrics = Self::metrics(&projects);

        let mut top_variances: Vec<ProjectPerformance> = projects
            .iter()
            .filter(|p| p.exact_variance_percent().abs() > Decimal::from(5))
            .cloned()
            .collect();
        top_variances.sort_by(|a, b| {
            b.exact_variance_percent()
                .abs()
                .cmp(&a.exact_variance_percent().abs())
        });
        top_variances.truncate(TOP_VARIANCE_LIMIT);

        let alerts = Self::alerts(&projects, &metrics);

        let kpis = DashboardKpis {
            budget_efficiency: percent_of(metrics.total_actual, metrics.total_budget),
            on_budget_percentage: percent_of(
                Decimal::from(metrics.total_projects - metrics.critical_projects),
                Decimal::from(metrics.total_projects),
            ),
            cost_control_index: CostControlIndex::from_average(metrics.average_variance_percent),
        };

        PortfolioDashboard {
            subsidiary_id,
            period,
            metrics,
            projects,
            top_variances,
            alerts,
            kpis,
        }
    }

    fn metrics(projects: &[ProjectPerformance]) -> PortfolioMetrics {
        let total_projects = projects.len();
        let sum_percent: Decimal = projects.iter().map(|p| p.summary.total_variance_percent).sum();
        let average_variance_percent = if total_projects == 0 {
            Decimal::ZERO
        } else {
            (sum_percent / Decimal::from(total_projects)).round_dp(2)
        };

        PortfolioMetrics {
            total_projects,
            total_budget: projects.iter().map(|p| p.summary.total_budget).sum(),
            total_actual: projects.iter().map(|p| p.summary.total_actual).sum(),
            average_variance_percent,
            projects_over_budget: projects
                .iter()
                .filter(|p| p.summary.total_variance_percent > Decimal::ZERO)
                .count(),
            projects_under_budget: projects
                .iter()
                .filter(|p| p.summary.total_variance_percent < Decimal::ZERO)
                .count(),
            critical_projects: projects
                .iter()
                .filter(|p| p.summary.status == SummaryStatus::Critical)
                .count(),
        }
    }

    fn alerts(projects: &[ProjectPerformance], metrics: &PortfolioMetrics) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = projects
            .iter()
            .filter(|p| p.summary.status == SummaryStatus::Critical)
            .map(|p| Alert {
                level: AlertLevel::Critical,
                project_id: Some(p.project_id),
                message: format!(
                    "Project {} has critical budget variance of {}%",
                    p.project_id,
                    p.summary.total_variance_percent.round_dp(1)
                ),
            })
            .collect();

        // critical > 30% of projects, compared in integers: critical * 10 > total * 3
        if metrics.critical_projects * 10 > metrics.total_projects * 3 {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                project_id: None,
                message: format!(
                    "{} out of {} projects have critical variances",
                    metrics.critical_projects, metrics.total_projects
                ),
            });
        }

        alerts
    }
}
