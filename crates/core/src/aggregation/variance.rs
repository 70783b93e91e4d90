//! Budget-vs-actual variance analysis for one project.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::budget::BudgetRecord;
use super::classify::{BudgetCategory, Classification, classify};
use super::types::{ReportLine, ReportPeriod, exact_percent_of};
use crate::coa::AccountType;

/// Category status from |variance %|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarianceStatus {
    /// |%| ≤ 5.
    Acceptable,
    /// 5 < |%| ≤ 10.
    Moderate,
    /// |%| > 10.
    Significant,
}

impl VarianceStatus {
    /// Status of a variance percentage.
    #[must_use]
    pub fn from_percent(variance_percent: Decimal) -> Self {
        let abs = variance_percent.abs();
        if abs > Decimal::TEN {
            Self::Significant
        } else if abs > Decimal::from(5) {
            Self::Moderate
        } else {
            Self::Acceptable
        }
    }
}

/// Project status from |total variance %|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryStatus {
    /// |%| ≤ 10.
    Normal,
    /// 10 < |%| ≤ 15.
    Warning,
    /// |%| > 15.
    Critical,
}

impl SummaryStatus {
    /// Status of a total variance percentage.
    #[must_use]
    pub fn from_percent(variance_percent: Decimal) -> Self {
        let abs = variance_percent.abs();
        if abs > Decimal::from(15) {
            Self::Critical
        } else if abs > Decimal::TEN {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

/// Whether the project as a whole is over or under budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostEfficiency {
    /// Total variance below zero.
    UnderBudget,
    /// Total variance zero or above.
    OverBudget,
}

/// Recommendation urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// Address immediately.
    Critical,
    /// Address soon.
    High,
    /// Review.
    Medium,
}

/// Actionable finding attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Urgency.
    pub priority: Priority,
    /// Area the finding concerns, e.g. `materials` or `BUDGET_CONTROL`.
    pub area: String,
    /// What is wrong.
    pub issue: String,
    /// What to do.
    pub action: String,
    /// Why it matters.
    pub expected_impact: String,
}

/// Budget vs actual for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVariance {
    /// Category.
    pub category: BudgetCategory,
    /// Budgeted amount.
    pub budget: Decimal,
    /// Σ over accounts of |Σ(debit − credit)| of the category's lines.
    pub actual: Decimal,
    /// `actual - budget`.
    pub variance: Decimal,
    /// `variance / budget * 100`, zero when the budget is zero.
    pub variance_percent: Decimal,
    /// Tri-level status.
    pub status: VarianceStatus,
    /// Lines counted.
    pub line_count: u64,
}

/// Actuals that matched no classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnclassifiedActual {
    /// Σ over accounts of |Σ(debit − credit)| of the unmatched lines.
    pub actual: Decimal,
    /// Lines counted.
    pub line_count: u64,
    /// Codes of the unmatched accounts, sorted.
    pub account_codes: Vec<String>,
}

/// Project-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceSummary {
    /// Budget total.
    pub total_budget: Decimal,
    /// Actual total across categories and the unclassified bucket.
    pub total_actual: Decimal,
    /// `total_actual - total_budget`.
    pub total_variance: Decimal,
    /// `total_variance / total_budget * 100`.
    pub total_variance_percent: Decimal,
    /// CRITICAL / WARNING / NORMAL.
    pub status: SummaryStatus,
}

/// Derived performance figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// `total_actual / total_budget * 100`.
    pub budget_utilization: Decimal,
    /// Over or under budget.
    pub cost_efficiency: CostEfficiency,
    /// Number of SIGNIFICANT categories.
    pub critical_variances: usize,
}

/// Full variance report for a project and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceReport {
    /// Project analysed.
    pub project_id: Uuid,
    /// Report window.
    pub period: ReportPeriod,
    /// Budget row used, if any.
    pub budget_id: Option<Uuid>,
    /// Its revision number.
    pub budget_revision: Option<u32>,
    /// Totals.
    pub summary: VarianceSummary,
    /// One row per category, in report order.
    pub categories: Vec<CategoryVariance>,
    /// Actuals no rule matched.
    pub unclassified: UnclassifiedActual,
    /// Derived metrics.
    pub performance: PerformanceMetrics,
    /// Findings.
    pub recommendations: Vec<Recommendation>,
}

impl VarianceReport {
    /// Variance row of `category`.
    #[must_use]
    pub fn category(&self, category: BudgetCategory) -> Option<&CategoryVariance> {
        self.categories.iter().find(|c| c.category == category)
    }
}

#[derive(Default)]
struct Bucket {
    // Net per account code; each account contributes its absolute net.
    net_by_account: BTreeMap<String, Decimal>,
    lines: u64,
}

impl Bucket {
    fn actual(&self) -> Decimal {
        self.net_by_account.values().map(|net| net.abs()).sum()
    }
}

/// Computes variance reports from snapshot data.
pub struct VarianceEngine;

impl VarianceEngine {
    /// Analyses `lines` against `budget` for `project_id` over `period`.
    ///
    /// Lines outside the window, of other projects, or on non-expense
    /// accounts are ignored. A missing budget yields zero budgets with
    /// actuals still reported.
    #[must_use]
    pub fn analyze(
        project_id: Uuid,
        period: ReportPeriod,
        budget: Option<&BudgetRecord>,
        lines: &[ReportLine],
    ) -> VarianceReport {
        let mut buckets: BTreeMap<BudgetCategory, Bucket> = BTreeMap::new();
        let mut unclassified = Bucket::default();
        let mut unclassified_codes: Vec<String> = Vec::new();

        for line in lines.iter().filter(|l| {
            l.account_type == AccountType::Expense
                && l.project_id == Some(project_id)
                && period.contains(l.entry_date)
        }) {
            let bucket = match classify(&line.account_name, line.sub_type.as_deref()) {
                Classification::Category(category) => buckets.entry(category).or_default(),
                Classification::Unclassified => {
                    unclassified_codes.push(line.account_code.clone());
                    &mut unclassified
                }
            };
            *bucket.net_by_account.entry(line.account_code.clone()).or_default() += line.net();
            bucket.lines += 1;
        }

        let categories: Vec<CategoryVariance> = BudgetCategory::ALL
            .into_iter()
            .map(|category| {
                let budgeted = budget.map_or(Decimal::ZERO, |b| b.plan.amount_for(category));
                let (actual, line_count) = buckets
                    .get(&category)
                    .map_or((Decimal::ZERO, 0), |b| (b.actual(), b.lines));
                let variance = actual - budgeted;
                let exact = exact_percent_of(variance, budgeted);
                CategoryVariance {
                    category,
                    budget: budgeted,
                    actual,
                    variance,
                    variance_percent: exact.round_dp(2),
                    status: VarianceStatus::from_percent(exact),
                    line_count,
                }
            })
            .collect();

        unclassified_codes.sort();
        unclassified_codes.dedup();
        let unclassified = UnclassifiedActual {
            actual: unclassified.actual(),
            line_count: unclassified.lines,
            account_codes: unclassified_codes,
        };

        let total_budget = budget.map_or(Decimal::ZERO, |b| b.plan.total_budget);
        let total_actual =
            categories.iter().map(|c| c.actual).sum::<Decimal>() + unclassified.actual;
        let total_variance = total_actual - total_budget;
        let total_variance_exact = exact_percent_of(total_variance, total_budget);
        let summary = VarianceSummary {
            total_budget,
            total_actual,
            total_variance,
            total_variance_percent: total_variance_exact.round_dp(2),
            status: SummaryStatus::from_percent(total_variance_exact),
        };

        let utilization_exact = exact_percent_of(total_actual, total_budget);
        let performance = PerformanceMetrics {
            budget_utilization: utilization_exact.round_dp(2),
            cost_efficiency: if total_variance < Decimal::ZERO {
                CostEfficiency::UnderBudget
            } else {
                CostEfficiency::OverBudget
            },
            critical_variances: categories
                .iter()
                .filter(|c| c.status == VarianceStatus::Significant)
                .count(),
        };

        let recommendations = Self::recommendations(&categories, utilization_exact);

        VarianceReport {
            project_id,
            period,
            budget_id: budget.map(|b| b.id),
            budget_revision: budget.map(|b| b.revision_number),
            summary,
            categories,
            unclassified,
            performance,
            recommendations,
        }
    }

    fn recommendations(categories: &[CategoryVariance], utilization: Decimal) -> Vec<Recommendation> {
        let mut out: Vec<Recommendation> = categories
            .iter()
            .filter(|c| c.status == VarianceStatus::Significant)
            .map(|c| {
                if c.variance > Decimal::ZERO {
                    Recommendation {
                        priority: Priority::High,
                        area: c.category.as_str().to_string(),
                        issue: format!("{} costs are {}% over budget", c.category, c.variance_percent.round_dp(1)),
                        action: format!("Review {} procurement and usage patterns", c.category),
                        expected_impact: "Cost reduction and better budget control".to_string(),
                    }
                } else {
                    Recommendation {
                        priority: Priority::Medium,
                        area: c.category.as_str().to_string(),
                        issue: format!(
                            "{} costs are {}% under budget",
                            c.category,
                            c.variance_percent.abs().round_dp(1)
                        ),
                        action: "Assess if quality or project scope is being compromised".to_string(),
                        expected_impact: "Ensure project quality and completion".to_string(),
                    }
                }
            })
            .collect();

        if utilization > Decimal::from(110) {
            out.push(Recommendation {
                priority: Priority::Critical,
                area: "BUDGET_CONTROL".to_string(),
                issue: "Total budget exceeded by significant margin".to_string(),
                action: "Implement immediate cost control measures and revised budget approval".to_string(),
                expected_impact: "Prevent further budget overruns".to_string(),
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::budget::BudgetService;
    use crate::coa::NormalBalance;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn q1() -> ReportPeriod {
        ReportPeriod::new(date(1, 1), date(3, 31)).unwrap()
    }

    fn budget(project_id: Uuid, total: Decimal) -> BudgetRecord {
        BudgetRecord {
            id: Uuid::new_v4(),
            project_id,
            subsidiary_id: None,
            period_start: date(1, 1),
            period_end: date(12, 31),
            revision_number: 1,
            plan: BudgetService::plan(total, None, dec!(1000000000)).unwrap(),
        }
    }

    fn expense(project_id: Uuid, code: &str, name: &str, debit: Decimal, credit: Decimal, on: NaiveDate) -> ReportLine {
        ReportLine {
            account_id: Uuid::new_v4(),
            account_code: code.to_string(),
            account_name: name.to_string(),
            account_type: AccountType::Expense,
            sub_type: None,
            normal_balance: NormalBalance::Debit,
            debit,
            credit,
            entry_date: on,
            project_id: Some(project_id),
            cost_center_id: None,
        }
    }

    #[test]
    fn test_materials_overrun_is_significant() {
        let project = Uuid::new_v4();
        // Materials budget: 40% of 100,000,000
        let b = budget(project, dec!(100000000));
        let lines = vec![
            expense(project, "5101.01", "Beban Material", dec!(30000000), Decimal::ZERO, date(1, 10)),
            expense(project, "5101.01", "Beban Material", dec!(14500000), Decimal::ZERO, date(2, 10)),
        ];

        let report = VarianceEngine::analyze(project, q1(), Some(&b), &lines);
        let materials = report.category(BudgetCategory::Materials).unwrap();

        assert_eq!(materials.budget, dec!(40000000));
        assert_eq!(materials.actual, dec!(44500000));
        assert_eq!(materials.variance, dec!(4500000));
        assert_eq!(materials.variance_percent, dec!(11.25));
        assert_eq!(materials.status, VarianceStatus::Significant);
        assert_eq!(materials.line_count, 2);

        assert_eq!(report.performance.critical_variances, 7);
        assert_eq!(report.recommendations[0].priority, Priority::High);
        assert_eq!(report.recommendations[0].area, "materials");
    }

    #[test]
    fn test_lines_outside_scope_are_ignored() {
        let project = Uuid::new_v4();
        let other = Uuid::new_v4();
        let b = budget(project, dec!(1000));
        let mut revenue = expense(project, "4101", "Pendapatan Material", Decimal::ZERO, dec!(999), date(1, 5));
        revenue.account_type = AccountType::Revenue;
        let lines = vec![
            expense(other, "5101", "Beban Material", dec!(100), Decimal::ZERO, date(1, 5)),
            expense(project, "5101", "Beban Material", dec!(100), Decimal::ZERO, date(4, 1)),
            revenue,
        ];

        let report = VarianceEngine::analyze(project, q1(), Some(&b), &lines);
        assert_eq!(report.summary.total_actual, Decimal::ZERO);
        assert_eq!(report.summary.total_variance, dec!(-1000));
        assert_eq!(report.performance.cost_efficiency, CostEfficiency::UnderBudget);
    }

    #[test]
    fn test_credits_net_against_debits() {
        let project = Uuid::new_v4();
        let b = budget(project, dec!(1000));
        let lines = vec![
            expense(project, "5102", "Upah Tukang", dec!(300), Decimal::ZERO, date(1, 5)),
            expense(project, "5102", "Upah Tukang", Decimal::ZERO, dec!(50), date(1, 6)),
        ];
        let report = VarianceEngine::analyze(project, q1(), Some(&b), &lines);
        assert_eq!(report.category(BudgetCategory::Labor).unwrap().actual, dec!(250));
    }

    #[test]
    fn test_each_account_contributes_its_absolute_net() {
        let project = Uuid::new_v4();
        let b = budget(project, dec!(1000));
        // A credit-heavy refund account must not cancel the other material spend
        let lines = vec![
            expense(project, "5101.01", "Beban Material Besi", dec!(300), Decimal::ZERO, date(1, 5)),
            expense(project, "5101.02", "Beban Material Retur", Decimal::ZERO, dec!(100), date(1, 6)),
        ];
        let report = VarianceEngine::analyze(project, q1(), Some(&b), &lines);
        let materials = report.category(BudgetCategory::Materials).unwrap();
        assert_eq!(materials.actual, dec!(400));
        assert_eq!(materials.line_count, 2);
        assert_eq!(report.summary.total_actual, dec!(400));
    }

    #[test]
    fn test_status_uses_unrounded_percentage() {
        let project = Uuid::new_v4();
        // Materials budget 40,000 and actual 44,001.60: 10.004% displays as 10.00
        let b = budget(project, dec!(100000));
        let lines = vec![expense(project, "5101", "Beban Material", dec!(44001.60), Decimal::ZERO, date(1, 5))];
        let report = VarianceEngine::analyze(project, q1(), Some(&b), &lines);
        let materials = report.category(BudgetCategory::Materials).unwrap();
        assert_eq!(materials.variance_percent, dec!(10.00));
        assert_eq!(materials.status, VarianceStatus::Significant);
    }

    #[test]
    fn test_summary_status_just_above_thresholds() {
        let project = Uuid::new_v4();
        let b = budget(project, dec!(100000));

        let warning = vec![expense(project, "5101", "Beban Material", dec!(110004), Decimal::ZERO, date(1, 5))];
        let report = VarianceEngine::analyze(project, q1(), Some(&b), &warning);
        assert_eq!(report.summary.total_variance_percent, dec!(10.00));
        assert_eq!(report.summary.status, SummaryStatus::Warning);

        let critical = vec![expense(project, "5101", "Beban Material", dec!(115004), Decimal::ZERO, date(1, 5))];
        let report = VarianceEngine::analyze(project, q1(), Some(&b), &critical);
        assert_eq!(report.summary.total_variance_percent, dec!(15.00));
        assert_eq!(report.summary.status, SummaryStatus::Critical);
    }

    #[test]
    fn test_unclassified_counts_in_totals() {
        let project = Uuid::new_v4();
        let b = budget(project, dec!(1000));
        let lines = vec![
            expense(project, "5301", "Beban Lain-lain", dec!(70), Decimal::ZERO, date(2, 1)),
            expense(project, "5301", "Beban Lain-lain", dec!(30), Decimal::ZERO, date(2, 2)),
        ];
        let report = VarianceEngine::analyze(project, q1(), Some(&b), &lines);
        assert_eq!(report.unclassified.actual, dec!(100));
        assert_eq!(report.unclassified.line_count, 2);
        assert_eq!(report.unclassified.account_codes, vec!["5301".to_string()]);
        assert_eq!(report.summary.total_actual, dec!(100));
        let categorized: Decimal = report.categories.iter().map(|c| c.actual).sum();
        assert_eq!(categorized, Decimal::ZERO);
    }

    #[test]
    fn test_missing_budget_reports_actuals() {
        let project = Uuid::new_v4();
        let lines = vec![expense(project, "5101", "Beban Material", dec!(500), Decimal::ZERO, date(1, 1))];
        let report = VarianceEngine::analyze(project, q1(), None, &lines);

        assert!(report.budget_id.is_none());
        assert_eq!(report.summary.total_budget, Decimal::ZERO);
        assert_eq!(report.summary.total_actual, dec!(500));
        assert_eq!(report.summary.total_variance_percent, Decimal::ZERO);
        assert_eq!(report.summary.status, SummaryStatus::Normal);
        let materials = report.category(BudgetCategory::Materials).unwrap();
        assert_eq!(materials.variance_percent, Decimal::ZERO);
        assert_eq!(materials.status, VarianceStatus::Acceptable);
    }

    #[test]
    fn test_summary_status_and_budget_control_recommendation() {
        let project = Uuid::new_v4();
        let b = budget(project, dec!(1000));
        let lines = vec![expense(project, "5101", "Beban Material", dec!(1200), Decimal::ZERO, date(3, 1))];
        let report = VarianceEngine::analyze(project, q1(), Some(&b), &lines);

        assert_eq!(report.summary.total_variance_percent, dec!(20));
        assert_eq!(report.summary.status, SummaryStatus::Critical);
        assert_eq!(report.performance.budget_utilization, dec!(120));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.priority == Priority::Critical && r.area == "BUDGET_CONTROL"));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.priority == Priority::Medium && r.area == "labor"));
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(VarianceStatus::from_percent(dec!(5)), VarianceStatus::Acceptable);
        assert_eq!(VarianceStatus::from_percent(dec!(-5.01)), VarianceStatus::Moderate);
        assert_eq!(VarianceStatus::from_percent(dec!(10)), VarianceStatus::Moderate);
        assert_eq!(VarianceStatus::from_percent(dec!(10.01)), VarianceStatus::Significant);
        assert_eq!(SummaryStatus::from_percent(dec!(10)), SummaryStatus::Normal);
        assert_eq!(SummaryStatus::from_percent(dec!(-15)), SummaryStatus::Warning);
        assert_eq!(SummaryStatus::from_percent(dec!(15.5)), SummaryStatus::Critical);
    }
}
