//! Property-based tests for the report engines.
//!
//! - Property 1: Classification Totality
//! - Property 2: Budget Plan Consistency
//! - Property 3: Variance Totals
//! - Property 4: Dashboard Counts

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::budget::{BudgetRecord, BudgetService};
use super::classify::{BudgetCategory, Classification, classify};
use super::dashboard::{DashboardBuilder, TOP_VARIANCE_LIMIT};
use super::types::{ReportLine, ReportPeriod, exact_percent_of};
use super::variance::{VarianceEngine, VarianceStatus};
use crate::coa::{AccountType, NormalBalance};

const THRESHOLD: Decimal = dec!(1000000000);

const NAMES: [&str; 10] = [
    "Beban Material",
    "Upah Tenaga Kerja",
    "Sewa Alat Berat",
    "Biaya Subkontraktor",
    "Asuransi Proyek",
    "Overhead Lapangan",
    "Biaya Administrasi",
    "Beban Lain-lain",
    "Perjalanan Dinas",
    "Material Handling Equipment",
];

fn period() -> ReportPeriod {
    ReportPeriod::new(
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
    )
    .unwrap()
}

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn expense_line() -> impl Strategy<Value = (usize, Decimal, bool, u32)> {
    (0..NAMES.len(), amount(), any::<bool>(), 1u32..=365)
}

fn to_line(project_id: Uuid, (name, amount, is_debit, day): (usize, Decimal, bool, u32)) -> ReportLine {
    let (debit, credit) = if is_debit {
        (amount, Decimal::ZERO)
    } else {
        (Decimal::ZERO, amount)
    };
    ReportLine {
        account_id: Uuid::from_u128(u128::try_from(name).unwrap() + 1),
        account_code: format!("51{name:02}"),
        account_name: NAMES[name].to_string(),
        account_type: AccountType::Expense,
        sub_type: None,
        normal_balance: NormalBalance::Debit,
        debit,
        credit,
        entry_date: NaiveDate::from_yo_opt(2026, day).unwrap(),
        project_id: Some(project_id),
        cost_center_id: None,
    }
}

fn budget(project_id: Uuid, total: Decimal) -> BudgetRecord {
    BudgetRecord {
        id: Uuid::new_v4(),
        project_id,
        subsidiary_id: None,
        period_start: period().start,
        period_end: period().end,
        revision_number: 1,
        plan: BudgetService::plan(total, None, THRESHOLD).unwrap(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// **Property 1.1: Every name and sub-type pair classifies without panicking, deterministically**
    #[test]
    fn prop_classification_is_total(name in ".{0,40}", sub_type in proptest::option::of("[A-Z_]{0,20}")) {
        let first = classify(&name, sub_type.as_deref());
        let second = classify(&name, sub_type.as_deref());
        prop_assert_eq!(first, second);
    }

    /// **Property 1.2: Classification ignores letter case**
    #[test]
    fn prop_classification_is_case_insensitive(idx in 0..NAMES.len()) {
        let name = NAMES[idx];
        prop_assert_eq!(classify(name, None), classify(&name.to_uppercase(), None));
    }

    /// **Property 1.3: A material keyword always lands in materials**
    #[test]
    fn prop_material_keyword_wins(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}") {
        let name = format!("{prefix}material{suffix}");
        prop_assert_eq!(classify(&name, None), Classification::Category(BudgetCategory::Materials));
    }

    /// **Property 2.1: Default plan amounts are the rounded share of the total**
    #[test]
    fn prop_plan_amounts_are_rounded_shares(total in amount()) {
        let plan = BudgetService::plan(total, None, THRESHOLD).unwrap();
        for allocation in &plan.categories {
            let expected = (total * allocation.percentage / Decimal::ONE_HUNDRED).round_dp(2);
            prop_assert_eq!(allocation.amount, expected);
        }
        let sum: Decimal = plan.categories.iter().map(|c| c.amount).sum();
        let drift = (sum - total).abs();
        prop_assert!(drift <= Decimal::new(7, 2), "drift {} too large", drift);
        prop_assert_eq!(plan.approval_required, total > THRESHOLD);
    }

    /// **Property 3.1: Category and unclassified actuals add up to the total**
    #[test]
    fn prop_variance_totals_add_up(
        total in amount(),
        raw in prop::collection::vec(expense_line(), 0..30),
    ) {
        let project = Uuid::new_v4();
        let lines: Vec<ReportLine> = raw.into_iter().map(|l| to_line(project, l)).collect();
        let b = budget(project, total);
        let report = VarianceEngine::analyze(project, period(), Some(&b), &lines);

        let categories: Decimal = report.categories.iter().map(|c| c.actual).sum();
        prop_assert_eq!(report.summary.total_actual, categories + report.unclassified.actual);
        prop_assert_eq!(report.summary.total_budget, total);
        prop_assert_eq!(
            report.summary.total_variance,
            report.summary.total_actual - report.summary.total_budget
        );

        for c in &report.categories {
            prop_assert_eq!(c.variance, c.actual - c.budget);
            prop_assert_eq!(c.status, VarianceStatus::from_percent(exact_percent_of(c.variance, c.budget)));
            prop_assert_eq!(c.variance_percent, exact_percent_of(c.variance, c.budget).round_dp(2));
        }

        let counted: u64 = report.categories.iter().map(|c| c.line_count).sum::<u64>() + report.unclassified.line_count;
        prop_assert_eq!(counted, lines.len() as u64);

        let significant = report
            .categories
            .iter()
            .filter(|c| c.status == VarianceStatus::Significant)
            .count();
        prop_assert_eq!(report.performance.critical_variances, significant);
    }

    /// **Property 3.2: Lines of other projects never change a report**
    #[test]
    fn prop_variance_ignores_other_projects(
        total in amount(),
        own in prop::collection::vec(expense_line(), 0..15),
        foreign in prop::collection::vec(expense_line(), 1..15),
    ) {
        let project = Uuid::new_v4();
        let other = Uuid::new_v4();
        let own: Vec<ReportLine> = own.into_iter().map(|l| to_line(project, l)).collect();
        let mut mixed = own.clone();
        mixed.extend(foreign.into_iter().map(|l| to_line(other, l)));

        let b = budget(project, total);
        let alone = VarianceEngine::analyze(project, period(), Some(&b), &own);
        let together = VarianceEngine::analyze(project, period(), Some(&b), &mixed);
        prop_assert_eq!(alone, together);
    }

    /// **Property 4.1: Dashboard counts stay within the project count**
    #[test]
    fn prop_dashboard_counts_are_bounded(
        projects in prop::collection::vec(
            (amount(), prop::collection::vec(expense_line(), 0..10)),
            0..12,
        ),
    ) {
        let reports: Vec<_> = projects
            .into_iter()
            .map(|(total, raw)| {
                let project = Uuid::new_v4();
                let lines: Vec<ReportLine> = raw.into_iter().map(|l| to_line(project, l)).collect();
                VarianceEngine::analyze(project, period(), Some(&budget(project, total)), &lines)
            })
            .collect();
        let dashboard = DashboardBuilder::build(Uuid::new_v4(), period(), &reports);
        let m = &dashboard.metrics;

        prop_assert_eq!(m.total_projects, reports.len());
        prop_assert!(m.projects_over_budget + m.projects_under_budget <= m.total_projects);
        prop_assert!(m.critical_projects <= m.total_projects);
        prop_assert!(dashboard.top_variances.len() <= TOP_VARIANCE_LIMIT);
        prop_assert!(
            dashboard
                .top_variances
                .windows(2)
                .all(|w| w[0].summary.total_variance_percent.abs() >= w[1].summary.total_variance_percent.abs())
        );

        let budget_sum: Decimal = reports.iter().map(|r| r.summary.total_budget).sum();
        prop_assert_eq!(m.total_budget, budget_sum);
    }
}
