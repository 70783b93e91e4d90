//! Revenue against cost for one project.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{ReportLine, ReportPeriod, percent_of, ratio};
use crate::coa::AccountType;

/// Revenue of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueShare {
    /// Account credited.
    pub account_id: Uuid,
    /// Its code.
    pub account_code: String,
    /// Its name.
    pub account_name: String,
    /// Σ credits.
    pub amount: Decimal,
    /// Share of total revenue.
    pub percentage: Decimal,
}

/// Profitability of a project over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitabilityReport {
    /// Project analysed.
    pub project_id: Uuid,
    /// Report window.
    pub period: ReportPeriod,
    /// Σ credits on revenue accounts.
    pub total_revenue: Decimal,
    /// Σ(debit − credit) on expense accounts.
    pub total_costs: Decimal,
    /// `revenue - costs`.
    pub gross_profit: Decimal,
    /// `profit / revenue * 100`.
    pub gross_margin: Decimal,
    /// `costs / revenue`, 4 dp.
    pub cost_per_revenue: Decimal,
    /// `revenue / costs`, 2 dp.
    pub revenue_efficiency: Decimal,
    /// `profit / costs`, 2 dp.
    pub profitability_index: Decimal,
    /// Revenue at which the margin covers costs, whole units. Zero if the
    /// margin is not positive.
    pub break_even_point: Decimal,
    /// Revenue per account, sorted by code.
    pub revenue_breakdown: Vec<RevenueShare>,
}

/// Computes profitability reports.
pub struct ProfitabilityEngine;

impl ProfitabilityEngine {
    /// Profitability of `project_id` from `lines` inside `period`.
    #[must_use]
    pub fn compute(project_id: Uuid, period: ReportPeriod, lines: &[ReportLine]) -> ProfitabilityReport {
        let mut revenue: BTreeMap<&str, RevenueShare> = BTreeMap::new();
        let mut total_revenue = Decimal::ZERO;
        let mut total_costs = Decimal::ZERO;

        for line in lines
            .iter()
            .filter(|l| l.project_id == Some(project_id) && period.contains(l.entry_date))
        {
            match line.account_type {
                AccountType::Revenue if line.credit > Decimal::ZERO => {
                    total_revenue += line.credit;
                    revenue
                        .entry(line.account_code.as_str())
                        .or_insert_with(|| RevenueShare {
                            account_id: line.account_id,
                            account_code: line.account_code.clone(),
                            account_name: line.account_name.clone(),
                            amount: Decimal::ZERO,
                            percentage: Decimal::ZERO,
                        })
                        .amount += line.credit;
                }
                AccountType::Expense => total_costs += line.net(),
                _ => {}
            }
        }

        let revenue_breakdown = revenue
            .into_values()
            .map(|mut share| {
                share.percentage = percent_of(share.amount, total_revenue);
                share
            })
            .collect();

        let gross_profit = total_revenue - total_costs;
        let gross_margin = percent_of(gross_profit, total_revenue);
        let break_even_point = if gross_margin > Decimal::ZERO {
            (total_costs / (gross_margin / Decimal::ONE_HUNDRED)).round_dp(0)
        } else {
            Decimal::ZERO
        };

        ProfitabilityReport {
            project_id,
            period,
            total_revenue,
            total_costs,
            gross_profit,
            gross_margin,
            cost_per_revenue: ratio(total_costs, total_revenue, 4),
            revenue_efficiency: ratio(total_revenue, total_costs, 2),
            profitability_index: ratio(gross_profit, total_costs, 2),
            break_even_point,
            revenue_breakdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn period() -> ReportPeriod {
        ReportPeriod::new(date(1, 1), date(6, 30)).unwrap()
    }

    fn line(project_id: Uuid, code: &str, account_type: AccountType, debit: Decimal, credit: Decimal) -> ReportLine {
        ReportLine {
            account_id: Uuid::from_u128(code.bytes().map(u128::from).sum()),
            account_code: code.to_string(),
            account_name: format!("Account {code}"),
            account_type,
            sub_type: None,
            normal_balance: account_type.normal_balance(),
            debit,
            credit,
            entry_date: date(3, 1),
            project_id: Some(project_id),
            cost_center_id: None,
        }
    }

    #[test]
    fn test_margin_and_ratios() {
        let project = Uuid::new_v4();
        let lines = vec![
            line(project, "4101", AccountType::Revenue, Decimal::ZERO, dec!(600000)),
            line(project, "4102", AccountType::Revenue, Decimal::ZERO, dec!(400000)),
            line(project, "5101", AccountType::Expense, dec!(800000), Decimal::ZERO),
            line(project, "1101", AccountType::Asset, dec!(1000000), Decimal::ZERO),
        ];
        let report = ProfitabilityEngine::compute(project, period(), &lines);

        assert_eq!(report.total_revenue, dec!(1000000));
        assert_eq!(report.total_costs, dec!(800000));
        assert_eq!(report.gross_profit, dec!(200000));
        assert_eq!(report.gross_margin, dec!(20));
        assert_eq!(report.cost_per_revenue, dec!(0.8));
        assert_eq!(report.revenue_efficiency, dec!(1.25));
        assert_eq!(report.profitability_index, dec!(0.25));
        assert_eq!(report.break_even_point, dec!(4000000));

        let shares: Vec<_> = report.revenue_breakdown.iter().map(|s| (s.account_code.as_str(), s.percentage)).collect();
        assert_eq!(shares, vec![("4101", dec!(60)), ("4102", dec!(40))]);
    }

    #[test]
    fn test_revenue_debits_are_not_revenue() {
        let project = Uuid::new_v4();
        let lines = vec![
            line(project, "4101", AccountType::Revenue, Decimal::ZERO, dec!(1000)),
            line(project, "4101", AccountType::Revenue, dec!(300), Decimal::ZERO),
        ];
        let report = ProfitabilityEngine::compute(project, period(), &lines);
        assert_eq!(report.total_revenue, dec!(1000));
    }

    #[test]
    fn test_loss_has_no_break_even() {
        let project = Uuid::new_v4();
        let lines = vec![
            line(project, "4101", AccountType::Revenue, Decimal::ZERO, dec!(500)),
            line(project, "5101", AccountType::Expense, dec!(700), Decimal::ZERO),
        ];
        let report = ProfitabilityEngine::compute(project, period(), &lines);
        assert_eq!(report.gross_margin, dec!(-40));
        assert_eq!(report.break_even_point, Decimal::ZERO);
    }

    #[test]
    fn test_no_activity_is_all_zero() {
        let project = Uuid::new_v4();
        let other = line(Uuid::new_v4(), "4101", AccountType::Revenue, Decimal::ZERO, dec!(500));
        let report = ProfitabilityEngine::compute(project, period(), &[other]);
        assert_eq!(report.total_revenue, Decimal::ZERO);
        assert_eq!(report.gross_margin, Decimal::ZERO);
        assert_eq!(report.cost_per_revenue, Decimal::ZERO);
        assert!(report.revenue_breakdown.is_empty());
    }
}
