//! Project budgets: category breakdown, revisions and report selection.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classify::BudgetCategory;
use super::error::AggregationError;
use super::types::ReportPeriod;

/// Default category split, in percent of the total budget.
pub const DEFAULT_PERCENTAGES: [(BudgetCategory, u32); 7] = [
    (BudgetCategory::Materials, 40),
    (BudgetCategory::Labor, 25),
    (BudgetCategory::Equipment, 15),
    (BudgetCategory::Subcontractors, 10),
    (BudgetCategory::Overhead, 5),
    (BudgetCategory::Administration, 3),
    (BudgetCategory::Insurance, 2),
];

/// One category of a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAllocation {
    /// Category.
    pub category: BudgetCategory,
    /// Share of the total, in percent.
    pub percentage: Decimal,
    /// `total * percentage / 100`, rounded to 2 dp.
    pub amount: Decimal,
}

/// Validated budget ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPlan {
    /// Total budget.
    pub total_budget: Decimal,
    /// One allocation per category, in report order.
    pub categories: Vec<CategoryAllocation>,
    /// Total exceeds the approval threshold.
    pub approval_required: bool,
}

impl BudgetPlan {
    /// Budgeted amount of `category`, zero if absent.
    #[must_use]
    pub fn amount_for(&self, category: BudgetCategory) -> Decimal {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map_or(Decimal::ZERO, |c| c.amount)
    }

    /// Category percentages, for carrying over into a revision.
    #[must_use]
    pub fn percentages(&self) -> Vec<(BudgetCategory, Decimal)> {
        self.categories.iter().map(|c| (c.category, c.percentage)).collect()
    }
}

/// Input for a new budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetInput {
    /// Project budgeted.
    pub project_id: Uuid,
    /// Optional subsidiary tag.
    pub subsidiary_id: Option<Uuid>,
    /// First day covered.
    pub period_start: NaiveDate,
    /// Last day covered.
    pub period_end: NaiveDate,
    /// Total budget.
    pub total_budget: Decimal,
    /// Category percentages; defaults apply when `None`.
    pub categories: Option<Vec<(BudgetCategory, Decimal)>>,
}

/// Input for revising a budget. Unset fields carry over.
#[derive(Debug, Clone, Default)]
pub struct ReviseBudgetInput {
    /// New total.
    pub total_budget: Option<Decimal>,
    /// New percentages.
    pub categories: Option<Vec<(BudgetCategory, Decimal)>>,
}

/// A stored budget revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRecord {
    /// Row id.
    pub id: Uuid,
    /// Project budgeted.
    pub project_id: Uuid,
    /// Subsidiary tag.
    pub subsidiary_id: Option<Uuid>,
    /// First day covered.
    pub period_start: NaiveDate,
    /// Last day covered.
    pub period_end: NaiveDate,
    /// 1 for the original, +1 per revision.
    pub revision_number: u32,
    /// Plan contents.
    pub plan: BudgetPlan,
}

/// Budget rules with no database dependencies.
pub struct BudgetService;

impl BudgetService {
    /// Default category percentages as decimals.
    #[must_use]
    pub fn default_percentages() -> Vec<(BudgetCategory, Decimal)> {
        DEFAULT_PERCENTAGES
            .iter()
            .map(|(category, pct)| (*category, Decimal::from(*pct)))
            .collect()
    }

    /// Builds a plan from a total and optional percentages.
    ///
    /// `None` or an empty slice selects the default split.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-positive total, a negative or
    /// duplicated category, or percentages that do not sum to exactly 100.
    pub fn plan(
        total_budget: Decimal,
        percentages: Option<&[(BudgetCategory, Decimal)]>,
        approval_threshold: Decimal,
    ) -> Result<BudgetPlan, AggregationError> {
        if total_budget <= Decimal::ZERO {
            return Err(AggregationError::InvalidBudgetTotal(total_budget));
        }

        let defaults;
        let percentages = match percentages {
            Some(p) if !p.is_empty() => p,
            _ => {
                defaults = Self::default_percentages();
                &defaults
            }
        };

        let mut sum = Decimal::ZERO;
        for (i, (category, pct)) in percentages.iter().enumerate() {
            if *pct < Decimal::ZERO {
                return Err(AggregationError::NegativePercentage {
                    category: category.as_str(),
                });
            }
            if percentages[..i].iter().any(|(c, _)| c == category) {
                return Err(AggregationError::DuplicateCategory(category.as_str()));
            }
            sum += *pct;
        }
        if sum != Decimal::ONE_HUNDRED {
            return Err(AggregationError::PercentagesNotHundred(sum));
        }

        let categories = BudgetCategory::ALL
            .into_iter()
            .map(|category| {
                let percentage = percentages
                    .iter()
                    .find(|(c, _)| *c == category)
                    .map_or(Decimal::ZERO, |(_, p)| *p);
                CategoryAllocation {
                    category,
                    percentage,
                    amount: (total_budget * percentage / Decimal::ONE_HUNDRED).round_dp(2),
                }
            })
            .collect();

        Ok(BudgetPlan {
            total_budget,
            categories,
            approval_required: total_budget > approval_threshold,
        })
    }

    /// Builds the next revision of `current`.
    ///
    /// # Errors
    ///
    /// Same as [`BudgetService::plan`].
    pub fn revise(
        current: &BudgetRecord,
        input: &ReviseBudgetInput,
        approval_threshold: Decimal,
    ) -> Result<(u32, BudgetPlan), AggregationError> {
        let total = input.total_budget.unwrap_or(current.plan.total_budget);
        let percentages = input
            .categories
            .clone()
            .unwrap_or_else(|| current.plan.percentages());
        let plan = Self::plan(total, Some(&percentages), approval_threshold)?;
        Ok((current.revision_number + 1, plan))
    }

    /// The budget a report over `period` uses: the highest revision whose
    /// period overlaps the window. Ties go to the latest period start.
    #[must_use]
    pub fn select_for_period<'a>(budgets: &'a [BudgetRecord], period: &ReportPeriod) -> Option<&'a BudgetRecord> {
        budgets
            .iter()
            .filter(|b| period.overlaps(b.period_start, b.period_end))
            .max_by_key(|b| (b.revision_number, b.period_start))
    }
}
