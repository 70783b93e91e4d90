//! Cost centers: registration, allocations and performance.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AggregationError;
use super::types::{ReportLine, ReportPeriod, exact_percent_of};
use super::variance::{Priority, Recommendation};

/// Organizational kind of a cost center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum CostCenterType {
    Administrative,
    Operational,
    ProjectSpecific,
    Equipment,
    MaterialProcurement,
    LaborManagement,
    QualityControl,
    SafetyCompliance,
    Overhead,
}

impl CostCenterType {
    /// All types.
    pub const ALL: [Self; 9] = [
        Self::Administrative,
        Self::Operational,
        Self::ProjectSpecific,
        Self::Equipment,
        Self::MaterialProcurement,
        Self::LaborManagement,
        Self::QualityControl,
        Self::SafetyCompliance,
        Self::Overhead,
    ];

    /// Upper-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Administrative => "ADMINISTRATIVE",
            Self::Operational => "OPERATIONAL",
            Self::ProjectSpecific => "PROJECT_SPECIFIC",
            Self::Equipment => "EQUIPMENT",
            Self::MaterialProcurement => "MATERIAL_PROCUREMENT",
            Self::LaborManagement => "LABOR_MANAGEMENT",
            Self::QualityControl => "QUALITY_CONTROL",
            Self::SafetyCompliance => "SAFETY_COMPLIANCE",
            Self::Overhead => "OVERHEAD",
        }
    }
}

impl std::str::FromStr for CostCenterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown cost center type: {s}"))
    }
}

/// How a cost was allocated to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum AllocationType {
    DirectLabor,
    DirectMaterial,
    EquipmentUsage,
    OverheadAllocation,
    AdministrativeCosts,
    UtilityCosts,
    InsuranceAllocation,
    FacilityCosts,
}

impl AllocationType {
    /// All types.
    pub const ALL: [Self; 8] = [
        Self::DirectLabor,
        Self::DirectMaterial,
        Self::EquipmentUsage,
        Self::OverheadAllocation,
        Self::AdministrativeCosts,
        Self::UtilityCosts,
        Self::InsuranceAllocation,
        Self::FacilityCosts,
    ];

    /// Upper-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectLabor => "DIRECT_LABOR",
            Self::DirectMaterial => "DIRECT_MATERIAL",
            Self::EquipmentUsage => "EQUIPMENT_USAGE",
            Self::OverheadAllocation => "OVERHEAD_ALLOCATION",
            Self::AdministrativeCosts => "ADMINISTRATIVE_COSTS",
            Self::UtilityCosts => "UTILITY_COSTS",
            Self::InsuranceAllocation => "INSURANCE_ALLOCATION",
            Self::FacilityCosts => "FACILITY_COSTS",
        }
    }

    /// Basis recorded when the caller gives none.
    #[must_use]
    pub const fn default_basis(self) -> &'static str {
        match self {
            Self::DirectLabor => "Labor hours worked",
            Self::DirectMaterial => "Material quantity used",
            Self::EquipmentUsage => "Equipment hours utilized",
            Self::OverheadAllocation => "Percentage of direct costs",
            Self::AdministrativeCosts => "Revenue percentage",
            Self::UtilityCosts => "Square footage basis",
            Self::InsuranceAllocation => "Asset value basis",
            Self::FacilityCosts => "Headcount basis",
        }
    }
}

impl std::str::FromStr for AllocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown allocation type: {s}"))
    }
}

/// Input for a new cost center.
#[derive(Debug, Clone)]
pub struct CreateCostCenterInput {
    /// Unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Kind.
    pub cost_center_type: CostCenterType,
    /// Project the center belongs to.
    pub project_id: Option<Uuid>,
    /// Subsidiary the center belongs to.
    pub subsidiary_id: Option<Uuid>,
    /// Spend ceiling for performance reports.
    pub budget_limit: Decimal,
}

/// A stored cost center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenterRecord {
    /// Row id.
    pub id: Uuid,
    /// Unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Kind.
    pub cost_center_type: CostCenterType,
    /// Project tag.
    pub project_id: Option<Uuid>,
    /// Subsidiary tag.
    pub subsidiary_id: Option<Uuid>,
    /// Spend ceiling.
    pub budget_limit: Decimal,
    /// Active flag.
    pub is_active: bool,
}

/// Input for an allocation.
#[derive(Debug, Clone)]
pub struct RecordAllocationInput {
    /// Source cost center.
    pub cost_center_id: Uuid,
    /// Receiving project.
    pub project_id: Uuid,
    /// Amount, strictly positive.
    pub amount: Decimal,
    /// Kind.
    pub allocation_type: AllocationType,
    /// Method description; defaults by type.
    pub allocation_basis: Option<String>,
    /// Effective date.
    pub effective_date: NaiveDate,
}

/// A stored allocation. Allocations are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    /// Row id.
    pub id: Uuid,
    /// Source cost center.
    pub cost_center_id: Uuid,
    /// Receiving project.
    pub project_id: Uuid,
    /// Amount.
    pub amount: Decimal,
    /// Kind.
    pub allocation_type: AllocationType,
    /// Method description.
    pub allocation_basis: String,
    /// Effective date.
    pub effective_date: NaiveDate,
}

/// Spend position against the budget limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostCenterStatus {
    /// Variance % > 10.
    OverBudget,
    /// Variance % < -20.
    UnderBudget,
    /// Otherwise.
    WithinBudget,
}

/// Efficiency tier from utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EfficiencyTier {
    /// Utilization > 95%.
    Excellent,
    /// Between.
    Good,
    /// Utilization < 70%.
    NeedsImprovement,
}

/// Cost center performance for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenterPerformance {
    /// Center analysed.
    pub cost_center_id: Uuid,
    /// Its code.
    pub code: String,
    /// Its kind.
    pub cost_center_type: CostCenterType,
    /// Report window.
    pub period: ReportPeriod,
    /// Σ(debit − credit) of tagged lines.
    pub actual: Decimal,
    /// Budget limit.
    pub budget_limit: Decimal,
    /// `actual - budget_limit`.
    pub variance: Decimal,
    /// `variance / budget_limit * 100`.
    pub variance_percent: Decimal,
    /// `actual / budget_limit * 100`.
    pub utilization: Decimal,
    /// `budget_limit - actual`.
    pub remaining_budget: Decimal,
    /// Spend position.
    pub status: CostCenterStatus,
    /// Efficiency tier.
    pub efficiency: EfficiencyTier,
    /// Tagged lines counted.
    pub line_count: u64,
    /// `actual / line_count`, 2 dp.
    pub average_line_amount: Decimal,
    /// Findings.
    pub recommendations: Vec<Recommendation>,
}

/// Allocation totals for a filter and window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationReport {
    /// Report window.
    pub period: ReportPeriod,
    /// Totals per allocation type.
    pub by_type: BTreeMap<AllocationType, Decimal>,
    /// Totals per receiving project.
    pub by_project: BTreeMap<Uuid, Decimal>,
    /// Totals per `YYYY-MM`.
    pub monthly: BTreeMap<String, Decimal>,
    /// Allocations counted.
    pub allocation_count: usize,
    /// Grand total.
    pub total: Decimal,
}

/// Cost center rules with no database dependencies.
pub struct CostCenterService;

impl CostCenterService {
    /// Validates and normalizes a new cost center.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank code or name, or a negative
    /// budget limit.
    pub fn validate_new(input: &CreateCostCenterInput) -> Result<CreateCostCenterInput, AggregationError> {
        let code = input.code.trim();
        if code.is_empty() {
            return Err(AggregationError::EmptyField("code"));
        }
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AggregationError::EmptyField("name"));
        }
        if input.budget_limit < Decimal::ZERO {
            return Err(AggregationError::NegativeBudgetLimit);
        }
        Ok(CreateCostCenterInput {
            code: code.to_uppercase(),
            name: name.to_string(),
            ..input.clone()
        })
    }

    /// Validates an allocation and resolves its basis.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAllocationAmount` unless the amount is positive.
    pub fn resolve_allocation(input: &RecordAllocationInput) -> Result<String, AggregationError> {
        if input.amount <= Decimal::ZERO {
            return Err(AggregationError::InvalidAllocationAmount);
        }
        Ok(input
            .allocation_basis
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(input.allocation_type.default_basis())
            .to_string())
    }

    /// Performance of `center` from its tagged lines in `period`.
    #[must_use]
    pub fn performance(center: &CostCenterRecord, period: ReportPeriod, lines: &[ReportLine]) -> CostCenterPerformance {
        let (actual, line_count) = lines
            .iter()
            .filter(|l| l.cost_center_id == Some(center.id) && period.contains(l.entry_date))
            .fold((Decimal::ZERO, 0u64), |(sum, n), l| (sum + l.net(), n + 1));

        let budget_limit = center.budget_limit;
        let variance = actual - budget_limit;
        let variance_percent = exact_percent_of(variance, budget_limit);
        let utilization = exact_percent_of(actual, budget_limit);

        let status = if variance_percent > Decimal::TEN {
            CostCenterStatus::OverBudget
        } else if variance_percent < Decimal::from(-20) {
            CostCenterStatus::UnderBudget
        } else {
            CostCenterStatus::WithinBudget
        };

        let efficiency = if utilization > Decimal::from(95) {
            EfficiencyTier::Excellent
        } else if utilization < Decimal::from(70) {
            EfficiencyTier::NeedsImprovement
        } else {
            EfficiencyTier::Good
        };

        let average_line_amount = if line_count == 0 {
            Decimal::ZERO
        } else {
            (actual / Decimal::from(line_count)).round_dp(2)
        };

        CostCenterPerformance {
            cost_center_id: center.id,
            code: center.code.clone(),
            cost_center_type: center.cost_center_type,
            period,
            actual,
            budget_limit,
            variance,
            variance_percent: variance_percent.round_dp(2),
            utilization: utilization.round_dp(2),
            remaining_budget: budget_limit - actual,
            status,
            efficiency,
            line_count,
            average_line_amount,
            recommendations: Self::recommendations(center.cost_center_type, variance_percent, utilization),
        }
    }

    fn recommendations(
        cost_center_type: CostCenterType,
        variance_percent: Decimal,
        utilization: Decimal,
    ) -> Vec<Recommendation> {
        let mut out = Vec::new();

        if variance_percent > Decimal::from(15) {
            out.push(Recommendation {
                priority: Priority::High,
                area: "BUDGET_CONTROL".to_string(),
                issue: format!("Cost center is {}% over budget", variance_percent.round_dp(1)),
                action: "Implement immediate cost control measures and review allocation accuracy".to_string(),
                expected_impact: "Reduce budget variance to acceptable range".to_string(),
            });
        }

        if utilization < Decimal::from(60) {
            out.push(Recommendation {
                priority: Priority::Medium,
                area: "UTILIZATION".to_string(),
                issue: format!("Low budget utilization at {}%", utilization.round_dp(1)),
                action: "Review budget allocation and consider reallocation to other cost centers".to_string(),
                expected_impact: "Optimize resource allocation efficiency".to_string(),
            });
        }

        if cost_center_type == CostCenterType::ProjectSpecific && variance_percent > Decimal::from(5) {
            out.push(Recommendation {
                priority: Priority::High,
                area: "PROJECT_CONTROL".to_string(),
                issue: "Project-specific cost center showing budget variance".to_string(),
                action: "Review project scope and timeline for cost control opportunities".to_string(),
                expected_impact: "Maintain project profitability".to_string(),
            });
        }

        out
    }

    /// Totals allocations matching the optional filters within `period`.
    #[must_use]
    pub fn allocation_report(
        allocations: &[AllocationRecord],
        cost_center_id: Option<Uuid>,
        project_id: Option<Uuid>,
        period: ReportPeriod,
    ) -> AllocationReport {
        let mut report = AllocationReport {
            period,
            by_type: BTreeMap::new(),
            by_project: BTreeMap::new(),
            monthly: BTreeMap::new(),
            allocation_count: 0,
            total: Decimal::ZERO,
        };

        for a in allocations.iter().filter(|a| {
            cost_center_id.is_none_or(|id| a.cost_center_id == id)
                && project_id.is_none_or(|id| a.project_id == id)
                && period.contains(a.effective_date)
        }) {
            *report.by_type.entry(a.allocation_type).or_default() += a.amount;
            *report.by_project.entry(a.project_id).or_default() += a.amount;
            let month = format!("{:04}-{:02}", a.effective_date.year(), a.effective_date.month());
            *report.monthly.entry(month).or_default() += a.amount;
            report.allocation_count += 1;
            report.total += a.amount;
        }

        report
    }
}
