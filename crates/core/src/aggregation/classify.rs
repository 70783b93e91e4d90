//! Expense account classification into budget categories.
//!
//! Classification is an ordered rule table, first match wins. Accounts no
//! rule matches land in [`Classification::Unclassified`].

use serde::{Deserialize, Serialize};

/// Budget categories of a construction project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategory {
    /// Direct: materials.
    Materials,
    /// Direct: labor.
    Labor,
    /// Direct: equipment.
    Equipment,
    /// Direct: subcontractors.
    Subcontractors,
    /// Indirect: overhead.
    Overhead,
    /// Indirect: administration.
    Administration,
    /// Indirect: insurance.
    Insurance,
}

impl BudgetCategory {
    /// All categories in report order.
    pub const ALL: [Self; 7] = [
        Self::Materials,
        Self::Labor,
        Self::Equipment,
        Self::Subcontractors,
        Self::Overhead,
        Self::Administration,
        Self::Insurance,
    ];

    /// Lower-case name used in payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Materials => "materials",
            Self::Labor => "labor",
            Self::Equipment => "equipment",
            Self::Subcontractors => "subcontractors",
            Self::Overhead => "overhead",
            Self::Administration => "administration",
            Self::Insurance => "insurance",
        }
    }

    /// Returns true for direct-cost categories.
    #[must_use]
    pub const fn is_direct(self) -> bool {
        matches!(
            self,
            Self::Materials | Self::Labor | Self::Equipment | Self::Subcontractors
        )
    }
}

impl std::fmt::Display for BudgetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BudgetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown budget category: {s}"))
    }
}

/// Outcome of classifying one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Matched a budget category.
    Category(BudgetCategory),
    /// No rule matched.
    Unclassified,
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    /// Category assigned on match.
    pub category: BudgetCategory,
    /// Lower-case keywords searched in the account name and sub-type.
    pub keywords: &'static [&'static str],
    /// Sub-types matched exactly, ignoring case.
    pub sub_types: &'static [&'static str],
}

impl ClassificationRule {
    fn matches(&self, name: &str, sub_type: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| name.contains(k) || sub_type.contains(k))
            || self
                .sub_types
                .iter()
                .any(|s| s.eq_ignore_ascii_case(sub_type))
    }
}

/// Keyword rules take priority over the sub-type fallbacks below them.
pub const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        category: BudgetCategory::Materials,
        keywords: &["material", "bahan"],
        sub_types: &[],
    },
    ClassificationRule {
        category: BudgetCategory::Labor,
        keywords: &["labor", "labour", "tenaga kerja", "upah"],
        sub_types: &[],
    },
    ClassificationRule {
        category: BudgetCategory::Equipment,
        keywords: &["equipment", "alat", "mesin"],
        sub_types: &[],
    },
    ClassificationRule {
        category: BudgetCategory::Subcontractors,
        keywords: &["subcontractor", "kontraktor"],
        sub_types: &[],
    },
    ClassificationRule {
        category: BudgetCategory::Insurance,
        keywords: &["insurance", "asuransi"],
        sub_types: &[],
    },
    ClassificationRule {
        category: BudgetCategory::Overhead,
        keywords: &["overhead"],
        sub_types: &["DIRECT_COST"],
    },
    ClassificationRule {
        category: BudgetCategory::Administration,
        keywords: &["administrasi", "administration"],
        sub_types: &["OPERATING_EXPENSE"],
    },
];

/// Classifies an expense account by name and sub-type.
#[must_use]
pub fn classify(account_name: &str, sub_type: Option<&str>) -> Classification {
    let name = account_name.to_lowercase();
    let sub_type = sub_type.unwrap_or_default().trim().to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.matches(&name, &sub_type))
        .map_or(Classification::Unclassified, |rule| {
            Classification::Category(rule.category)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Beban Material", None, BudgetCategory::Materials)]
    #[case("Bahan Bangunan", Some("DIRECT_COST"), BudgetCategory::Materials)]
    #[case("Upah Tukang", None, BudgetCategory::Labor)]
    #[case("Biaya Tenaga Kerja Langsung", Some("DIRECT_COST"), BudgetCategory::Labor)]
    #[case("Sewa Alat Berat", None, BudgetCategory::Equipment)]
    #[case("Biaya Subkontraktor", None, BudgetCategory::Subcontractors)]
    #[case("Premi Asuransi Proyek", None, BudgetCategory::Insurance)]
    #[case("Biaya Lapangan", Some("DIRECT_COST"), BudgetCategory::Overhead)]
    #[case("Site Overhead", None, BudgetCategory::Overhead)]
    #[case("Beban Kantor", Some("operating_expense"), BudgetCategory::Administration)]
    #[case("Biaya Administrasi", None, BudgetCategory::Administration)]
    fn test_classify(#[case] name: &str, #[case] sub_type: Option<&str>, #[case] expected: BudgetCategory) {
        assert_eq!(classify(name, sub_type), Classification::Category(expected));
    }

    #[test]
    fn test_unmatched_is_unclassified() {
        assert_eq!(classify("Beban Lain-lain", None), Classification::Unclassified);
        assert_eq!(classify("", Some("OTHER")), Classification::Unclassified);
    }

    #[test]
    fn test_keyword_rules_win_over_subtype_fallbacks() {
        // Operating expense sub-type, but the name names the insurance category
        assert_eq!(
            classify("Beban Asuransi", Some("OPERATING_EXPENSE")),
            Classification::Category(BudgetCategory::Insurance)
        );
    }

    #[test]
    fn test_category_round_trip() {
        for category in BudgetCategory::ALL {
            assert_eq!(category.as_str().parse::<BudgetCategory>().unwrap(), category);
        }
        assert!("misc".parse::<BudgetCategory>().is_err());
        assert_eq!(BudgetCategory::ALL.iter().filter(|c| c.is_direct()).count(), 4);
    }
}
