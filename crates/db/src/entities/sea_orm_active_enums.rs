//! `SeaORM` active enums mirroring the Postgres enum types.

use kontra_core::aggregation::{AllocationType as DomainAllocationType, CostCenterType as DomainCostCenterType};
use kontra_core::coa::{AccountType as DomainAccountType, NormalBalance as DomainNormalBalance};
use kontra_core::ledger::EntryStatus as DomainEntryStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
#[allow(missing_docs)]
pub enum AccountType {
    #[sea_orm(string_value = "ASSET")]
    Asset,
    #[sea_orm(string_value = "LIABILITY")]
    Liability,
    #[sea_orm(string_value = "EQUITY")]
    Equity,
    #[sea_orm(string_value = "REVENUE")]
    Revenue,
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "normal_balance")]
#[allow(missing_docs)]
pub enum NormalBalance {
    #[sea_orm(string_value = "DEBIT")]
    Debit,
    #[sea_orm(string_value = "CREDIT")]
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_status")]
#[allow(missing_docs)]
pub enum EntryStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "POSTED")]
    Posted,
    #[sea_orm(string_value = "REVERSED")]
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cost_center_type")]
#[allow(missing_docs)]
pub enum CostCenterType {
    #[sea_orm(string_value = "ADMINISTRATIVE")]
    Administrative,
    #[sea_orm(string_value = "OPERATIONAL")]
    Operational,
    #[sea_orm(string_value = "PROJECT_SPECIFIC")]
    ProjectSpecific,
    #[sea_orm(string_value = "EQUIPMENT")]
    Equipment,
    #[sea_orm(string_value = "MATERIAL_PROCUREMENT")]
    MaterialProcurement,
    #[sea_orm(string_value = "LABOR_MANAGEMENT")]
    LaborManagement,
    #[sea_orm(string_value = "QUALITY_CONTROL")]
    QualityControl,
    #[sea_orm(string_value = "SAFETY_COMPLIANCE")]
    SafetyCompliance,
    #[sea_orm(string_value = "OVERHEAD")]
    Overhead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "allocation_type")]
#[allow(missing_docs)]
pub enum AllocationType {
    #[sea_orm(string_value = "DIRECT_LABOR")]
    DirectLabor,
    #[sea_orm(string_value = "DIRECT_MATERIAL")]
    DirectMaterial,
    #[sea_orm(string_value = "EQUIPMENT_USAGE")]
    EquipmentUsage,
    #[sea_orm(string_value = "OVERHEAD_ALLOCATION")]
    OverheadAllocation,
    #[sea_orm(string_value = "ADMINISTRATIVE_COSTS")]
    AdministrativeCosts,
    #[sea_orm(string_value = "UTILITY_COSTS")]
    UtilityCosts,
    #[sea_orm(string_value = "INSURANCE_ALLOCATION")]
    InsuranceAllocation,
    #[sea_orm(string_value = "FACILITY_COSTS")]
    FacilityCosts,
}

/// Maps a storage enum onto its domain twin, both ways.
macro_rules! mirror_enum {
    ($db:ident <=> $domain:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$db> for $domain {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$domain> for $db {
            fn from(value: $domain) -> Self {
                match value {
                    $($domain::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(AccountType <=> DomainAccountType { Asset, Liability, Equity, Revenue, Expense });
mirror_enum!(NormalBalance <=> DomainNormalBalance { Debit, Credit });
mirror_enum!(EntryStatus <=> DomainEntryStatus { Draft, Posted, Reversed });
mirror_enum!(CostCenterType <=> DomainCostCenterType {
    Administrative,
    Operational,
    ProjectSpecific,
    Equipment,
    MaterialProcurement,
    LaborManagement,
    QualityControl,
    SafetyCompliance,
    Overhead,
});
mirror_enum!(AllocationType <=> DomainAllocationType {
    DirectLabor,
    DirectMaterial,
    EquipmentUsage,
    OverheadAllocation,
    AdministrativeCosts,
    UtilityCosts,
    InsuranceAllocation,
    FacilityCosts,
});
