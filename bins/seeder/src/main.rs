//! Database seeder for Kontra development and testing.
//!
//! Seeds the basic PSAK chart of accounts for a construction company.
//! Accounts whose code already exists are skipped, so the seeder can be
//! re-run against a partially seeded database.
//!
//! Usage: cargo run --bin seeder

use std::collections::HashMap;

use anyhow::Context;
use kontra_core::coa::{AccountSpec, AccountType};
use kontra_db::AccountRepository;
use kontra_db::repositories::AccountFilter;
use kontra_shared::{AppConfig, telemetry};
use tracing::info;
use uuid::Uuid;

/// One seeded account: code, name, type, sub-type, level, parent code.
type SeedAccount = (&'static str, &'static str, AccountType, &'static str, u8, Option<&'static str>);

/// Parents always precede their children.
const BASIC_CHART: &[SeedAccount] = &[
    ("1000", "ASET", AccountType::Asset, "CONTROL_ACCOUNT", 1, None),
    ("1100", "Aset Lancar", AccountType::Asset, "CURRENT_ASSET", 2, Some("1000")),
    ("1101", "Kas & Bank", AccountType::Asset, "CASH_AND_BANK", 3, Some("1100")),
    ("1101.01", "Kas Kecil", AccountType::Asset, "CASH_AND_BANK", 4, Some("1101")),
    ("1101.02", "Bank", AccountType::Asset, "CASH_AND_BANK", 4, Some("1101")),
    ("1102", "Piutang Usaha", AccountType::Asset, "RECEIVABLES", 3, Some("1100")),
    ("1103", "Piutang Retensi", AccountType::Asset, "RECEIVABLES", 3, Some("1100")),
    ("1104", "Persediaan Material", AccountType::Asset, "INVENTORY", 3, Some("1100")),
    ("1200", "Aset Tetap", AccountType::Asset, "FIXED_ASSET", 2, Some("1000")),
    ("1201", "Peralatan Konstruksi", AccountType::Asset, "FIXED_ASSET", 3, Some("1200")),
    ("1202", "Kendaraan", AccountType::Asset, "FIXED_ASSET", 3, Some("1200")),
    ("1203", "Akumulasi Penyusutan", AccountType::Asset, "ACCUMULATED_DEPRECIATION", 3, Some("1200")),
    ("2000", "KEWAJIBAN", AccountType::Liability, "CONTROL_ACCOUNT", 1, None),
    ("2100", "Kewajiban Lancar", AccountType::Liability, "CURRENT_LIABILITY", 2, Some("2000")),
    ("2101", "Hutang Usaha", AccountType::Liability, "PAYABLES", 3, Some("2100")),
    ("2102", "Hutang Retensi", AccountType::Liability, "PAYABLES", 3, Some("2100")),
    ("2103", "Uang Muka Proyek", AccountType::Liability, "UNEARNED_REVENUE", 3, Some("2100")),
    ("2104", "Hutang Pajak", AccountType::Liability, "TAX_PAYABLE", 3, Some("2100")),
    ("2200", "Kewajiban Jangka Panjang", AccountType::Liability, "LONG_TERM_LIABILITY", 2, Some("2000")),
    ("2201", "Hutang Bank Jangka Panjang", AccountType::Liability, "LONG_TERM_DEBT", 3, Some("2200")),
    ("3000", "EKUITAS", AccountType::Equity, "CONTROL_ACCOUNT", 1, None),
    ("3100", "Modal Saham", AccountType::Equity, "CAPITAL_STOCK", 2, Some("3000")),
    ("3200", "Laba Ditahan", AccountType::Equity, "RETAINED_EARNINGS", 2, Some("3000")),
    ("3300", "Laba Tahun Berjalan", AccountType::Equity, "CURRENT_YEAR_EARNINGS", 2, Some("3000")),
    ("4000", "PENDAPATAN", AccountType::Revenue, "CONTROL_ACCOUNT", 1, None),
    ("4100", "Pendapatan Proyek", AccountType::Revenue, "PROJECT_REVENUE", 2, Some("4000")),
    ("4200", "Pendapatan Lain-lain", AccountType::Revenue, "OTHER_REVENUE", 2, Some("4000")),
    ("5000", "BEBAN", AccountType::Expense, "CONTROL_ACCOUNT", 1, None),
    ("5100", "Beban Langsung Proyek", AccountType::Expense, "DIRECT_COST", 2, Some("5000")),
    ("5101", "Beban Material", AccountType::Expense, "MATERIAL_COST", 3, Some("5100")),
    ("5102", "Beban Upah Tenaga Kerja", AccountType::Expense, "LABOR_COST", 3, Some("5100")),
    ("5103", "Beban Subkontraktor", AccountType::Expense, "SUBCONTRACTOR_COST", 3, Some("5100")),
    ("5104", "Beban Peralatan", AccountType::Expense, "EQUIPMENT_COST", 3, Some("5100")),
    ("5200", "Beban Operasional", AccountType::Expense, "OPERATING_EXPENSE", 2, Some("5000")),
    ("5201", "Beban Gaji Karyawan", AccountType::Expense, "SALARY_EXPENSE", 3, Some("5200")),
    ("5202", "Beban Sewa Kantor", AccountType::Expense, "RENT_EXPENSE", 3, Some("5200")),
    ("5203", "Beban Utilitas", AccountType::Expense, "UTILITY_EXPENSE", 3, Some("5200")),
    ("5204", "Beban Penyusutan", AccountType::Expense, "DEPRECIATION_EXPENSE", 3, Some("5200")),
    ("5300", "Beban Lain-lain", AccountType::Expense, "OTHER_EXPENSE", 2, Some("5000")),
    ("5301", "Beban Bunga", AccountType::Expense, "INTEREST_EXPENSE", 3, Some("5300")),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.log);

    let db = kontra_db::connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    let accounts = AccountRepository::with_config(db, &config.ledger);

    let mut ids: HashMap<String, Uuid> = accounts
        .list(AccountFilter::default())
        .await?
        .into_iter()
        .map(|a| (a.code, a.id))
        .collect();

    let mut created = 0usize;
    for &(code, name, account_type, sub_type, level, parent) in BASIC_CHART {
        if ids.contains_key(code) {
            continue;
        }
        let parent_id = parent
            .map(|p| ids.get(p).copied().with_context(|| format!("parent {p} of {code} is missing")))
            .transpose()?;

        let account = accounts
            .create_account(AccountSpec {
                code: Some(code.to_string()),
                name: name.to_string(),
                account_type,
                sub_type: Some(sub_type.to_string()),
                level,
                parent_id,
                normal_balance: None,
                // Leaves stay postable; adding a child promotes its parent.
                is_control_account: Some(level <= 2),
            })
            .await
            .with_context(|| format!("failed to seed account {code}"))?;

        ids.insert(account.code, account.id);
        created += 1;
    }

    info!(created, total = BASIC_CHART.len(), "Chart of accounts seeded");
    Ok(())
}
