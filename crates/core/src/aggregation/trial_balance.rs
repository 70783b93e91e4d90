//! Trial balance as of a date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::ReportLine;
use crate::coa::{AccountType, NormalBalance};

/// One account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Account.
    pub account_id: Uuid,
    /// Its code.
    pub account_code: String,
    /// Its name.
    pub account_name: String,
    /// Its type.
    pub account_type: AccountType,
    /// Its normal balance side.
    pub normal_balance: NormalBalance,
    /// Σ debits.
    pub total_debit: Decimal,
    /// Σ credits.
    pub total_credit: Decimal,
    /// Balance signed by the normal side.
    pub balance: Decimal,
}

/// Trial balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Last entry date included.
    pub as_of: NaiveDate,
    /// Rows sorted by account code.
    pub rows: Vec<TrialBalanceRow>,
    /// Σ debits over all rows.
    pub total_debit: Decimal,
    /// Σ credits over all rows.
    pub total_credit: Decimal,
}

impl TrialBalance {
    /// Builds the trial balance from balance-affecting lines.
    ///
    /// Lines dated after `as_of` are skipped.
    #[must_use]
    pub fn build(as_of: NaiveDate, lines: &[ReportLine]) -> Self {
        let mut rows: BTreeMap<&str, TrialBalanceRow> = BTreeMap::new();

        for line in lines.iter().filter(|l| l.entry_date <= as_of) {
            let row = rows.entry(line.account_code.as_str()).or_insert_with(|| TrialBalanceRow {
                account_id: line.account_id,
                account_code: line.account_code.clone(),
                account_name: line.account_name.clone(),
                account_type: line.account_type,
                normal_balance: line.normal_balance,
                total_debit: Decimal::ZERO,
                total_credit: Decimal::ZERO,
                balance: Decimal::ZERO,
            });
            row.total_debit += line.debit;
            row.total_credit += line.credit;
            row.balance += line.normal_balance.balance_change(line.debit, line.credit);
        }

        let rows: Vec<TrialBalanceRow> = rows.into_values().collect();
        let total_debit = rows.iter().map(|r| r.total_debit).sum();
        let total_credit = rows.iter().map(|r| r.total_credit).sum();

        Self {
            as_of,
            rows,
            total_debit,
            total_credit,
        }
    }

    /// Returns true when debits equal credits.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}
