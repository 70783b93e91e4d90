//! Account balance calculations.
//!
//! An account's cached balance is always a pure function of the lines of
//! its posted (and reversed) entries:
//! - Debit-normal accounts: balance = Σdebit − Σcredit
//! - Credit-normal accounts: balance = Σcredit − Σdebit

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use kontra_shared::types::AccountId;
use uuid::Uuid;

use super::types::PostingLine;
use crate::coa::NormalBalance;

/// Account balance derived from its ledger lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Normal balance side used for the sign of `balance`.
    pub normal_balance: NormalBalance,
    /// Total debit amount.
    pub debit_total: Decimal,
    /// Total credit amount.
    pub credit_total: Decimal,
    /// Net balance in the account's normal direction.
    pub balance: Decimal,
}

impl AccountBalance {
    /// Creates an empty balance.
    #[must_use]
    pub const fn new(account_id: AccountId, normal_balance: NormalBalance) -> Self {
        Self {
            account_id,
            normal_balance,
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }

    /// Adds one line's amounts.
    pub fn apply(&mut self, debit: Decimal, credit: Decimal) {
        self.debit_total += debit;
        self.credit_total += credit;
        self.balance = self
            .normal_balance
            .balance_change(self.debit_total, self.credit_total);
    }
}

/// Recomputes balances for every account touched by `lines`.
///
/// `normal_of` supplies each account's normal side. The result is keyed by
/// account id in ascending order, which is also the order rows are locked.
pub fn recompute_balances<'a, I, F>(lines: I, normal_of: F) -> BTreeMap<Uuid, AccountBalance>
where
    I: IntoIterator<Item = &'a PostingLine>,
    F: Fn(Uuid) -> NormalBalance,
{
    let mut balances: BTreeMap<Uuid, AccountBalance> = BTreeMap::new();
    for line in lines {
        balances
            .entry(line.account_id)
            .or_insert_with(|| {
                AccountBalance::new(AccountId::from_uuid(line.account_id), normal_of(line.account_id))
            })
            .apply(line.debit, line.credit);
    }
    balances
}

/// Sorted, de-duplicated account ids referenced by `lines`.
pub fn touched_accounts<'a, I>(lines: I) -> Vec<Uuid>
where
    I: IntoIterator<Item = &'a PostingLine>,
{
    let mut ids: Vec<Uuid> = lines.into_iter().map(|l| l.account_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
