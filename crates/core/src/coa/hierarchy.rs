//! Reporting trees and posting-target selection over a set of accounts.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use super::types::AccountRecord;

/// An account with its resolved children, in code order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountNode {
    /// The account at this node.
    pub account: AccountRecord,
    /// Child nodes sorted by code.
    pub children: Vec<AccountNode>,
}

impl AccountNode {
    /// Number of accounts in this subtree, including the node itself.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Self::len).sum::<usize>()
    }

    /// Always false; a node contains at least itself.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Depth-first walk in code order.
    pub fn walk(&self) -> Vec<&AccountRecord> {
        let mut out = vec![&self.account];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

/// Builds a rooted forest from a flat account set.
///
/// Accounts without a parent are roots. So are accounts whose parent is
/// not part of `accounts` (e.g. filtered out), which keeps every input
/// account in the output exactly once.
#[must_use]
pub fn build_hierarchy(accounts: Vec<AccountRecord>) -> Vec<AccountNode> {
    let ids: HashSet<Uuid> = accounts.iter().map(|a| a.id).collect();

    let mut roots = Vec::new();
    let mut children: HashMap<Uuid, Vec<AccountRecord>> = HashMap::new();
    for account in accounts {
        match account.parent_id {
            Some(parent_id) if ids.contains(&parent_id) && parent_id != account.id => {
                children.entry(parent_id).or_default().push(account);
            }
            _ => roots.push(account),
        }
    }

    roots.sort_by(|a, b| a.code.cmp(&b.code));
    roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect()
}

fn attach(account: AccountRecord, children: &mut HashMap<Uuid, Vec<AccountRecord>>) -> AccountNode {
    let mut kids = children.remove(&account.id).unwrap_or_default();
    kids.sort_by(|a, b| a.code.cmp(&b.code));
    let children = kids.into_iter().map(|kid| attach(kid, children)).collect();
    AccountNode { account, children }
}

/// Active leaf accounts that may receive postings.
///
/// Excludes control accounts and any candidate that is the parent of
/// another candidate.
#[must_use]
pub fn transactional_accounts(candidates: Vec<AccountRecord>) -> Vec<AccountRecord> {
    let parents: HashSet<Uuid> = candidates.iter().filter_map(|a| a.parent_id).collect();

    let mut leaves: Vec<AccountRecord> = candidates
        .into_iter()
        .filter(|a| a.is_active && !a.is_control_account && !parents.contains(&a.id))
        .collect();
    leaves.sort_by(|a, b| a.code.cmp(&b.code));
    leaves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coa::types::AccountType;
    use rust_decimal::Decimal;

    fn account(code: &str, level: u8, parent: Option<&AccountRecord>, control: bool) -> AccountRecord {
        AccountRecord {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: format!("Account {code}"),
            account_type: AccountType::Asset,
            sub_type: None,
            level,
            parent_id: parent.map(|p| p.id),
            normal_balance: AccountType::Asset.normal_balance(),
            is_control_account: control,
            is_active: true,
            current_balance: Decimal::ZERO,
        }
    }

    fn sample() -> Vec<AccountRecord> {
        let root = account("1000", 1, None, true);
        let current = account("1100", 2, Some(&root), true);
        let cash = account("1101", 3, Some(&current), true);
        let petty = account("1101.02", 4, Some(&cash), false);
        let bank = account("1101.01", 4, Some(&cash), false);
        let receivable = account("1102", 3, Some(&current), false);
        vec![petty, receivable, root, bank, cash, current]
    }

    #[test]
    fn test_build_hierarchy_nests_in_code_order() {
        let forest = build_hierarchy(sample());
        assert_eq!(forest.len(), 1);

        let codes: Vec<&str> = forest[0].walk().iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["1000", "1100", "1101", "1101.01", "1101.02", "1102"]);
        assert_eq!(forest[0].len(), 6);
    }

    #[test]
    fn test_orphans_become_roots() {
        let accounts: Vec<AccountRecord> = sample()
            .into_iter()
            .filter(|a| a.code != "1100")
            .collect();
        let forest = build_hierarchy(accounts);

        let roots: Vec<&str> = forest.iter().map(|n| n.account.code.as_str()).collect();
        assert_eq!(roots, vec!["1000", "1101", "1102"]);
        assert_eq!(forest.iter().map(AccountNode::len).sum::<usize>(), 5);
    }

    #[test]
    fn test_empty_input_builds_empty_forest() {
        assert!(build_hierarchy(Vec::new()).is_empty());
    }

    #[test]
    fn test_transactional_excludes_parents_and_controls() {
        let leaves = transactional_accounts(sample());
        let codes: Vec<&str> = leaves.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["1101.01", "1101.02", "1102"]);
    }

    #[test]
    fn test_transactional_excludes_unflagged_parents_and_inactive() {
        let mut accounts = sample();
        for a in &mut accounts {
            if a.code == "1101" {
                a.is_control_account = false;
            }
            if a.code == "1102" {
                a.is_active = false;
            }
        }
        let leaves = transactional_accounts(accounts);
        let codes: Vec<&str> = leaves.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["1101.01", "1101.02"]);
    }
}
