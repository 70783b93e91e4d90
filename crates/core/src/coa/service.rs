//! Account registry rules: structural validation and field resolution.

use uuid::Uuid;

use super::code::{AccountCode, CodeGenerator};
use super::error::CoaError;
use super::types::{AccountRecord, AccountSpec, AccountType, MAX_LEVEL, MIN_LEVEL, NewAccount, ParentInfo};

/// What the registry must do to the parent when a child is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentAction {
    /// Nothing; parent is absent or already a control account.
    None,
    /// Flip the parent to a control account in the same transaction.
    PromoteToControl(Uuid),
}

/// Chart-of-accounts rules with no database dependencies.
pub struct AccountService;

impl AccountService {
    /// Validates the type/level/parent triple of a new account.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the parent is missing, extra,
    /// inactive, at the wrong level, or of a different type.
    pub fn validate_parent(
        account_type: AccountType,
        level: u8,
        parent: Option<&ParentInfo>,
    ) -> Result<(), CoaError> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(CoaError::InvalidLevel(level));
        }

        match parent {
            None if level == MIN_LEVEL => Ok(()),
            None => Err(CoaError::ParentRequired(level)),
            Some(_) if level == MIN_LEVEL => Err(CoaError::ParentNotAllowed),
            Some(p) if p.level != level - 1 => Err(CoaError::ParentLevelMismatch {
                expected: level - 1,
                actual: p.level,
            }),
            Some(p) if p.account_type != account_type => Err(CoaError::ParentTypeMismatch {
                expected: account_type,
                actual: p.account_type,
            }),
            Some(p) if !p.is_active => Err(CoaError::ParentInactive(p.id)),
            Some(_) => Ok(()),
        }
    }

    /// Validates an explicit code against type, level and parent range.
    pub fn validate_explicit_code(
        code: &str,
        account_type: AccountType,
        level: u8,
        parent: Option<&ParentInfo>,
    ) -> Result<AccountCode, CoaError> {
        let parsed = CodeGenerator::validate_account_code(code, account_type, level)?;
        if let Some(parent) = parent {
            let parent_code = AccountCode::parse(&parent.code)?;
            CodeGenerator::ensure_within_parent(parsed, account_type, level, parent_code)?;
        }
        Ok(parsed)
    }

    /// Resolves every field of the account to insert.
    ///
    /// Defaults normal balance from the type, and control flag and sub-type
    /// from the code when the caller leaves them unset.
    pub fn resolve_new_account(spec: &AccountSpec, code: AccountCode) -> Result<NewAccount, CoaError> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(CoaError::EmptyName);
        }

        let suggested = CodeGenerator::suggest_properties(spec.account_type, code);
        let sub_type = spec
            .sub_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .or_else(|| suggested.sub_type.map(ToString::to_string));

        Ok(NewAccount {
            code: code.to_string(),
            name: name.to_string(),
            account_type: spec.account_type,
            sub_type,
            level: spec.level,
            parent_id: spec.parent_id,
            normal_balance: spec.normal_balance.unwrap_or(suggested.normal_balance),
            is_control_account: spec
                .is_control_account
                .unwrap_or(suggested.is_control_account),
        })
    }

    /// Decides what happens to the parent when a child is attached.
    ///
    /// # Errors
    ///
    /// Returns `ParentHasPostings` if the parent must be promoted but already
    /// carries journal lines.
    pub fn parent_action(parent: Option<&ParentInfo>, parent_line_count: u64) -> Result<ParentAction, CoaError> {
        match parent {
            Some(p) if !p.is_control_account && parent_line_count > 0 => {
                Err(CoaError::ParentHasPostings(p.id))
            }
            Some(p) if !p.is_control_account => Ok(ParentAction::PromoteToControl(p.id)),
            _ => Ok(ParentAction::None),
        }
    }

    /// Deactivation is only allowed once no active children remain.
    pub fn ensure_can_deactivate(account_id: Uuid, active_children: u64) -> Result<(), CoaError> {
        if active_children > 0 {
            return Err(CoaError::HasActiveChildren {
                account_id,
                count: active_children,
            });
        }
        Ok(())
    }

    /// Accounts that may parent a new account of `account_type` at `level`.
    #[must_use]
    pub fn available_parents(
        accounts: &[AccountRecord],
        account_type: AccountType,
        level: u8,
    ) -> Vec<AccountRecord> {
        if level <= MIN_LEVEL {
            return Vec::new();
        }
        let mut parents: Vec<AccountRecord> = accounts
            .iter()
            .filter(|a| a.is_active && a.account_type == account_type && a.level == level - 1)
            .cloned()
            .collect();
        parents.sort_by(|a, b| a.code.cmp(&b.code));
        parents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coa::types::NormalBalance;
    use rust_decimal::Decimal;

    fn parent(level: u8, account_type: AccountType, code: &str) -> ParentInfo {
        ParentInfo {
            id: Uuid::new_v4(),
            code: code.to_string(),
            level,
            account_type,
            is_active: true,
            is_control_account: true,
        }
    }

    fn spec(level: u8) -> AccountSpec {
        AccountSpec {
            code: None,
            name: "Kas & Bank".to_string(),
            account_type: AccountType::Asset,
            sub_type: None,
            level,
            parent_id: None,
            normal_balance: None,
            is_control_account: None,
        }
    }

    #[test]
    fn test_valid_parent_chain() {
        let p = parent(2, AccountType::Asset, "1100");
        assert!(AccountService::validate_parent(AccountType::Asset, 3, Some(&p)).is_ok());
        assert!(AccountService::validate_parent(AccountType::Asset, 1, None).is_ok());
    }

    #[test]
    fn test_parent_rules() {
        let l1 = parent(1, AccountType::Asset, "1000");
        assert!(matches!(
            AccountService::validate_parent(AccountType::Asset, 3, Some(&l1)),
            Err(CoaError::ParentLevelMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            AccountService::validate_parent(AccountType::Liability, 2, Some(&l1)),
            Err(CoaError::ParentTypeMismatch { .. })
        ));
        assert!(matches!(
            AccountService::validate_parent(AccountType::Asset, 1, Some(&l1)),
            Err(CoaError::ParentNotAllowed)
        ));
        assert!(matches!(
            AccountService::validate_parent(AccountType::Asset, 2, None),
            Err(CoaError::ParentRequired(2))
        ));
        assert!(matches!(
            AccountService::validate_parent(AccountType::Asset, 0, None),
            Err(CoaError::InvalidLevel(0))
        ));

        let inactive = ParentInfo {
            is_active: false,
            ..l1
        };
        assert!(matches!(
            AccountService::validate_parent(AccountType::Asset, 2, Some(&inactive)),
            Err(CoaError::ParentInactive(_))
        ));
    }

    #[test]
    fn test_explicit_code_must_sit_under_parent() {
        let p = parent(2, AccountType::Asset, "1100");
        assert!(AccountService::validate_explicit_code("1105", AccountType::Asset, 3, Some(&p)).is_ok());
        assert!(matches!(
            AccountService::validate_explicit_code("1205", AccountType::Asset, 3, Some(&p)),
            Err(CoaError::CodeOutsideParent { .. })
        ));
    }

    #[test]
    fn test_resolve_defaults() {
        let resolved =
            AccountService::resolve_new_account(&spec(3), AccountCode::parse("1101").unwrap()).unwrap();
        assert_eq!(resolved.normal_balance, NormalBalance::Debit);
        assert!(resolved.is_control_account);
        assert_eq!(resolved.sub_type.as_deref(), Some("CASH_AND_BANK"));
        assert_eq!(resolved.code, "1101");
    }

    #[test]
    fn test_resolve_respects_overrides() {
        let mut s = spec(3);
        s.name = "  Pendapatan Kontrak  ".to_string();
        s.account_type = AccountType::Revenue;
        s.is_control_account = Some(false);
        s.sub_type = Some("CONTRACT_REVENUE".to_string());
        let resolved =
            AccountService::resolve_new_account(&s, AccountCode::parse("4101").unwrap()).unwrap();
        assert_eq!(resolved.name, "Pendapatan Kontrak");
        assert_eq!(resolved.normal_balance, NormalBalance::Credit);
        assert!(!resolved.is_control_account);
        assert_eq!(resolved.sub_type.as_deref(), Some("CONTRACT_REVENUE"));
    }

    #[test]
    fn test_resolve_rejects_blank_name() {
        let mut s = spec(1);
        s.name = "   ".to_string();
        assert!(matches!(
            AccountService::resolve_new_account(&s, AccountCode::parse("1000").unwrap()),
            Err(CoaError::EmptyName)
        ));
    }

    #[test]
    fn test_parent_action() {
        let mut p = parent(3, AccountType::Asset, "1101");
        assert_eq!(AccountService::parent_action(Some(&p), 5).unwrap(), ParentAction::None);

        p.is_control_account = false;
        assert_eq!(
            AccountService::parent_action(Some(&p), 0).unwrap(),
            ParentAction::PromoteToControl(p.id)
        );
        assert!(matches!(
            AccountService::parent_action(Some(&p), 1),
            Err(CoaError::ParentHasPostings(_))
        ));
        assert_eq!(AccountService::parent_action(None, 0).unwrap(), ParentAction::None);
    }

    #[test]
    fn test_ensure_can_deactivate() {
        assert!(AccountService::ensure_can_deactivate(Uuid::nil(), 0).is_ok());
        assert!(matches!(
            AccountService::ensure_can_deactivate(Uuid::nil(), 3),
            Err(CoaError::HasActiveChildren { count: 3, .. })
        ));
    }

    #[test]
    fn test_available_parents() {
        let record = |code: &str, level: u8, account_type: AccountType, active: bool| AccountRecord {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_string(),
            account_type,
            sub_type: None,
            level,
            parent_id: None,
            normal_balance: account_type.normal_balance(),
            is_control_account: true,
            is_active: active,
            current_balance: Decimal::ZERO,
        };
        let accounts = vec![
            record("1200", 2, AccountType::Asset, true),
            record("1100", 2, AccountType::Asset, true),
            record("1300", 2, AccountType::Asset, false),
            record("2100", 2, AccountType::Liability, true),
            record("1101", 3, AccountType::Asset, true),
        ];
        let parents = AccountService::available_parents(&accounts, AccountType::Asset, 3);
        let codes: Vec<&str> = parents.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["1100", "1200"]);
        assert!(AccountService::available_parents(&accounts, AccountType::Asset, 1).is_empty());
    }
}
