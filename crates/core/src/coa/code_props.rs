//! Property-based tests for code allocation.
//!
//! - Generated codes always have the PSAK shape for their level
//! - Generated codes never leave the parent's range
//! - Sequential allocation under one parent never repeats a code

use std::collections::HashSet;

use proptest::prelude::*;

use super::code::{AccountCode, CodeGenerator, CodeRequest};
use super::error::CoaError;
use super::types::AccountType;

fn account_type() -> impl Strategy<Value = AccountType> {
    prop_oneof![
        Just(AccountType::Asset),
        Just(AccountType::Liability),
        Just(AccountType::Equity),
        Just(AccountType::Revenue),
        Just(AccountType::Expense),
    ]
}

/// A request at level 1-4 with a well-formed parent for its type.
fn request() -> impl Strategy<Value = CodeRequest> {
    (account_type(), 1u8..=4, 1u32..=9, 1u32..=9).prop_map(|(t, level, hundreds, units)| {
        let p = t.prefix() * 1000;
        let parent = match level {
            2 => Some(AccountCode::new(p, None)),
            3 => Some(AccountCode::new(p + hundreds * 100, None)),
            4 => Some(AccountCode::new(p + hundreds * 100 + units, None)),
            _ => None,
        };
        CodeRequest {
            account_type: t,
            level,
            parent,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// **Allocated codes validate for their type and level**
    #[test]
    fn prop_generated_code_is_well_formed(req in request(), taken in 0usize..8) {
        let mut seen = 0usize;
        let result = CodeGenerator::generate(&req, &[], 10, |_| {
            seen += 1;
            seen <= taken
        });

        match result {
            Ok(code) => {
                let raw = code.to_string();
                prop_assert!(
                    CodeGenerator::validate_account_code(&raw, req.account_type, req.level).is_ok(),
                    "{} invalid at level {}", raw, req.level
                );
                if let Some(parent) = req.parent {
                    prop_assert!(CodeGenerator::ensure_within_parent(
                        code, req.account_type, req.level, parent
                    ).is_ok());
                }
            }
            Err(CoaError::CodeRangeExhausted { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// **Sequential allocation yields distinct, strictly increasing codes**
    #[test]
    fn prop_sequential_allocation_is_unique(req in request(), n in 1usize..8) {
        let mut existing: Vec<AccountCode> = Vec::new();
        for _ in 0..n {
            match CodeGenerator::first_candidate(&req, &existing) {
                Ok(code) => {
                    if let Some(last) = existing.last() {
                        prop_assert!(code > *last);
                    }
                    existing.push(code);
                }
                Err(CoaError::CodeRangeExhausted { .. }) => break,
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
        let unique: HashSet<AccountCode> = existing.iter().copied().collect();
        prop_assert_eq!(unique.len(), existing.len());
    }

    /// **A taken candidate is never returned**
    #[test]
    fn prop_taken_codes_are_skipped(req in request(), skip in 0u8..5) {
        let mut taken = HashSet::new();
        let mut candidate = CodeGenerator::first_candidate(&req, &[]);
        for _ in 0..skip {
            if let Ok(code) = candidate {
                taken.insert(code);
                candidate = CodeGenerator::next_after(&req, code);
            }
        }

        if let Ok(code) = CodeGenerator::generate(&req, &[], 10, |c| taken.contains(c)) {
            prop_assert!(!taken.contains(&code));
        }
    }
}
