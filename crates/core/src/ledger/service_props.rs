//! Property-based tests for LedgerService.
//!
//! - Property 1: Entry Balance Integrity
//! - Property 2: Line Number Contiguity
//! - Property 3: Reversal Correctness

use chrono::NaiveDate;
use kontra_shared::types::JournalEntryId;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::reversal::{ReversalInput, ReversalService};
use super::service::{AccountInfo, LedgerService};
use super::types::{CreateEntryInput, JournalLineInput};
use crate::coa::NormalBalance;

/// Strategy to generate positive amounts in minor units (0.01 to 100,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn make_input(lines: Vec<JournalLineInput>) -> CreateEntryInput {
    CreateEntryInput {
        entry_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        description: "Test entry".to_string(),
        project_id: None,
        subsidiary_id: None,
        lines,
        created_by: None,
    }
}

/// Mock lookup where every account is an active leaf.
fn ok_lookup(id: Uuid) -> Option<AccountInfo> {
    Some(AccountInfo {
        id,
        is_active: true,
        is_control_account: false,
        normal_balance: NormalBalance::Debit,
    })
}

/// Debit lines for each amount plus one balancing credit line.
fn balanced_lines(amounts: &[Decimal]) -> Vec<JournalLineInput> {
    let mut lines: Vec<JournalLineInput> = (1u32..)
        .zip(amounts)
        .map(|(n, amount)| JournalLineInput::debit(n, Uuid::new_v4(), *amount))
        .collect();
    let total: Decimal = amounts.iter().copied().sum();
    let next = u32::try_from(lines.len()).unwrap() + 1;
    lines.push(JournalLineInput::credit(next, Uuid::new_v4(), total));
    lines
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// **Property 1.1: Balanced entries are accepted with exact totals**
    #[test]
    fn prop_balanced_entry_accepted(amounts in prop::collection::vec(positive_amount(), 1..10)) {
        let input = make_input(balanced_lines(&amounts));
        let (_, totals) = LedgerService::validate_entry(&input, ok_lookup).unwrap();
        let expected: Decimal = amounts.iter().copied().sum();
        prop_assert!(totals.is_balanced);
        prop_assert_eq!(totals.total_debit, expected);
        prop_assert_eq!(totals.total_credit, expected);
    }

    /// **Property 1.2: Any one-cent imbalance is rejected**
    ///
    /// There is no tolerance: off by 0.01 is as wrong as off by a million.
    #[test]
    fn prop_any_imbalance_rejected(
        amounts in prop::collection::vec(positive_amount(), 1..10),
        skew in 1i64..1_000_000i64,
    ) {
        let mut lines = balanced_lines(&amounts);
        let last = lines.len() - 1;
        lines[last].credit += Decimal::new(skew, 2);

        let result = LedgerService::validate_entry(&make_input(lines), ok_lookup);
        let is_imbalanced = matches!(result, Err(LedgerError::ImbalancedEntry { .. }));
        prop_assert!(is_imbalanced);
    }

    /// **Property 2.1: Line order in the input does not matter**
    #[test]
    fn prop_shuffled_lines_validate(
        amounts in prop::collection::vec(positive_amount(), 1..10),
        rotate in 0usize..10,
    ) {
        let mut lines = balanced_lines(&amounts);
        let len = lines.len();
        lines.rotate_left(rotate % len);

        let (ordered, _) = LedgerService::validate_entry(&make_input(lines), ok_lookup).unwrap();
        let numbers: Vec<u32> = ordered.iter().map(|l| l.line_number).collect();
        let expected: Vec<u32> = (1..=u32::try_from(len).unwrap()).collect();
        prop_assert_eq!(numbers, expected);
    }

    /// **Property 2.2: A gap anywhere is rejected**
    #[test]
    fn prop_line_number_gap_rejected(
        amounts in prop::collection::vec(positive_amount(), 1..10),
        gap_at in 0usize..10,
    ) {
        let mut lines = balanced_lines(&amounts);
        let idx = gap_at % lines.len();
        for line in lines.iter_mut().skip(idx) {
            line.line_number += 1;
        }

        let result = LedgerService::validate_entry(&make_input(lines), ok_lookup);
        let is_sequence_error = matches!(result, Err(LedgerError::LineNumberSequence { .. }));
        prop_assert!(is_sequence_error);
    }

    /// **Property 3.1: Reversal mirrors totals and nets accounts to zero**
    #[test]
    fn prop_reversal_nets_to_zero(amounts in prop::collection::vec(positive_amount(), 1..10)) {
        let lines = balanced_lines(&amounts);
        let input = ReversalInput {
            original_entry_id: JournalEntryId::new(),
            original_entry_number: "JE2026010001".to_string(),
            project_id: None,
            subsidiary_id: None,
            original_lines: lines.clone(),
            reversal_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            reason: "Correction".to_string(),
            reversed_by: None,
        };
        let output = ReversalService::create_reversing_entry(&input).unwrap();

        let original = LedgerService::validate_entry(&make_input(lines.clone()), ok_lookup).unwrap().1;
        prop_assert_eq!(output.totals.total_debit, original.total_credit);
        prop_assert_eq!(output.totals.total_credit, original.total_debit);

        let net = ReversalService::net_effect(&lines, &output.entry.lines);
        prop_assert!(net.iter().all(|(_, amount)| amount.is_zero()));

        // The compensating entry passes the same validation as any entry
        prop_assert!(LedgerService::validate_entry(&output.entry, ok_lookup).is_ok());
    }
}
