//! Ledger service for journal entry validation.
//!
//! This module provides the core business logic for validating journal
//! entries before they are persisted or posted.

use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::types::{CreateEntryInput, EntryStatus, EntryTotals, JournalLineInput, PostingLine};
use crate::coa::NormalBalance;

/// Largest number of fractional digits a ledger amount may carry.
pub const MAX_AMOUNT_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(19, 2)` column holds: 99,999,999,999,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_313_682_943, 2_328_306_436, 0, false, 2);

/// Information about an account needed for validation.
#[derive(Debug, Clone, Copy)]
pub struct AccountInfo {
    /// The account ID.
    pub id: Uuid,
    /// Whether the account is active.
    pub is_active: bool,
    /// Whether the account is a control account.
    pub is_control_account: bool,
    /// Normal balance side.
    pub normal_balance: NormalBalance,
}

/// Ledger service for journal entry validation.
///
/// This service contains pure business logic with no database dependencies.
pub struct LedgerService;

impl LedgerService {
    /// Validate a candidate entry before persisting it as a draft.
    ///
    /// Checks, in order:
    /// 1. At least 2 lines and a description
    /// 2. Each line's amounts (debit xor credit, non-negative, 2 dp)
    /// 3. Line numbers form 1..N
    /// 4. Every account exists, is active and is not a control account
    /// 5. Debits equal credits exactly
    ///
    /// # Returns
    ///
    /// The lines ordered by line number, and the entry totals.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if validation fails.
    pub fn validate_entry<A>(
        input: &CreateEntryInput,
        account_lookup: A,
    ) -> Result<(Vec<JournalLineInput>, EntryTotals), LedgerError>
    where
        A: Fn(Uuid) -> Option<AccountInfo>,
    {
        if input.lines.len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }
        if input.description.trim().is_empty() {
            return Err(LedgerError::EmptyDescription);
        }

        for line in &input.lines {
            Self::validate_line(line)?;
        }

        Self::validate_line_numbers(input.lines.iter().map(|l| l.line_number))?;

        let posting: Vec<PostingLine> = input.lines.iter().map(PostingLine::from).collect();
        let totals = Self::validate_postable(&posting, &account_lookup)?;

        let mut ordered = input.lines.clone();
        ordered.sort_by_key(|l| l.line_number);

        Ok((ordered, totals))
    }

    /// Re-validate a stored entry right before it is posted.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` unless the entry is a draft, otherwise the
    /// same account and balance errors as creation.
    pub fn validate_for_posting<A>(
        entry_id: Uuid,
        status: EntryStatus,
        lines: &[PostingLine],
        account_lookup: A,
    ) -> Result<EntryTotals, LedgerError>
    where
        A: Fn(Uuid) -> Option<AccountInfo>,
    {
        if status != EntryStatus::Draft {
            return Err(LedgerError::AlreadyPosted(entry_id));
        }
        if lines.len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }
        Self::validate_postable(lines, &account_lookup)
    }

    /// Validate a single line's amounts.
    ///
    /// # Errors
    ///
    /// Returns error if an amount is negative, too precise, above
    /// [`MAX_AMOUNT`], or if the line does not carry exactly one strictly
    /// positive side.
    pub fn validate_line(line: &JournalLineInput) -> Result<(), LedgerError> {
        let line_number = line.line_number;

        if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount { line_number });
        }
        if line.debit.is_zero() == line.credit.is_zero() {
            return Err(LedgerError::InvalidLineAmounts { line_number });
        }

        for amount in [line.debit, line.credit] {
            let scale = amount.normalize().scale();
            if scale > MAX_AMOUNT_SCALE {
                return Err(LedgerError::ExcessPrecision { line_number, scale });
            }
            if amount > MAX_AMOUNT {
                return Err(LedgerError::AmountOutOfRange {
                    line_number,
                    max: MAX_AMOUNT,
                });
            }
        }

        if let Some(tax) = line.tax_amount {
            if tax < Decimal::ZERO || tax.normalize().scale() > MAX_AMOUNT_SCALE {
                return Err(LedgerError::InvalidTaxAmount { line_number });
            }
            if tax > MAX_AMOUNT {
                return Err(LedgerError::AmountOutOfRange {
                    line_number,
                    max: MAX_AMOUNT,
                });
            }
        }

        Ok(())
    }

    /// Validate that line numbers are exactly 1..N in some order.
    ///
    /// # Errors
    ///
    /// Returns `LineNumberSequence` naming the first position that breaks
    /// the sequence.
    pub fn validate_line_numbers<I>(numbers: I) -> Result<(), LedgerError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut numbers: Vec<u32> = numbers.into_iter().collect();
        numbers.sort_unstable();

        for (expected, found) in (1u32..).zip(numbers) {
            if found != expected {
                return Err(LedgerError::LineNumberSequence { expected, found });
            }
        }
        Ok(())
    }

    /// Calculate entry totals from lines.
    ///
    /// # Errors
    ///
    /// Returns `TotalOutOfRange` when either total exceeds [`MAX_AMOUNT`].
    pub fn calculate_totals(lines: &[PostingLine]) -> Result<EntryTotals, LedgerError> {
        Self::totals_within_range(lines.iter().map(|l| (l.debit, l.credit)))
    }

    pub(crate) fn totals_within_range<I>(amounts: I) -> Result<EntryTotals, LedgerError>
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        EntryTotals::from_amounts(amounts)
            .filter(|t| t.total_debit <= MAX_AMOUNT && t.total_credit <= MAX_AMOUNT)
            .ok_or(LedgerError::TotalOutOfRange { max: MAX_AMOUNT })
    }

    /// Validate that an entry can be deleted.
    ///
    /// Only draft entries can be deleted.
    ///
    /// # Errors
    ///
    /// Returns error if entry is not in draft status.
    pub fn validate_can_delete(entry_id: Uuid, status: EntryStatus) -> Result<(), LedgerError> {
        if !status.is_editable() {
            return Err(LedgerError::CanOnlyDeleteDraft(entry_id));
        }
        Ok(())
    }

    /// Validate that an entry can be reversed.
    ///
    /// # Errors
    ///
    /// Returns error unless the entry is posted, not yet reversed, and not
    /// itself a compensating entry.
    pub fn validate_can_reverse(
        entry_id: Uuid,
        status: EntryStatus,
        reversal_of_entry_id: Option<Uuid>,
    ) -> Result<(), LedgerError> {
        match status {
            EntryStatus::Draft => Err(LedgerError::NotPosted(entry_id)),
            EntryStatus::Reversed => Err(LedgerError::AlreadyReversed(entry_id)),
            EntryStatus::Posted if reversal_of_entry_id.is_some() => {
                Err(LedgerError::CannotReverseReversal(entry_id))
            }
            EntryStatus::Posted => Ok(()),
        }
    }

    fn validate_postable<A>(lines: &[PostingLine], account_lookup: &A) -> Result<EntryTotals, LedgerError>
    where
        A: Fn(Uuid) -> Option<AccountInfo>,
    {
        for line in lines {
            let info = account_lookup(line.account_id)
                .filter(|info| info.is_active)
                .ok_or(LedgerError::UnknownAccount(line.account_id))?;
            if info.is_control_account {
                return Err(LedgerError::ControlAccountPosting(line.account_id));
            }
        }

        let totals = Self::calculate_totals(lines)?;
        if !totals.is_balanced {
            return Err(LedgerError::ImbalancedEntry {
                debit: totals.total_debit,
                credit: totals.total_credit,
            });
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn leaf(id: Uuid) -> AccountInfo {
        AccountInfo {
            id,
            is_active: true,
            is_control_account: false,
            normal_balance: NormalBalance::Debit,
        }
    }

    fn make_input(lines: Vec<JournalLineInput>) -> CreateEntryInput {
        CreateEntryInput {
            entry_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            description: "Penerimaan termin proyek".to_string(),
            project_id: None,
            subsidiary_id: None,
            lines,
            created_by: None,
        }
    }

    // Mock lookup that knows every account as an active leaf
    fn ok_lookup(id: Uuid) -> Option<AccountInfo> {
        Some(leaf(id))
    }

    fn balanced_pair(amount: Decimal) -> Vec<JournalLineInput> {
        vec![
            JournalLineInput::debit(1, Uuid::new_v4(), amount),
            JournalLineInput::credit(2, Uuid::new_v4(), amount),
        ]
    }

    #[test]
    fn test_validate_balanced_entry() {
        let input = make_input(balanced_pair(dec!(500000)));
        let (lines, totals) = LedgerService::validate_entry(&input, ok_lookup).unwrap();

        assert_eq!(lines.len(), 2);
        assert!(totals.is_balanced);
        assert_eq!(totals.total_debit, dec!(500000));
        assert_eq!(totals.total_credit, dec!(500000));
    }

    #[test]
    fn test_validate_imbalanced_entry() {
        let input = make_input(vec![
            JournalLineInput::debit(1, Uuid::new_v4(), dec!(500000)),
            JournalLineInput::credit(2, Uuid::new_v4(), dec!(400000)),
        ]);

        let result = LedgerService::validate_entry(&input, ok_lookup);
        assert!(matches!(
            result,
            Err(LedgerError::ImbalancedEntry { debit, credit })
                if debit == dec!(500000) && credit == dec!(400000)
        ));
    }

    #[test]
    fn test_validate_insufficient_lines() {
        let input = make_input(vec![JournalLineInput::debit(1, Uuid::new_v4(), dec!(1))]);
        assert!(matches!(
            LedgerService::validate_entry(&input, ok_lookup),
            Err(LedgerError::InsufficientLines)
        ));
    }

    #[test]
    fn test_validate_blank_description() {
        let mut input = make_input(balanced_pair(dec!(1)));
        input.description = "  ".to_string();
        assert!(matches!(
            LedgerService::validate_entry(&input, ok_lookup),
            Err(LedgerError::EmptyDescription)
        ));
    }

    #[test]
    fn test_line_with_both_sides_is_rejected() {
        let mut lines = balanced_pair(dec!(100));
        lines[0].credit = dec!(100);
        let input = make_input(lines);
        assert!(matches!(
            LedgerService::validate_entry(&input, ok_lookup),
            Err(LedgerError::InvalidLineAmounts { line_number: 1 })
        ));
    }

    #[test]
    fn test_line_with_neither_side_is_rejected() {
        let mut lines = balanced_pair(dec!(100));
        lines[1].credit = Decimal::ZERO;
        let input = make_input(lines);
        assert!(matches!(
            LedgerService::validate_entry(&input, ok_lookup),
            Err(LedgerError::InvalidLineAmounts { line_number: 2 })
        ));
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let mut lines = balanced_pair(dec!(100));
        lines[0].debit = dec!(-100);
        let input = make_input(lines);
        assert!(matches!(
            LedgerService::validate_entry(&input, ok_lookup),
            Err(LedgerError::NegativeAmount { line_number: 1 })
        ));
    }

    #[test]
    fn test_sub_cent_amount_is_rejected() {
        let input = make_input(balanced_pair(dec!(10.005)));
        assert!(matches!(
            LedgerService::validate_entry(&input, ok_lookup),
            Err(LedgerError::ExcessPrecision { scale: 3, .. })
        ));
    }

    #[test]
    fn test_trailing_zero_scale_is_accepted() {
        let input = make_input(balanced_pair(dec!(10.5000)));
        assert!(LedgerService::validate_entry(&input, ok_lookup).is_ok());
    }

    #[test]
    fn test_amount_above_column_maximum_is_rejected() {
        let id = Uuid::new_v4();
        let huge = dec!(50000000000000000000000000000);
        let input = make_input(vec![
            JournalLineInput::debit(1, id, huge),
            JournalLineInput::debit(2, id, huge),
            JournalLineInput::credit(3, id, huge),
            JournalLineInput::credit(4, id, huge),
        ]);
        let err = LedgerService::validate_entry(&input, ok_lookup).unwrap_err();
        assert!(matches!(err, LedgerError::AmountOutOfRange { line_number: 1, .. }));

        let mut line = JournalLineInput::debit(1, id, dec!(100));
        line.tax_amount = Some(MAX_AMOUNT + dec!(0.01));
        assert!(matches!(
            LedgerService::validate_line(&line),
            Err(LedgerError::AmountOutOfRange { line_number: 1, .. })
        ));
    }

    #[test]
    fn test_column_maximum_is_accepted_but_totals_are_bounded() {
        let id = Uuid::new_v4();
        assert_eq!(MAX_AMOUNT, dec!(99999999999999999.99));
        assert!(LedgerService::validate_entry(&make_input(balanced_pair(MAX_AMOUNT)), ok_lookup).is_ok());

        let input = make_input(vec![
            JournalLineInput::debit(1, id, MAX_AMOUNT),
            JournalLineInput::debit(2, id, MAX_AMOUNT),
            JournalLineInput::credit(3, id, MAX_AMOUNT),
            JournalLineInput::credit(4, id, MAX_AMOUNT),
        ]);
        let err = LedgerService::validate_entry(&input, ok_lookup).unwrap_err();
        assert!(matches!(err, LedgerError::TotalOutOfRange { .. }));
        assert_eq!(err.http_status_code(), 422);
    }

    #[test]
    fn test_negative_tax_is_rejected() {
        let mut lines = balanced_pair(dec!(100));
        lines[0].tax_amount = Some(dec!(-11));
        let input = make_input(lines);
        assert!(matches!(
            LedgerService::validate_entry(&input, ok_lookup),
            Err(LedgerError::InvalidTaxAmount { line_number: 1 })
        ));
    }

    #[test]
    fn test_lines_are_returned_in_line_number_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let input = make_input(vec![
            JournalLineInput::credit(3, c, dec!(40)),
            JournalLineInput::debit(1, a, dec!(100)),
            JournalLineInput::credit(2, b, dec!(60)),
        ]);
        let (lines, _) = LedgerService::validate_entry(&input, ok_lookup).unwrap();
        let order: Vec<Uuid> = lines.iter().map(|l| l.account_id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_line_number_gaps_and_duplicates() {
        assert!(LedgerService::validate_line_numbers([2, 1, 3]).is_ok());
        assert!(matches!(
            LedgerService::validate_line_numbers([1, 3]),
            Err(LedgerError::LineNumberSequence { expected: 2, found: 3 })
        ));
        assert!(matches!(
            LedgerService::validate_line_numbers([1, 1, 2]),
            Err(LedgerError::LineNumberSequence { expected: 2, found: 1 })
        ));
        assert!(matches!(
            LedgerService::validate_line_numbers([0, 1]),
            Err(LedgerError::LineNumberSequence { expected: 1, found: 0 })
        ));
    }

    #[test]
    fn test_unknown_and_inactive_accounts() {
        let input = make_input(balanced_pair(dec!(100)));
        assert!(matches!(
            LedgerService::validate_entry(&input, |_| None),
            Err(LedgerError::UnknownAccount(_))
        ));

        let inactive = |id: Uuid| {
            Some(AccountInfo {
                is_active: false,
                ..leaf(id)
            })
        };
        assert!(matches!(
            LedgerService::validate_entry(&input, inactive),
            Err(LedgerError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_control_account_posting() {
        let lines = balanced_pair(dec!(100));
        let control_id = lines[1].account_id;
        let input = make_input(lines);
        let accounts: HashMap<Uuid, AccountInfo> = input
            .lines
            .iter()
            .map(|l| {
                let info = AccountInfo {
                    is_control_account: l.account_id == control_id,
                    ..leaf(l.account_id)
                };
                (l.account_id, info)
            })
            .collect();

        let result = LedgerService::validate_entry(&input, |id| accounts.get(&id).copied());
        assert!(matches!(
            result,
            Err(LedgerError::ControlAccountPosting(id)) if id == control_id
        ));
    }

    #[test]
    fn test_validate_for_posting_rejects_second_post() {
        let lines: Vec<PostingLine> = balanced_pair(dec!(5)).iter().map(PostingLine::from).collect();
        let id = Uuid::new_v4();
        assert!(LedgerService::validate_for_posting(id, EntryStatus::Draft, &lines, ok_lookup).is_ok());
        assert!(matches!(
            LedgerService::validate_for_posting(id, EntryStatus::Posted, &lines, ok_lookup),
            Err(LedgerError::AlreadyPosted(_))
        ));
        assert!(matches!(
            LedgerService::validate_for_posting(id, EntryStatus::Reversed, &lines, ok_lookup),
            Err(LedgerError::AlreadyPosted(_))
        ));
    }

    #[test]
    fn test_validate_can_delete() {
        let id = Uuid::new_v4();
        assert!(LedgerService::validate_can_delete(id, EntryStatus::Draft).is_ok());
        assert!(matches!(
            LedgerService::validate_can_delete(id, EntryStatus::Posted),
            Err(LedgerError::CanOnlyDeleteDraft(_))
        ));
    }

    #[test]
    fn test_validate_can_reverse() {
        let id = Uuid::new_v4();
        assert!(LedgerService::validate_can_reverse(id, EntryStatus::Posted, None).is_ok());
        assert!(matches!(
            LedgerService::validate_can_reverse(id, EntryStatus::Draft, None),
            Err(LedgerError::NotPosted(_))
        ));
        assert!(matches!(
            LedgerService::validate_can_reverse(id, EntryStatus::Reversed, None),
            Err(LedgerError::AlreadyReversed(_))
        ));
        assert!(matches!(
            LedgerService::validate_can_reverse(id, EntryStatus::Posted, Some(Uuid::new_v4())),
            Err(LedgerError::CannotReverseReversal(_))
        ));
    }
}
