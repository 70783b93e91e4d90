//! PSAK account codes and deterministic code allocation.
//!
//! Codes are four digits, optionally followed by a two-digit dot suffix at
//! level 4 (`1101.02`). The leading digit is the account type prefix.
//!
//! | Level | First code      | Increment    | Range                        |
//! |-------|-----------------|--------------|------------------------------|
//! | 1     | `{p}000`        | +100         | `{p}000`..`{p}900`           |
//! | 2     | parent + 100    | +100         | parent's thousand block      |
//! | 3     | parent + 1      | +1           | parent's hundred block       |
//! | 4     | `{parent}.01`   | suffix +1    | `{parent}.01`..`{parent}.99` |

use std::fmt;

use super::error::CoaError;
use super::types::{AccountProperties, AccountType, MAX_LEVEL, MIN_LEVEL};

/// A parsed account code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountCode {
    base: u32,
    suffix: Option<u8>,
}

impl AccountCode {
    /// Builds a code from its numeric parts.
    #[must_use]
    pub const fn new(base: u32, suffix: Option<u8>) -> Self {
        Self { base, suffix }
    }

    /// Parses `NNNN` or `NNNN.NN`.
    pub fn parse(code: &str) -> Result<Self, CoaError> {
        let invalid = |reason: &str| CoaError::InvalidCode {
            code: code.to_string(),
            reason: reason.to_string(),
        };

        let (base_part, suffix_part) = match code.split_once('.') {
            Some((base, suffix)) => (base, Some(suffix)),
            None => (code, None),
        };

        if base_part.len() != 4 || !base_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected four digits"));
        }
        let base: u32 = base_part
            .parse()
            .map_err(|_| invalid("expected four digits"))?;
        if base < 1000 {
            return Err(invalid("leading digit must be a type prefix"));
        }

        let suffix = match suffix_part {
            None => None,
            Some(s) if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) => {
                Some(s.parse().map_err(|_| invalid("expected a two-digit suffix"))?)
            }
            Some(_) => return Err(invalid("expected a two-digit suffix")),
        };

        Ok(Self { base, suffix })
    }

    /// The four-digit part.
    #[must_use]
    pub const fn base(self) -> u32 {
        self.base
    }

    /// The level-4 suffix, if any.
    #[must_use]
    pub const fn suffix(self) -> Option<u8> {
        self.suffix
    }

    /// Leading digit.
    #[must_use]
    pub const fn type_prefix(self) -> u32 {
        self.base / 1000
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suffix {
            Some(suffix) => write!(f, "{:04}.{suffix:02}", self.base),
            None => write!(f, "{:04}", self.base),
        }
    }
}

/// What to allocate a code for.
#[derive(Debug, Clone, Copy)]
pub struct CodeRequest {
    /// Type of the new account.
    pub account_type: AccountType,
    /// Level of the new account.
    pub level: u8,
    /// Parent's code; `None` only at level 1.
    pub parent: Option<AccountCode>,
}

/// Stateless code allocator.
pub struct CodeGenerator;

impl CodeGenerator {
    /// Retry ceiling used when configuration does not override it.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

    /// Checks that `code` has the PSAK shape for `account_type` at `level`.
    pub fn validate_account_code(
        code: &str,
        account_type: AccountType,
        level: u8,
    ) -> Result<AccountCode, CoaError> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(CoaError::InvalidLevel(level));
        }

        let parsed = AccountCode::parse(code)?;
        let prefix = account_type.prefix();
        let invalid = |reason: String| CoaError::InvalidCode {
            code: code.to_string(),
            reason,
        };

        if parsed.type_prefix() != prefix {
            return Err(invalid(format!("{account_type} codes must start with {prefix}")));
        }
        match (level, parsed.suffix) {
            (MAX_LEVEL, None) => Err(invalid(format!(
                "level 4 codes use the form {prefix}NNN.NN"
            ))),
            (MAX_LEVEL, Some(_)) | (_, None) => Ok(parsed),
            (_, Some(_)) => Err(invalid(format!(
                "level {level} codes use the form {prefix}NNN"
            ))),
        }
    }

    /// Rejects a code that lies outside the range its parent owns.
    pub fn ensure_within_parent(
        code: AccountCode,
        account_type: AccountType,
        level: u8,
        parent: AccountCode,
    ) -> Result<(), CoaError> {
        let request = CodeRequest {
            account_type,
            level,
            parent: Some(parent),
        };
        if Self::in_range(&request, code) {
            Ok(())
        } else {
            Err(CoaError::CodeOutsideParent {
                code: code.to_string(),
                parent: parent.to_string(),
            })
        }
    }

    /// Derives the next code after the highest in-range sibling.
    ///
    /// `siblings` may contain unrelated codes; only those inside the
    /// request's range are considered.
    pub fn first_candidate(
        request: &CodeRequest,
        siblings: &[AccountCode],
    ) -> Result<AccountCode, CoaError> {
        Self::validate_request(request)?;

        let highest = siblings
            .iter()
            .copied()
            .filter(|code| Self::in_range(request, *code))
            .max();

        match highest {
            Some(code) => Self::next_after(request, code),
            None => {
                let initial = Self::initial(request);
                if Self::in_range(request, initial) {
                    Ok(initial)
                } else {
                    Err(CoaError::CodeRangeExhausted {
                        after: request.parent.unwrap_or(initial).to_string(),
                    })
                }
            }
        }
    }

    /// The code one increment after `code`, staying inside the request's range.
    pub fn next_after(request: &CodeRequest, code: AccountCode) -> Result<AccountCode, CoaError> {
        Self::advance(request.level, code)
            .filter(|next| Self::in_range(request, *next))
            .ok_or_else(|| CoaError::CodeRangeExhausted {
                after: code.to_string(),
            })
    }

    /// Allocates a code, skipping taken ones, within `max_attempts` tries.
    pub fn generate<F>(
        request: &CodeRequest,
        siblings: &[AccountCode],
        max_attempts: u32,
        mut is_taken: F,
    ) -> Result<AccountCode, CoaError>
    where
        F: FnMut(&AccountCode) -> bool,
    {
        let mut candidate = Self::first_candidate(request, siblings)?;

        for attempt in 1..=max_attempts {
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
            if attempt < max_attempts {
                candidate = Self::next_after(request, candidate)?;
            }
        }

        Err(CoaError::GenerationExhausted {
            attempts: max_attempts,
        })
    }

    /// Suggests normal balance, control flag and sub-type for a code.
    #[must_use]
    pub fn suggest_properties(account_type: AccountType, code: AccountCode) -> AccountProperties {
        let sub_type = match code.base() {
            1101 => Some("CASH_AND_BANK"),
            1102 => Some("ACCOUNTS_RECEIVABLE"),
            1103 => Some("INVENTORY"),
            base if base / 100 == 51 => Some("DIRECT_COST"),
            base if base / 100 == 52 => Some("OPERATING_EXPENSE"),
            _ => None,
        };

        AccountProperties {
            normal_balance: account_type.normal_balance(),
            is_control_account: code.suffix().is_none(),
            sub_type,
        }
    }

    fn validate_request(request: &CodeRequest) -> Result<(), CoaError> {
        let level = request.level;
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(CoaError::InvalidLevel(level));
        }
        match (level, request.parent) {
            (MIN_LEVEL, Some(_)) => Err(CoaError::ParentNotAllowed),
            (MIN_LEVEL, None) => Ok(()),
            (_, None) => Err(CoaError::ParentRequired(level)),
            (_, Some(parent)) if parent.type_prefix() != request.account_type.prefix() => {
                Err(CoaError::InvalidCode {
                    code: parent.to_string(),
                    reason: format!("parent code does not belong to {}", request.account_type),
                })
            }
            (_, Some(_)) => Ok(()),
        }
    }

    const fn initial(request: &CodeRequest) -> AccountCode {
        let prefix = request.account_type.prefix();
        match (request.level, request.parent) {
            (2, Some(parent)) => AccountCode::new(parent.base + 100, None),
            (3, Some(parent)) => AccountCode::new(parent.base + 1, None),
            (MAX_LEVEL, Some(parent)) => AccountCode::new(parent.base, Some(1)),
            _ => AccountCode::new(prefix * 1000, None),
        }
    }

    fn advance(level: u8, code: AccountCode) -> Option<AccountCode> {
        match level {
            1 | 2 => Some(AccountCode::new(code.base + 100, None)),
            3 => Some(AccountCode::new(code.base + 1, None)),
            _ => code
                .suffix
                .and_then(|s| s.checked_add(1))
                .filter(|s| *s <= 99)
                .map(|s| AccountCode::new(code.base, Some(s))),
        }
    }

    fn in_range(request: &CodeRequest, code: AccountCode) -> bool {
        if code.type_prefix() != request.account_type.prefix() || code.base > 9999 {
            return false;
        }
        match (request.level, request.parent) {
            (1, None) => code.suffix.is_none() && code.base % 100 == 0,
            (2, Some(parent)) => {
                code.suffix.is_none()
                    && code.base % 100 == 0
                    && code.base / 1000 == parent.base / 1000
                    && code.base > parent.base
            }
            (3, Some(parent)) => {
                code.suffix.is_none()
                    && code.base / 100 == parent.base / 100
                    && code.base > parent.base
            }
            (MAX_LEVEL, Some(parent)) => {
                code.base == parent.base && code.suffix.is_some_and(|s| s >= 1)
            }
            _ => false,
        }
    }
}
