//! Account repository for chart of accounts database operations.
//!
//! Account creation runs in a SERIALIZABLE transaction so that two
//! concurrent requests for the same parent never receive the same code.
//! A transaction that loses the race is retried from scratch.

use std::collections::HashSet;

use kontra_core::coa::{
    AccountCode, AccountNode, AccountRecord, AccountService, AccountSpec, AccountType, CoaError, CodeGenerator,
    CodeRequest, MIN_LEVEL, ParentAction, ParentInfo, build_hierarchy, transactional_accounts,
};
use kontra_shared::AppError;
use kontra_shared::config::LedgerConfig;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, IsolationLevel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entities::{chart_of_accounts, journal_entry_lines, sea_orm_active_enums};
use crate::retry::{is_retryable_conflict, is_unique_violation};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// A chart-of-accounts rule rejected the request.
    #[error(transparent)]
    Coa(#[from] CoaError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Coa(e) => e.into(),
            AccountError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Filter by account type.
    pub account_type: Option<AccountType>,
    /// Filter by active status.
    pub is_active: Option<bool>,
    /// Filter by parent ID (`Some(None)` = root accounts only).
    pub parent_id: Option<Option<Uuid>>,
    /// Filter by level.
    pub level: Option<u8>,
}

impl From<chart_of_accounts::Model> for AccountRecord {
    fn from(model: chart_of_accounts::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            account_type: model.account_type.into(),
            sub_type: model.sub_type,
            // The table CHECK keeps level within 1..=4.
            level: u8::try_from(model.level).unwrap_or(MIN_LEVEL),
            parent_id: model.parent_id,
            normal_balance: model.normal_balance.into(),
            is_control_account: model.is_control_account,
            is_active: model.is_active,
            current_balance: model.current_balance,
        }
    }
}

impl From<&chart_of_accounts::Model> for ParentInfo {
    fn from(model: &chart_of_accounts::Model) -> Self {
        Self {
            id: model.id,
            code: model.code.clone(),
            level: u8::try_from(model.level).unwrap_or(MIN_LEVEL),
            account_type: model.account_type.into(),
            is_active: model.is_active,
            is_control_account: model.is_control_account,
        }
    }
}

/// Account repository for the chart of accounts.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
    max_attempts: u32,
}

impl AccountRepository {
    /// Creates a new account repository with the default retry ceiling.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            max_attempts: CodeGenerator::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Creates a repository using the configured retry ceiling.
    #[must_use]
    pub const fn with_config(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            db,
            max_attempts: config.code_generation_max_attempts,
        }
    }

    /// Creates an account, generating its code when none is given.
    ///
    /// Adding the first child to a non-control parent promotes that parent
    /// to a control account in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The level/type/parent combination is invalid
    /// - An explicit code is malformed, outside the parent's range, or taken
    /// - The parent must be promoted but already has journal lines
    /// - No free code was found within the retry ceiling (`GenerationExhausted`)
    #[instrument(skip(self, spec), fields(account_type = %spec.account_type, level = spec.level))]
    pub async fn create_account(&self, spec: AccountSpec) -> Result<AccountRecord, AccountError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.try_create(&spec, attempts).await {
                Ok(model) => {
                    info!(account_id = %model.id, code = %model.code, attempt, "Account created");
                    return Ok(model.into());
                }
                Err(AccountError::Database(err)) if is_retryable_conflict(&err) => {
                    if let Some(code) = &spec.code
                        && is_unique_violation(&err)
                    {
                        return Err(CoaError::DuplicateCode(code.trim().to_string()).into());
                    }
                    warn!(attempt, error = %err, "Account code allocation conflicted, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(CoaError::GenerationExhausted { attempts }.into())
    }

    async fn try_create(&self, spec: &AccountSpec, max_attempts: u32) -> Result<chart_of_accounts::Model, AccountError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        let parent = match spec.parent_id {
            Some(parent_id) => {
                let model = chart_of_accounts::Entity::find_by_id(parent_id)
                    .one(&txn)
                    .await?
                    .ok_or(CoaError::ParentNotFound(parent_id))?;
                Some(ParentInfo::from(&model))
            }
            None => None,
        };
        AccountService::validate_parent(spec.account_type, spec.level, parent.as_ref())?;

        let code = match spec.code.as_deref() {
            Some(explicit) => {
                let code =
                    AccountService::validate_explicit_code(explicit.trim(), spec.account_type, spec.level, parent.as_ref())?;
                let taken = chart_of_accounts::Entity::find()
                    .filter(chart_of_accounts::Column::Code.eq(code.to_string()))
                    .count(&txn)
                    .await?;
                if taken > 0 {
                    return Err(CoaError::DuplicateCode(code.to_string()).into());
                }
                code
            }
            None => Self::generate_code(&txn, spec, parent.as_ref(), max_attempts).await?,
        };

        let new = AccountService::resolve_new_account(spec, code)?;

        let parent_lines = match &parent {
            Some(p) if !p.is_control_account => {
                journal_entry_lines::Entity::find()
                    .filter(journal_entry_lines::Column::AccountId.eq(p.id))
                    .count(&txn)
                    .await?
            }
            _ => 0,
        };

        let now = chrono::Utc::now().fixed_offset();
        if let ParentAction::PromoteToControl(parent_id) = AccountService::parent_action(parent.as_ref(), parent_lines)? {
            chart_of_accounts::Entity::update_many()
                .col_expr(chart_of_accounts::Column::IsControlAccount, Expr::value(true))
                .col_expr(chart_of_accounts::Column::UpdatedAt, Expr::value(now))
                .filter(chart_of_accounts::Column::Id.eq(parent_id))
                .exec(&txn)
                .await?;
            debug!(parent_id = %parent_id, "Parent promoted to control account");
        }

        let account = chart_of_accounts::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(new.code),
            name: Set(new.name),
            account_type: Set(new.account_type.into()),
            sub_type: Set(new.sub_type),
            level: Set(i16::from(new.level)),
            parent_id: Set(new.parent_id),
            normal_balance: Set(new.normal_balance.into()),
            is_control_account: Set(new.is_control_account),
            is_active: Set(true),
            current_balance: Set(rust_decimal::Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let account = account.insert(&txn).await?;

        txn.commit().await?;
        Ok(account)
    }

    /// Picks the next free code among the accounts visible to `txn`.
    async fn generate_code(
        txn: &DatabaseTransaction,
        spec: &AccountSpec,
        parent: Option<&ParentInfo>,
        max_attempts: u32,
    ) -> Result<AccountCode, AccountError> {
        let parent_code = parent.map(|p| AccountCode::parse(&p.code)).transpose()?;
        let request = CodeRequest {
            account_type: spec.account_type,
            level: spec.level,
            parent: parent_code,
        };

        let rows: Vec<(String, i16)> = chart_of_accounts::Entity::find()
            .select_only()
            .column(chart_of_accounts::Column::Code)
            .column(chart_of_accounts::Column::Level)
            .filter(
                chart_of_accounts::Column::AccountType
                    .eq(sea_orm_active_enums::AccountType::from(spec.account_type)),
            )
            .into_tuple()
            .all(txn)
            .await?;

        let level = i16::from(spec.level);
        let siblings: Vec<AccountCode> = rows
            .iter()
            .filter(|(_, l)| *l == level)
            .filter_map(|(code, _)| AccountCode::parse(code).ok())
            .collect();
        let taken: HashSet<AccountCode> = rows
            .iter()
            .filter_map(|(code, _)| AccountCode::parse(code).ok())
            .collect();

        Ok(CodeGenerator::generate(&request, &siblings, max_attempts, |candidate| {
            taken.contains(candidate)
        })?)
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn get(&self, id: Uuid) -> Result<AccountRecord, AccountError> {
        chart_of_accounts::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(AccountRecord::from)
            .ok_or_else(|| CoaError::AccountNotFound(id).into())
    }

    /// Lists accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, filter: AccountFilter) -> Result<Vec<AccountRecord>, AccountError> {
        let mut query = chart_of_accounts::Entity::find().order_by_asc(chart_of_accounts::Column::Code);

        if let Some(account_type) = filter.account_type {
            query = query.filter(
                chart_of_accounts::Column::AccountType.eq(sea_orm_active_enums::AccountType::from(account_type)),
            );
        }

        if let Some(is_active) = filter.is_active {
            query = query.filter(chart_of_accounts::Column::IsActive.eq(is_active));
        }

        if let Some(parent_id) = filter.parent_id {
            match parent_id {
                Some(pid) => {
                    query = query.filter(chart_of_accounts::Column::ParentId.eq(pid));
                }
                None => {
                    query = query.filter(chart_of_accounts::Column::ParentId.is_null());
                }
            }
        }

        if let Some(level) = filter.level {
            query = query.filter(chart_of_accounts::Column::Level.eq(i16::from(level)));
        }

        let accounts = query.all(&self.db).await?;
        Ok(accounts.into_iter().map(AccountRecord::from).collect())
    }

    /// Soft-deletes an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, or `HasActiveChildren` while any child is
    /// still active.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<AccountRecord, AccountError> {
        let txn = self.db.begin().await?;

        let account = chart_of_accounts::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(CoaError::AccountNotFound(id))?;

        let active_children = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::ParentId.eq(id))
            .filter(chart_of_accounts::Column::IsActive.eq(true))
            .count(&txn)
            .await?;
        AccountService::ensure_can_deactivate(id, active_children)?;

        let mut active: chart_of_accounts::ActiveModel = account.into();
        active.is_active = Set(false);
        active.updated_at = Set(chrono::Utc::now().fixed_offset());
        let account = active.update(&txn).await?;

        txn.commit().await?;
        info!(account_id = %id, code = %account.code, "Account deactivated");
        Ok(account.into())
    }

    /// Builds the reporting tree, optionally limited to one type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn hierarchy(&self, account_type: Option<AccountType>) -> Result<Vec<AccountNode>, AccountError> {
        let accounts = self
            .list(AccountFilter {
                account_type,
                ..AccountFilter::default()
            })
            .await?;
        Ok(build_hierarchy(accounts))
    }

    /// Active leaf accounts that can receive journal lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_transactional(&self, account_type: Option<AccountType>) -> Result<Vec<AccountRecord>, AccountError> {
        let accounts = self
            .list(AccountFilter {
                account_type,
                ..AccountFilter::default()
            })
            .await?;
        Ok(transactional_accounts(accounts))
    }

    /// Accounts that can parent a new account of `account_type` at `level`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn available_parents(&self, account_type: AccountType, level: u8) -> Result<Vec<AccountRecord>, AccountError> {
        let accounts = self
            .list(AccountFilter {
                account_type: Some(account_type),
                is_active: Some(true),
                ..AccountFilter::default()
            })
            .await?;
        Ok(AccountService::available_parents(&accounts, account_type, level))
    }
}
