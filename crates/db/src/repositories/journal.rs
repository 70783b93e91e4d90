//! Journal repository: entry creation, posting and reversal.
//!
//! Posting and reversal lock the entry row, then every touched account row
//! in ascending id order, and recompute the cached balances of those
//! accounts from their balance-affecting lines before committing.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use kontra_core::coa::NormalBalance;
use kontra_core::ledger::{
    AccountInfo, CreateEntryInput, EntryNumberFormat, EntryStatus, EntryTotals, JournalLineInput, LedgerError,
    LedgerService, PostingLine, ReversalInput, ReversalService, recompute_balances, touched_accounts,
};
use kontra_shared::AppError;
use kontra_shared::config::LedgerConfig;
use kontra_shared::types::{JournalEntryId, UserId};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entities::{
    chart_of_accounts, journal_entries, journal_entry_lines,
    sea_orm_active_enums::EntryStatus as DbEntryStatus,
};
use crate::retry::{is_retryable_conflict, is_unique_violation};

/// Default prefix of entry numbers.
pub const DEFAULT_ENTRY_PREFIX: &str = "JE";

/// Error types for journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// A ledger rule rejected the request.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<JournalError> for AppError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::Ledger(e) => e.into(),
            JournalError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// A journal entry with its lines ordered by line number.
#[derive(Debug, Clone)]
pub struct JournalEntryWithLines {
    /// The entry header.
    pub entry: journal_entries::Model,
    /// The entry lines.
    pub lines: Vec<journal_entry_lines::Model>,
}

/// Filter options for listing entries.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Filter by status.
    pub status: Option<EntryStatus>,
    /// Filter by project.
    pub project_id: Option<Uuid>,
    /// Filter by subsidiary.
    pub subsidiary_id: Option<Uuid>,
    /// Entries dated on or after.
    pub date_from: Option<NaiveDate>,
    /// Entries dated on or before.
    pub date_to: Option<NaiveDate>,
}

/// Input for reversing a posted entry.
#[derive(Debug, Clone)]
pub struct ReverseEntryInput {
    /// Accounting date of the compensating entry.
    pub reversal_date: NaiveDate,
    /// Why the entry is reversed.
    pub reason: String,
    /// The user reversing the entry.
    pub reversed_by: Option<Uuid>,
}

/// Outcome of a reversal.
#[derive(Debug, Clone)]
pub struct ReversalResult {
    /// The original entry, now `REVERSED`.
    pub original: journal_entries::Model,
    /// The posted compensating entry.
    pub reversal: JournalEntryWithLines,
}

fn account_info(model: &chart_of_accounts::Model) -> AccountInfo {
    AccountInfo {
        id: model.id,
        is_active: model.is_active,
        is_control_account: model.is_control_account,
        normal_balance: model.normal_balance.into(),
    }
}

fn line_input(model: &journal_entry_lines::Model) -> JournalLineInput {
    JournalLineInput {
        account_id: model.account_id,
        debit: model.debit_amount,
        credit: model.credit_amount,
        // The table CHECK keeps line numbers positive.
        line_number: u32::try_from(model.line_number).unwrap_or_default(),
        description: model.description.clone(),
        project_id: model.project_id,
        cost_center_id: model.cost_center_id,
        tax_amount: model.tax_amount,
        tax_type: model.tax_type.clone(),
    }
}

const fn posting_line(model: &journal_entry_lines::Model) -> PostingLine {
    PostingLine {
        account_id: model.account_id,
        debit: model.debit_amount,
        credit: model.credit_amount,
    }
}

/// Journal repository.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    format: EntryNumberFormat,
    max_attempts: u32,
}

impl JournalRepository {
    /// Creates a new journal repository with default numbering.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            format: EntryNumberFormat::new(DEFAULT_ENTRY_PREFIX),
            max_attempts: 10,
        }
    }

    /// Creates a repository using the configured numbering and retry ceiling.
    #[must_use]
    pub fn with_config(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            db,
            format: EntryNumberFormat::new(config.entry_number_prefix.clone()),
            max_attempts: config.max_entry_attempts,
        }
    }

    /// Creates a `DRAFT` entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the entry has fewer than two lines, a
    /// malformed line, a gap in line numbers, an unknown, inactive or
    /// control account, or unequal debits and credits. Returns
    /// `EntryNumberExhausted` if no free entry number was found.
    #[instrument(skip(self, input), fields(entry_date = %input.entry_date, lines = input.lines.len()))]
    pub async fn create_entry(&self, input: CreateEntryInput) -> Result<JournalEntryWithLines, JournalError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            match self.try_create(&input, attempt).await {
                Ok(created) => {
                    info!(
                        entry_id = %created.entry.id,
                        entry_number = %created.entry.entry_number,
                        total = %created.entry.total_debit,
                        "Journal entry created"
                    );
                    return Ok(created);
                }
                Err(JournalError::Database(err)) if is_unique_violation(&err) => {
                    warn!(attempt, error = %err, "Entry number taken, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(LedgerError::EntryNumberExhausted { attempts }.into())
    }

    async fn try_create(&self, input: &CreateEntryInput, attempt: u32) -> Result<JournalEntryWithLines, JournalError> {
        let txn = self.db.begin().await?;

        let ids: BTreeSet<Uuid> = input.lines.iter().map(|l| l.account_id).collect();
        let accounts: HashMap<Uuid, chart_of_accounts::Model> = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::Id.is_in(ids))
            .all(&txn)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let (lines, totals) = LedgerService::validate_entry(input, |id| accounts.get(&id).map(account_info))?;

        let number = self.next_number(&txn, input.entry_date, attempt).await?;
        let entry = Self::insert_entry(&txn, input, &number, totals, None).await?;
        let lines = Self::insert_lines(&txn, entry.id, &lines).await?;

        txn.commit().await?;
        Ok(JournalEntryWithLines { entry, lines })
    }

    async fn next_number(&self, txn: &DatabaseTransaction, entry_date: NaiveDate, attempt: u32) -> Result<String, JournalError> {
        let prefix = self.format.month_prefix(entry_date);
        let last: Option<String> = journal_entries::Entity::find()
            .select_only()
            .column(journal_entries::Column::EntryNumber)
            .filter(journal_entries::Column::EntryNumber.starts_with(&prefix))
            .order_by_desc(journal_entries::Column::EntryNumber)
            .into_tuple()
            .one(txn)
            .await?;
        Ok(self.format.next(entry_date, last.as_deref(), attempt)?)
    }

    async fn insert_entry(
        txn: &DatabaseTransaction,
        input: &CreateEntryInput,
        entry_number: &str,
        totals: EntryTotals,
        reversal_of_entry_id: Option<Uuid>,
    ) -> Result<journal_entries::Model, DbErr> {
        let now = chrono::Utc::now().fixed_offset();
        journal_entries::ActiveModel {
            id: Set(Uuid::new_v4()),
            entry_number: Set(entry_number.to_string()),
            entry_date: Set(input.entry_date),
            description: Set(input.description.trim().to_string()),
            status: Set(DbEntryStatus::Draft),
            total_debit: Set(totals.total_debit),
            total_credit: Set(totals.total_credit),
            project_id: Set(input.project_id),
            subsidiary_id: Set(input.subsidiary_id),
            created_by: Set(input.created_by),
            posted_at: Set(None),
            posted_by: Set(None),
            reversal_of_entry_id: Set(reversal_of_entry_id),
            reversed_by_entry_id: Set(None),
            reversal_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
    }

    async fn insert_lines(
        txn: &DatabaseTransaction,
        entry_id: Uuid,
        lines: &[JournalLineInput],
    ) -> Result<Vec<journal_entry_lines::Model>, DbErr> {
        let now = chrono::Utc::now().fixed_offset();
        let mut inserted = Vec::with_capacity(lines.len());
        for line in lines {
            let line_number = i32::try_from(line.line_number)
                .map_err(|_| DbErr::Custom(format!("line number {} out of range", line.line_number)))?;
            let model = journal_entry_lines::ActiveModel {
                id: Set(Uuid::new_v4()),
                journal_entry_id: Set(entry_id),
                account_id: Set(line.account_id),
                line_number: Set(line_number),
                debit_amount: Set(line.debit),
                credit_amount: Set(line.credit),
                description: Set(line.description.clone()),
                project_id: Set(line.project_id),
                cost_center_id: Set(line.cost_center_id),
                tax_amount: Set(line.tax_amount),
                tax_type: Set(line.tax_type.clone()),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;
            inserted.push(model);
        }
        Ok(inserted)
    }

    /// Finds an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if the entry does not exist.
    pub async fn get(&self, entry_id: Uuid) -> Result<JournalEntryWithLines, JournalError> {
        let entry = journal_entries::Entity::find_by_id(entry_id)
            .one(&self.db)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        let lines = journal_entry_lines::Entity::find()
            .filter(journal_entry_lines::Column::JournalEntryId.eq(entry_id))
            .order_by_asc(journal_entry_lines::Column::LineNumber)
            .all(&self.db)
            .await?;
        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Lists entry headers, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, filter: EntryFilter) -> Result<Vec<journal_entries::Model>, JournalError> {
        let mut query = journal_entries::Entity::find()
            .order_by_desc(journal_entries::Column::EntryDate)
            .order_by_desc(journal_entries::Column::EntryNumber);

        if let Some(status) = filter.status {
            query = query.filter(journal_entries::Column::Status.eq(DbEntryStatus::from(status)));
        }
        if let Some(project_id) = filter.project_id {
            query = query.filter(journal_entries::Column::ProjectId.eq(project_id));
        }
        if let Some(subsidiary_id) = filter.subsidiary_id {
            query = query.filter(journal_entries::Column::SubsidiaryId.eq(subsidiary_id));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(journal_entries::Column::EntryDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(journal_entries::Column::EntryDate.lte(to));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Posts a draft entry and refreshes the balances it touches.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `AlreadyPosted` for a non-draft entry, or
    /// the creation-time validation errors if an account was deactivated or
    /// promoted to control since the draft was saved.
    #[instrument(skip(self))]
    pub async fn post(&self, entry_id: Uuid, posted_by: Option<Uuid>) -> Result<JournalEntryWithLines, JournalError> {
        let txn = self.db.begin().await?;

        let entry = journal_entries::Entity::find_by_id(entry_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        let lines = Self::lines_of(&txn, entry_id).await?;
        let posting: Vec<PostingLine> = lines.iter().map(posting_line).collect();

        let accounts = Self::lock_accounts(&txn, &touched_accounts(posting.iter())).await?;
        let totals = LedgerService::validate_for_posting(entry_id, entry.status.into(), &posting, |id| {
            accounts.get(&id).map(account_info)
        })?;

        let now = chrono::Utc::now().fixed_offset();
        let mut active: journal_entries::ActiveModel = entry.into();
        active.status = Set(DbEntryStatus::Posted);
        active.total_debit = Set(totals.total_debit);
        active.total_credit = Set(totals.total_credit);
        active.posted_at = Set(Some(now));
        active.posted_by = Set(posted_by);
        active.updated_at = Set(now);
        let entry = active.update(&txn).await?;

        Self::refresh_balances(&txn, &accounts).await?;

        txn.commit().await?;
        info!(
            entry_id = %entry.id,
            entry_number = %entry.entry_number,
            accounts = accounts.len(),
            "Journal entry posted"
        );
        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Reverses a posted entry with a posted compensating entry.
    ///
    /// The original becomes `REVERSED` and both entries keep affecting
    /// balances, so every touched account nets back to its prior balance.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `NotPosted`, `AlreadyReversed`,
    /// `CannotReverseReversal` or `EmptyReversalReason`. Once the retries
    /// run out, returns `EntryNumberExhausted` if the last attempt lost an
    /// entry number race and `ConcurrentModification` otherwise.
    #[instrument(skip(self, input), fields(reversal_date = %input.reversal_date))]
    pub async fn reverse(&self, entry_id: Uuid, input: ReverseEntryInput) -> Result<ReversalResult, JournalError> {
        let attempts = self.max_attempts.max(1);
        let mut number_taken = false;

        for attempt in 0..attempts {
            match self.try_reverse(entry_id, &input, attempt).await {
                Ok(result) => {
                    info!(
                        entry_id = %result.original.id,
                        reversal_id = %result.reversal.entry.id,
                        reversal_number = %result.reversal.entry.entry_number,
                        "Journal entry reversed"
                    );
                    return Ok(result);
                }
                Err(JournalError::Database(err)) if is_retryable_conflict(&err) => {
                    number_taken = is_unique_violation(&err);
                    warn!(attempt, error = %err, "Reversal conflicted, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        if number_taken {
            Err(LedgerError::EntryNumberExhausted { attempts }.into())
        } else {
            Err(LedgerError::ConcurrentModification.into())
        }
    }

    async fn try_reverse(&self, entry_id: Uuid, input: &ReverseEntryInput, attempt: u32) -> Result<ReversalResult, JournalError> {
        let txn = self.db.begin().await?;

        let original = journal_entries::Entity::find_by_id(entry_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        LedgerService::validate_can_reverse(entry_id, original.status.into(), original.reversal_of_entry_id)?;

        let original_lines = Self::lines_of(&txn, entry_id).await?;
        let output = ReversalService::create_reversing_entry(&ReversalInput {
            original_entry_id: JournalEntryId::from_uuid(original.id),
            original_entry_number: original.entry_number.clone(),
            project_id: original.project_id,
            subsidiary_id: original.subsidiary_id,
            original_lines: original_lines.iter().map(line_input).collect(),
            reversal_date: input.reversal_date,
            reason: input.reason.clone(),
            reversed_by: input.reversed_by.map(UserId::from_uuid),
        })?;

        let number = self.next_number(&txn, output.entry.entry_date, attempt).await?;
        let reversal_of = Some(output.reversal_of_entry_id.into_inner());

        // Lines can only be attached while the compensating entry is a draft.
        let reversal = Self::insert_entry(&txn, &output.entry, &number, output.totals, reversal_of).await?;
        let reversal_lines = Self::insert_lines(&txn, reversal.id, &output.entry.lines).await?;

        let now = chrono::Utc::now().fixed_offset();
        let reason = input.reason.trim().to_string();

        let reversal_id = reversal.id;
        let mut active: journal_entries::ActiveModel = reversal.into();
        active.status = Set(DbEntryStatus::Posted);
        active.posted_at = Set(Some(now));
        active.posted_by = Set(input.reversed_by);
        active.reversal_reason = Set(Some(reason.clone()));
        active.updated_at = Set(now);
        let reversal = active.update(&txn).await?;

        let mut active: journal_entries::ActiveModel = original.into();
        active.status = Set(DbEntryStatus::Reversed);
        active.reversed_by_entry_id = Set(Some(reversal_id));
        active.reversal_reason = Set(Some(reason));
        active.updated_at = Set(now);
        let original = active.update(&txn).await?;

        let posting: Vec<PostingLine> = original_lines.iter().map(posting_line).collect();
        let accounts = Self::lock_accounts(&txn, &touched_accounts(posting.iter())).await?;
        Self::refresh_balances(&txn, &accounts).await?;

        txn.commit().await?;
        Ok(ReversalResult {
            original,
            reversal: JournalEntryWithLines {
                entry: reversal,
                lines: reversal_lines,
            },
        })
    }

    /// Deletes a draft entry and its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, or `CanOnlyDeleteDraft` once posted.
    #[instrument(skip(self))]
    pub async fn delete_draft(&self, entry_id: Uuid) -> Result<(), JournalError> {
        let txn = self.db.begin().await?;

        let entry = journal_entries::Entity::find_by_id(entry_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        LedgerService::validate_can_delete(entry_id, entry.status.into())?;

        journal_entry_lines::Entity::delete_many()
            .filter(journal_entry_lines::Column::JournalEntryId.eq(entry_id))
            .exec(&txn)
            .await?;
        journal_entries::Entity::delete_by_id(entry_id).exec(&txn).await?;

        txn.commit().await?;
        info!(entry_id = %entry_id, entry_number = %entry.entry_number, "Draft entry deleted");
        Ok(())
    }

    async fn lines_of(txn: &DatabaseTransaction, entry_id: Uuid) -> Result<Vec<journal_entry_lines::Model>, DbErr> {
        journal_entry_lines::Entity::find()
            .filter(journal_entry_lines::Column::JournalEntryId.eq(entry_id))
            .order_by_asc(journal_entry_lines::Column::LineNumber)
            .all(txn)
            .await
    }

    /// Locks account rows `FOR UPDATE` in ascending id order.
    async fn lock_accounts(
        txn: &DatabaseTransaction,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, chart_of_accounts::Model>, DbErr> {
        let accounts = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(chart_of_accounts::Column::Id)
            .lock_exclusive()
            .all(txn)
            .await?;
        Ok(accounts.into_iter().map(|a| (a.id, a)).collect())
    }

    /// Recomputes `current_balance` of the locked accounts from every line
    /// of a `POSTED` or `REVERSED` entry.
    async fn refresh_balances(
        txn: &DatabaseTransaction,
        accounts: &HashMap<Uuid, chart_of_accounts::Model>,
    ) -> Result<(), DbErr> {
        let ids: BTreeSet<Uuid> = accounts.keys().copied().collect();

        let rows: Vec<(Uuid, Decimal, Decimal)> = journal_entry_lines::Entity::find()
            .select_only()
            .column(journal_entry_lines::Column::AccountId)
            .column(journal_entry_lines::Column::DebitAmount)
            .column(journal_entry_lines::Column::CreditAmount)
            .join(JoinType::InnerJoin, journal_entry_lines::Relation::JournalEntries.def())
            .filter(journal_entry_lines::Column::AccountId.is_in(ids.iter().copied()))
            .filter(journal_entries::Column::Status.is_in([DbEntryStatus::Posted, DbEntryStatus::Reversed]))
            .into_tuple()
            .all(txn)
            .await?;

        let lines: Vec<PostingLine> = rows
            .into_iter()
            .map(|(account_id, debit, credit)| PostingLine {
                account_id,
                debit,
                credit,
            })
            .collect();
        let balances = recompute_balances(lines.iter(), |id| {
            accounts
                .get(&id)
                .map_or(NormalBalance::Debit, |a| a.normal_balance.into())
        });

        let now = chrono::Utc::now().fixed_offset();
        for id in ids {
            let balance = balances.get(&id).map_or(Decimal::ZERO, |b| b.balance);
            chart_of_accounts::Entity::update_many()
                .col_expr(chart_of_accounts::Column::CurrentBalance, Expr::value(balance))
                .col_expr(chart_of_accounts::Column::UpdatedAt, Expr::value(now))
                .filter(chart_of_accounts::Column::Id.eq(id))
                .exec(txn)
                .await?;
            debug!(account_id = %id, balance = %balance, "Balance refreshed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sea_orm_active_enums::NormalBalance as DbNormalBalance;
    use rust_decimal_macros::dec;

    fn line_model(line_number: i32, debit: Decimal, credit: Decimal) -> journal_entry_lines::Model {
        journal_entry_lines::Model {
            id: Uuid::new_v4(),
            journal_entry_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            line_number,
            debit_amount: debit,
            credit_amount: credit,
            description: Some("Pembelian semen".to_string()),
            project_id: Some(Uuid::new_v4()),
            cost_center_id: None,
            tax_amount: Some(dec!(110)),
            tax_type: Some("PPN".to_string()),
            created_at: chrono::Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_line_model_round_trips_to_input() {
        let model = line_model(2, dec!(1000), Decimal::ZERO);
        let input = line_input(&model);
        assert_eq!(input.line_number, 2);
        assert_eq!(input.debit, dec!(1000));
        assert_eq!(input.account_id, model.account_id);
        assert_eq!(input.tax_amount, Some(dec!(110)));
        assert_eq!(input.project_id, model.project_id);

        let posting = posting_line(&model);
        assert_eq!(posting, PostingLine::from(&input));
    }

    #[test]
    fn test_account_info_carries_posting_flags() {
        let now = chrono::Utc::now().fixed_offset();
        let model = chart_of_accounts::Model {
            id: Uuid::new_v4(),
            code: "2101".to_string(),
            name: "Hutang Usaha".to_string(),
            account_type: crate::entities::sea_orm_active_enums::AccountType::Liability,
            sub_type: None,
            level: 3,
            parent_id: None,
            normal_balance: DbNormalBalance::Credit,
            is_control_account: false,
            is_active: false,
            current_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        let info = account_info(&model);
        assert_eq!(info.id, model.id);
        assert!(!info.is_active);
        assert_eq!(info.normal_balance, NormalBalance::Credit);
    }

    #[test]
    fn test_ledger_error_maps_to_app_error() {
        let id = Uuid::new_v4();
        let app: AppError = JournalError::from(LedgerError::AlreadyPosted(id)).into();
        assert!(matches!(app, AppError::Conflict(_)));
    }
}
