//! Classification of database errors that warrant a transaction retry.

use sea_orm::{DbErr, RuntimeErr, SqlErr};

/// SQLSTATE for `serialization_failure`.
pub const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for `deadlock_detected`.
pub const DEADLOCK_DETECTED: &str = "40P01";

/// Returns true if `err` is a unique-constraint violation.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Returns true if `err` is a serialization failure or deadlock.
pub fn is_serialization_failure(err: &DbErr) -> bool {
    matches!(
        sqlstate(err).as_deref(),
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
    )
}

/// Returns true if a concurrent writer caused `err` and the whole
/// transaction may be retried.
pub fn is_retryable_conflict(err: &DbErr) -> bool {
    is_unique_violation(err) || is_serialization_failure(err)
}

fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(e) => e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned()),
        RuntimeErr::Internal(_) => None,
    }
}
