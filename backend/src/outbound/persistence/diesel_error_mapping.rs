//! Classification of Diesel failures shared by the PostgreSQL adapters.
//!
//! Diesel only assigns dedicated kinds to a handful of SQLSTATEs. Deadlocks,
//! lock timeouts and statement timeouts arrive as `Unknown`, so those are
//! recognised from the server message PostgreSQL emits for them.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Coarse failure classes the adapters translate into port errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// The connection dropped or could not be used.
    Connection,
    /// The server aborted the transaction to break a serialization conflict
    /// or a deadlock.
    Conflict(String),
    /// A lock wait or statement exceeded its configured budget.
    Timeout(String),
    /// A unique constraint rejected the write.
    UniqueViolation { constraint: Option<String> },
    /// Anything else.
    Query(String),
}

const DEADLOCK_MESSAGE: &str = "deadlock detected";
const LOCK_TIMEOUT_MESSAGE: &str = "lock timeout";
const STATEMENT_TIMEOUT_MESSAGE: &str = "statement timeout";

/// Classify a Diesel error, logging the raw failure at debug level.
pub(crate) fn classify_diesel_error(error: &DieselError) -> DieselFailure {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
            let message = info.message().to_owned();
            match kind {
                DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand => {
                    DieselFailure::Connection
                }
                DatabaseErrorKind::SerializationFailure => DieselFailure::Conflict(message),
                DatabaseErrorKind::UniqueViolation => DieselFailure::UniqueViolation {
                    constraint: info
                        .constraint_name()
                        .map(str::to_owned)
                        .or_else(|| constraint_from_message(&message)),
                },
                _ if message.contains(DEADLOCK_MESSAGE) => DieselFailure::Conflict(message),
                _ if message.contains(LOCK_TIMEOUT_MESSAGE)
                    || message.contains(STATEMENT_TIMEOUT_MESSAGE) =>
                {
                    DieselFailure::Timeout(message)
                }
                _ => DieselFailure::Query("database error".to_owned()),
            }
        }
        DieselError::NotFound => DieselFailure::Query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => DieselFailure::Query("database query error".to_owned()),
        DieselError::BrokenTransactionManager => DieselFailure::Connection,
        other => {
            debug!(
                error_type = %std::any::type_name_of_val(other),
                "diesel operation failed"
            );
            DieselFailure::Query("database error".to_owned())
        }
    }
}

/// Pull the constraint name out of `... violates unique constraint "name"`.
fn constraint_from_message(message: &str) -> Option<String> {
    let (_, tail) = message.split_once("constraint \"")?;
    let (name, _) = tail.split_once('"')?;
    Some(name.to_owned())
}

/// Map pool errors through a repository-specific connection constructor.
pub(crate) fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    connection(error.into_message())
}

/// Map a Diesel error for adapters that only distinguish connection and
/// query failures.
pub(crate) fn map_basic_diesel_error<E>(
    error: &DieselError,
    query: impl FnOnce(String) -> E,
    connection: impl FnOnce(String) -> E,
) -> E {
    match classify_diesel_error(error) {
        DieselFailure::Connection => connection("database connection error".to_owned()),
        DieselFailure::Conflict(message)
        | DieselFailure::Timeout(message)
        | DieselFailure::Query(message) => query(message),
        DieselFailure::UniqueViolation { constraint } => query(format!(
            "unique constraint violated: {}",
            constraint.as_deref().unwrap_or("unknown")
        )),
    }
}
