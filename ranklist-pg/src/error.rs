//! Conversion of driver and pool errors into [`RanklistError`].
//!
//! Every conversion logs the full driver error and hands a short reason to
//! the caller.

use deadpool_postgres::{CreatePoolError, PoolError};
use ranklist_core::{RanklistError, StorageError};
use tokio_postgres::error::SqlState;

/// SQLSTATEs a retry can clear.
const TRANSIENT_STATES: &[SqlState] = &[
    SqlState::T_R_SERIALIZATION_FAILURE,
    SqlState::T_R_DEADLOCK_DETECTED,
    SqlState::LOCK_NOT_AVAILABLE,
    SqlState::QUERY_CANCELED,
];

/// Map a query error raised inside `operation`.
pub(crate) fn query_error(operation: &'static str) -> impl Fn(tokio_postgres::Error) -> RanklistError {
    move |err| {
        tracing::error!(operation, "Database error: {:?}", err);

        if err.is_closed() {
            return StorageError::ConnectionFailed {
                reason: "connection closed".to_string(),
            }
            .into();
        }
        match err.code() {
            Some(code) if TRANSIENT_STATES.contains(code) => StorageError::TransactionFailed {
                reason: format!("{} aborted ({})", operation, code.code()),
            }
            .into(),
            Some(code) => StorageError::QueryFailed {
                operation: operation.to_string(),
                reason: format!("SQLSTATE {}", code.code()),
            }
            .into(),
            None => StorageError::QueryFailed {
                operation: operation.to_string(),
                reason: "Database operation failed".to_string(),
            }
            .into(),
        }
    }
}

/// Map a failure to check a connection out of the pool.
pub(crate) fn pool_error(err: PoolError) -> RanklistError {
    tracing::error!("Connection pool error: {:?}", err);

    let reason = match err {
        PoolError::Timeout(_) => "connection pool exhausted".to_string(),
        PoolError::Closed => "connection pool is closed".to_string(),
        _ => "failed to acquire database connection".to_string(),
    };
    StorageError::ConnectionFailed { reason }.into()
}

pub(crate) fn pool_build_error(err: CreatePoolError) -> RanklistError {
    tracing::error!("Failed to create pool: {:?}", err);
    StorageError::ConnectionFailed {
        reason: format!("Failed to create pool: {}", err),
    }
    .into()
}

/// Map a column that could not be read into its record type.
pub(crate) fn row_error(entity: &'static str) -> impl Fn(tokio_postgres::Error) -> RanklistError {
    move |err| {
        tracing::error!(entity, "Row decode error: {:?}", err);
        StorageError::RowDecode {
            entity: entity.to_string(),
            reason: err.to_string(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_pool_is_transient() {
        let err = pool_error(PoolError::Closed);
        assert!(err.is_transient());
        assert_eq!(
            err,
            RanklistError::Storage(StorageError::ConnectionFailed {
                reason: "connection pool is closed".to_string()
            })
        );
    }

    #[test]
    fn test_transient_states_cover_lock_conflicts() {
        assert!(TRANSIENT_STATES.contains(&SqlState::T_R_DEADLOCK_DETECTED));
        assert!(TRANSIENT_STATES.contains(&SqlState::T_R_SERIALIZATION_FAILURE));
        assert!(!TRANSIENT_STATES.contains(&SqlState::UNIQUE_VIOLATION));
    }
}
