//! Error types surfaced by the connection pool service.

/// Failure of a pooled database operation.
///
/// Nothing is retried or classified here; the caller decides what to do.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Timed out after {timeout_ms}ms waiting for a database connection")]
    AcquireTimeout { timeout_ms: u64 },

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl DbError {
    /// Map an error returned while acquiring a pooled connection.
    pub fn from_acquire(err: sqlx::Error, timeout_ms: u64) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::AcquireTimeout { timeout_ms },
            sqlx::Error::PoolClosed => Self::PoolClosed,
            other => Self::Connect(other),
        }
    }

    pub fn is_acquire_timeout(&self) -> bool {
        matches!(self, Self::AcquireTimeout { .. })
    }

    pub fn is_pool_closed(&self) -> bool {
        matches!(self, Self::PoolClosed)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => Self::PoolClosed,
            other => Self::Query(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_maps_to_acquire_timeout() {
        let err = DbError::from_acquire(sqlx::Error::PoolTimedOut, 2000);
        assert!(err.is_acquire_timeout());
        assert_eq!(
            err.to_string(),
            "Timed out after 2000ms waiting for a database connection"
        );
    }

    #[test]
    fn pool_closed_maps_on_both_paths() {
        assert!(DbError::from_acquire(sqlx::Error::PoolClosed, 10).is_pool_closed());
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(err.is_pool_closed());
    }

    #[test]
    fn other_acquire_errors_are_connect_failures() {
        let err = DbError::from_acquire(sqlx::Error::Protocol("bad handshake".into()), 10);
        assert!(matches!(err, DbError::Connect(_)));
        assert!(err.to_string().contains("bad handshake"));
    }

    #[test]
    fn query_error_keeps_underlying_message() {
        let err: DbError = sqlx::Error::ColumnNotFound("attendee_id".into()).into();
        assert!(matches!(err, DbError::Query(_)));
        assert!(err.to_string().contains("attendee_id"));
    }
}
