//! Database connection pool and query execution.

use futures::TryStreamExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Either, Executor, PgPool};

use crate::config::PoolConfig;
use crate::errors::DbError;
use crate::models::query_result::decode_row;
use crate::models::{PoolStats, QueryParam, QueryResult};

/// Create a PostgreSQL connection pool without opening any connection.
pub fn create_pool(config: &PoolConfig) -> PgPool {
    // Zero disables idle reaping.
    let idle_timeout = (config.idle_timeout_ms > 0).then(|| config.idle_timeout());

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(0)
        .idle_timeout(idle_timeout)
        .acquire_timeout(config.connection_timeout())
        .connect_lazy_with(config.connect_options())
}

/// Owned handle to the shared connection pool.
///
/// Cloning is cheap and every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    config: PoolConfig,
}

impl Database {
    pub fn new(config: PoolConfig) -> Self {
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "Initializing PostgreSQL connection pool"
        );

        Self {
            pool: create_pool(&config),
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Underlying sqlx pool, for callers that need the full sqlx API.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// One-shot startup probe: acquire a connection and hand it straight back.
    ///
    /// The outcome is only logged. The pool stays usable either way and will
    /// try to connect again on the next query.
    pub async fn verify_connectivity(&self) -> bool {
        match self.pool.acquire().await {
            Ok(conn) => {
                drop(conn);
                tracing::info!(
                    host = %self.config.host,
                    database = %self.config.database,
                    "PostgreSQL connection established"
                );
                true
            }
            Err(e) => {
                let err = DbError::from_acquire(e, self.config.connection_timeout_ms);
                tracing::error!(error = %err, "Failed to connect to PostgreSQL");
                false
            }
        }
    }

    /// Run a query with positional parameters and collect its rows.
    ///
    /// The connection goes back to the pool when this returns, on success and
    /// on error alike.
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> Result<QueryResult, DbError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DbError::from_acquire(e, self.config.connection_timeout_ms))?;

        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, param| param.bind_to(query));

        let mut result = QueryResult::default();
        let mut stream = (&mut *conn).fetch_many(query);

        while let Some(item) = stream.try_next().await? {
            match item {
                Either::Left(done) => result.row_count += done.rows_affected(),
                Either::Right(row) => result.rows.push(decode_row(&row)?),
            }
        }

        tracing::debug!(
            rows = result.rows.len(),
            row_count = result.row_count,
            "Query executed"
        );

        Ok(result)
    }

    pub fn stats(&self) -> PoolStats {
        let idle = u32::try_from(self.pool.num_idle()).unwrap_or(u32::MAX);
        PoolStats::new(self.pool.size(), idle, self.config.max_connections)
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Drain the pool: wait for checked-out connections, then close them all.
    ///
    /// Later calls to [`Database::execute`] fail with [`DbError::PoolClosed`].
    pub async fn close(&self) {
        if self.pool.is_closed() {
            return;
        }
        tracing::info!("Closing PostgreSQL connection pool");
        self.pool.close().await;
        tracing::info!("PostgreSQL connection pool closed");
    }
}
