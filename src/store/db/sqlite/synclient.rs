use std::{future::Future, str::FromStr, sync::Arc, time::Duration};

use sqlx::{
    Database, Error, IntoArguments, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use tokio::{
    runtime::{Handle, Runtime},
    task::block_in_place,
};

use super::TxStatement;

/// Blocking facade over an async SQLite pool.
#[derive(Debug, Clone)]
pub struct SynClient {
    pool: SqlitePool,

    runtime: Arc<Runtime>,
}

fn block_on<F: Future>(
    runtime: &Runtime,
    fut: F,
) -> F::Output {
    if Handle::try_current().is_ok() {
        block_in_place(|| runtime.block_on(fut))
    } else {
        runtime.block_on(fut)
    }
}

impl SynClient {
    pub fn connect(
        db_url: &str,
        max_connections: u32,
        runtime: Arc<Runtime>,
    ) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);

        // every connection to `:memory:` opens a separate database, so pin one for the pool's lifetime
        let in_memory = db_url.contains(":memory:") || db_url.contains("mode=memory");
        let pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(5));
        let pool_options = if in_memory {
            pool_options.max_connections(1).min_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.max_connections(max_connections.max(1))
        };

        let pool = block_on(&runtime, async move { pool_options.connect_with(options).await })?;

        Ok(Self {
            pool,
            runtime,
        })
    }

    pub fn query_one<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> Result<SqliteRow, Error>
    where
        A: IntoArguments<'q, Sqlite> + 'q,
    {
        block_on(&self.runtime, async move {
            let mut conn = self.pool.acquire().await?;

            sqlx::query_with(sql, params).fetch_one(&mut *conn).await
        })
    }

    pub fn query<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> Result<Vec<SqliteRow>, Error>
    where
        A: IntoArguments<'q, Sqlite> + 'q,
    {
        block_on(&self.runtime, async move {
            let mut conn = self.pool.acquire().await?;

            sqlx::query_with(sql, params).fetch_all(&mut *conn).await
        })
    }

    pub fn execute<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> Result<<Sqlite as Database>::QueryResult, Error>
    where
        A: IntoArguments<'q, Sqlite> + 'q,
    {
        block_on(&self.runtime, async move {
            let mut conn = self.pool.acquire().await?;

            sqlx::query_with(sql, params).execute(&mut *conn).await
        })
    }

    /// Runs every statement inside one transaction.
    pub fn batch_execute(
        &self,
        sqls: &[String],
    ) -> Result<(), Error> {
        block_on(&self.runtime, async move {
            let mut tx = self.pool.begin().await?;

            for sql in sqls {
                sqlx::query(sql).execute(&mut *tx).await?;
            }
            tx.commit().await
        })
    }

    /// Runs every statement inside one transaction.
    ///
    /// Returns the index of the first `must_match` statement that changed no
    /// row; the transaction is rolled back in that case.
    pub fn transaction(
        &self,
        statements: Vec<TxStatement>,
    ) -> Result<Option<usize>, Error> {
        block_on(&self.runtime, async move {
            let mut tx = self.pool.begin().await?;

            for (i, stmt) in statements.into_iter().enumerate() {
                let result = sqlx::query_with(stmt.sql.as_str(), stmt.values).execute(&mut *tx).await?;
                if stmt.must_match && result.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Ok(Some(i));
                }
            }
            tx.commit().await?;
            Ok(None)
        })
    }
}
