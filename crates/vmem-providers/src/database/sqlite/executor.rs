//! SQLite executor behind the driver-agnostic `DatabaseExecutor` port.
//!
//! Repositories never touch sqlx types: parameters go in as [`SqlParam`],
//! rows come back as [`SqlRow`]. Every call checks a fresh connection out
//! of the pool, so sessions are never shared across concurrent operations.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row};

use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{DatabaseExecutor, SqlParam, SqlRow};

/// Pool-backed SQLite executor.
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Open (creating if missing) a database file and initialise the schema.
    pub async fn connect(path: &Path) -> Result<Arc<dyn DatabaseExecutor>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::database_with_source(format!("create {}", parent.display()), e)
                })?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect_with(options, 5).await
    }

    /// In-memory database (tests). A single pooled connection that never
    /// retires: every connection would otherwise get its own empty
    /// in-memory database.
    pub async fn connect_in_memory() -> Result<Arc<dyn DatabaseExecutor>> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .in_memory(true);
        Self::connect_with(options, 1).await
    }

    async fn connect_with(
        options: SqliteConnectOptions,
        max_connections: u32,
    ) -> Result<Arc<dyn DatabaseExecutor>> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| Error::database_with_source("could not open sqlite database", e))?;

        let executor = Arc::new(Self { pool });
        super::ddl::initialize_schema(executor.as_ref()).await?;
        Ok(executor)
    }

    fn bind<'q>(
        mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        params: &'q [SqlParam],
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        for param in params {
            query = match param {
                SqlParam::String(s) => query.bind(s.as_str()),
                SqlParam::I64(i) => query.bind(*i),
                SqlParam::F64(f) => query.bind(*f),
                SqlParam::Bool(b) => query.bind(*b),
                SqlParam::Null => query.bind(Option::<String>::None),
            };
        }
        query
    }
}

#[async_trait]
impl DatabaseExecutor for SqliteExecutor {
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let result = Self::bind(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database_with_source(format!("execute failed: {sql}"), e))?;
        Ok(result.rows_affected())
    }

    async fn query_one(&self, sql: &str, params: &[SqlParam]) -> Result<Option<Arc<dyn SqlRow>>> {
        let row = Self::bind(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database_with_source(format!("query failed: {sql}"), e))?;
        Ok(row.map(|r| Arc::new(SqliteRowWrapper { row: r }) as Arc<dyn SqlRow>))
    }

    async fn query_all(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Arc<dyn SqlRow>>> {
        let rows = Self::bind(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database_with_source(format!("query failed: {sql}"), e))?;
        Ok(rows
            .into_iter()
            .map(|r| Arc::new(SqliteRowWrapper { row: r }) as Arc<dyn SqlRow>)
            .collect())
    }
}

/// Wraps a driver row, exposing values by column name.
struct SqliteRowWrapper {
    row: SqliteRow,
}

impl SqliteRowWrapper {
    fn has_column(&self, name: &str) -> bool {
        self.row.columns().iter().any(|c| c.name() == name)
    }
}

impl SqlRow for SqliteRowWrapper {
    fn try_get_string(&self, name: &str) -> Result<Option<String>> {
        if !self.has_column(name) {
            return Err(Error::database(format!("no such column: {name}")));
        }
        self.row
            .try_get::<Option<String>, _>(name)
            .map_err(|e| Error::database_with_source(format!("read column {name}"), e))
    }

    fn try_get_i64(&self, name: &str) -> Result<Option<i64>> {
        if !self.has_column(name) {
            return Err(Error::database(format!("no such column: {name}")));
        }
        self.row
            .try_get::<Option<i64>, _>(name)
            .map_err(|e| Error::database_with_source(format!("read column {name}"), e))
    }

    fn try_get_f64(&self, name: &str) -> Result<Option<f64>> {
        if !self.has_column(name) {
            return Err(Error::database(format!("no such column: {name}")));
        }
        self.row
            .try_get::<Option<f64>, _>(name)
            .map_err(|e| Error::database_with_source(format!("read column {name}"), e))
    }
}
