//! Connections to the target PostgreSQL database used for validation and
//! rollback execution.
//!
//! Statements go through sqlx's simple query protocol, so one string may
//! carry several statements.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Executor, PgConnection};
use thiserror::Error;

/// SQLSTATE for "database does not exist".
const INVALID_CATALOG_NAME: &str = "3D000";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    /// Unreachable host, rejected credentials or missing database.
    #[error("target connection failed: {message}")]
    Connection { message: String, missing_database: bool },
    /// The statement was rejected by the server.
    #[error("{message}")]
    Sql { code: Option<String>, message: String },
}

impl TargetError {
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Connection { message, .. } | Self::Sql { message, .. } => message,
        }
    }

    fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), missing_database: false }
    }
}

impl From<sqlx::Error> for TargetError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned());
                if code.as_deref() == Some(INVALID_CATALOG_NAME) {
                    return Self::Connection { message: db.message().to_owned(), missing_database: true };
                }
                // Class 08 is connection exceptions, 28 is invalid authorization.
                if code.as_deref().is_some_and(|c| c.starts_with("08") || c.starts_with("28")) {
                    return Self::connection(db.message());
                }
                Self::Sql { code, message: db.message().to_owned() }
            },
            other => Self::connection(other.to_string()),
        }
    }
}

/// Statements applied before a batch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub applied: usize,
    pub error: TargetError,
}

/// An open connection scoped to one schema.
#[async_trait]
pub trait TargetSession: Send {
    /// Runs one or more statements as a single unit.
    async fn execute(&mut self, sql: &str) -> Result<(), TargetError>;

    /// Drops and recreates the session's schema.
    async fn reset_schema(&mut self) -> Result<(), TargetError>;

    /// Applies statements in order inside one transaction; any failure rolls all back.
    async fn execute_in_transaction(&mut self, statements: &[String]) -> Result<usize, BatchFailure>;
}

#[async_trait]
pub trait TargetConnector: Send + Sync {
    async fn connect(&self, dsn: &str, schema: &str) -> Result<Box<dyn TargetSession>, TargetError>;

    /// Creates the database named in `dsn`. Returns `false` if it already exists.
    async fn create_database(&self, dsn: &str) -> Result<bool, TargetError>;
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PgTargetConnector;

pub struct PgTargetSession {
    conn: PgConnection,
    schema: String,
}

#[async_trait]
impl TargetConnector for PgTargetConnector {
    async fn connect(&self, dsn: &str, schema: &str) -> Result<Box<dyn TargetSession>, TargetError> {
        let mut conn = PgConnection::connect(dsn).await?;
        let setup = format!(
            "CREATE SCHEMA IF NOT EXISTS {schema}; SET search_path TO {schema}",
            schema = quote_ident(schema)
        );
        conn.execute(setup.as_str()).await?;
        tracing::debug!(schema, "connected to target database");
        Ok(Box::new(PgTargetSession { conn, schema: schema.to_owned() }))
    }

    async fn create_database(&self, dsn: &str) -> Result<bool, TargetError> {
        let options = PgConnectOptions::from_str(dsn)?;
        let Some(database) = options.get_database().map(str::to_owned) else {
            return Err(TargetError::connection("target DSN does not name a database"));
        };
        let mut conn = PgConnection::connect_with(&options.database("postgres")).await?;
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
            .bind(&database)
            .fetch_optional(&mut conn)
            .await?;
        if exists.is_some() {
            return Ok(false);
        }
        let create = format!("CREATE DATABASE {}", quote_ident(&database));
        conn.execute(create.as_str()).await?;
        tracing::info!(database = %database, "created target database");
        Ok(true)
    }
}

#[async_trait]
impl TargetSession for PgTargetSession {
    async fn execute(&mut self, sql: &str) -> Result<(), TargetError> {
        self.conn.execute(sql).await?;
        Ok(())
    }

    async fn reset_schema(&mut self) -> Result<(), TargetError> {
        let schema = quote_ident(&self.schema);
        let sql = format!(
            "DROP SCHEMA IF EXISTS {schema} CASCADE; CREATE SCHEMA {schema}; SET search_path TO {schema}"
        );
        self.conn.execute(sql.as_str()).await?;
        tracing::warn!(schema = %self.schema, "target schema reset (clean slate)");
        Ok(())
    }

    async fn execute_in_transaction(&mut self, statements: &[String]) -> Result<usize, BatchFailure> {
        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| BatchFailure { applied: 0, error: e.into() })?;
        for (applied, statement) in statements.iter().enumerate() {
            if let Err(e) = (&mut *tx).execute(statement.as_str()).await {
                let error = TargetError::from(e);
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback of failed batch failed");
                }
                return Err(BatchFailure { applied, error });
            }
        }
        tx.commit().await.map_err(|e| BatchFailure { applied: statements.len(), error: e.into() })?;
        Ok(statements.len())
    }
}
