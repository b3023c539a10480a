//! SQL-based backend for collections.
//!
//! [`Sqlite`] implements the [`Session`](crate::backend::Session) trait on an
//! SQLite database through sqlx's `AnyPool`.
//!
//! ## Architecture
//!
//! The session API is synchronous. Each `Sqlite` owns a tokio runtime and
//! drives every sqlx future to completion with `block_on`, so it must be used
//! from synchronous code, not from inside another tokio runtime.
//!
//! Tables are created from a [`RecordType`](crate::schema::RecordType) by
//! the [`schema`] module. Values are stored with portable SQL types: UUIDs,
//! dates and timestamps as text, booleans as integers.

/// Table definitions derived from record types.
pub mod schema;
mod storage;

use std::path::Path;
use std::sync::Arc;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use sqlx::error::ErrorKind;

use crate::Result;
use crate::backend::errors::BackendError;

/// Extension trait for sqlx Result types to simplify error handling.
///
/// Similar to `anyhow::Context`, this trait adds a method to convert
/// sqlx errors to `BackendError::SqlxError` with a context message.
pub(crate) trait SqlxResultExt<T> {
    /// Convert sqlx error to BackendError with context message.
    fn sql_context(self, context: &str) -> Result<T>;

    /// Like `sql_context`, but maps constraint failures and missing tables
    /// on `table` to their structured variants.
    fn table_context(self, table: &str, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            BackendError::SqlxError {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }

    fn table_context(self, table: &str, context: &str) -> Result<T> {
        match self {
            Err(sqlx::Error::Database(db)) if is_constraint(db.kind()) => {
                Err(BackendError::ConstraintViolation {
                    table: table.to_string(),
                    reason: db.message().to_string(),
                }
                .into())
            }
            Err(sqlx::Error::Database(db)) if db.message().starts_with("no such table") => {
                Err(BackendError::TableNotFound {
                    table: table.to_string(),
                }
                .into())
            }
            other => other.sql_context(context),
        }
    }
}

fn is_constraint(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UniqueViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::CheckViolation
    )
}

/// SQLite session backend.
///
/// Clones share the connection pool and the runtime.
#[derive(Clone)]
pub struct Sqlite {
    pool: AnyPool,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl std::fmt::Debug for Sqlite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sqlite").finish_non_exhaustive()
    }
}

impl Sqlite {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the database file if it doesn't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        // mode=rwc: read-write-create (create file if it doesn't exist)
        let url = format!("sqlite:{}?mode=rwc", path.as_ref().display());
        Self::connect(&url)
    }

    /// Create an in-memory SQLite database.
    ///
    /// The database exists only for the lifetime of this backend and its clones.
    pub fn in_memory() -> Result<Self> {
        // Use shared cache mode for in-memory SQLite so all connections in the pool
        // share the same database, with a unique name per instance.
        let unique_id = uuid::Uuid::new_v4();
        let url = format!("sqlite:file:mem_{unique_id}?mode=memory&cache=shared");
        Self::connect(&url)
    }

    /// Connect to a SQLite database using a connection URL.
    pub fn connect(url: &str) -> Result<Self> {
        let runtime = Arc::new(tokio::runtime::Runtime::new().map_err(|e| {
            BackendError::Runtime {
                reason: format!("Failed to create tokio runtime: {e}"),
            }
        })?);

        // Detect if this is an in-memory database
        let is_in_memory = url.contains("mode=memory");

        let pool = runtime.block_on(async {
            sqlx::any::install_default_drivers();

            // For in-memory databases with shared cache, we must prevent
            // all connections from being closed. When the last connection closes,
            // the in-memory database is destroyed and all data is lost.
            let options = if is_in_memory {
                AnyPoolOptions::new()
                    .max_connections(5)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
            } else {
                AnyPoolOptions::new().max_connections(5)
            };
            let pool = options
                .connect(url)
                .await
                .sql_context("Failed to connect to SQLite")?;

            let pragmas = if is_in_memory {
                "PRAGMA busy_timeout = 5000;"
            } else {
                // - journal_mode=WAL: Write-Ahead Logging for better concurrency
                // - synchronous=NORMAL: Balanced durability (safe with WAL)
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;"
            };
            sqlx::query(pragmas)
                .execute(&pool)
                .await
                .sql_context("Failed to configure SQLite")?;

            Ok::<_, crate::Error>(pool)
        })?;

        tracing::debug!(in_memory = is_in_memory, "Connected to SQLite");
        Ok(Self { pool, runtime })
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Run `future` to completion on this backend's runtime.
    pub(crate) fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
