use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub use sqlx::Error;
pub use sqlx::Result;

static TEST_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

// --- Driver Adapter Pattern ---
pub type Driver = Sqlite;
pub type Connection = sqlx::SqliteConnection;
pub type Pool = SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Infrastructure(sqlx::Error),
    #[error("Resource not found")]
    NotFound,
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            _ => {
                if let Some(db_err) = err.as_database_error() {
                    if let Some(code) = db_err.code() {
                        match code.as_ref() {
                            "2067" | "1555" => {
                                return RepositoryError::UniqueViolation(
                                    db_err.message().to_string(),
                                );
                            }
                            "275" => {
                                return RepositoryError::CheckViolation(
                                    db_err.message().to_string(),
                                );
                            }
                            _ => {}
                        }
                    }
                }
                RepositoryError::Infrastructure(err)
            }
        }
    }
}

#[derive(Clone)]
pub struct Database {
    pub pool: Pool,
}

impl Database {
    /// Opens (creating if needed) the SQLite file behind `connection_string`.
    ///
    /// `timeout` bounds both pool acquisition and SQLite's busy wait, so no
    /// ledger call can hang on a locked file.
    pub async fn new(connection_string: &str, timeout: Duration) -> sqlx::Result<Self> {
        let options = SqliteConnectOptions::from_str(connection_string)?
            .create_if_missing(true)
            .busy_timeout(timeout);

        let pool = SqlitePoolOptions::new()
            .acquire_timeout(timeout)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!("Running migrations...");
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await?;
        tracing::info!("Migrations complete.");
        Ok(())
    }

    pub async fn begin(&self) -> Result<UnitOfWork<'_>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork { tx })
    }
}

pub struct UnitOfWork<'a> {
    tx: Transaction<'a, Driver>,
}

impl<'a> UnitOfWork<'a> {
    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub fn connection(&mut self) -> &mut Connection {
        &mut *self.tx
    }
}

// do not add #[cfg(test)] here because it hides this method from libraries.
pub async fn get_test_db() -> Database {
    use std::time::{SystemTime, UNIX_EPOCH};

    // Unique file per test; the counter keeps parallel tests in one process apart.
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let n = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_path = std::env::temp_dir().join(format!(
        "test_ledger_{}_{}_{}.db",
        std::process::id(),
        now,
        n
    ));
    let connection_string = format!("sqlite:{}", db_path.display());

    let options = SqliteConnectOptions::from_str(&connection_string).unwrap()
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1) // Single connection is safer for SQLite tests
        .acquire_timeout(DEFAULT_STORE_TIMEOUT)
        .connect_with(options)
        .await
        .expect("Failed to create test database pool");

    let db = Database { pool };
    db.run_migrations().await.expect("Failed to run migrations");

    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_write_schema_marker() {
        let db = get_test_db().await;
        let version: String =
            sqlx::query_scalar("SELECT value FROM ledger_meta WHERE key = 'schema_version'")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(version, "1");
    }

    #[tokio::test]
    async fn test_unique_violation_is_translated() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let insert = "INSERT INTO ledger (id, ts_utc, ts_local, amount, currency, kind) \
                      VALUES ('dup', 'a', 'b', '1', 'RUB', 'debit')";
        sqlx::query(insert).execute(uow.connection()).await.unwrap();
        let err = sqlx::query(insert).execute(uow.connection()).await.unwrap_err();
        assert!(matches!(RepositoryError::from(err), RepositoryError::UniqueViolation(_)));
    }
}
