use crate::models::LedgerRow;
use crate::repository::LedgerRepository;
use async_trait::async_trait;
use database::{Database, RepositoryError};
use tracing::instrument;

/// Schema version written by the migrations and required at startup.
pub const SCHEMA_VERSION: &str = "1";

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),
    #[error("Transaction {0} is already recorded")]
    Duplicate(String),
    #[error("Nothing to delete")]
    NothingToDelete,
    #[error("Ledger schema version {found:?} does not match expected {expected}")]
    SchemaMismatch {
        expected: &'static str,
        found: Option<String>,
    },
}

impl From<RepositoryError> for LedgerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => LedgerError::NothingToDelete,
            RepositoryError::UniqueViolation(msg) => LedgerError::Duplicate(msg),
            RepositoryError::Infrastructure(e) => LedgerError::Unavailable(e.to_string()),
            RepositoryError::CheckViolation(msg) => LedgerError::Unavailable(msg),
        }
    }
}

/// Append-only, ordered system of record for transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends one row. The row is either fully written or not written at all.
    async fn append(&self, row: &LedgerRow) -> Result<(), LedgerError>;

    /// All rows in append order. Backend failures are logged and read as an
    /// empty ledger.
    async fn read_all(&self) -> Vec<LedgerRow>;

    /// Removes and returns the most recently appended row.
    async fn delete_last(&self) -> Result<LedgerRow, LedgerError>;

    async fn contains(&self, id: &str) -> Result<bool, LedgerError>;
}

#[derive(Clone)]
pub struct SqliteLedgerStore {
    db: Database,
}

impl SqliteLedgerStore {
    /// Wraps a migrated database, refusing one whose schema marker is missing
    /// or from another version.
    pub async fn open(db: Database) -> Result<Self, LedgerError> {
        let found = {
            let mut uow = db.begin().await?;
            let mut repo = LedgerRepository::new(uow.connection());
            repo.schema_version().await?
        };

        if found.as_deref() != Some(SCHEMA_VERSION) {
            return Err(LedgerError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found,
            });
        }

        Ok(Self { db })
    }

    async fn try_read_all(&self) -> Result<Vec<LedgerRow>, RepositoryError> {
        let mut uow = self.db.begin().await?;
        let mut repo = LedgerRepository::new(uow.connection());
        repo.list().await
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    #[instrument(skip(self, row), fields(id = %row.id))]
    async fn append(&self, row: &LedgerRow) -> Result<(), LedgerError> {
        let mut uow = self.db.begin().await?;
        let mut repo = LedgerRepository::new(uow.connection());

        repo.append(row).await.map_err(|e| match e {
            RepositoryError::UniqueViolation(_) => LedgerError::Duplicate(row.id.clone()),
            other => other.into(),
        })?;

        uow.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read_all(&self) -> Vec<LedgerRow> {
        match self.try_read_all().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Failed to read ledger, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_last(&self) -> Result<LedgerRow, LedgerError> {
        let mut uow = self.db.begin().await?;
        let mut repo = LedgerRepository::new(uow.connection());

        let (seq, row) = repo.last().await?.ok_or(LedgerError::NothingToDelete)?;
        repo.delete(seq).await?;

        uow.commit().await?;
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn contains(&self, id: &str) -> Result<bool, LedgerError> {
        let mut uow = self.db.begin().await?;
        let mut repo = LedgerRepository::new(uow.connection());
        Ok(repo.exists(id).await?)
    }
}
