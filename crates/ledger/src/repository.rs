use crate::models::LedgerRow;
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct LedgerRowRecord {
    seq: i64,
    id: String,
    ts_utc: String,
    ts_local: String,
    amount: String,
    currency: String,
    kind: String,
    description: String,
    balance_after: Option<String>,
    source_msg: String,
}

impl From<LedgerRowRecord> for LedgerRow {
    fn from(record: LedgerRowRecord) -> Self {
        LedgerRow {
            id: record.id,
            ts_utc: record.ts_utc,
            ts_local: record.ts_local,
            amount: record.amount,
            currency: record.currency,
            kind: record.kind,
            description: record.description,
            balance_after: record.balance_after,
            source_msg: record.source_msg,
        }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT seq, id, ts_utc, ts_local, amount, currency, kind, description, balance_after, source_msg FROM ledger";

pub(crate) struct LedgerRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> LedgerRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    /// Appends a row and returns its position in append order.
    pub async fn append(&mut self, row: &LedgerRow) -> Result<i64, RepositoryError> {
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO ledger (id, ts_utc, ts_local, amount, currency, kind, description, balance_after, source_msg)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING seq
            "#,
        )
        .bind(&row.id)
        .bind(&row.ts_utc)
        .bind(&row.ts_local)
        .bind(&row.amount)
        .bind(&row.currency)
        .bind(&row.kind)
        .bind(&row.description)
        .bind(row.balance_after.as_deref())
        .bind(&row.source_msg)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(seq)
    }

    pub async fn list(&mut self) -> Result<Vec<LedgerRow>, RepositoryError> {
        let records = sqlx::query_as::<_, LedgerRowRecord>(&format!("{} ORDER BY seq", SELECT_COLUMNS))
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    pub async fn exists(&mut self, id: &str) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count > 0)
    }

    /// The most recently appended row together with its sequence number.
    pub async fn last(&mut self) -> Result<Option<(i64, LedgerRow)>, RepositoryError> {
        let record = sqlx::query_as::<_, LedgerRowRecord>(&format!(
            "{} ORDER BY seq DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record.map(|r| (r.seq, r.into())))
    }

    pub async fn delete(&mut self, seq: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM ledger WHERE seq = $1")
            .bind(seq)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn schema_version(&mut self) -> Result<Option<String>, RepositoryError> {
        let version = sqlx::query_scalar("SELECT value FROM ledger_meta WHERE key = 'schema_version'")
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(version)
    }
}
