use crate::models::{Admission, AdmissionRequest, ImportSummary, Reversal};
use budget::{compute_budget_stats, BudgetState};
use chrono::{DateTime, Utc};
use common::AppState;
use ingest::{parse_forwarder_time, NormalizeError};
use ledger::models::{format_minor_units, transaction_id, MAX_AMOUNT};
use ledger::{LedgerError, LedgerRow, TransactionKind, TransactionRecord};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Could not parse amount from message body")]
    NoAmount,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Ledger store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<LedgerError> for TransactionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NothingToDelete => TransactionError::NothingToUndo,
            LedgerError::Unavailable(msg) => TransactionError::StoreUnavailable(msg),
            _ => TransactionError::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<NormalizeError> for TransactionError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::NoAmount => TransactionError::NoAmount,
        }
    }
}

pub struct TransactionService;

impl TransactionService {
    /// Validates and appends one transaction, then recomputes the budget over
    /// the updated ledger. Re-admitting the same input with the same
    /// timestamp appends nothing and reports `Admission::Duplicate`.
    #[instrument(skip(state, request))]
    pub async fn admit(
        state: &AppState,
        request: AdmissionRequest,
        now: DateTime<Utc>,
    ) -> Result<Admission, TransactionError> {
        let record = Self::build_record(state, request, now)?;

        let _guard = state.write_lock.lock().await;

        if state.ledger.contains(&record.id).await? {
            tracing::info!(id = %record.id, "Duplicate admission ignored");
            let budget = Self::compute(state, now).await;
            return Ok(Admission::Duplicate { id: record.id, budget });
        }

        match state.ledger.append(&record.to_row(state.budget.timezone())).await {
            Ok(()) => {}
            Err(LedgerError::Duplicate(id)) => {
                tracing::info!(id = %id, "Duplicate admission rejected by store");
                let budget = Self::compute(state, now).await;
                return Ok(Admission::Duplicate { id, budget });
            }
            Err(e) => {
                tracing::error!("Failed to append transaction: {}", e);
                return Err(e.into());
            }
        }

        let budget = Self::compute(state, now).await;
        tracing::info!(id = %record.id, kind = %record.kind, amount = record.amount, "Transaction recorded");
        Ok(Admission::Recorded { record, budget })
    }

    /// Removes the most recently appended row and recomputes from what is left.
    #[instrument(skip(state))]
    pub async fn reverse_last(state: &AppState, now: DateTime<Utc>) -> Result<Reversal, TransactionError> {
        let _guard = state.write_lock.lock().await;

        let removed = state.ledger.delete_last().await?;
        tracing::info!(id = %removed.id, "Last transaction reversed");

        let budget = Self::compute(state, now).await;
        Ok(Reversal { removed, budget })
    }

    /// Current budget position. Never fails; an unreadable ledger reads as empty.
    #[instrument(skip(state))]
    pub async fn status(state: &AppState, now: DateTime<Utc>) -> BudgetState {
        Self::compute(state, now).await
    }

    /// Appends rows from an external export, skipping ids already present.
    #[instrument(skip(state, rows), fields(rows = rows.len()))]
    pub async fn import_rows(state: &AppState, rows: Vec<LedgerRow>) -> Result<ImportSummary, TransactionError> {
        let _guard = state.write_lock.lock().await;
        let mut summary = ImportSummary::default();

        for row in rows {
            if state.ledger.contains(&row.id).await? {
                summary.duplicates += 1;
                continue;
            }
            match state.ledger.append(&row).await {
                Ok(()) => summary.imported += 1,
                Err(LedgerError::Duplicate(_)) => summary.duplicates += 1,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(summary)
    }

    /// Renders the admission report and hands it to the notifier. Duplicates
    /// are not announced again.
    pub async fn announce_admission(state: &AppState, admission: &Admission) {
        if let Admission::Recorded { record, budget } = admission {
            match state.reports.admission(record, budget) {
                Ok(text) => state.notifier.send(&text).await,
                Err(e) => tracing::error!("Failed to render admission report: {}", e),
            }
        }
    }

    pub async fn announce_reversal(state: &AppState, reversal: &Reversal) {
        match state.reports.reversal(&reversal.removed, &reversal.budget) {
            Ok(text) => state.notifier.send(&text).await,
            Err(e) => tracing::error!("Failed to render reversal report: {}", e),
        }
    }

    pub async fn announce_status(state: &AppState, budget: &BudgetState) {
        match state.reports.status(budget) {
            Ok(text) => state.notifier.send(&text).await,
            Err(e) => tracing::error!("Failed to render status report: {}", e),
        }
    }

    fn build_record(
        state: &AppState,
        request: AdmissionRequest,
        now: DateTime<Utc>,
    ) -> Result<TransactionRecord, TransactionError> {
        let currency = state.config.currency.clone();

        match request {
            AdmissionRequest::Manual { amount, description } => {
                if amount <= 0 || amount > MAX_AMOUNT {
                    return Err(TransactionError::InvalidInput(format!(
                        "Amount must be positive and at most {}",
                        format_minor_units(MAX_AMOUNT)
                    )));
                }
                let key = format!("manual_{}", format_minor_units(amount));
                Ok(TransactionRecord {
                    id: transaction_id(&key, &now),
                    timestamp: now,
                    amount,
                    kind: TransactionKind::Debit,
                    currency,
                    description,
                    balance_after: None,
                    source_text: String::new(),
                })
            }
            AdmissionRequest::Raw { body, time } => {
                let body = body.trim().to_string();
                let normalized = state.normalizer.normalize(&body)?;

                let timestamp = match time.as_deref() {
                    Some(raw) => parse_forwarder_time(raw, state.budget.timezone(), now).unwrap_or_else(|| {
                        tracing::warn!(time = raw, "Unparseable forwarder timestamp, using current time");
                        now
                    }),
                    None => now,
                };

                Ok(TransactionRecord {
                    id: transaction_id(&body, &timestamp),
                    timestamp,
                    amount: normalized.amount,
                    kind: normalized.kind,
                    currency: normalized.currency,
                    description: normalized.description,
                    balance_after: normalized.balance_after,
                    source_text: body,
                })
            }
        }
    }

    async fn compute(state: &AppState, now: DateTime<Utc>) -> BudgetState {
        let records: Vec<TransactionRecord> = state
            .ledger
            .read_all()
            .await
            .iter()
            .filter_map(|row| match row.to_record() {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(id = %row.id, "Skipping malformed ledger row: {}", e);
                    None
                }
            })
            .collect();

        compute_budget_stats(&records, now, &state.budget)
    }
}
