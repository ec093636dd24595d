use budget::BudgetState;
use ledger::models::minor_units_from_f64;
use ledger::{LedgerRow, TransactionRecord};
use serde::Deserialize;
use validator::Validate;

pub const MANUAL_DESCRIPTION: &str = "Manual entry";

/// A transaction waiting to be admitted to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionRequest {
    /// Amount typed in by hand, always a debit. Minor units.
    Manual { amount: i64, description: String },
    /// Notification text to be normalized, with the forwarder's timestamp if it sent one.
    Raw { body: String, time: Option<String> },
}

impl AdmissionRequest {
    pub fn manual(amount: f64, description: Option<String>) -> Result<Self, String> {
        let amount = minor_units_from_f64(amount)
            .filter(|a| *a > 0)
            .ok_or_else(|| "Amount must be a positive number no larger than 10 billion".to_string())?;

        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| MANUAL_DESCRIPTION.to_string());

        Ok(Self::Manual { amount, description })
    }

    pub fn raw(body: String, time: Option<String>) -> Self {
        Self::Raw { body, time }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Recorded {
        record: TransactionRecord,
        budget: BudgetState,
    },
    /// The same input was admitted before; nothing was appended.
    Duplicate { id: String, budget: BudgetState },
}

impl Admission {
    pub fn budget(&self) -> &BudgetState {
        match self {
            Admission::Recorded { budget, .. } | Admission::Duplicate { budget, .. } => budget,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reversal {
    pub removed: LedgerRow,
    pub budget: BudgetState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RawSmsPayload {
    #[validate(length(min = 1, max = 4096))]
    pub body: String,
    pub time: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RawManualPayload {
    pub amount: f64,
    #[validate(length(max = 256))]
    pub description: Option<String>,
}

/// Body of `POST /transaction`: either a forwarded SMS or a manual entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TransactionPayload {
    Sms(RawSmsPayload),
    Manual(RawManualPayload),
}

impl TransactionPayload {
    pub fn into_request(self) -> Result<AdmissionRequest, String> {
        match self {
            TransactionPayload::Sms(p) => {
                p.validate().map_err(|e| e.to_string())?;
                Ok(AdmissionRequest::raw(p.body, p.time))
            }
            TransactionPayload::Manual(p) => {
                p.validate().map_err(|e| e.to_string())?;
                AdmissionRequest::manual(p.amount, p.description)
            }
        }
    }
}
