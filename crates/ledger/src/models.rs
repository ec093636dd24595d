use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Column order of the legacy spreadsheet export, header row included.
pub const LEGACY_HEADER: [&str; 9] = [
    "id",
    "ts_utc",
    "ts_msk",
    "amount",
    "currency",
    "type",
    "description",
    "balance_after",
    "source_msg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Debit,
    Credit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Debit => "debit",
            TransactionKind::Credit => "credit",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = MalformedRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "debit" => Ok(TransactionKind::Debit),
            "credit" => Ok(TransactionKind::Credit),
            other => Err(MalformedRecord::Kind(other.to_string())),
        }
    }
}

/// A validated ledger entry. Amounts are minor units (kopecks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub amount: i64,
    pub kind: TransactionKind,
    pub currency: String,
    pub description: String,
    pub balance_after: Option<i64>,
    pub source_text: String,
}

impl TransactionRecord {
    /// Renders the record in the persisted text layout. `tz` only affects the
    /// human-readable local timestamp column.
    pub fn to_row(&self, tz: Tz) -> LedgerRow {
        LedgerRow {
            id: self.id.clone(),
            ts_utc: self.timestamp.to_rfc3339(),
            ts_local: self.timestamp.with_timezone(&tz).to_rfc3339(),
            amount: format_minor_units(self.amount),
            currency: self.currency.clone(),
            kind: self.kind.as_str().to_string(),
            description: self.description.clone(),
            balance_after: self.balance_after.map(format_minor_units),
            source_msg: self.source_text.clone(),
        }
    }
}

/// A ledger row exactly as stored. Nothing here is trusted until
/// [`LedgerRow::to_record`] succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub id: String,
    pub ts_utc: String,
    pub ts_local: String,
    pub amount: String,
    pub currency: String,
    pub kind: String,
    pub description: String,
    pub balance_after: Option<String>,
    pub source_msg: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedRecord {
    #[error("unparseable amount: {0:?}")]
    Amount(String),
    #[error("unparseable timestamp: {0:?}")]
    Timestamp(String),
    #[error("unknown transaction kind: {0:?}")]
    Kind(String),
    #[error("row has {0} columns, expected at least 6")]
    TooShort(usize),
}

impl LedgerRow {
    /// Builds a row from positional spreadsheet cells. Trailing optional
    /// columns may be missing.
    pub fn from_cells(cells: &[String]) -> Result<Self, MalformedRecord> {
        if cells.len() < 6 {
            return Err(MalformedRecord::TooShort(cells.len()));
        }
        let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
        let balance = cell(7);

        Ok(Self {
            id: cell(0),
            ts_utc: cell(1),
            ts_local: cell(2),
            amount: cell(3),
            currency: cell(4),
            kind: cell(5),
            description: cell(6),
            balance_after: if balance.trim().is_empty() { None } else { Some(balance) },
            source_msg: cell(8),
        })
    }

    pub fn to_record(&self) -> Result<TransactionRecord, MalformedRecord> {
        let kind: TransactionKind = self.kind.parse()?;
        let amount = parse_minor_units(&self.amount)
            .ok_or_else(|| MalformedRecord::Amount(self.amount.clone()))?;
        let timestamp = parse_timestamp(&self.ts_utc)
            .or_else(|| parse_timestamp(&self.ts_local))
            .ok_or_else(|| MalformedRecord::Timestamp(self.ts_utc.clone()))?;

        Ok(TransactionRecord {
            id: self.id.clone(),
            timestamp,
            amount,
            kind,
            currency: self.currency.clone(),
            description: self.description.clone(),
            // Informational only, so a bad value is dropped rather than rejected.
            balance_after: self.balance_after.as_deref().and_then(parse_minor_units),
            source_text: self.source_msg.clone(),
        })
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Deterministic record id: the first 16 hex chars of SHA-256 over
/// `"{key}|{timestamp}"`. Same input at the same instant yields the same id.
pub fn transaction_id(key: &str, timestamp: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}", key, timestamp.to_rfc3339()).as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Largest amount accepted anywhere, in minor units (ten billion).
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Parses a non-negative decimal such as `"1 234,5"` or `"99.99"` into minor
/// units, rounding half up past the second fractional digit. Amounts above
/// [`MAX_AMOUNT`] are rejected.
pub fn parse_minor_units(s: &str) -> Option<i64> {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{00A0}' | '\u{202F}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let (whole, frac) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut digits = frac.bytes().map(|b| i64::from(b - b'0'));
    let tenths = digits.next().unwrap_or(0);
    let hundredths = digits.next().unwrap_or(0);
    let round_up = digits.next().is_some_and(|d| d >= 5);

    whole
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths + i64::from(round_up))
        .filter(|amount| *amount <= MAX_AMOUNT)
}

/// Converts a decimal amount (e.g. from JSON or a chat command) into minor
/// units. Rejects negative, non-finite and out-of-range input.
pub fn minor_units_from_f64(value: f64) -> Option<i64> {
    let scaled = (value * 100.0).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled > MAX_AMOUNT as f64 {
        return None;
    }
    Some(scaled as i64)
}

pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Like [`format_minor_units`] but always carries a sign, as in `+1430.14`.
pub fn format_signed_minor_units(amount: i64) -> String {
    if amount < 0 {
        format_minor_units(amount)
    } else {
        format!("+{}", format_minor_units(amount))
    }
}
