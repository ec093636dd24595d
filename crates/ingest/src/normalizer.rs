use ledger::TransactionKind;
use ledger::models::parse_minor_units;
use regex::Regex;
use serde::Serialize;

/// Typed view of one bank notification, before it gets an id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTransaction {
    /// Minor units.
    pub amount: i64,
    pub kind: TransactionKind,
    pub currency: String,
    pub description: String,
    pub balance_after: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("Could not parse amount from message body")]
    NoAmount,
}

/// Turns free-form notification text into a [`NormalizedTransaction`].
pub trait SmsNormalizer: Send + Sync {
    fn normalize(&self, text: &str) -> Result<NormalizedTransaction, NormalizeError>;
}

/// Heuristics for Russian retail bank SMS/push texts ("Покупка", "Оплата
/// через СБП", "Перевод", "Доступно"/"Баланс").
pub struct RegexNormalizer {
    currency: String,
    amount: Regex,
    balance: Regex,
    credit_markers: Regex,
    description_patterns: Vec<Regex>,
}

impl RegexNormalizer {
    pub fn new(currency: impl Into<String>) -> Result<Self, regex::Error> {
        let description_patterns = [
            r"(?im)Покупка на .*?, (.*?)(?:Доступно|Баланс|$)",
            r"(?im)Оплата через СБП на .*?, (.*?)(?:Доступно|Баланс|$)",
            r"(?im)Перевод на .*?\. (.*?)\.",
        ]
        .iter()
        .map(|p| Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            currency: currency.into(),
            amount: Regex::new(
                r"(?i)(\d+(?:[ \x{00A0}\x{202F}]\d{3})*(?:[.,]\d{1,2})?)\s*(?:₽|руб|р\.|rub)",
            )?,
            balance: Regex::new(r"(?i)(?:Доступно|Баланс)\s*([\d\s\x{00A0}\x{202F},.]+)₽")?,
            credit_markers: Regex::new(r"(?i)зачислен|пополнение|возврат|зарплата")?,
            description_patterns,
        })
    }

    fn amount(&self, text: &str) -> Option<i64> {
        let caps = self.amount.captures(text)?;
        parse_minor_units(&caps[1])
    }

    fn description(&self, text: &str) -> String {
        for pattern in &self.description_patterns {
            if let Some(caps) = pattern.captures(text) {
                let found = caps[1].trim().trim_end_matches('.').trim();
                if !found.is_empty() {
                    return found.to_string();
                }
            }
        }
        text.lines().next().unwrap_or_default().trim().to_string()
    }

    fn balance_after(&self, text: &str) -> Option<i64> {
        let caps = self.balance.captures(text)?;
        parse_minor_units(caps[1].trim().trim_end_matches(['.', ',']))
    }
}

impl SmsNormalizer for RegexNormalizer {
    fn normalize(&self, text: &str) -> Result<NormalizedTransaction, NormalizeError> {
        let amount = self.amount(text).ok_or(NormalizeError::NoAmount)?;
        let kind = if self.credit_markers.is_match(text) {
            TransactionKind::Credit
        } else {
            TransactionKind::Debit
        };

        Ok(NormalizedTransaction {
            amount,
            kind,
            currency: self.currency.clone(),
            description: self.description(text),
            balance_after: self.balance_after(text),
        })
    }
}
