//! Chat-ready report texts (Telegram HTML parse mode).

use askama::Template;
use budget::BudgetState;
use ledger::models::{format_minor_units, format_signed_minor_units};
use ledger::{LedgerRow, TransactionKind, TransactionRecord};

pub const HELP_TEXT: &str = "Hi! I track your daily budget.\n\
<b>Commands:</b>\n\
/status - show the current budget.\n\
/add <b>amount</b> [description] - record an expense by hand.\n\
/cancel - cancel the last transaction.";

pub const ADD_USAGE_TEXT: &str = "Invalid format. Use: <code>/add AMOUNT [description]</code>";

pub const NOTHING_TO_UNDO_TEXT: &str = "No transactions to cancel.";

#[derive(Template)]
#[template(path = "expense.html")]
struct ExpenseTemplate<'a> {
    amount: String,
    description: &'a str,
    daily_remaining: String,
    overspent: String,
    symbol: &'a str,
}

#[derive(Template)]
#[template(path = "income.html")]
struct IncomeTemplate<'a> {
    amount: String,
    description: &'a str,
    daily_remaining: String,
    symbol: &'a str,
}

#[derive(Template)]
#[template(path = "status.html")]
struct StatusTemplate<'a> {
    daily_limit: String,
    spent_today: String,
    daily_remaining: String,
    overspent: String,
    savings: String,
    symbol: &'a str,
}

#[derive(Template)]
#[template(path = "reversal.html")]
struct ReversalTemplate<'a> {
    description: &'a str,
    amount: &'a str,
    daily_remaining: String,
    symbol: &'a str,
}

/// Renders budget state into messages, in one currency.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    symbol: String,
}

impl ReportFormatter {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            symbol: currency_symbol.into(),
        }
    }

    /// Report sent after a transaction is recorded.
    pub fn admission(&self, record: &TransactionRecord, state: &BudgetState) -> askama::Result<String> {
        match record.kind {
            TransactionKind::Debit => ExpenseTemplate {
                amount: format_minor_units(record.amount),
                description: &record.description,
                daily_remaining: format_signed_minor_units(state.daily_remaining),
                overspent: format_minor_units(state.overspent),
                symbol: &self.symbol,
            }
            .render(),
            TransactionKind::Credit => IncomeTemplate {
                amount: format_minor_units(record.amount),
                description: &record.description,
                daily_remaining: format_signed_minor_units(state.daily_remaining),
                symbol: &self.symbol,
            }
            .render(),
        }
    }

    pub fn status(&self, state: &BudgetState) -> askama::Result<String> {
        StatusTemplate {
            daily_limit: format_minor_units(state.daily_limit),
            spent_today: format_minor_units(state.spent_today),
            daily_remaining: format_signed_minor_units(state.daily_remaining),
            overspent: format_minor_units(state.overspent),
            savings: format_minor_units(state.savings),
            symbol: &self.symbol,
        }
        .render()
    }

    /// The removed row is shown as stored, so even a malformed row can be
    /// reported back.
    pub fn reversal(&self, removed: &LedgerRow, state: &BudgetState) -> askama::Result<String> {
        ReversalTemplate {
            description: &removed.description,
            amount: &removed.amount,
            daily_remaining: format_signed_minor_units(state.daily_remaining),
            symbol: &self.symbol,
        }
        .render()
    }
}
