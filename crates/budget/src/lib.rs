//! Daily budget and rolling savings ("piggy bank") accounting.
//!
//! Everything here is a pure function of a ledger snapshot, the current
//! instant and an immutable [`BudgetConfig`].

pub mod config;
pub mod engine;

pub use config::{BudgetConfig, BudgetConfigError, MissingDayPolicy};
pub use engine::{compute_budget_stats, daily_debit_totals, BudgetState};
