pub mod import;
pub mod models;
mod repository;
pub mod store;

pub use models::{LedgerRow, MalformedRecord, TransactionKind, TransactionRecord};
pub use store::{LedgerError, LedgerStore, SqliteLedgerStore};
