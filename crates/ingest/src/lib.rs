//! Normalization of forwarded bank notifications into typed transactions.

pub mod normalizer;
pub mod time;

pub use normalizer::{NormalizeError, NormalizedTransaction, RegexNormalizer, SmsNormalizer};
pub use time::parse_forwarder_time;
