//! Telegram chat surface: `/status`, `/add`, `/cancel`, `/help`.

pub mod commands;
pub mod handler;

pub use commands::Command;
pub use handler::{bot_router, handle_command};
