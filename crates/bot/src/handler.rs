use crate::commands::Command;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use common::AppState;
use notifier::reports::{ADD_USAGE_TEXT, HELP_TEXT, NOTHING_TO_UNDO_TEXT};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use transactions::models::AdmissionRequest;
use transactions::service::{TransactionError, TransactionService};

#[derive(Debug, Deserialize)]
pub struct Update {
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

pub fn bot_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/telegram/webhook/{secret}", post(telegram_webhook))
        .with_state(state)
}

/// Telegram retries anything that is not a 2xx, so every update is
/// acknowledged, handled or not.
async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    Path(secret): Path<String>,
    Json(update): Json<Update>,
) -> impl IntoResponse {
    let ack = Json(json!({ "ok": true }));

    if state.config.tg_secret_path.as_deref() != Some(secret.as_str()) {
        tracing::warn!("Webhook called with a wrong secret path");
        return ack;
    }

    let Some(message) = update.message.or(update.edited_message) else {
        return ack;
    };

    let chat_id = message.chat.id.to_string();
    if state.config.telegram_chat_id.as_deref() != Some(chat_id.as_str()) {
        tracing::warn!(chat_id = %chat_id, "Ignoring message from unknown chat");
        return ack;
    }

    if let Some(text) = message.text {
        handle_command(&state, Command::parse(&text)).await;
    }

    ack
}

#[tracing::instrument(skip(state))]
pub async fn handle_command(state: &AppState, command: Command) {
    let now = Utc::now();

    match command {
        Command::Help => state.notifier.send(HELP_TEXT).await,
        Command::Status => {
            let budget = TransactionService::status(state, now).await;
            TransactionService::announce_status(state, &budget).await;
        }
        Command::Add { amount, description } => {
            let request = match AdmissionRequest::manual(amount, description) {
                Ok(request) => request,
                Err(_) => return state.notifier.send(ADD_USAGE_TEXT).await,
            };
            match TransactionService::admit(state, request, now).await {
                Ok(admission) => TransactionService::announce_admission(state, &admission).await,
                Err(e) => report_failure(state, e).await,
            }
        }
        Command::AddUsage => state.notifier.send(ADD_USAGE_TEXT).await,
        Command::Cancel => match TransactionService::reverse_last(state, now).await {
            Ok(reversal) => TransactionService::announce_reversal(state, &reversal).await,
            Err(TransactionError::NothingToUndo) => state.notifier.send(NOTHING_TO_UNDO_TEXT).await,
            Err(e) => report_failure(state, e).await,
        },
        Command::Unknown => {}
    }
}

async fn report_failure(state: &AppState, err: TransactionError) {
    tracing::error!("Chat command failed: {}", err);
    state.notifier.send(&format!("Error: {err}")).await;
}
