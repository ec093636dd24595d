use crate::Notifier;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Delivers messages to one chat through the Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_api_base(TELEGRAM_API_BASE, token, chat_id, timeout)
    }

    pub fn with_api_base(
        api_base: &str,
        token: &str,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
            chat_id: chat_id.into(),
        })
    }

    async fn try_send(&self, text: &str) -> Result<(), String> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(format!("telegram error: {status} {txt}"));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) {
        if let Err(e) = self.try_send(text).await {
            tracing::error!("Error sending to Telegram: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, routing::post};
    use std::sync::{Arc, Mutex};

    type Inbox = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn capture(State(inbox): State<Inbox>, Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
        inbox.lock().unwrap().push(body);
        Json(serde_json::json!({ "ok": true }))
    }

    async fn spawn_fake_api() -> (String, Inbox) {
        let inbox: Inbox = Arc::default();
        let app = Router::new()
            .route("/botTOKEN/sendMessage", post(capture))
            .with_state(inbox.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), inbox)
    }

    #[tokio::test]
    async fn test_send_posts_html_message() {
        let (base, inbox) = spawn_fake_api().await;
        let notifier = TelegramNotifier::with_api_base(&base, "TOKEN", "42", Duration::from_secs(5)).unwrap();

        notifier.send("<b>hi</b>").await;

        let sent = inbox.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["chat_id"], "42");
        assert_eq!(sent[0]["text"], "<b>hi</b>");
        assert_eq!(sent[0]["parse_mode"], "HTML");
    }

    #[tokio::test]
    async fn test_delivery_failures_are_swallowed() {
        let (base, inbox) = spawn_fake_api().await;
        // Wrong token path answers 404.
        let notifier = TelegramNotifier::with_api_base(&base, "WRONG", "42", Duration::from_secs(5)).unwrap();
        notifier.send("lost").await;
        assert!(inbox.lock().unwrap().is_empty());

        let unreachable =
            TelegramNotifier::with_api_base("http://127.0.0.1:9", "TOKEN", "42", Duration::from_millis(200)).unwrap();
        unreachable.send("lost too").await;
    }
}
