use crate::models::{Admission, AdmissionRequest, RawSmsPayload, TransactionPayload};
use crate::service::{TransactionError, TransactionService};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use common::AppState;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

impl IntoResponse for TransactionError {
    fn into_response(self) -> Response {
        let status = match self {
            TransactionError::NoAmount | TransactionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TransactionError::NothingToUndo => StatusCode::NOT_FOUND,
            TransactionError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn transactions_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/transaction", post(create_transaction))
        .route("/transaction/last", delete(reverse_last_transaction))
        .route("/sms", post(receive_sms))
        .route("/status", get(get_status))
        .with_state(state)
}

async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TransactionPayload>,
) -> Result<Response, TransactionError> {
    let request = payload.into_request().map_err(TransactionError::InvalidInput)?;
    admit_and_announce(&state, request).await
}

async fn receive_sms(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RawSmsPayload>,
) -> Result<Response, TransactionError> {
    payload
        .validate()
        .map_err(|e| TransactionError::InvalidInput(e.to_string()))?;
    let request = AdmissionRequest::raw(payload.body, payload.time);
    admit_and_announce(&state, request).await
}

async fn admit_and_announce(
    state: &AppState,
    request: AdmissionRequest,
) -> Result<Response, TransactionError> {
    let admission = TransactionService::admit(state, request, Utc::now()).await?;
    TransactionService::announce_admission(state, &admission).await;

    let response = match admission {
        Admission::Recorded { record, budget } => (
            StatusCode::CREATED,
            Json(json!({ "status": "recorded", "transaction": record, "budget": budget })),
        ),
        Admission::Duplicate { id, budget } => (
            StatusCode::OK,
            Json(json!({ "status": "duplicate", "id": id, "budget": budget })),
        ),
    };
    Ok(response.into_response())
}

async fn reverse_last_transaction(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, TransactionError> {
    let reversal = TransactionService::reverse_last(&state, Utc::now()).await?;
    TransactionService::announce_reversal(&state, &reversal).await;

    Ok(Json(json!({ "removed": reversal.removed, "budget": reversal.budget })))
}

async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(TransactionService::status(&state, Utc::now()).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use common::Config;
    use database::get_test_db;
    use ledger::SqliteLedgerStore;
    use notifier::Notifier;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) {
            self.sent.lock().unwrap().push(text.to_string());
        }
    }

    async fn test_app() -> (Router, Arc<RecordingNotifier>) {
        let store = SqliteLedgerStore::open(get_test_db().await).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let state = Arc::new(AppState::new(Config::default(), Arc::new(store), notifier.clone()).unwrap());
        let app = transactions_router(state.clone()).with_state(state);
        (app, notifier)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_post_sms_records_and_notifies() {
        let (app, notifier) = test_app().await;
        let body = json!({ "body": "Покупка на 300 ₽, АПТЕКА. Доступно 1 000 ₽", "time": "2025-03-10T08:00:00Z" });

        let response = app.clone().oneshot(post_json("/transaction", body.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["status"], "recorded");
        assert_eq!(json["transaction"]["description"], "АПТЕКА");

        let response = app.oneshot(post_json("/sms", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "duplicate");

        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_entry() {
        let (app, _) = test_app().await;
        let response = app
            .oneshot(post_json("/transaction", json!({ "amount": 45.5, "description": "Lunch" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["budget"]["spent_today"], "45.50");
    }

    #[tokio::test]
    async fn test_unparseable_body_is_bad_request() {
        let (app, notifier) = test_app().await;
        let response = app
            .oneshot(post_json("/transaction", json!({ "body": "Ваш код: 1234" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_manual_amount_is_rejected() {
        let (app, _) = test_app().await;
        let response = app
            .oneshot(post_json("/transaction", json!({ "amount": -5 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reverse_last() {
        let (app, notifier) = test_app().await;
        let delete_last = || {
            Request::builder()
                .method("DELETE")
                .uri("/transaction/last")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete_last()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        app.clone()
            .oneshot(post_json("/transaction", json!({ "amount": 10 })))
            .await
            .unwrap();
        let response = app.oneshot(delete_last()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["removed"]["amount"], "10.00");
        assert_eq!(json["budget"]["spent_today"], "0.00");
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_status() {
        let (app, _) = test_app().await;
        let request = Request::builder().uri("/status").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["daily_limit"], "1629.57");
        assert_eq!(json["daily_remaining"], "1629.57");
    }
}
