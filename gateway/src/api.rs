//! HTTP API: modem status, job submission, and job lookup.
//!
//! | Method | Path              | Success                      | Errors   |
//! |--------|-------------------|------------------------------|----------|
//! | GET    | `/api/status`     | 200 `Status`                 | 503      |
//! | POST   | `/api/send`       | 202 `{id, status, pending}`  | 400, 503 |
//! | GET    | `/api/queue/{id}` | 200 `Job`                    | 404      |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use smsgate::{Job, JobQueue, JobStatus, Modem, Status};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub modem: Arc<dyn Modem>,
    pub queue: Arc<JobQueue>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/send", post(send))
        .route("/api/queue/{id}", get(job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler failure, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self {
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<smsgate::Error> for HttpError {
    fn from(err: smsgate::Error) -> Self {
        match err {
            smsgate::Error::InvalidParameter(msg) => HttpError::BadRequest(msg),
            other => HttpError::ServiceUnavailable(other.to_string()),
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub id: String,
    pub status: JobStatus,
    pub pending: usize,
}

async fn status(State(state): State<AppState>) -> Result<Json<Status>, HttpError> {
    match state.modem.status().await {
        Ok(status) => Ok(Json(status)),
        Err(e) => {
            warn!(error = %e, "modem status query failed");
            Err(HttpError::ServiceUnavailable(e.to_string()))
        }
    }
}

async fn send(
    State(state): State<AppState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SendResponse>), HttpError> {
    let Json(req) = payload?;
    smsgate::validate_sms(&req.phone, &req.message)?;

    let Some(job) = state.queue.enqueue(&req.phone, &req.message) else {
        return Err(HttpError::ServiceUnavailable(
            "queue is full, try again later".into(),
        ));
    };

    info!(job_id = %job.id, phone = %req.phone, "accepted send request");
    Ok((
        StatusCode::ACCEPTED,
        Json(SendResponse {
            id: job.id,
            status: job.status,
            pending: state.queue.pending(),
        }),
    ))
}

async fn job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, HttpError> {
    state
        .queue
        .get(&id)
        .map(Json)
        .ok_or_else(|| HttpError::NotFound("job not found".into()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use smsgate::{Backend, QueueConfig, SimulatorModem};

    use super::*;

    fn app_with(modem: Arc<dyn Modem>, capacity: usize) -> Router {
        let queue = Arc::new(JobQueue::new(
            Arc::clone(&modem),
            QueueConfig::with_capacity(capacity),
        ));
        router(AppState { modem, queue })
    }

    fn app() -> Router {
        app_with(Arc::new(SimulatorModem::with_latency(0..=0)), 10)
    }

    async fn parse_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap_or_else(|e| panic!("Expected valid JSON body: {e}"))
    }

    fn post_send(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/send")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn status_returns_simulator_snapshot() {
        let response = app().oneshot(get("/api/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = parse_json(response).await;
        assert_eq!(json["connected"], true);
        assert_eq!(json["network_registered"], true);
        assert_eq!(json["signal_strength"], 31);
        assert_eq!(json["signal_strength_desc"], "excellent");
    }

    #[tokio::test]
    async fn status_failure_is_503() {
        let modem = smsgate::open(&Backend::Serial {
            port: "/dev/smsgate-test-no-such-port".into(),
            baud_rate: 115_200,
        })
        .unwrap();
        let response = app_with(modem, 1).oneshot(get("/api/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = parse_json(response).await;
        assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn send_accepts_job() {
        let response = app()
            .oneshot(post_send(r#"{"phone":"+420123456789","message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let json = parse_json(response).await;
        assert_eq!(json["id"].as_str().map(str::len), Some(16));
        assert_eq!(json["status"], "queued");
        assert!(json["pending"].is_u64());
    }

    #[tokio::test]
    async fn send_requires_phone_and_message() {
        let response = app()
            .oneshot(post_send(r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_json(response).await["error"], "phone number is required");

        let response = app()
            .oneshot(post_send(r#"{"phone":"+420123456789","message":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_json(response).await["error"], "message is required");
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let response = app().oneshot(post_send("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = parse_json(response).await;
        assert!(json["error"].as_str().unwrap().starts_with("invalid request body"));
    }

    #[tokio::test]
    async fn full_queue_is_503() {
        // One slot, held by a send that takes a minute.
        let app = app_with(Arc::new(SimulatorModem::with_latency(60_000..=60_000)), 1);
        let body = r#"{"phone":"+420123456789","message":"hi"}"#;

        let first = app.clone().oneshot(post_send(body)).await.unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app.oneshot(post_send(body)).await.unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            parse_json(second).await["error"],
            "queue is full, try again later"
        );
    }

    #[tokio::test]
    async fn unknown_job_is_404() {
        let response = app()
            .oneshot(get("/api/queue/0123456789abcdef"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(parse_json(response).await["error"], "job not found");
    }

    #[tokio::test]
    async fn finished_job_is_returned_once() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post_send(r#"{"phone":"+420123456789","message":"hi"}"#))
            .await
            .unwrap();
        let id = parse_json(response).await["id"].as_str().unwrap().to_string();
        let uri = format!("/api/queue/{id}");

        let mut finished = None;
        for _ in 0..200 {
            let response = app.clone().oneshot(get(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = parse_json(response).await;
            if json["status"] == "sent" {
                finished = Some(json);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let job = finished.expect("job never finished");
        assert_eq!(job["phone"], "+420123456789");
        assert_eq!(job["result"]["success"], true);
        assert!(job["result"]["message_reference"].is_string());
        assert!(job.get("error").is_none());

        let response = app.oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
