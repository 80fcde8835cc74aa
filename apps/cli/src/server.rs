//! HTTP chat API.
//!
//! - `POST /api/chat` with `{sessionId, message}`
//! - `DELETE /api/chat/{session_id}` to start over
//! - `GET /api/health`

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use teamreg_core::{ChatReply, RegistrationEngine};
use teamreg_shared::TeamRegError;

type AppState = Arc<RegistrationEngine>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatRequest {
    pub session_id: String,
    #[serde(default)]
    pub message: String,
}

pub(crate) fn router(engine: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat/{session_id}", delete(reset))
        .route("/api/health", get(health))
        .with_state(engine)
}

async fn chat(
    State(engine): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let reply = engine
        .handle_message(&request.session_id, &request.message)
        .await?;
    Ok(Json(reply))
}

async fn reset(
    State(engine): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatReply>, ApiError> {
    Ok(Json(engine.reset(&session_id).await?))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// [`TeamRegError`] as an HTTP response.
#[derive(Debug)]
pub(crate) struct ApiError(TeamRegError);

impl From<TeamRegError> for ApiError {
    fn from(e: TeamRegError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            TeamRegError::Validation { .. } => (StatusCode::BAD_REQUEST, "ValidationError"),
            TeamRegError::NotFound { .. } => (StatusCode::NOT_FOUND, "NotFound"),
            TeamRegError::Conflict { .. } | TeamRegError::StaleWrite { .. } => {
                (StatusCode::CONFLICT, "ConflictError")
            }
            TeamRegError::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "StorageError"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = json!({ "error": error_type, "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use teamreg_core::Services;
    use teamreg_shared::AppConfig;
    use tower::ServiceExt;

    async fn app() -> Router {
        let tmp = std::env::temp_dir().join(format!("tr_server_{}.db", uuid::Uuid::now_v7()));
        let services = Services::open(&AppConfig::default(), Some(&tmp))
            .await
            .expect("open services");
        router(Arc::new(services.engine().expect("engine")))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn chat_request(session: &str, message: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "sessionId": session, "message": message }).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn chat_advances_registration() {
        let app = app().await;
        let response = app
            .clone()
            .oneshot(chat_request("web-1", "our team name is Phoenix"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["state"], "BATCH_SELECTION");
        assert_eq!(body["buttons"], json!(["23", "24"]));
        assert_eq!(body["data"]["teamName"], "Phoenix");
    }

    #[tokio::test]
    async fn reset_returns_welcome() {
        let app = app().await;
        app.clone()
            .oneshot(chat_request("web-1", "Phoenix"))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/chat/web-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["state"], "WELCOME");
    }

    #[tokio::test]
    async fn empty_session_is_bad_request() {
        let response = app().await.oneshot(chat_request("", "Phoenix")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "ValidationError");
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }
}
