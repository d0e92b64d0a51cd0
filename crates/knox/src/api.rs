use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/documents", post(enqueue_document))
        .route("/health", get(|| async { "ok" }))
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub id: String,
}

async fn enqueue_document(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<QueuedResponse>), (StatusCode, String)> {
    if !payload.is_object() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Payload must be a JSON object".to_string(),
        ));
    }

    let id = state.queue.enqueue(&payload).await.map_err(|e| {
        tracing::error!("Failed to queue document: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    tracing::info!(id = %id, "Accepted document");
    Ok((StatusCode::ACCEPTED, Json(QueuedResponse { id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use knox_core::QueueDirectory;
    use tower::ServiceExt;

    async fn app(queue_dir: &std::path::Path) -> (Router, QueueDirectory) {
        let queue = QueueDirectory::new(queue_dir);
        queue.ensure_exists().await.unwrap();
        let app = router().with_state(AppState::new(queue.clone()));
        (app, queue)
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/documents")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _queue) = app(dir.path()).await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_document_is_queued() {
        let dir = tempfile::tempdir().unwrap();
        let (app, queue) = app(dir.path()).await;

        let response = app
            .oneshot(post_json(r#"{"type": "Publication", "content": {}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();

        let item = queue.next().await.unwrap().unwrap();
        assert_eq!(json["id"], item.id.as_str());
        assert_eq!(queue.read(&item).await.unwrap()["type"], "Publication");
    }

    #[tokio::test]
    async fn test_non_object_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (app, queue) = app(dir.path()).await;

        let response = app.oneshot(post_json("[1, 2, 3]")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(queue.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _queue) = app(dir.path()).await;

        let response = app.oneshot(post_json("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_queue_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let queue = QueueDirectory::new(dir.path().join("missing"));
        let app = router().with_state(AppState::new(queue));

        let response = app.oneshot(post_json(r#"{"type": "Publication"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
