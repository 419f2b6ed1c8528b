//! HTTP endpoints exposing the queue's control operations.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::protocol::*;
use crate::error::{self, QueueError};
use crate::job::Job;
use crate::queue::Queue;
use crate::tools::ToolInfo;

/// Shared state for RPC routes.
#[derive(Clone)]
pub struct RpcState {
    pub queue: Arc<Queue>,
}

/// Build the RPC router.
pub fn rpc_routes(queue: Arc<Queue>) -> Router {
    let state = RpcState { queue };

    Router::new()
        .route(ENDPOINT_HEALTH, get(health))
        .route(ENDPOINT_RESOURCE_HARDWARE, post(resource_hardware))
        .route(ENDPOINT_RESOURCE_TOOLS, post(resource_tools))
        .route(ENDPOINT_ADD_TASK, post(add_task))
        .route(ENDPOINT_TASK_STATUS, post(task_status))
        .route(ENDPOINT_TASK_PAUSE, post(task_pause))
        .route(ENDPOINT_TASK_RUN, post(task_run))
        .route(ENDPOINT_TASK_QUIT, post(task_quit))
        .route(ENDPOINT_ALL_TASK_STATUS, post(all_task_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the RPC routes until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, queue: Arc<Queue>, shutdown: F) -> error::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Resource RPC server listening");
    }
    axum::serve(listener, rpc_routes(queue))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueueError::Unauthorized => StatusCode::UNAUTHORIZED,
            QueueError::NoSuchTool { .. } | QueueError::NoSuchTask { .. } => StatusCode::NOT_FOUND,
            QueueError::TaskExists { .. } => StatusCode::CONFLICT,
            QueueError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            QueueError::Factory { .. }
            | QueueError::Start { .. }
            | QueueError::Pause { .. }
            | QueueError::Run { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let job = match &self {
            QueueError::Pause { final_status, .. } => Some(final_status.as_ref().clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
            job,
        };
        (status, Json(body)).into_response()
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "resource-node"
    }))
}

// ── Registry views ──────────────────────────────────────────────────────

async fn resource_hardware(
    State(state): State<RpcState>,
    Json(call): Json<RpcCall>,
) -> Result<Json<BTreeMap<String, bool>>, QueueError> {
    state.queue.resource_hardware(&call.auth).await.map(Json)
}

async fn resource_tools(
    State(state): State<RpcState>,
    Json(call): Json<RpcCall>,
) -> Result<Json<Vec<ToolInfo>>, QueueError> {
    state.queue.resource_tools(&call.auth).await.map(Json)
}

// ── Task lifecycle ──────────────────────────────────────────────────────

async fn add_task(
    State(state): State<RpcState>,
    Json(call): Json<RpcCall>,
) -> Result<Json<Job>, QueueError> {
    state.queue.add_task(&call.auth, call.job).await.map(Json)
}

async fn task_status(
    State(state): State<RpcState>,
    Json(call): Json<RpcCall>,
) -> Result<Json<Job>, QueueError> {
    state.queue.task_status(&call.auth, &call.job.uuid).await.map(Json)
}

async fn task_pause(
    State(state): State<RpcState>,
    Json(call): Json<RpcCall>,
) -> Result<Json<Job>, QueueError> {
    state.queue.task_pause(&call.auth, &call.job.uuid).await.map(Json)
}

async fn task_run(
    State(state): State<RpcState>,
    Json(call): Json<RpcCall>,
) -> Result<Json<Job>, QueueError> {
    state.queue.task_run(&call.auth, &call.job.uuid).await.map(Json)
}

async fn task_quit(
    State(state): State<RpcState>,
    Json(call): Json<RpcCall>,
) -> Result<Json<Job>, QueueError> {
    state.queue.task_quit(&call.auth, &call.job.uuid).await.map(Json)
}

async fn all_task_status(
    State(state): State<RpcState>,
    Json(call): Json<RpcCall>,
) -> Result<Json<Vec<Job>>, QueueError> {
    state.queue.all_task_status(&call.auth).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::tools::ToolRegistry;
    use crate::tools::builtin::SleepTool;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    const TOKEN: &str = "route-token";

    fn app() -> (Router, Uuid) {
        let mut registry = ToolRegistry::new();
        let sleep_id = registry.register(Arc::new(SleepTool::new().with_requirement("gpu")));
        let queue = Arc::new(Queue::new(QueueConfig::new(TOKEN), registry));
        (rpc_routes(queue), sleep_id)
    }

    async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_token_is_401_with_kind() {
        let (app, _) = app();
        let (status, body) = post_json(
            &app,
            ENDPOINT_RESOURCE_HARDWARE,
            serde_json::json!({"auth": "nope"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication");
    }

    #[tokio::test]
    async fn hardware_and_tools_are_served() {
        let (app, sleep_id) = app();
        let (status, hw) = post_json(
            &app,
            ENDPOINT_RESOURCE_HARDWARE,
            serde_json::json!({"auth": TOKEN}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hw, serde_json::json!({"gpu": true}));

        let (status, tools) =
            post_json(&app, ENDPOINT_RESOURCE_TOOLS, serde_json::json!({"auth": TOKEN})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tools[0]["id"], sleep_id.to_string());
        assert_eq!(tools[0]["name"], "sleep");
    }

    #[tokio::test]
    async fn unknown_tool_is_404() {
        let (app, _) = app();
        let (status, body) = post_json(
            &app,
            ENDPOINT_ADD_TASK,
            serde_json::json!({"auth": TOKEN, "job": {"uuid": "j1", "tool_uuid": "unknown"}}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no_such_tool");
    }

    #[tokio::test]
    async fn add_status_quit_over_http() {
        let (app, sleep_id) = app();
        let job = serde_json::json!({
            "uuid": "j1",
            "tool_uuid": sleep_id.to_string(),
            "parameters": {"duration_secs": "60"}
        });

        let (status, added) = post_json(
            &app,
            ENDPOINT_ADD_TASK,
            serde_json::json!({"auth": TOKEN, "job": job}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(added["status"], "running");

        let (status, dup) = post_json(
            &app,
            ENDPOINT_ADD_TASK,
            serde_json::json!({"auth": TOKEN, "job": job}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(dup["error"], "task_exists");

        let bare = serde_json::json!({"auth": TOKEN, "job": {"uuid": "j1"}});
        let (status, quit) = post_json(&app, ENDPOINT_TASK_QUIT, bare.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(quit["status"], "quit");

        let (status, body) = post_json(&app, ENDPOINT_TASK_STATUS, bare).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no_such_task");
    }

    #[tokio::test]
    async fn factory_error_is_422() {
        let (app, sleep_id) = app();
        let (status, body) = post_json(
            &app,
            ENDPOINT_ADD_TASK,
            serde_json::json!({
                "auth": TOKEN,
                "job": {"uuid": "j1", "tool_uuid": sleep_id.to_string()}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "factory");
    }

    #[test]
    fn pause_error_response_carries_final_job() {
        let mut last = Job::reference("j1");
        last.set_status(crate::job::JobStatus::Quit);
        let err = QueueError::Pause {
            id: "j1".into(),
            source: crate::error::TaskError::Unsupported {
                operation: "pause".into(),
            },
            final_status: Box::new(last),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
