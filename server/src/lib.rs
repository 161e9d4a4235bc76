//! HTTP transport for the todo service.
//!
//! # Design
//! Handlers turn JSON requests into `TodoService` calls and map the
//! service's `ErrorKind` onto status codes (see `error`). Each request runs
//! under its own `RequestContext` bounded by the configured timeout; if the
//! client goes away axum drops the handler future, and the storage call with
//! it.

pub mod config;
pub mod error;

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use todo_core::{FieldMask, InMemoryStorage, RequestContext, TodoItem, TodoService, TodoStorage};

pub use config::{Config, ConfigError, StorageBackend};
pub use error::{ApiError, ErrorBody};

pub type Service = TodoService<Arc<dyn TodoStorage>>;

#[derive(Clone)]
pub struct AppState {
    service: Arc<Service>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(storage: Arc<dyn TodoStorage>, request_timeout: Duration) -> Self {
        Self::from_service(TodoService::new(storage), request_timeout)
    }

    pub fn from_service(service: Service, request_timeout: Duration) -> Self {
        Self {
            service: Arc::new(service),
            request_timeout,
        }
    }

    /// Fresh in-memory storage with the default timeout.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStorage::new()),
            Config::default().request_timeout,
        )
    }

    fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub details: String,
}

/// Field values of an update. Which of them apply is decided by
/// `UpdateTodo::update_mask`, not by presence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTodo {
    #[serde(default)]
    pub item: TodoFields,
    #[serde(default)]
    pub update_mask: Vec<String>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `app` on `listener` until `shutdown` resolves, then drain in-flight
/// requests.
pub async fn run<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<TodoItem>>, ApiError> {
    let todos = state.service.list(&state.context()).await?;
    Ok(Json(todos))
}

async fn create_todo(
    State(state): State<AppState>,
    Json(input): Json<CreateTodo>,
) -> Result<(StatusCode, Json<TodoItem>), ApiError> {
    if input.title.trim().is_empty() {
        return Err(ApiError::InvalidRequest("title must not be empty".to_string()));
    }
    let draft = TodoItem::draft(input.title, input.details);
    let todo = state.service.create(&state.context(), draft).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TodoItem>, ApiError> {
    let todo = state.service.fetch(&state.context(), &id).await?;
    Ok(Json(todo))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTodo>,
) -> Result<StatusCode, ApiError> {
    let mask = FieldMask::from_paths(&input.update_mask);
    if mask.contains(todo_core::UpdatableField::Title) && input.item.title.trim().is_empty() {
        return Err(ApiError::InvalidRequest("title must not be empty".to_string()));
    }
    let patch = TodoItem {
        id,
        title: input.item.title,
        details: input.item.details,
    };
    state.service.update(&state.context(), &patch, &mask).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(&state.context(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
