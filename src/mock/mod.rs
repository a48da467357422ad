//! Mock intranet server for local testing.
//!
//! # Endpoints
//!
//! - `GET /` and `GET /index.html` - project page with the tag list injected
//! - `POST /add-tag` - append a synthetic tag (`{name?, percent?, status?, date?}`)
//! - `GET /tags` - list the synthetic tags as JSON
//! - `POST /reset` - remove every tag

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{Result, TagwatchError};

pub mod page;

pub use page::MockTag;

/// Body of `POST /add-tag`; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct AddTagRequest {
    pub name: Option<String>,
    pub percent: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Default)]
struct MockInner {
    tags: Vec<MockTag>,
    counter: u64,
}

/// Shared server state
#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<Mutex<MockInner>>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag, filling defaults
    pub async fn add(&self, request: AddTagRequest) -> (MockTag, usize) {
        let mut inner = self.inner.lock().await;
        inner.counter += 1;
        let tag = MockTag {
            name: request
                .name
                .unwrap_or_else(|| format!("apping-hello_world-v{}", inner.counter)),
            percent: request.percent.unwrap_or_else(|| "100".to_string()),
            status: request.status.unwrap_or_else(|| "SUCCEEDED".to_string()),
            date: request.date.unwrap_or_else(default_date),
        };
        inner.tags.push(tag.clone());
        (tag, inner.tags.len())
    }

    pub async fn tags(&self) -> Vec<MockTag> {
        self.inner.lock().await.tags.clone()
    }

    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.tags.clear();
        inner.counter = 0;
    }
}

fn default_date() -> String {
    chrono::Local::now().format("%B %-d - %Y %H:%M").to_string()
}

async fn add_tag_handler(State(state): State<MockState>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        AddTagRequest::default()
    } else {
        match serde_json::from_slice::<AddTagRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, format!("invalid tag: {}", e)).into_response();
            }
        }
    };

    let (tag, total) = state.add(request).await;
    tracing::info!(name = %tag.name, status = %tag.status, percent = %tag.percent, "tag added");
    Json(serde_json::json!({ "ok": true, "tag": tag, "total": total })).into_response()
}

async fn list_tags_handler(State(state): State<MockState>) -> Json<Vec<MockTag>> {
    Json(state.tags().await)
}

async fn reset_handler(State(state): State<MockState>) -> Json<serde_json::Value> {
    state.reset().await;
    tracing::info!("tags reset");
    Json(serde_json::json!({ "ok": true }))
}

async fn index_handler(State(state): State<MockState>) -> impl IntoResponse {
    let html = page::inject_tags(page::INDEX_TEMPLATE, &state.tags().await);
    ([(header::CACHE_CONTROL, "no-store")], Html(html))
}

async fn favicon_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/add-tag", post(add_tag_handler))
        .route("/tags", get(list_tags_handler))
        .route("/reset", post(reset_handler))
        .route("/favicon.ico", get(favicon_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Serve on an already bound listener until the task is dropped
pub async fn serve_on(listener: tokio::net::TcpListener, state: MockState) -> Result<()> {
    axum::serve(listener, router(state))
        .await
        .map_err(|e| TagwatchError::ServerError(e.to_string()))
}

/// Bind `addr` and serve forever on a fresh runtime
pub fn run(addr: SocketAddr) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| TagwatchError::ServerError(format!("cannot bind {}: {}", addr, e)))?;
        tracing::info!("mock intra listening on http://{}", addr);
        serve_on(listener, MockState::new()).await
    })
}
