//! Mock similarity service over HTTP
//!
//! Serves `/api/find-similar` and `/api/audio` on an ephemeral local port and
//! records what it received.

use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Canned responses
#[derive(Debug, Clone)]
pub struct MockServerConfig {
    pub find_status: StatusCode,
    /// Raw body returned by `/api/find-similar`
    pub find_body: String,
    pub audio: HashMap<String, Vec<u8>>,
}

impl MockServerConfig {
    pub fn with_matches(matches: Value) -> Self {
        Self {
            find_status: StatusCode::OK,
            find_body: json!({ "similar_files": matches }).to_string(),
            audio: HashMap::new(),
        }
    }

    pub fn with_raw_response(status: StatusCode, body: &str) -> Self {
        Self {
            find_status: status,
            find_body: body.to_string(),
            audio: HashMap::new(),
        }
    }

    pub fn audio(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.audio.insert(path.to_string(), bytes);
        self
    }
}

/// One multipart field as received
#[derive(Debug, Clone)]
pub struct ReceivedField {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

struct MockState {
    config: MockServerConfig,
    find_calls: AtomicUsize,
    audio_requests: Mutex<Vec<Value>>,
    uploads: Mutex<Vec<ReceivedField>>,
}

pub struct MockServer {
    pub base_url: String,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(config: MockServerConfig) -> Self {
        let state = Arc::new(MockState {
            config,
            find_calls: AtomicUsize::new(0),
            audio_requests: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/find-similar", post(find_similar))
            .route("/api/audio", post(audio))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn find_calls(&self) -> usize {
        self.state.find_calls.load(Ordering::SeqCst)
    }

    pub fn audio_requests(&self) -> Vec<Value> {
        self.state.audio_requests.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<ReceivedField> {
        self.state.uploads.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn find_similar(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    state.find_calls.fetch_add(1, Ordering::SeqCst);

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        state.uploads.lock().unwrap().push(ReceivedField {
            name,
            file_name,
            content_type,
            bytes,
        });
    }

    (
        state.config.find_status,
        [(header::CONTENT_TYPE, "application/json")],
        state.config.find_body.clone(),
    )
        .into_response()
}

async fn audio(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.audio_requests.lock().unwrap().push(body.clone());

    let bytes = body
        .get("filename")
        .and_then(Value::as_str)
        .and_then(|name| state.config.audio.get(name).cloned());

    match bytes {
        Some(bytes) => ([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "File not found" })),
        )
            .into_response(),
    }
}
