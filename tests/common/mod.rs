//! In-process mock of the document-chat backend.
//!
//! Served on an ephemeral port; every knob the tests need lives on [`Mock`].

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{Value, json};

use docchat_client::config::AppConfig;
use docchat_client::{ApiClient, TokenStore, Workspace};

pub const USER: &str = "alice";
pub const PASSWORD: &str = "secret";

/// Backend state and counters.
#[derive(Debug, Default)]
pub struct Mock {
    pub access: Mutex<String>,
    pub refresh: Mutex<String>,
    pub refresh_calls: AtomicUsize,
    pub refresh_fails: AtomicBool,
    pub refresh_delay_ms: AtomicU32,
    /// Pause on data calls so concurrent requests overlap.
    pub data_delay_ms: AtomicU32,
    pub stats_calls: AtomicUsize,
    pub status_polls: AtomicU32,
    /// Status polls before a document reports complete; 0 means never.
    pub ready_after: AtomicU32,
    pub ingestion_fails: AtomicBool,
    /// Status code for `DELETE /documents/{id}`; 0 means 200.
    pub delete_document_status: AtomicU32,
    pub uploads: Mutex<Vec<(String, String, usize)>>,
    pub documents: Mutex<Vec<(i64, String)>>,
    pub conversations: Mutex<HashMap<i64, Value>>,
    pub messages: Mutex<HashMap<i64, Vec<Value>>>,
    next_id: AtomicI64,
    generation: AtomicU32,
}

impl Mock {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Invalidate the current access token, as if it expired.
    pub fn expire_access(&self) {
        *self.access.lock().unwrap() = "expired".to_string();
    }

    pub fn add_document(&self, filename: &str) -> i64 {
        let id = self.next_id();
        self.documents.lock().unwrap().push((id, filename.to_string()));
        id
    }

    pub fn add_conversation(&self, document_id: i64, title: &str) -> i64 {
        let id = self.next_id();
        self.conversations.lock().unwrap().insert(
            id,
            json!({"id": id, "document_id": document_id, "title": title, "user_id": 1}),
        );
        id
    }

    fn issue_tokens(&self) -> Value {
        let n = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("access-{n}");
        let refresh = format!("refresh-{n}");
        *self.access.lock().unwrap() = access.clone();
        *self.refresh.lock().unwrap() = refresh.clone();
        json!({"access_token": access, "refresh_token": refresh, "token_type": "bearer"})
    }
}

/// A running mock server.
#[derive(Debug)]
pub struct Backend {
    pub state: Arc<Mock>,
    pub base_url: String,
}

impl Backend {
    pub async fn start() -> Self {
        let state = Arc::new(Mock::default());
        state.ready_after.store(1, Ordering::SeqCst);

        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/me", get(me))
            .route("/auth/refresh", post(refresh))
            .route("/auth/change_password", post(change_password))
            .route("/documents/upload", post(upload))
            .route("/documents/my_files", get(my_files))
            .route("/documents/{id}/status", get(document_status))
            .route("/documents/{id}", axum::routing::delete(delete_document))
            .route("/conversations/", get(list_conversations).post(create_conversation))
            .route(
                "/conversations/{id}",
                get(get_conversation)
                    .delete(delete_conversation)
                    .patch(rename_conversation),
            )
            .route(
                "/conversations/{id}/messages",
                get(list_messages).post(add_message),
            )
            .route("/nlp/ask", post(ask))
            .route("/nlp/summary/{id}", post(summary))
            .route("/analytics/user-stats", get(user_stats))
            .route("/analytics/latest-conversation", get(latest_conversation))
            .route("/analytics/recommended-documents", get(recommended))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: format!("http://{addr}"),
        }
    }

    pub fn config(&self) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.api.base_url = self.base_url.clone();
        cfg.api.request_timeout_secs = 5;
        cfg.ingestion.poll_interval_ms = 10;
        cfg.ingestion.max_attempts = 5;
        cfg
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::from_config(&self.config(), TokenStore::new()).unwrap()
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::from_config(self.config()).unwrap()
    }
}

type Shared = State<Arc<Mock>>;

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"detail": message}))).into_response()
}

async fn authorize(state: &Mock, headers: &HeaderMap) -> Result<(), Response> {
    let delay = state.data_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
    }
    let expected = format!("Bearer {}", state.access.lock().unwrap());
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented == expected {
        Ok(())
    } else {
        Err(detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
    }
}

macro_rules! authorized {
    ($state:expr, $headers:expr) => {
        if let Err(resp) = authorize(&$state, &$headers).await {
            return resp;
        }
    };
}

async fn login(State(state): Shared, Form(form): Form<HashMap<String, String>>) -> Response {
    if form.get("username").map(String::as_str) == Some(USER)
        && form.get("password").map(String::as_str) == Some(PASSWORD)
    {
        Json(state.issue_tokens()).into_response()
    } else {
        detail(StatusCode::UNAUTHORIZED, "Incorrect username or password")
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == USER {
        return detail(StatusCode::BAD_REQUEST, "Username already registered");
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "username": body["username"],
            "email": body["email"],
            "full_name": body["full_name"],
            "disabled": false
        })),
    )
        .into_response()
}

async fn me(State(state): Shared, headers: HeaderMap) -> Response {
    authorized!(state, headers);
    Json(json!({
        "username": USER,
        "email": "alice@example.com",
        "full_name": "Alice Doe",
        "disabled": false
    }))
    .into_response()
}

async fn refresh(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
    }
    let current = state.refresh.lock().unwrap().clone();
    if state.refresh_fails.load(Ordering::SeqCst) || body["refresh_token"] != current.as_str() {
        return detail(StatusCode::BAD_REQUEST, "Invalid refresh token");
    }
    Json(state.issue_tokens()).into_response()
}

async fn change_password(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    authorized!(state, headers);
    if body["old_password"] != PASSWORD {
        return detail(StatusCode::BAD_REQUEST, "Incorrect password");
    }
    Json(json!({"message": "Password updated successfully"})).into_response()
}

async fn upload(State(state): Shared, headers: HeaderMap, mut multipart: Multipart) -> Response {
    authorized!(state, headers);
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let mime = field.content_type().unwrap_or_default().to_string();
        let Ok(bytes) = field.bytes().await else {
            return detail(StatusCode::BAD_REQUEST, "Broken upload");
        };
        state
            .uploads
            .lock()
            .unwrap()
            .push((filename.clone(), mime, bytes.len()));
        let id = state.add_document(&filename);
        return Json(json!({"id": id, "filename": filename, "message": "File uploaded"}))
            .into_response();
    }
    detail(StatusCode::UNPROCESSABLE_ENTITY, "file field required")
}

async fn my_files(State(state): Shared, headers: HeaderMap) -> Response {
    authorized!(state, headers);
    let docs: Vec<Value> = state
        .documents
        .lock()
        .unwrap()
        .iter()
        .map(|(id, name)| json!({"id": id, "filename": name}))
        .collect();
    Json(docs).into_response()
}

async fn document_status(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    authorized!(state, headers);
    let filename = state
        .documents
        .lock()
        .unwrap()
        .iter()
        .find(|(doc, _)| *doc == id)
        .map(|(_, name)| name.clone());
    let Some(filename) = filename else {
        return detail(StatusCode::NOT_FOUND, "Document not found");
    };
    let polls = state.status_polls.fetch_add(1, Ordering::SeqCst) + 1;
    let ready_after = state.ready_after.load(Ordering::SeqCst);
    let (complete, status) = if state.ingestion_fails.load(Ordering::SeqCst) {
        (false, "failed")
    } else if ready_after > 0 && polls >= ready_after {
        (true, "completed")
    } else {
        (false, "processing")
    };
    Json(json!({"id": id, "filename": filename, "processingComplete": complete, "status": status}))
        .into_response()
}

async fn delete_document(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    authorized!(state, headers);
    state.documents.lock().unwrap().retain(|(doc, _)| *doc != id);
    state
        .conversations
        .lock()
        .unwrap()
        .retain(|_, conv| conv["document_id"] != id);
    match state.delete_document_status.load(Ordering::SeqCst) {
        0 => Json(json!({"message": "Document deleted"})).into_response(),
        code => detail(
            StatusCode::from_u16(u16::try_from(code).unwrap()).unwrap(),
            "Vector index not found",
        ),
    }
}

async fn list_conversations(State(state): Shared, headers: HeaderMap) -> Response {
    authorized!(state, headers);
    let mut all: Vec<Value> = state.conversations.lock().unwrap().values().cloned().collect();
    all.sort_by_key(|c| c["id"].as_i64());
    Json(all).into_response()
}

async fn create_conversation(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    authorized!(state, headers);
    let document_id = body["document_id"].as_i64().unwrap_or_default();
    let title = body["title"].as_str().unwrap_or("New conversation");
    let id = state.add_conversation(document_id, title);
    let conv = state.conversations.lock().unwrap()[&id].clone();
    Json(conv).into_response()
}

async fn get_conversation(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    authorized!(state, headers);
    match state.conversations.lock().unwrap().get(&id) {
        Some(conv) => Json(conv.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Conversation not found"),
    }
}

async fn delete_conversation(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    authorized!(state, headers);
    match state.conversations.lock().unwrap().remove(&id) {
        Some(_) => Json(json!({"message": "Conversation deleted"})).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Conversation not found"),
    }
}

async fn rename_conversation(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    authorized!(state, headers);
    let mut conversations = state.conversations.lock().unwrap();
    let Some(conv) = conversations.get_mut(&id) else {
        return detail(StatusCode::NOT_FOUND, "Conversation not found");
    };
    conv["title"] = body["title"].clone();
    Json(conv.clone()).into_response()
}

async fn list_messages(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    authorized!(state, headers);
    if !state.conversations.lock().unwrap().contains_key(&id) {
        return detail(StatusCode::NOT_FOUND, "Conversation not found");
    }
    let messages = state.messages.lock().unwrap().get(&id).cloned().unwrap_or_default();
    Json(messages).into_response()
}

async fn add_message(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    authorized!(state, headers);
    let message = json!({
        "id": state.next_id(),
        "conversation_id": id,
        "role": body["role"],
        "content": body["content"],
        "timestamp": "2026-01-01T00:00:00"
    });
    state
        .messages
        .lock()
        .unwrap()
        .entry(id)
        .or_default()
        .push(message.clone());
    Json(message).into_response()
}

async fn ask(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    authorized!(state, headers);
    let question = body["question"].as_str().unwrap_or_default();
    Json(json!({
        "answer": format!("You asked: {question}"),
        "sources": [{"chunk_id": 1, "file_id": body["file_id"], "content_preview": "..."}],
        "total_chunks_used": 1
    }))
    .into_response()
}

async fn summary(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    authorized!(state, headers);
    Json(json!({
        "document_id": id,
        "document_title": "report.pdf",
        "summary": "A short report.",
        "metrics": {"chunk_count": 4, "processing_time_seconds": 0.5, "cached": false}
    }))
    .into_response()
}

async fn user_stats(State(state): Shared, headers: HeaderMap) -> Response {
    authorized!(state, headers);
    state.stats_calls.fetch_add(1, Ordering::SeqCst);
    let documents = state.documents.lock().unwrap().len();
    let conversations = state.conversations.lock().unwrap().len();
    Json(json!({
        "documents_count": documents,
        "conversations_count": conversations,
        "questions_count": 0,
        "document_usage": []
    }))
    .into_response()
}

async fn latest_conversation(State(state): Shared, headers: HeaderMap) -> Response {
    authorized!(state, headers);
    Json(Value::Null).into_response()
}

async fn recommended(State(state): Shared, headers: HeaderMap) -> Response {
    authorized!(state, headers);
    Json(json!([])).into_response()
}
