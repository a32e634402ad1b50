//! In-process upload endpoint for tests.

use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use super::UPLOAD_PATH;

/// Canned reply for every upload.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Json(u16, Value),
    Text(u16, &'static str),
}

impl Reply {
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Reply::Json(status, body)
    }

    pub(crate) fn text(status: u16, body: &'static str) -> Self {
        Reply::Text(status, body)
    }
}

/// One multipart field as the server saw it.
#[derive(Debug, Clone)]
pub(crate) struct ReceivedField {
    pub field_name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone)]
struct ServerState {
    reply: Reply,
    received: Arc<Mutex<Vec<ReceivedField>>>,
}

pub(crate) struct TestServer {
    pub base_url: String,
    received: Arc<Mutex<Vec<ReceivedField>>>,
}

impl TestServer {
    pub(crate) fn received(&self) -> Vec<ReceivedField> {
        self.received.lock().unwrap().clone()
    }
}

/// Serves `UPLOAD_PATH` on an ephemeral localhost port.
pub(crate) async fn spawn(reply: Reply) -> TestServer {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = ServerState {
        reply,
        received: Arc::clone(&received),
    };
    let app = Router::new()
        .route(UPLOAD_PATH, post(handle_upload))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        received,
    }
}

async fn handle_upload(State(state): State<ServerState>, mut multipart: Multipart) -> Response {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let field_name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        state.received.lock().unwrap().push(ReceivedField {
            field_name,
            file_name,
            content_type,
            data,
        });
    }

    match state.reply {
        Reply::Json(status, body) => (status_code(status), Json(body)).into_response(),
        Reply::Text(status, body) => (status_code(status), body).into_response(),
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap()
}
