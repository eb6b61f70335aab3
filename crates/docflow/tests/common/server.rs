//! In-process HTTP job service for exercising the HTTP client.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Upload as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub uploader: Option<String>,
}

#[derive(Default)]
pub struct ServerState {
    /// Status of job `abc123`.
    pub status: String,
    pub uploads: Vec<ReceivedUpload>,
    pub approvals: Vec<Value>,
    /// Held before answering an upload.
    pub upload_delay: Option<Duration>,
}

type Shared = Arc<Mutex<ServerState>>;

/// Serves the job service routes on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl TestServer {
    pub async fn start(status: &str) -> Self {
        let state: Shared = Arc::new(Mutex::new(ServerState {
            status: status.to_string(),
            ..ServerState::default()
        }));

        let app = Router::new()
            .route("/health", get(health))
            .route("/jobs/", get(list_jobs).post(create_job))
            .route("/jobs/{id}", get(get_job))
            .route("/preview/{id}", get(get_preview))
            .route("/approval/{id}", post(approve))
            .route("/models/history", get(model_history))
            .route("/master-data/", get(master_data))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state.lock().expect("server state").uploads.clone()
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        self.state.lock().expect("server state").upload_delay = Some(delay);
    }

    pub fn approvals(&self) -> Vec<Value> {
        self.state.lock().expect("server state").approvals.clone()
    }
}

fn not_found(detail: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
}

fn job_json(status: &str) -> Value {
    json!({
        "job_id": "abc123",
        "status": status,
        "filename": "invoice.pdf",
        "created_at": "2024-05-01T08:00:00Z",
        "updated_at": "2024-05-01T08:03:00Z",
        "error": null,
        "ocr_conf_mean": 0.88,
        "metadata": { "uploader": "ana" },
        "preview_ready": status == "completed",
        "csv_ready": status == "completed",
        "approved_at": null
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_jobs(State(state): State<Shared>) -> Json<Value> {
    let status = state.lock().expect("server state").status.clone();
    let job = job_json(&status);
    Json(json!({
        "jobs": [{
            "job_id": job["job_id"],
            "status": job["status"],
            "filename": job["filename"],
            "created_at": job["created_at"],
            "updated_at": job["updated_at"],
            "error": null,
            "ocr_conf_mean": job["ocr_conf_mean"]
        }]
    }))
}

async fn create_job(State(state): State<Shared>, mut multipart: Multipart) -> Response {
    let mut upload: Option<ReceivedUpload> = None;
    let mut uploader: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                upload = Some(ReceivedUpload {
                    filename,
                    content_type,
                    bytes,
                    uploader: None,
                });
            }
            Some("uploader") => {
                uploader = field.text().await.ok();
            }
            _ => {}
        }
    }

    let Some(mut upload) = upload else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "loc": ["body", "file"], "msg": "field required" }] })),
        )
            .into_response();
    };

    if upload.filename.ends_with(".exe") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "Unsupported file type" })),
        )
            .into_response();
    }

    let delay = state.lock().expect("server state").upload_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    upload.uploader = uploader;
    let mut guard = state.lock().expect("server state");
    guard.uploads.push(upload);
    guard.status = "queued".to_string();
    Json(job_json("queued")).into_response()
}

async fn get_job(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    if id != "abc123" {
        return not_found("Job not found");
    }
    let status = state.lock().expect("server state").status.clone();
    Json(job_json(&status)).into_response()
}

async fn get_preview(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let status = state.lock().expect("server state").status.clone();
    if id != "abc123" || (status != "completed" && status != "approved") {
        return not_found("Preview not available");
    }
    Json(json!({
        "job_id": "abc123",
        "headers": ["Nome", "CPF"],
        "rows": [{
            "columns": ["Ana", "111.222.333-44"],
            "validations": [{ "field": "CPF", "status": "warning", "message": "checksum inválido" }]
        }],
        "total_rows": 40,
        "metadata": { "source": "page-1" }
    }))
    .into_response()
}

async fn approve(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if id != "abc123" {
        return not_found("Job not found");
    }

    let mut guard = state.lock().expect("server state");
    guard.approvals.push(body.clone());
    if guard.status != "completed" {
        let detail = format!("Job is {}", guard.status);
        return (StatusCode::CONFLICT, Json(json!({ "detail": detail }))).into_response();
    }

    guard.status = "approved".to_string();
    Json(json!({
        "job_id": "abc123",
        "approved": true,
        "approved_at": "2024-05-01T09:00:00",
        "notes": body["notes"]
    }))
    .into_response()
}

async fn model_history() -> Json<Value> {
    Json(json!({
        "items": [
            { "model_name": "layout", "version": "1", "created_at": "2024-04-01", "status": "archived", "metrics": { "f1": 0.81 } },
            { "model_name": "layout", "version": "2", "created_at": "2024-04-20", "status": "promoted", "metrics": { "f1": 0.86 } }
        ]
    }))
}

async fn master_data() -> Json<Value> {
    Json(json!({
        "records": [
            { "sigla": "SP", "descricao": "São Paulo", "codigo": "35", "metadata": {} }
        ]
    }))
}
