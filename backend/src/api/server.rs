//! HTTP server for the gradeload API.
//!
//! # API Endpoints
//!
//! | Method | Path               | Description                              |
//! |--------|--------------------|------------------------------------------|
//! | GET    | `/`                | Upload form                              |
//! | POST   | `/`, `/api/upload` | Upload spreadsheet + context, run        |
//! | GET    | `/download?file=`  | Download a generated artifact            |
//! | GET    | `/health`          | Health check                             |
//! | GET    | `/api/logs`        | SSE stream for real-time logs            |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Html, IntoResponse, Json, Redirect, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::locks::ArtifactLocks;
use super::logs::{log_error, log_info, log_warning, LOG_BROADCASTER};
use super::storage::{allowed_file, secure_filename, UploadStore};
use super::types::{
    error_response, DownloadQuery, UploadResponse, INVALID_FILE, INVALID_FORMAT, NO_FILE,
};
use crate::config::Settings;
use crate::error::{PipelineError, ServerError};
use crate::models::RunContext;
use crate::parser::{ReadOptions, SheetFormat};
use crate::transform::pipeline::process_bytes;
use crate::writer::check_file_name;

const UPLOAD_FORM: &str = include_str!("../../templates/index.html");

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub uploads: UploadStore,
    pub locks: ArtifactLocks,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            uploads: UploadStore::new(settings.upload_dir.clone()),
            settings: Arc::new(settings),
            locks: ArtifactLocks::new(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(error_response(&msg))).into_response()
            }
            other => {
                log_error(format!("Request failed: {}", other));
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(error_response(INVALID_FORMAT)),
                )
                    .into_response()
            }
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(upload_form).post(upload))
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/download", get(download))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(state.settings.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    settings.ensure_dirs()?;
    let port = settings.port;
    let app = router(AppState::new(settings));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 gradeload server running on http://localhost:{}", port);
    println!("   GET  /              - Upload form");
    println!("   POST /api/upload    - Upload spreadsheet");
    println!("   GET  /download      - Download artifact");
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "gradeload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "download": "GET /download?file=",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Uploaded file plus the four context fields.
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    ctx: RunContext,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ServerError> {
    let bad = |e: axum::extract::multipart::MultipartError| {
        ServerError::BadRequest(format!("Multipart error: {}", e))
    };

    let mut form = UploadForm {
        file: None,
        ctx: RunContext::default(),
    };

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(bad)?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            "campo1" | "propuesta" => form.ctx.propuesta = field.text().await.map_err(bad)?,
            "campo2" | "comision" => form.ctx.comision = field.text().await.map_err(bad)?,
            "campo3" | "actividad" => form.ctx.actividad = field.text().await.map_err(bad)?,
            "campo4" | "periodo_lectivo" => {
                form.ctx.periodo_lectivo = field.text().await.map_err(bad)?
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let form = read_form(multipart).await?;
    let (original_name, bytes) = form
        .file
        .ok_or_else(|| ServerError::BadRequest(NO_FILE.to_string()))?;

    if original_name.is_empty() {
        return Err(ServerError::BadRequest(INVALID_FILE.to_string()));
    }
    if !allowed_file(&original_name) {
        return Err(ServerError::BadRequest(INVALID_FORMAT.to_string()));
    }
    let file_name = secure_filename(&original_name);
    if !allowed_file(&file_name) {
        return Err(ServerError::BadRequest(INVALID_FILE.to_string()));
    }

    let format = SheetFormat::from_path(&file_name).map_err(PipelineError::from)?;

    log_info(format!("📄 New upload: {} ({} bytes)", file_name, bytes.len()));
    state
        .uploads
        .save(&file_name, &bytes)
        .await
        .map_err(|e| ServerError::Internal(format!("Cannot save upload: {}", e)))?;

    // The saved copy can be overwritten by a same-named upload; run on our own bytes.
    let ctx = form.ctx;
    let _guard = state.locks.acquire(&ctx.artifact_key()).await;

    let dest_dir = state.settings.processed_dir.clone();
    let run_ctx = ctx.clone();
    let output = tokio::task::spawn_blocking(move || {
        process_bytes(&bytes, format, &run_ctx, &dest_dir, ReadOptions::default())
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok(Json(UploadResponse::new(file_name, ctx, &output)))
}

async fn download(State(state): State<AppState>, Query(query): Query<DownloadQuery>) -> Response {
    let Some(name) = query.file.filter(|n| !n.is_empty()) else {
        return Redirect::to("/").into_response();
    };

    if check_file_name(&name).is_err() || name.starts_with('.') {
        log_warning(format!("Rejected download name: {}", name));
        return Redirect::to("/").into_response();
    }

    let path = state.settings.processed_dir.join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => {
            log_warning(format!("Archivo no encontrado: {}", name));
            Redirect::to("/").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "gradeload-test-boundary";

    fn test_state() -> (AppState, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let settings = Settings {
            upload_dir: root.path().join("uploads"),
            processed_dir: root.path().join("processed"),
            ..Settings::default()
        };
        settings.ensure_dirs().unwrap();
        (AppState::new(settings), root)
    }

    fn multipart_body(file: Option<(&str, &str)>, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        if let Some((file_name, content)) = file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body.into_bytes()
    }

    fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    const CONTEXT: [(&str, &str); 4] = [
        ("campo1", "ING-SIS"),
        ("campo2", "A1"),
        ("campo3", "ALG1"),
        ("campo4", "2024-1C"),
    ];

    const ACTAS: &str = "Legajo,Nota,Promocion,Apellido,Nombre,DNI,Edicion,Inicio,Facultad\n\
                         1,8.5,2024,Perez,Ana,111,1,2024-03-01,FRBA\n\
                         2,no-rindio,2024,Gomez,Luis,222,1,2024-03-01,FRBA\n";

    #[tokio::test]
    async fn health_returns_ok() {
        let (state, _root) = test_state();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router(state).oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn form_is_served() {
        let (state, _root) = test_state();
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = router(state).oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("campo1"));
        assert!(html.contains("campo4"));
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let (state, _root) = test_state();
        let req = upload_request("/api/upload", multipart_body(None, &CONTEXT));
        let response = router(state).oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], NO_FILE);
    }

    #[tokio::test]
    async fn upload_with_wrong_extension_is_rejected() {
        let (state, _root) = test_state();
        let body = multipart_body(Some(("actas.pdf", "%PDF")), &CONTEXT);
        let response = router(state).oneshot(upload_request("/", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], INVALID_FORMAT);
    }

    #[tokio::test]
    async fn upload_produces_both_artifacts() {
        let (state, root) = test_state();
        let body = multipart_body(Some(("actas final.csv", ACTAS)), &CONTEXT);
        let response = router(state).oneshot(upload_request("/api/upload", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["uploaded_filename"], "actas_final.csv");
        assert_eq!(json["processed_file_alumnos"], "/download?file=Subir_Alumnos_A1_ALG1.csv");
        assert_eq!(json["processed_file_notas"], "/download?file=Subir_Notas_A1_ALG1.csv");
        assert_eq!(json["metadata"]["kept"], 1);
        assert_eq!(json["metadata"]["droppedGrade"], 1);

        let notas = std::fs::read_to_string(root.path().join("processed/Subir_Notas_A1_ALG1.csv"))
            .unwrap();
        assert_eq!(notas, "\"DNI\",\"Nota\",\"CONCAT\"\n\"111\",\"8.5\",\"DNI 111,8.5\"\n");
        assert!(root.path().join("uploads/actas_final.csv").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn same_named_uploads_keep_their_own_rows() {
        let (state, root) = test_state();
        let header = "Legajo,Nota,Promocion,Apellido,Nombre,DNI,Edicion,Inicio,Facultad\n";
        let first = format!("{header}1,8,2024,Perez,Ana,111,1,2024-03-01,FRBA\n");
        let second = format!("{header}2,6,2024,Gomez,Luis,999,1,2024-03-01,FRBA\n");
        let first_ctx = [("campo1", "P"), ("campo2", "A1"), ("campo3", "ALG1"), ("campo4", "X")];
        let second_ctx = [("campo1", "P"), ("campo2", "B2"), ("campo3", "ALG1"), ("campo4", "X")];

        let app = router(state);
        for _ in 0..20 {
            let a = app.clone().oneshot(upload_request(
                "/api/upload",
                multipart_body(Some(("notas.csv", first.as_str())), &first_ctx),
            ));
            let b = app.clone().oneshot(upload_request(
                "/api/upload",
                multipart_body(Some(("notas.csv", second.as_str())), &second_ctx),
            ));
            let (a, b) = tokio::join!(a, b);
            assert_eq!(a.unwrap().status(), StatusCode::OK);
            assert_eq!(b.unwrap().status(), StatusCode::OK);

            let processed = root.path().join("processed");
            let a_notas = std::fs::read_to_string(processed.join("Subir_Notas_A1_ALG1.csv")).unwrap();
            let b_notas = std::fs::read_to_string(processed.join("Subir_Notas_B2_ALG1.csv")).unwrap();
            assert!(a_notas.contains("\"111\"") && !a_notas.contains("\"999\""));
            assert!(b_notas.contains("\"999\"") && !b_notas.contains("\"111\""));
        }
    }

    #[tokio::test]
    async fn malformed_table_maps_to_generic_error() {
        let (state, root) = test_state();
        let body = multipart_body(Some(("actas.csv", "a,b,c\n1,2,3\n")), &CONTEXT);
        let response = router(state).oneshot(upload_request("/api/upload", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({ "error": INVALID_FORMAT }));
        assert_eq!(std::fs::read_dir(root.path().join("processed")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn download_serves_artifact() {
        let (state, root) = test_state();
        std::fs::write(root.path().join("processed/Subir_Notas_A1_ALG1.csv"), "\"DNI\"\n").unwrap();

        let req = Request::builder()
            .uri("/download?file=Subir_Notas_A1_ALG1.csv")
            .body(Body::empty())
            .unwrap();
        let response = router(state).oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"Subir_Notas_A1_ALG1.csv\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"\"DNI\"\n");
    }

    #[tokio::test]
    async fn download_rejects_traversal_and_missing_files() {
        let (state, _root) = test_state();
        for uri in ["/download?file=..%2Fsecret", "/download?file=missing.csv", "/download"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = router(state.clone()).oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        }
    }
}
