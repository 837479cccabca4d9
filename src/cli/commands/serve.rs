//! HTTP server: JSON-RPC over `POST /mcp` plus the file download side-channel.

use super::build_handler;
use crate::cli::Output;
use crate::config::Settings;
use crate::files::FileStore;
use crate::mcp::{CallContext, McpServer};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    server: McpServer,
    files: Arc<FileStore>,
    public_url: Option<String>,
}

impl AppState {
    /// Base URL for download links: configured public URL, else the Host header.
    fn base_url(&self, headers: &HeaderMap) -> Option<String> {
        if let Some(url) = &self.public_url {
            return Some(url.trim_end_matches('/').to_string());
        }
        headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(|host| format!("http://{}", host))
    }
}

/// Run the HTTP server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let files = Arc::new(FileStore::from_settings(&settings.server));
    let handler = build_handler(&settings)?.with_file_store(Arc::clone(&files));
    let tool_count = handler.registry().len();

    let state = Arc::new(AppState {
        server: McpServer::new(handler, &settings.mcp.protocol_version),
        files,
        public_url: settings.server.public_url.clone(),
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Toolgate HTTP Server");
    println!();
    Output::success(&format!("Listening on http://{} ({} tools)", addr, tool_count));
    println!();
    println!("Endpoints:");
    Output::kv("JSON-RPC", "POST /mcp");
    Output::kv("Health", "GET  /health");
    Output::kv("Downloads", "GET  /api/files/download/:token");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/mcp", post(mcp))
        .route("/api/files/download/{token}", get(download))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn mcp(State(state): State<Arc<AppState>>, headers: HeaderMap, body: String) -> Response {
    let context = CallContext {
        base_url: state.base_url(&headers),
    };

    match state.server.handle_line(&body, &context).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn download(State(state): State<Arc<AppState>>, Path(token): Path<String>) -> Response {
    let Some(artifact) = state.files.take(&token) else {
        return not_found();
    };

    let file = match tokio::fs::File::open(&artifact.path).await {
        Ok(file) => file,
        Err(e) => {
            warn!("Download {} failed: {}", artifact.path.display(), e);
            return not_found();
        }
    };

    info!("Serving {} ({})", artifact.filename, artifact.mime_type);
    // The open handle keeps the contents readable after the path is removed.
    state.files.schedule_removal(artifact.path.clone());

    let disposition = format!("attachment; filename=\"{}\"", header_safe(&artifact.filename));
    (
        [
            (header::CONTENT_TYPE, artifact.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "File not found or link expired" })),
    )
        .into_response()
}

/// Printable ASCII only, without quotes, so the filename fits a header value.
fn header_safe(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"') || c == ' ' { c } else { '_' })
        .collect()
}
