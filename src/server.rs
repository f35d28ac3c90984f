use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::PreprocessError;
use crate::pipeline::{Pipeline, PreprocessResult};
use crate::storage::{self, UploadStore};

pub const UPLOAD_FIELD: &str = "file";

const PROCESSING_FAILED: &str = "An error occurred while processing the file. Please refresh \
the page and try again. If softvend is STRATASPHERE, they do not need pre processing";

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: UploadStore,
    pub keep_processed: usize,
}

impl AppState {
    pub fn new(store: UploadStore, keep_processed: usize) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new()),
            store,
            keep_processed,
        }
    }
}

/// Failures surfaced to upload clients as `{"error": ...}` bodies
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No file part in the request")]
    NoFilePart,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file type. Only CSV files are allowed.")]
    InvalidFileType,

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("{}", PROCESSING_FAILED)]
    Processing,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NoFilePart | ApiError::NoFileSelected | ApiError::InvalidFileType => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Multipart(e) => e.status(),
            ApiError::Processing => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// A cleaned export ready to send back
#[derive(Debug)]
pub struct ProcessedUpload {
    pub file_name: String,
    pub contents: Vec<u8>,
    pub result: PreprocessResult,
}

/// Save, process and clean up after one upload. Runs on a blocking thread.
///
/// The response is built from the in-memory result, so concurrent uploads
/// never read each other's processed files.
pub fn process_upload(
    state: &AppState,
    file_name: &str,
    bytes: &[u8],
) -> Result<ProcessedUpload, PreprocessError> {
    let saved = state.store.save_upload(file_name, bytes)?;

    let outcome = state.pipeline.preprocess_bytes(bytes);
    // The raw upload is never kept, whether or not processing worked
    state.store.remove(&saved);
    let (contents, result) = outcome?;

    state.store.write_processed(file_name, &contents)?;
    if let Err(e) = state.store.clean_up_processed(state.keep_processed) {
        warn!("Failed to clean up processed files: {}", e);
    }

    Ok(ProcessedUpload {
        file_name: storage::processed_file_name(file_name),
        contents,
        result,
    })
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "pm-preprocessor",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Accept a CSV export and return its cleaned copy as an attachment
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) = upload.ok_or(ApiError::NoFilePart)?;
    if file_name.is_empty() {
        return Err(ApiError::NoFileSelected);
    }
    if !storage::is_allowed_file(&file_name) {
        return Err(ApiError::InvalidFileType);
    }

    info!(file = %file_name, bytes = bytes.len(), "📥 Received upload");

    let task_state = state.clone();
    let task_name = file_name.clone();
    let processed =
        tokio::task::spawn_blocking(move || process_upload(&task_state, &task_name, &bytes))
            .await
            .map_err(|e| {
                error!(file = %file_name, "Upload task failed: {}", e);
                ApiError::Processing
            })?
            .map_err(|e| {
                error!(file = %file_name, "Error processing file: {}", e);
                ApiError::Processing
            })?;

    info!(
        file = %file_name,
        vendor = %processed.result.vendor,
        rows = processed.result.rows,
        "📤 Sending processed file {}",
        processed.file_name
    );

    let disposition = format!("attachment; filename=\"{}\"", processed.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        processed.contents,
    )
        .into_response())
}

/// Create the HTTP router with the API routes and the static front-end
pub fn create_server(state: AppState, static_dir: PathBuf, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        // Everything else is the front-end build
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: &AppConfig) -> anyhow::Result<()> {
    let store = UploadStore::new(&config.storage.upload_dir)?;
    let state = AppState::new(store, config.storage.keep_processed);
    let app = create_server(
        state,
        config.storage.static_dir.clone(),
        config.server.max_upload_bytes,
    );

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;

    info!("🚀 HTTP server running on http://{addr}");
    info!("💚 Health check: http://{addr}/health");
    info!("📄 Upload endpoint: http://{addr}/api/upload");

    axum::serve(listener, app).await?;

    Ok(())
}
