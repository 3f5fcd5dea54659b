//! reqlog-server - HTTP capture service for reqlog

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use reqlog_axum::{capture_middleware, CaptureState, PathFilter};
use reqlog_core::defaults;
use reqlog_db::Database;
use reqlog_pipeline::{BatchWriter, LogQueue, WriterConfig};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// correlating captured records with server logs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

#[derive(Clone)]
struct AppState {
    db: Database,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "reqlog_server=debug,reqlog_pipeline=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "reqlog_server=debug,reqlog_pipeline=debug,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("reqlog-server.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/reqlog".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| defaults::SERVER_PORT.to_string())
        .parse()
        .unwrap_or(defaults::SERVER_PORT);

    // Capture configuration
    // SERVICE_NAME: recorded on every captured request (default: empty)
    // REQLOG_QUEUE_CAPACITY: ingestion queue bound (default: 10000)
    // REQLOG_PATH_FILTER: comma-separated paths to skip, "/prefix/*" allowed
    //                     (default: "/health")
    // REQLOG_FILE_FIELD: multipart field name holding the upload (default: "file")
    let service_name = std::env::var("SERVICE_NAME").unwrap_or_default();
    let queue_capacity: usize = std::env::var("REQLOG_QUEUE_CAPACITY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::QUEUE_CAPACITY);
    let path_filter = std::env::var("REQLOG_PATH_FILTER")
        .map(|csv| PathFilter::from_csv(&csv))
        .unwrap_or_else(|_| PathFilter::new(["/health"]));
    let file_field = std::env::var("REQLOG_FILE_FIELD")
        .unwrap_or_else(|_| defaults::FILE_FIELD_NAME.to_string());
    let writer_config = WriterConfig::from_env();

    info!(
        service_name = %service_name,
        queue_capacity = queue_capacity,
        batch_max = writer_config.batch_max,
        flush_interval_ms = writer_config.flush_interval_ms,
        "Capture pipeline configured"
    );

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Assemble the capture pipeline: bounded queue feeding the batch writer
    let (submitter, receiver) = LogQueue::bounded(queue_capacity);
    let writer_handle =
        BatchWriter::new(Arc::new(db.request_logs.clone()), writer_config).start(receiver);

    let capture_state = CaptureState::new(submitter)
        .with_service_name(service_name)
        .with_filter(path_filter)
        .with_file_field(file_field);

    let state = AppState { db };

    let app = Router::new()
        .route("/health", get(health_check))
        // Demo traffic endpoints
        .route("/api/v1/echo", post(echo))
        .route("/api/v1/upload", post(upload))
        // Captured record read-back
        .route("/api/v1/request-logs", get(list_request_logs))
        .route("/api/v1/request-logs/:request_id", get(get_request_log))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            capture_state,
            capture_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        // The 2 MB extractor default sits far below the 100 MiB capture
        // ceiling; the body limit layer below is the real cap.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024 * 1024)) // 2 GB
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // In-flight requests are done; flush whatever the queue still holds.
    info!("Draining capture pipeline...");
    writer_handle.shutdown().await?;
    info!("Capture pipeline drained");

    Ok(())
}

/// Resolve when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing in-flight requests");
}

// =============================================================================
// DEMO HANDLERS
// =============================================================================

/// Service health probe. Skipped by the default path filter.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Echo a JSON body back.
///
/// The capture middleware buffers and restores the body before this handler
/// runs; a successful echo proves downstream extractors see the request
/// intact.
async fn echo(Json(body): Json<serde_json::Value>) -> impl IntoResponse {
    Json(body)
}

/// Accept a multipart upload and report what arrived.
async fn upload(mut multipart: Multipart) -> Result<impl IntoResponse, ApiError> {
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;
        parts.push(serde_json::json!({
            "field": field_name,
            "file_name": file_name,
            "size_bytes": bytes.len(),
        }));
    }

    Ok(Json(serde_json::json!({ "received": parts })))
}

// =============================================================================
// READ-BACK HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListRequestLogsQuery {
    /// Maximum records to return (default: 50, capped at 500)
    limit: Option<i64>,
    /// Restrict the listing to one request path (exact match)
    path: Option<String>,
}

/// Most recently captured records, newest first.
async fn list_request_logs(
    State(state): State<AppState>,
    Query(query): Query<ListRequestLogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let records = state
        .db
        .request_logs
        .list_recent(limit, query.path.as_deref())
        .await?;
    let total = state.db.request_logs.count().await?;

    Ok(Json(serde_json::json!({
        "total": total,
        "count": records.len(),
        "records": records,
    })))
}

/// All captured records carrying the given correlation id.
///
/// Returns an array: retries and proxy replays can legitimately produce
/// several records with the same id.
async fn get_request_log(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .db
        .request_logs
        .find_by_request_id(&request_id)
        .await?;

    if records.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No request log for request_id {}",
            request_id
        )));
    }

    Ok(Json(serde_json::json!({
        "request_id": request_id,
        "records": records,
    })))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Database(reqlog_core::Error),
    NotFound(String),
    BadRequest(String),
}

impl From<reqlog_core::Error> for ApiError {
    fn from(err: reqlog_core::Error) -> Self {
        ApiError::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_request_id_is_uuid_v7() {
        let mut maker = MakeRequestUuidV7;
        let req = axum::http::Request::new(());
        let id = maker.make_request_id(&req).expect("id generated");
        let parsed = Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[tokio::test]
    async fn test_health_check_is_ok() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_error_status_mapping() {
        let not_found = ApiError::NotFound("missing".to_string()).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let bad_request = ApiError::BadRequest("nope".to_string()).into_response();
        assert_eq!(bad_request.status(), StatusCode::BAD_REQUEST);

        let database =
            ApiError::Database(reqlog_core::Error::Internal("boom".to_string())).into_response();
        assert_eq!(database.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_api_error_body_carries_message() {
        let response = ApiError::NotFound("no such record".to_string()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "no such record");
    }
}
