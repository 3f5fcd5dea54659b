//! Request capture middleware.
//!
//! Observes one request/response exchange, builds an immutable
//! [`RequestLog`] and hands it to the ingestion queue off the request
//! path. Capture is strictly passive: it never changes status codes,
//! never consumes the body from downstream handlers and never fails a
//! request.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use uuid::Uuid;

use reqlog_core::defaults::{FILE_FIELD_NAME, FILE_SIZE_LIMIT_BYTES};
use reqlog_core::RequestLog;
use reqlog_pipeline::Submitter;

use crate::capture::capture_request_content;
use crate::filter::PathFilter;

/// Header carrying the request correlation id.
///
/// An incoming value is propagated onto the record and echoed on the
/// response; otherwise the middleware generates a UUIDv7.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request id assigned by the capture middleware, injected into request
/// extensions so handlers can correlate their own logs with the record.
#[derive(Clone, Debug)]
pub struct CapturedRequestId(pub String);

/// Shared state for [`capture_middleware`].
#[derive(Clone)]
pub struct CaptureState {
    submitter: Submitter,
    filter: PathFilter,
    service_name: String,
    file_field: String,
    file_size_limit: u64,
}

impl CaptureState {
    /// Create capture state with default settings: no path filter, an
    /// empty service name, upload field `"file"`, 100 MiB upload
    /// ceiling.
    pub fn new(submitter: Submitter) -> Self {
        Self {
            submitter,
            filter: PathFilter::default(),
            service_name: String::new(),
            file_field: FILE_FIELD_NAME.to_string(),
            file_size_limit: FILE_SIZE_LIMIT_BYTES,
        }
    }

    /// Set the service name stamped on every record.
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Set the paths exempt from capture.
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the multipart field name treated as the upload.
    pub fn with_file_field(mut self, file_field: impl Into<String>) -> Self {
        self.file_field = file_field.into();
        self
    }

    /// Set the upload size ceiling in bytes.
    pub fn with_file_size_limit(mut self, file_size_limit: u64) -> Self {
        self.file_size_limit = file_size_limit;
        self
    }
}

/// Capture middleware for `axum::middleware::from_fn_with_state`.
///
/// Filtered paths pass straight through. For everything else the
/// middleware notes request facts, captures bounded content, runs the
/// inner service, then submits the finished record from a detached
/// task so the response is never delayed by classification.
pub async fn capture_middleware(
    State(state): State<CaptureState>,
    mut req: Request,
    next: Next,
) -> Response {
    if state.filter.matches(req.uri().path()) {
        return next.run(req).await;
    }

    let start = std::time::Instant::now();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query_string = req.uri().query().unwrap_or("").to_string();
    let remote_ip = client_ip(&req);
    let user_agent = header_str(req.headers(), &USER_AGENT);
    let content_type = header_str(req.headers(), &CONTENT_TYPE);

    req.extensions_mut()
        .insert(CapturedRequestId(request_id.clone()));

    let (req, captured) =
        capture_request_content(req, &content_type, &state.file_field, state.file_size_limit)
            .await;

    let mut response = next.run(req).await;

    let record = RequestLog {
        request_id: request_id.clone(),
        service_name: state.service_name.clone(),
        method,
        path,
        query_string,
        status_code: response.status().as_u16() as i32,
        remote_ip,
        user_agent,
        content_type,
        request_time: start.elapsed().as_secs_f64(),
        created_at: Utc::now(),
        file_name: captured.file_name,
        file_size: captured.file_size,
        content_json: None,
    };

    // Classification can chew on large payloads; keep it off the
    // response path.
    let submitter = state.submitter.clone();
    tokio::spawn(async move {
        submitter.submit(record, &captured.content);
    });

    if !response.headers().contains_key(X_REQUEST_ID) {
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(X_REQUEST_ID), value);
        }
    }

    response
}

/// Best-effort client address: proxy headers first, then the socket
/// peer address when the server was built with connect info.
fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
    {
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}
