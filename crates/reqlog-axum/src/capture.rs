//! Request content capture.
//!
//! Reads bounded request content for later classification while keeping
//! the body available to downstream handlers. Capture never fails a
//! request: problems degrade to sentinel content or to no content.

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header;
use tracing::debug;

/// Content captured from one request.
#[derive(Debug, Default)]
pub(crate) struct CapturedContent {
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub content: Bytes,
}

/// Capture content according to the request content type.
///
/// JSON bodies are buffered whole and restored. Multipart bodies are
/// buffered and restored too, but content beyond `file_size_limit` is
/// replaced by a sentinel; requests declaring an oversize
/// `content-length` pass through unread. Every other content type is
/// left alone.
pub(crate) async fn capture_request_content(
    req: Request,
    content_type: &str,
    file_field: &str,
    file_size_limit: u64,
) -> (Request, CapturedContent) {
    if content_type.contains("multipart/form-data") {
        capture_multipart(req, content_type, file_field, file_size_limit).await
    } else if content_type.contains("application/json") {
        capture_json(req).await
    } else {
        (req, CapturedContent::default())
    }
}

async fn capture_json(req: Request) -> (Request, CapturedContent) {
    let (parts, body) = req.into_parts();

    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let captured = CapturedContent {
                content: bytes.clone(),
                ..CapturedContent::default()
            };
            (Request::from_parts(parts, Body::from(bytes)), captured)
        }
        Err(e) => {
            // The body stream broke mid-read; downstream sees it empty.
            let captured = CapturedContent {
                content: Bytes::from(format!("read request body error: {e}")),
                ..CapturedContent::default()
            };
            (Request::from_parts(parts, Body::empty()), captured)
        }
    }
}

async fn capture_multipart(
    req: Request,
    content_type: &str,
    file_field: &str,
    file_size_limit: u64,
) -> (Request, CapturedContent) {
    let declared_len = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    // Oversize uploads are detected up front from the declared length
    // and never buffered here.
    if declared_len.is_some_and(|len| len > file_size_limit) {
        let captured = CapturedContent {
            content: Bytes::from_static(b"file too large, skip content"),
            ..CapturedContent::default()
        };
        return (req, captured);
    }

    let (parts, body) = req.into_parts();

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let captured = CapturedContent {
                content: Bytes::from(format!("read request body error: {e}")),
                ..CapturedContent::default()
            };
            return (Request::from_parts(parts, Body::empty()), captured);
        }
    };

    // A chunked body with no declared length can still turn out oversize
    // once buffered. It is restored whole; only its content is skipped.
    if bytes.len() as u64 > file_size_limit {
        let captured = CapturedContent {
            content: Bytes::from_static(b"file too large, skip content"),
            ..CapturedContent::default()
        };
        return (Request::from_parts(parts, Body::from(bytes)), captured);
    }

    let captured = read_file_field(bytes.clone(), content_type, file_field).await;
    (Request::from_parts(parts, Body::from(bytes)), captured)
}

/// Locate the upload field in a buffered multipart body and read it
/// fully. Fields are matched by name and must carry a filename, like a
/// browser file input; the first match wins.
async fn read_file_field(body: Bytes, content_type: &str, file_field: &str) -> CapturedContent {
    let boundary = match multer::parse_boundary(content_type) {
        Ok(boundary) => boundary,
        Err(e) => {
            debug!(
                subsystem = "capture",
                error = %e,
                "Multipart content type without usable boundary, skipping capture"
            );
            return CapturedContent::default();
        }
    };

    let stream = futures::stream::iter([Ok::<_, std::convert::Infallible>(body)]);
    let mut multipart = multer::Multipart::new(stream, boundary);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            // End of form, or a form we cannot parse: nothing to capture.
            Ok(None) | Err(_) => return CapturedContent::default(),
        };

        if field.name() != Some(file_field) || field.file_name().is_none() {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        return match field.bytes().await {
            Ok(content) => CapturedContent {
                file_name,
                file_size: Some(content.len() as i64),
                content,
            },
            Err(e) => CapturedContent {
                file_name,
                file_size: None,
                content: Bytes::from(format!("read file error: {e}")),
            },
        };
    }
}
