use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{AppConfig, UploadConfig};
use crate::error::ApiError;
use crate::routing::Middleware;

pub const UPLOAD_MIDDLEWARE: &str = "upload";

/// A single file pulled out of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    /// Extension of the original file name including the dot, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name.as_deref()?;
        let dot = name.rfind('.')?;
        (dot + 1 < name.len()).then(|| &name[dot..])
    }
}

/// Accepts one file in multipart field `field`, checks its type and size
/// and stores it as an [`UploadedFile`] extension. Requests that are not
/// multipart, or carry no such field, pass through untouched.
///
/// Limits come from an `Arc<UploadConfig>` extension when present.
pub fn single_file(field: &'static str) -> Middleware {
    Middleware::new(UPLOAD_MIDDLEWARE, move |request, next| accept_single_file(field, request, next))
}

async fn accept_single_file(field: &'static str, request: Request, next: Next) -> Response {
    if !is_multipart(request.headers()) {
        return next.run(request).await;
    }

    let limits = request
        .extensions()
        .get::<Arc<UploadConfig>>()
        .cloned()
        .unwrap_or_else(|| Arc::new(AppConfig::development().upload));

    let (mut parts, body) = request.into_parts();
    let mut multipart_request = Request::new(body);
    *multipart_request.headers_mut() = parts.headers.clone();
    // Carries the body limit the multipart reader honours.
    *multipart_request.extensions_mut() = parts.extensions.clone();

    let multipart = match Multipart::from_request(multipart_request, &()).await {
        Ok(multipart) => multipart,
        Err(rejection) => return ApiError::bad_request(rejection.body_text()).into_response(),
    };

    match read_file(multipart, field, &limits).await {
        Ok(Some(file)) => {
            parts.extensions.insert(file);
        }
        Ok(None) => {}
        Err(e) => return e.into_response(),
    }

    next.run(Request::from_parts(parts, Body::empty())).await
}

async fn read_file(mut multipart: Multipart, field: &str, limits: &UploadConfig) -> Result<Option<UploadedFile>, ApiError> {
    let mut found = None;

    while let Some(mut part) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if part.name() != Some(field) {
            continue;
        }
        if found.is_some() {
            return Err(ApiError::bad_request(format!("Only one file may be sent in '{}'", field)));
        }

        let content_type = part.content_type().unwrap_or_default().to_string();
        if !limits.allowed_mime_types.iter().any(|allowed| *allowed == content_type) {
            return Err(ApiError::unsupported_media_type("Only JPEG and PNG files are allowed"));
        }
        let file_name = part.file_name().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = part.chunk().await.map_err(|e| ApiError::bad_request(e.body_text()))? {
            if data.len() + chunk.len() > limits.max_file_size_bytes {
                return Err(ApiError::payload_too_large(format!(
                    "File exceeds the {} byte limit",
                    limits.max_file_size_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        found = Some(UploadedFile {
            field: field.to_string(),
            file_name,
            content_type,
            data: Bytes::from(data),
        });
    }

    Ok(found)
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}
