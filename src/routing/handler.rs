use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    body::{to_bytes, Bytes},
    extract::Request,
    http::{header::SET_COOKIE, Extensions, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};

use super::metadata::{ParamBinding, ParamKind};
use crate::error::ApiError;
use crate::middleware::response::ResponseEntity;

pub type HandlerResult = Result<Response, ApiError>;
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

/// Arguments handed to a controller handler: the bound parameter slots
/// followed by the request and response contexts.
pub struct HandlerArgs {
    slots: Vec<Option<String>>,
    pub request: RequestContext,
    pub response: ResponseContext,
}

impl HandlerArgs {
    pub fn new(slots: Vec<Option<String>>, request: RequestContext) -> Self {
        Self {
            slots,
            request,
            response: ResponseContext::default(),
        }
    }

    pub fn slots(&self) -> &[Option<String>] {
        &self.slots
    }

    /// Raw value bound to `index`, `None` when unbound or absent from the request.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|slot| slot.as_deref())
    }

    pub fn required(&self, index: usize, name: &str) -> Result<&str, ApiError> {
        self.arg(index)
            .ok_or_else(|| ApiError::bad_request(format!("Missing required parameter '{}'", name)))
    }

    pub fn parse<T: FromStr>(&self, index: usize, name: &str) -> Result<T, ApiError> {
        self.required(index, name)?
            .parse()
            .map_err(|_| ApiError::bad_request(format!("Invalid value for parameter '{}'", name)))
    }
}

/// Fills argument slots from the matched path segments and the query string.
///
/// The slot vector is sized to the highest bound index; slots with no binding,
/// and bindings whose source is missing from the request, stay `None`.
pub fn bind_arguments(
    bindings: &[ParamBinding],
    path: &HashMap<String, String>,
    query: &HashMap<String, String>,
) -> Vec<Option<String>> {
    let len = bindings
        .iter()
        .map(|binding| binding.target_index + 1)
        .max()
        .unwrap_or(0);
    let mut slots = vec![None; len];

    for binding in bindings {
        let source = match binding.kind {
            ParamKind::Path => path,
            ParamKind::Query => query,
        };
        slots[binding.target_index] = source.get(&binding.source_name).cloned();
    }

    slots
}

/// The buffered request as seen by a handler.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
}

impl RequestContext {
    pub async fn from_request(request: Request, body_limit: usize) -> Result<Self, ApiError> {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, body_limit)
            .await
            .map_err(|e| ApiError::payload_too_large(format!("Failed to read request body: {}", e)))?;

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Value inserted into the request extensions by an earlier middleware.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if self.body.is_empty() {
            return Err(ApiError::bad_request("Request body is missing"));
        }
        serde_json::from_slice(&self.body).map_err(|e| ApiError::invalid_json(e.to_string()))
    }
}

/// Pending response state: headers to merge into whatever envelope the
/// handler finally returns.
#[derive(Debug, Default)]
pub struct ResponseContext {
    headers: HeaderMap,
}

impl ResponseContext {
    pub fn set_cookie(mut self, cookie: HeaderValue) -> Self {
        self.headers.append(SET_COOKIE, cookie);
        self
    }

    pub fn ok<T: Serialize>(self, message: impl Into<String>, data: T) -> Response {
        self.finish(ResponseEntity::ok(message, data))
    }

    pub fn created<T: Serialize>(self, message: impl Into<String>, data: T) -> Response {
        self.finish(ResponseEntity::created(message, data))
    }

    pub fn updated<T: Serialize>(self, message: impl Into<String>, data: T) -> Response {
        self.finish(ResponseEntity::ok(message, data))
    }

    pub fn deleted(self, message: impl Into<String>) -> Response {
        self.finish(ResponseEntity::ok(message, ()))
    }

    pub fn status<T: Serialize>(self, status: StatusCode, message: impl Into<String>, data: T) -> Response {
        self.finish(ResponseEntity::with_status(status, message, data))
    }

    pub fn finish<T: Serialize>(self, entity: ResponseEntity<T>) -> Response {
        let mut response = entity.into_response();
        for (name, value) in self.headers.iter() {
            response.headers_mut().append(name, value.clone());
        }
        response
    }
}
