use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// One line per request: method and URI on arrival, status and latency at
/// debug level once the response is ready.
pub async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    tracing::info!("{} {}", method, uri);

    let started = Instant::now();
    let response = next.run(request).await;
    tracing::debug!(
        "{} {} -> {} in {}ms",
        method,
        uri,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}
