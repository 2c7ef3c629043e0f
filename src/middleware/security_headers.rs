// ABOUTME: Security response headers applied to every response (§4.8)
// ABOUTME: HSTS is added only when the server is fronted by TLS

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

/// Attach `X-Content-Type-Options`, `X-Frame-Options`, `X-XSS-Protection`,
/// and (when TLS is enabled) `Strict-Transport-Security` to every response.
pub async fn security_headers(tls_enabled: bool, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("x-xss-protection", HeaderValue::from_static("1; mode=block"));
    if tls_enabled {
        headers.insert(
            "strict-transport-security",
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        );
    }
    response
}
