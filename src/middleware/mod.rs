// ABOUTME: Cross-cutting HTTP concerns: identity resolution and response headers
// ABOUTME: Auth resolution order and security headers both follow §4.8 exactly

//! Authentication extractors and response middleware.

/// `Identity`/`AdminIdentity` extractors implementing the bearer auth resolution order.
pub mod auth;
/// Security headers applied to every response.
pub mod security_headers;

pub use auth::{AdminIdentity, ClientIp, Identity, UserIdentity};
pub use security_headers::security_headers;
