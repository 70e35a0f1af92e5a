//! Outbound HTTP client shared by the token flow and management API calls.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::{AuthError, AuthResult};

/// Build the shared client. Every request is bounded by `timeout`.
pub fn build_http_client(timeout: Duration) -> AuthResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(AuthError::HttpClient)
}

/// Resolve `{domain}{relative_uri}` into the URL that goes on the wire.
///
/// The result is percent-encoded, so it is both the request target and the
/// DPoP `htu`.
pub fn resolve_url(domain: &str, relative_uri: &str) -> AuthResult<Url> {
    let raw = format!("{domain}{relative_uri}");
    Url::parse(&raw).map_err(|e| AuthError::Protocol(format!("invalid request URL {raw}: {e}")))
}
