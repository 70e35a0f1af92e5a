use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Body, Client, Method, Response};
use tracing::{debug, warn};

use crate::api::v1::DPOP_HEADER;
use crate::config::ServiceIdentity;
use crate::error::{AuthError, AuthResult};
use crate::services::auth::dpop::{AdditionalClaims, DpopProofBuilder, generate_ath};
use crate::services::auth::token_service::TokenService;
use crate::services::http::resolve_url;

/// Calls the management API with the cached DPoP-bound access token.
///
/// Every call gets its own proof bound to the method, the full URL and the
/// token (`ath`). The response is returned as-is; status handling is up to the
/// caller.
#[derive(Debug, Clone)]
pub struct ManagementApi {
    identity: Arc<ServiceIdentity>,
    http: Client,
    tokens: Arc<TokenService>,
    proofs: DpopProofBuilder,
}

impl ManagementApi {
    pub fn new(
        identity: Arc<ServiceIdentity>,
        http: Client,
        tokens: Arc<TokenService>,
        proofs: DpopProofBuilder,
    ) -> Self {
        Self {
            identity,
            http,
            tokens,
            proofs,
        }
    }

    /// Issue `method {domain}{relative_uri}`.
    ///
    /// Requires a prior successful `authenticate()` whose token is still fresh;
    /// a stale token is `NotAuthenticated` and the caller re-authenticates.
    /// Caller headers are applied last and replace `Accept`, `Authorization`
    /// or `DPoP` on collision.
    pub async fn call(
        &self,
        relative_uri: &str,
        method: Method,
        headers: Option<HeaderMap>,
        body: Option<Body>,
    ) -> AuthResult<Response> {
        let token = self
            .tokens
            .current()
            .await
            .ok_or(AuthError::NotAuthenticated)?;

        let url = resolve_url(&self.identity.domain, relative_uri)?;
        let ath = generate_ath(token.value());
        let proof = self.proofs.build(
            method.as_str(),
            url.as_str(),
            &AdditionalClaims::with_ath(ath),
        )?;

        let mut req_headers = HeaderMap::new();
        req_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        req_headers.insert(
            AUTHORIZATION,
            sensitive_value(&format!("DPoP {}", token.value()))?,
        );
        req_headers.insert(
            HeaderName::from_static(DPOP_HEADER),
            sensitive_value(&proof)?,
        );
        if let Some(extra) = headers {
            merge_headers(&mut req_headers, extra);
        }

        debug!(%method, %url, "calling management API");

        let mut req = self
            .http
            .request(method, url.clone())
            .headers(req_headers);
        if let Some(body) = body {
            req = req.body(body);
        }

        req.send().await.map_err(|e| {
            warn!(%url, error = %e, "management API request failed");
            AuthError::network(url.as_str(), e)
        })
    }
}

fn sensitive_value(value: &str) -> AuthResult<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| AuthError::Protocol("token is not a valid header value".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Caller headers win: every name they carry replaces what is already set.
fn merge_headers(base: &mut HeaderMap, extra: HeaderMap) {
    for name in extra.keys() {
        base.remove(name);
    }
    for (name, value) in extra.iter() {
        base.append(name.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_headers_replace_defaults_and_keep_multiple_values() {
        let mut base = HeaderMap::new();
        base.insert(ACCEPT, HeaderValue::from_static("application/json"));
        base.insert(AUTHORIZATION, HeaderValue::from_static("DPoP tok-1"));

        let mut extra = HeaderMap::new();
        extra.insert(ACCEPT, HeaderValue::from_static("text/csv"));
        extra.append("x-tag", HeaderValue::from_static("a"));
        extra.append("x-tag", HeaderValue::from_static("b"));

        merge_headers(&mut base, extra);

        assert_eq!(base[ACCEPT], "text/csv");
        assert_eq!(base[AUTHORIZATION], "DPoP tok-1");
        let tags: Vec<_> = base.get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["a", "b"]);
    }
}
