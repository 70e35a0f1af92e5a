use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::v1::dto::{TokenErrorResponse, TokenRequest, TokenResponse};
use crate::api::v1::{DPOP_HEADER, DPOP_NONCE_HEADER, TOKEN_PATH, USE_DPOP_NONCE};
use crate::config::ServiceIdentity;
use crate::error::{AuthError, AuthResult};
use crate::services::auth::client_assertion::ClientAssertionBuilder;
use crate::services::auth::dpop::{AdditionalClaims, DpopProofBuilder};
use crate::services::http::resolve_url;

/// Access token issued by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Without an expiry the token is kept for the life of the process.
    pub fn is_fresh(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now + leeway < expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Outcome of one token request.
enum TokenAttempt {
    Issued(AccessToken),
    /// `400 use_dpop_nonce`; `body` is kept in case the retry is challenged too.
    NonceChallenge { nonce: String, body: String },
}

/// Client-credentials token acquisition with DPoP.
///
/// Flow:
/// - reuse the cached token while it is fresh
/// - POST the token request with a client assertion and a DPoP proof
/// - on `400 use_dpop_nonce`, rebuild both with the server nonce and retry once
/// - cache whatever token comes back
///
/// The cache lock is held across the whole exchange, so concurrent callers
/// share a single token request.
pub struct TokenService {
    identity: Arc<ServiceIdentity>,
    http: Client,
    assertions: ClientAssertionBuilder,
    proofs: DpopProofBuilder,
    expiry_leeway: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("token_endpoint", &self.identity.token_endpoint())
            .field("client_id", &self.identity.client_id)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(
        identity: Arc<ServiceIdentity>,
        http: Client,
        assertions: ClientAssertionBuilder,
        proofs: DpopProofBuilder,
        expiry_leeway: Duration,
    ) -> Self {
        Self {
            identity,
            http,
            assertions,
            proofs,
            expiry_leeway,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached access token, acquiring a new one if needed.
    pub async fn authenticate(&self) -> AuthResult<AccessToken> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now(), self.expiry_leeway) {
                return Ok(token.clone());
            }
            debug!(expires_at = ?token.expires_at(), "cached access token is stale");
        }

        info!(
            token_endpoint = %self.identity.token_endpoint(),
            client_id = %self.identity.client_id,
            "valid access token not found; requesting a new one"
        );

        let token = match self.request_token(None).await? {
            TokenAttempt::Issued(token) => token,
            TokenAttempt::NonceChallenge { nonce, .. } => {
                debug!("token endpoint requires a DPoP nonce; retrying");
                match self.request_token(Some(nonce.as_str())).await? {
                    TokenAttempt::Issued(token) => token,
                    TokenAttempt::NonceChallenge { body, .. } => {
                        warn!(
                            status = %StatusCode::BAD_REQUEST,
                            body = %body,
                            "token endpoint repeated the DPoP nonce challenge"
                        );
                        return Err(AuthError::AuthServer {
                            status: StatusCode::BAD_REQUEST,
                            body,
                        });
                    }
                }
            }
        };

        info!(expires_at = ?token.expires_at(), "retrieved access token");
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Current token without contacting the token endpoint.
    pub async fn cached(&self) -> Option<AccessToken> {
        self.cached.lock().await.clone()
    }

    /// Cached token, but only while `authenticate()` would still reuse it.
    pub async fn current(&self) -> Option<AccessToken> {
        self.cached()
            .await
            .filter(|token| token.is_fresh(Utc::now(), self.expiry_leeway))
    }

    /// Drop the cached token; the next `authenticate()` requests a new one.
    pub async fn clear(&self) {
        self.cached.lock().await.take();
    }

    async fn request_token(&self, nonce: Option<&str>) -> AuthResult<TokenAttempt> {
        let token_endpoint = resolve_url(&self.identity.domain, TOKEN_PATH)?;

        // Both JWTs are single-use: build new ones for every attempt.
        let assertion = self.assertions.build()?;
        let extra = match nonce {
            Some(nonce) => AdditionalClaims::with_nonce(nonce),
            None => AdditionalClaims::none(),
        };
        let proof = self.proofs.build("POST", token_endpoint.as_str(), &extra)?;

        let scope = self.identity.scope_param();
        let form = TokenRequest::client_credentials(&scope, &assertion);

        let resp = self
            .http
            .post(token_endpoint.clone())
            .header(ACCEPT, "application/json")
            .header(DPOP_HEADER, proof)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::network(token_endpoint.as_str(), e))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .text()
            .await
            .map_err(|e| AuthError::network(token_endpoint.as_str(), e))?;

        classify_response(status, &headers, &body)
    }
}

fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> AuthResult<TokenAttempt> {
    if status.is_success() {
        let resp: TokenResponse = serde_json::from_str(body).map_err(|e| {
            warn!(%status, error = %e, "token response is not a valid token body");
            AuthError::Protocol(format!("token response: {e}"))
        })?;

        let expires_at = resp
            .expires_in
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        return Ok(TokenAttempt::Issued(AccessToken::new(
            resp.access_token,
            expires_at,
        )));
    }

    if status == StatusCode::BAD_REQUEST && is_nonce_challenge(body) {
        let nonce = headers
            .get(DPOP_NONCE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                warn!("nonce challenge without a dpop-nonce header");
                AuthError::Protocol("use_dpop_nonce without dpop-nonce header".to_string())
            })?;
        return Ok(TokenAttempt::NonceChallenge {
            nonce: nonce.to_string(),
            body: body.to_string(),
        });
    }

    warn!(%status, body = %body, "token request failed");
    Err(AuthError::AuthServer {
        status,
        body: body.to_string(),
    })
}

fn is_nonce_challenge(body: &str) -> bool {
    serde_json::from_str::<TokenErrorResponse>(body)
        .map(|e| e.error == USE_DPOP_NONCE)
        .unwrap_or(false)
}
