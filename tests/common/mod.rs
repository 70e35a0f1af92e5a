#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use httpmock::{HttpMockRequest, Mock};
use httpmock::prelude::*;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde_json::{Map, Value};

use okta_dpop_client::config::{AppEnv, Config, KeySource, ServiceIdentity};
use okta_dpop_client::state::AppState;

pub const CLIENT_ID: &str = "0oa-test-client";
pub const TOKEN_PATH: &str = "/oauth2/v1/token";
pub const USERS_PATH: &str = "/api/v1/users";

pub const NONCE_CHALLENGE_BODY: &str = r#"{"error":"use_dpop_nonce","error_description":"Authorization server requires nonce in DPoP proof."}"#;

pub type Claims = Map<String, Value>;

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn token_json(access_token: &str, expires_in: u64) -> String {
    format!(
        r#"{{"token_type":"DPoP","expires_in":{expires_in},"access_token":"{access_token}","scope":"okta.users.read"}}"#
    )
}

pub fn config_for(base_url: &str) -> Config {
    Config {
        app_env: AppEnv::Development,
        identity: ServiceIdentity::new(
            base_url,
            CLIENT_ID,
            vec!["okta.users.read".to_string(), "okta.groups.read".to_string()],
        ),
        client_assertion_key: KeySource::File(fixture("client_assertion_private.pem")),
        dpop_private_key: KeySource::File(fixture("dpop_private.pem")),
        dpop_public_jwk: KeySource::File(fixture("dpop_public.jwk.json")),
        http_timeout: Duration::from_secs(5),
        token_expiry_leeway_seconds: 60,
    }
}

pub fn state_for(server: &MockServer) -> AppState {
    AppState::from_config(&config_for(&server.base_url())).unwrap()
}

/// Token endpoint answering nonce-less proofs with a `use_dpop_nonce`
/// challenge for `nonce`.
pub fn mock_nonce_challenge<'a>(
    server: &'a MockServer,
    recorder: &Recorder,
    nonce: &str,
) -> Mock<'a> {
    mock_challenge_after(server, recorder, None, nonce)
}

/// Token endpoint answering proofs that carry `answered` (or no nonce, for
/// `None`) with a fresh challenge for `nonce`.
pub fn mock_challenge_after<'a>(
    server: &'a MockServer,
    recorder: &Recorder,
    answered: Option<&str>,
    nonce: &str,
) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(TOKEN_PATH)
            .is_true(recorder.matcher_where(nonce_is(answered)));
        then.status(400)
            .header("content-type", "application/json")
            .header("dpop-nonce", nonce)
            .body(NONCE_CHALLENGE_BODY);
    })
}

/// Token endpoint issuing `access_token` to proofs that carry `nonce`
/// (or no nonce, for `None`).
pub fn mock_token<'a>(
    server: &'a MockServer,
    recorder: &Recorder,
    nonce: Option<&str>,
    access_token: &str,
) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(TOKEN_PATH)
            .header("accept", "application/json")
            .header("content-type", "application/x-www-form-urlencoded")
            .is_true(recorder.matcher_where(nonce_is(nonce)));
        then.status(200)
            .header("content-type", "application/json")
            .body(token_json(access_token, 3600));
    })
}

/// Proof filter on the `nonce` claim; `None` means no nonce at all.
pub fn nonce_is(expected: Option<&str>) -> impl Fn(&Claims) -> bool + Send + Sync + 'static {
    let expected = expected.map(str::to_string);
    move |proof: &Claims| proof.get("nonce").and_then(Value::as_str) == expected.as_deref()
}

/// One request as seen by a mock: its verified DPoP claims and raw body.
#[derive(Clone, Debug)]
pub struct Seen {
    pub proof: Claims,
    pub body: String,
}

impl Seen {
    pub fn form(&self) -> HashMap<String, String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .into_owned()
            .collect()
    }
}

/// Records requests whose DPoP proof is valid and targets a URL under
/// `htu_prefix`, in arrival order.
///
/// Matchers may be evaluated more than once per request; entries are keyed by
/// the raw proof, which is unique per request.
#[derive(Clone)]
pub struct Recorder {
    htu_prefix: String,
    seen: Arc<Mutex<Vec<(String, Seen)>>>,
}

impl Recorder {
    pub fn new(htu_prefix: impl Into<String>) -> Self {
        Self {
            htu_prefix: htu_prefix.into(),
            seen: Arc::default(),
        }
    }

    /// Matcher for `When::is_true` accepting any valid proof under the prefix.
    pub fn matcher(&self) -> impl Fn(&HttpMockRequest) -> bool + Send + Sync + 'static {
        self.matcher_where(|_: &Claims| true)
    }

    /// Like `matcher`, but only for proofs that also satisfy `accept`.
    pub fn matcher_where<P>(
        &self,
        accept: P,
    ) -> impl Fn(&HttpMockRequest) -> bool + Send + Sync + 'static
    where
        P: Fn(&Claims) -> bool + Send + Sync + 'static,
    {
        let recorder = self.clone();
        move |req: &HttpMockRequest| recorder.record(req, &accept)
    }

    fn record(&self, req: &HttpMockRequest, accept: &dyn Fn(&Claims) -> bool) -> bool {
        let Some(raw) = dpop_header(req) else {
            return false;
        };
        let Some(proof) = verify_proof(&raw) else {
            return false;
        };
        let on_prefix = proof
            .get("htu")
            .and_then(Value::as_str)
            .is_some_and(|htu| htu.starts_with(&self.htu_prefix));
        if !on_prefix || !accept(&proof) {
            return false;
        }

        let mut seen = self.seen.lock().unwrap();
        if !seen.iter().any(|(r, _)| *r == raw) {
            seen.push((
                raw,
                Seen {
                    proof,
                    body: req.body_string(),
                },
            ));
        }
        true
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }
}

fn dpop_header(req: &HttpMockRequest) -> Option<String> {
    req.headers()
        .get("dpop")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// A proof is valid when it is an RS256 `dpop+jwt` signed by the fixture key
/// it embeds.
fn verify_proof(proof: &str) -> Option<Claims> {
    let header = decode_header(proof).ok()?;
    if header.typ.as_deref() != Some("dpop+jwt") || header.alg != Algorithm::RS256 {
        return None;
    }

    let jwk: Jwk = header.jwk?;
    if jwk != fixture_jwk() {
        return None;
    }

    decode::<Claims>(
        proof,
        &DecodingKey::from_jwk(&jwk).ok()?,
        &Validation::new(Algorithm::RS256),
    )
    .ok()
    .map(|data| data.claims)
}

fn fixture_jwk() -> Jwk {
    serde_json::from_str(&std::fs::read_to_string(fixture("dpop_public.jwk.json")).unwrap())
        .unwrap()
}

/// Verify a client assertion with the client's public key and return its claims.
pub fn decode_assertion(assertion: &str, token_endpoint: &str) -> Claims {
    let public_pem = std::fs::read_to_string(fixture("client_assertion_public.pem")).unwrap();

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[token_endpoint]);
    validation.set_issuer(&[CLIENT_ID]);
    validation.sub = Some(CLIENT_ID.to_string());

    decode::<Claims>(
        assertion,
        &DecodingKey::from_rsa_pem(public_pem.as_bytes()).unwrap(),
        &validation,
    )
    .unwrap()
    .claims
}
