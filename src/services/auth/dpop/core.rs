//! DPoP proof construction (RFC 9449).
//!
//! A proof is a short-lived JWT signed with the DPoP private key, carrying the
//! public key in its header. Every outbound request gets its own proof; proofs
//! are never cached because the server replay-checks `jti`.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::error;

use crate::error::{AuthError, AuthResult};
use crate::services::auth::dpop::types::{AdditionalClaims, DpopClaims};
use crate::services::auth::jwt::{self, HeaderOverrides, SignOptions};
use crate::services::auth::keys::KeyMaterial;

pub const DPOP_JWT_TYP: &str = "dpop+jwt";

const PROOF_LIFETIME_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct DpopProofBuilder {
    keys: Arc<KeyMaterial>,
}

impl DpopProofBuilder {
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        Self { keys }
    }

    /// Build a proof bound to `method` and `uri`.
    ///
    /// `uri` is used verbatim as `htu`; callers pass the exact URL they send.
    pub fn build(&self, method: &str, uri: &str, extra: &AdditionalClaims) -> AuthResult<String> {
        let pair = self.keys.dpop_key_pair()?;

        let claims = DpopClaims {
            htm: method,
            htu: uri,
            jti: jwt::new_jti()?,
            extra,
        };
        let payload = match serde_json::to_value(&claims) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(AuthError::Protocol("DPoP claims are not an object".into())),
            Err(e) => {
                error!(error = %e, "failed to serialize DPoP claims");
                return Err(AuthError::Signing(e.into()));
            }
        };

        let options = SignOptions {
            header: HeaderOverrides {
                typ: Some(DPOP_JWT_TYP.to_string()),
                jwk: Some(pair.public_jwk().clone()),
            },
            ..SignOptions::rs256(Duration::minutes(PROOF_LIFETIME_MINUTES))
        };

        jwt::sign(&payload, pair.private_key(), &options)
    }
}

/// `ath` claim: base64url (no padding) of SHA-256 over the access token.
pub fn generate_ath(access_token: &str) -> String {
    let digest = Sha256::digest(access_token.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
