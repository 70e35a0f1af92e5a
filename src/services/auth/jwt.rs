use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, Header};
use serde_json::{Map, Value};
use tracing::error;

use crate::error::{AuthError, AuthResult};
use crate::services::auth::keys::SigningKey;

/// Header fields that replace the defaults (`alg` from the options, `typ=JWT`).
#[derive(Debug, Clone, Default)]
pub struct HeaderOverrides {
    pub typ: Option<String>,
    pub jwk: Option<Jwk>,
}

#[derive(Debug, Clone)]
pub struct SignOptions<'a> {
    pub algorithm: Algorithm,
    pub expires_in: Duration,
    pub audience: Option<&'a str>,
    pub issuer: Option<&'a str>,
    pub subject: Option<&'a str>,
    pub header: HeaderOverrides,
}

impl SignOptions<'_> {
    pub fn rs256(expires_in: Duration) -> Self {
        Self {
            algorithm: Algorithm::RS256,
            expires_in,
            audience: None,
            issuer: None,
            subject: None,
            header: HeaderOverrides::default(),
        }
    }
}

/// Fresh token identifier: 256 random bits, hex-encoded.
pub fn new_jti() -> AuthResult<String> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes).map_err(|e| {
        error!(error = %e, "getrandom failed");
        AuthError::Entropy(e)
    })?;
    Ok(hex::encode(bytes))
}

/// Sign `payload` into a compact JWS.
///
/// `iat` and `exp` are always set; `aud`/`iss`/`sub` are set when the options
/// carry them and win over same-named payload members.
pub fn sign(
    payload: &Map<String, Value>,
    key: &SigningKey,
    options: &SignOptions<'_>,
) -> AuthResult<String> {
    if options.algorithm != Algorithm::RS256 || key.algorithm() != options.algorithm {
        error!(
            requested = ?options.algorithm,
            key = ?key.algorithm(),
            "unsupported JWT signing algorithm"
        );
        return Err(AuthError::Signing(ErrorKind::InvalidAlgorithm.into()));
    }

    let mut header = Header::new(options.algorithm);
    header.typ = Some(
        options
            .header
            .typ
            .clone()
            .unwrap_or_else(|| "JWT".to_string()),
    );
    header.jwk = options.header.jwk.clone();

    let iat = chrono::Utc::now().timestamp();
    let exp = iat + options.expires_in.num_seconds();

    let mut claims = payload.clone();
    claims.insert("iat".to_string(), Value::from(iat));
    claims.insert("exp".to_string(), Value::from(exp));
    if let Some(aud) = options.audience {
        claims.insert("aud".to_string(), Value::from(aud));
    }
    if let Some(iss) = options.issuer {
        claims.insert("iss".to_string(), Value::from(iss));
    }
    if let Some(sub) = options.subject {
        claims.insert("sub".to_string(), Value::from(sub));
    }

    jsonwebtoken::encode(&header, &claims, key.encoding_key()).map_err(|e| {
        error!(error = %e, "failed to sign JWT");
        AuthError::Signing(e)
    })
}
