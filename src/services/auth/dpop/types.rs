use serde::Serialize;

/// Optional DPoP proof claims (RFC 9449).
///
/// - `nonce`: echoed from the last `dpop-nonce` response header.
/// - `ath`: access token hash, required when calling a resource server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdditionalClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ath: Option<String>,
}

impl AdditionalClaims {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_nonce(nonce: impl Into<String>) -> Self {
        Self {
            nonce: Some(nonce.into()),
            ath: None,
        }
    }

    pub fn with_ath(ath: impl Into<String>) -> Self {
        Self {
            nonce: None,
            ath: Some(ath.into()),
        }
    }
}

/// DPoP proof JWT claims; `iat`/`exp` are added by the signer.
#[derive(Debug, Serialize)]
pub struct DpopClaims<'a> {
    pub htm: &'a str, // HTTP method
    pub htu: &'a str, // HTTP URI (absolute, no fragment)
    pub jti: String,  // unique proof ID (server-side replay detection)
    #[serde(flatten)]
    pub extra: &'a AdditionalClaims,
}
