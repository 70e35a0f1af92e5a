//! Signing key material: the client-assertion key and the DPoP key pair.
//!
//! Keys are read from their configured source on first use and kept in memory
//! for the rest of the process. The two keys have distinct types so a DPoP key
//! can never be handed to the client-assertion builder or the other way round.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk};
use jsonwebtoken::{Algorithm, EncodingKey};
use tracing::{debug, warn};

use crate::config::{Config, KeySource};
use crate::error::{AuthError, AuthResult};

/// Private key plus the algorithm it signs with (always RS256 here).
#[derive(Clone)]
pub struct SigningKey {
    encoding_key: EncodingKey,
    algorithm: Algorithm,
}

impl SigningKey {
    /// `pem` must be an RSA private key (PKCS#1 or PKCS#8 PEM).
    pub fn from_rsa_pem(pem: &str) -> AuthResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            warn!(error = %e, "failed to parse RSA private key PEM");
            AuthError::KeyFormat(format!("expected an RSA private key in PEM format: {e}"))
        })?;

        Ok(Self {
            encoding_key,
            algorithm: Algorithm::RS256,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// DPoP private key and the public JWK embedded in every proof header.
#[derive(Clone, Debug)]
pub struct DpopKeyPair {
    private_key: SigningKey,
    public_jwk: Jwk,
}

impl DpopKeyPair {
    pub fn new(private_key: SigningKey, public_jwk: Jwk) -> AuthResult<Self> {
        if !matches!(public_jwk.algorithm, AlgorithmParameters::RSA(_)) {
            return Err(AuthError::KeyFormat(
                "DPoP public JWK must be an RSA key (kty=RSA)".to_string(),
            ));
        }

        Ok(Self {
            private_key,
            public_jwk,
        })
    }

    /// Parse a PEM private key and a JSON public JWK.
    ///
    /// Only the public members of the JWK survive parsing, so a JWK exported
    /// with private parameters never leaks into a proof header.
    pub fn from_pem_and_jwk(private_pem: &str, public_jwk_json: &str) -> AuthResult<Self> {
        let private_key = SigningKey::from_rsa_pem(private_pem)?;
        let public_jwk: Jwk = serde_json::from_str(public_jwk_json).map_err(|e| {
            warn!(error = %e, "failed to parse DPoP public JWK");
            AuthError::KeyFormat(format!("DPoP public key is not a valid JWK: {e}"))
        })?;

        Self::new(private_key, public_jwk)
    }

    pub fn private_key(&self) -> &SigningKey {
        &self.private_key
    }

    pub fn public_jwk(&self) -> &Jwk {
        &self.public_jwk
    }
}

/// Lazily loaded key store.
///
/// Each key is loaded once, on first use; concurrent first uses wait on the
/// same lock instead of reading the source twice.
#[derive(Debug)]
pub struct KeyMaterial {
    client_assertion_source: KeySource,
    dpop_private_source: KeySource,
    dpop_public_source: KeySource,

    client_assertion_key: Mutex<Option<Arc<SigningKey>>>,
    dpop_key_pair: Mutex<Option<Arc<DpopKeyPair>>>,
}

impl KeyMaterial {
    pub fn new(
        client_assertion_source: KeySource,
        dpop_private_source: KeySource,
        dpop_public_source: KeySource,
    ) -> Self {
        Self {
            client_assertion_source,
            dpop_private_source,
            dpop_public_source,
            client_assertion_key: Mutex::new(None),
            dpop_key_pair: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.client_assertion_key.clone(),
            config.dpop_private_key.clone(),
            config.dpop_public_jwk.clone(),
        )
    }

    pub fn client_assertion_key(&self) -> AuthResult<Arc<SigningKey>> {
        let mut slot = self
            .client_assertion_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(key) = slot.as_ref() {
            return Ok(Arc::clone(key));
        }

        let pem = read_source(&self.client_assertion_source)?;
        let key = Arc::new(SigningKey::from_rsa_pem(&pem)?);
        debug!(source = ?self.client_assertion_source, "loaded client assertion key");

        *slot = Some(Arc::clone(&key));
        Ok(key)
    }

    pub fn dpop_key_pair(&self) -> AuthResult<Arc<DpopKeyPair>> {
        let mut slot = self
            .dpop_key_pair
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(pair) = slot.as_ref() {
            return Ok(Arc::clone(pair));
        }

        let private_pem = read_source(&self.dpop_private_source)?;
        let public_jwk = read_source(&self.dpop_public_source)?;
        let pair = Arc::new(DpopKeyPair::from_pem_and_jwk(&private_pem, &public_jwk)?);
        debug!(source = ?self.dpop_private_source, "loaded DPoP key pair");

        *slot = Some(Arc::clone(&pair));
        Ok(pair)
    }
}

fn read_source(source: &KeySource) -> AuthResult<String> {
    match source {
        KeySource::Inline(value) => Ok(value.clone()),
        KeySource::File(path) => std::fs::read_to_string(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to read key file");
            AuthError::KeyLoad {
                path: path.clone(),
                source: e,
            }
        }),
    }
}
