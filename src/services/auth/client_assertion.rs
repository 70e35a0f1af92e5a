use std::sync::Arc;

use chrono::Duration;
use serde_json::{Map, Value};

use crate::config::ServiceIdentity;
use crate::error::AuthResult;
use crate::services::auth::jwt::{self, SignOptions};
use crate::services::auth::keys::KeyMaterial;

const ASSERTION_LIFETIME_HOURS: i64 = 1;

/// Builds `private_key_jwt` client assertions (RFC 7523).
///
/// `iss` and `sub` are the client id, `aud` is the token endpoint. Every call
/// carries a fresh `jti`, so assertions are never reused.
#[derive(Debug, Clone)]
pub struct ClientAssertionBuilder {
    identity: Arc<ServiceIdentity>,
    keys: Arc<KeyMaterial>,
}

impl ClientAssertionBuilder {
    pub fn new(identity: Arc<ServiceIdentity>, keys: Arc<KeyMaterial>) -> Self {
        Self { identity, keys }
    }

    pub fn build(&self) -> AuthResult<String> {
        let key = self.keys.client_assertion_key()?;
        let token_endpoint = self.identity.token_endpoint();

        let mut payload = Map::new();
        payload.insert("jti".to_string(), Value::String(jwt::new_jti()?));

        let options = SignOptions {
            audience: Some(token_endpoint.as_str()),
            issuer: Some(self.identity.client_id.as_str()),
            subject: Some(self.identity.client_id.as_str()),
            ..SignOptions::rs256(Duration::hours(ASSERTION_LIFETIME_HOURS))
        };

        jwt::sign(&payload, &key, &options)
    }
}
