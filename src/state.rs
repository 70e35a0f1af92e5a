/*
 * Responsibility
 * - Process-wide services built once from Config
 * - Cheap to clone (everything behind Arc or already reference-counted)
 */
use std::sync::Arc;

use chrono::Duration;

use crate::config::Config;
use crate::error::AuthResult;
use crate::services::ManagementApi;
use crate::services::auth::{ClientAssertionBuilder, DpopProofBuilder, KeyMaterial, TokenService};
use crate::services::http::build_http_client;

#[derive(Clone, Debug)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub api: ManagementApi,
}

impl AppState {
    pub fn new(tokens: Arc<TokenService>, api: ManagementApi) -> Self {
        Self { tokens, api }
    }

    /// Wire the token flow and the API client. Keys are not read until the
    /// first JWT is built.
    pub fn from_config(config: &Config) -> AuthResult<Self> {
        let identity = Arc::new(config.identity.clone());
        let keys = Arc::new(KeyMaterial::from_config(config));
        let http = build_http_client(config.http_timeout)?;

        let proofs = DpopProofBuilder::new(Arc::clone(&keys));
        let assertions = ClientAssertionBuilder::new(Arc::clone(&identity), keys);

        let tokens = Arc::new(TokenService::new(
            Arc::clone(&identity),
            http.clone(),
            assertions,
            proofs.clone(),
            Duration::seconds(config.token_expiry_leeway_seconds),
        ));
        let api = ManagementApi::new(identity, http, Arc::clone(&tokens), proofs);

        Ok(Self::new(tokens, api))
    }
}
