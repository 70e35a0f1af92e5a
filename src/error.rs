/*
 * Responsibility
 * - One error type for key loading, signing, token acquisition and API calls
 * - Keep the token endpoint's status and body for terminal failures
 */
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read key material from {path}")]
    KeyLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid key material: {0}")]
    KeyFormat(String),

    #[error("failed to sign JWT")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("failed to generate random jti")]
    Entropy(#[source] getrandom::Error),

    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("token endpoint returned {status}: {body}")]
    AuthServer { status: StatusCode, body: String },

    #[error("no access token; call authenticate() first")]
    NotAuthenticated,
}

impl AuthError {
    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
