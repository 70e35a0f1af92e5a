/*
 * Responsibility
 * - Load settings from the environment (.env is optional)
 * - Validate them up front: a missing or malformed value fails startup
 * - Describe where each signing key comes from (inline value or file path)
 */
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fmt};

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(env::var("APP_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where a piece of key material lives.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    Inline(String),
    File(PathBuf),
}

// Inline key material must not end up in logs.
impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Inline(_) => f.write_str("Inline(<redacted>)"),
            KeySource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// The service application this process authenticates as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    /// Org base URL, without a trailing slash.
    pub domain: String,
    pub client_id: String,
    pub scopes: Vec<String>,
}

impl ServiceIdentity {
    pub fn new(domain: &str, client_id: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            domain: domain.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            scopes,
        }
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}{}", self.domain, crate::api::v1::TOKEN_PATH)
    }

    /// Space-delimited scope parameter.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,
    pub identity: ServiceIdentity,

    // Signs the private_key_jwt client assertion
    pub client_assertion_key: KeySource,
    // Signs DPoP proofs; the public half is embedded in every proof header
    pub dpop_private_key: KeySource,
    pub dpop_public_jwk: KeySource,

    pub http_timeout: Duration,
    pub token_expiry_leeway_seconds: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let domain = required(&lookup, "OKTA_ORG_URL")?;
        let url = Url::parse(&domain).map_err(|_| ConfigError::Invalid("OKTA_ORG_URL"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("OKTA_ORG_URL"));
        }

        let client_id = required(&lookup, "OKTA_CLIENT_ID")?;

        let scopes = required(&lookup, "OKTA_SCOPES")?
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>();
        if scopes.is_empty() {
            return Err(ConfigError::Missing("OKTA_SCOPES"));
        }

        let client_assertion_key = key_source(
            &lookup,
            "OKTA_CC_PRIVATE_KEY",
            "OKTA_CC_PRIVATE_KEY_FILE",
            Some("\\n"),
        )?;
        let dpop_private_key = key_source(
            &lookup,
            "OKTA_DPOP_PRIVATE_KEY",
            "OKTA_DPOP_PRIVATE_KEY_FILE",
            Some("\\n"),
        )?;
        let dpop_public_jwk = key_source(
            &lookup,
            "OKTA_DPOP_PUBLIC_JWK",
            "OKTA_DPOP_PUBLIC_JWK_FILE",
            None,
        )?;

        let http_timeout_seconds = match lookup("HTTP_TIMEOUT_SECONDS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid("HTTP_TIMEOUT_SECONDS"))?,
            None => 30,
        };

        let token_expiry_leeway_seconds = match lookup("TOKEN_EXPIRY_LEEWAY_SECONDS") {
            Some(v) => v
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|s| (0..=86_400).contains(s))
                .ok_or(ConfigError::Invalid("TOKEN_EXPIRY_LEEWAY_SECONDS"))?,
            None => 60,
        };

        Ok(Self {
            app_env,
            identity: ServiceIdentity::new(&domain, client_id, scopes),
            client_assertion_key,
            dpop_private_key,
            dpop_public_jwk,
            http_timeout: Duration::from_secs(http_timeout_seconds),
            token_expiry_leeway_seconds,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or(ConfigError::Missing(key))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(key));
    }
    Ok(value.to_string())
}

/// Inline value wins over a file path. `unescape` expands literal "\n"
/// sequences so a PEM fits on a single env line.
fn key_source<F>(
    lookup: &F,
    inline_key: &'static str,
    file_key: &'static str,
    unescape: Option<&str>,
) -> Result<KeySource, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(inline_key) {
        if !value.trim().is_empty() {
            let value = match unescape {
                Some(seq) => value.replace(seq, "\n"),
                None => value,
            };
            return Ok(KeySource::Inline(value));
        }
    }

    match lookup(file_key) {
        Some(path) if !path.trim().is_empty() => Ok(KeySource::File(PathBuf::from(path.trim()))),
        _ => Err(ConfigError::Missing(file_key)),
    }
}
