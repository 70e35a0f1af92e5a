//! Wire contract of the org authorization server and management API.

pub mod dto;

/// Token endpoint, relative to the org domain.
pub const TOKEN_PATH: &str = "/oauth2/v1/token";

/// Management API user listing.
pub const USERS_PATH: &str = "/api/v1/users";

/// Response header carrying a server-issued DPoP nonce.
pub const DPOP_NONCE_HEADER: &str = "dpop-nonce";

/// Request header carrying the DPoP proof.
pub const DPOP_HEADER: &str = "dpop";

/// `error` value of a nonce challenge (HTTP 400).
pub const USE_DPOP_NONCE: &str = "use_dpop_nonce";
