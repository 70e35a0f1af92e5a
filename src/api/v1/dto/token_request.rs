use serde::Serialize;

pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const CLIENT_ASSERTION_TYPE_JWT_BEARER: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Form body for the token endpoint (`application/x-www-form-urlencoded`).
///
/// Client authentication is `private_key_jwt`: no secret is sent, only the
/// signed `client_assertion`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'static str,
    pub scope: &'a str,
    pub client_assertion_type: &'static str,
    pub client_assertion: &'a str,
}

impl<'a> TokenRequest<'a> {
    pub fn client_credentials(scope: &'a str, client_assertion: &'a str) -> Self {
        Self {
            grant_type: GRANT_TYPE_CLIENT_CREDENTIALS,
            scope,
            client_assertion_type: CLIENT_ASSERTION_TYPE_JWT_BEARER,
            client_assertion,
        }
    }
}
