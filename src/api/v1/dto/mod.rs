pub mod token_request;
pub mod token_response;

pub use token_request::TokenRequest;
pub use token_response::{TokenErrorResponse, TokenResponse};
