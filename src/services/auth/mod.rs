pub mod client_assertion;
pub mod dpop;
pub mod jwt;
pub mod keys;
pub mod token_service;

pub use client_assertion::ClientAssertionBuilder;
pub use dpop::{DpopProofBuilder, generate_ath};
pub use keys::{DpopKeyPair, KeyMaterial, SigningKey};
pub use token_service::{AccessToken, TokenService};
