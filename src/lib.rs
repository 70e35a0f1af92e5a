//! Client-credentials access tokens bound to a DPoP key, and management API
//! calls made with them.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use okta_dpop_client::{config::Config, state::AppState};
//! use reqwest::Method;
//!
//! let state = AppState::from_config(&Config::from_env()?)?;
//! state.tokens.authenticate().await?;
//! let resp = state.api.call("/api/v1/users", Method::GET, None, None).await?;
//! println!("{}", resp.status());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;

pub use error::{AuthError, AuthResult};
