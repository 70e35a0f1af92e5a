pub mod core;
pub mod types;

pub use self::core::{DPOP_JWT_TYP, DpopProofBuilder, generate_ath};
pub use self::types::AdditionalClaims;
