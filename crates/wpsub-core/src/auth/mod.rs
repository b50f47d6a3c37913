//! Auth primitives (signing key + bearer token minting).

pub mod token;

pub use token::{ClaimMap, SigningKey, TokenClaims, TokenSigner, DEFAULT_TOKEN_TTL_SECS};
