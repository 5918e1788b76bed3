//! `roster-auth`: bearer-token verification.
//!
//! Decoupled from HTTP and storage: callers hand in the raw token and get back
//! a [`Principal`] or a uniform [`AuthError::Unauthorized`].

pub mod claims;
pub mod principal;
pub mod validator;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use principal::Principal;
pub use validator::{AuthError, Hs256JwtValidator, JwtValidator};
