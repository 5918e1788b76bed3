//! Token verification (HS256 shared secret).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use thiserror::Error;

use crate::{JwtClaims, Principal, TokenValidationError, validate_claims};

/// Every verification failure collapses to this; the cause is only logged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("unauthorized")]
    Unauthorized,
}

impl From<TokenValidationError> for AuthError {
    fn from(err: TokenValidationError) -> Self {
        tracing::debug!(error = %err, "token rejected");
        AuthError::Unauthorized
    }
}

pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError>;
}

/// HS256 validator keyed by a shared secret.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller-supplied clock in `validate_claims`.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    fn decode(&self, token: &str) -> Result<JwtClaims, TokenValidationError> {
        decode::<JwtClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let claims = self.decode(token)?;
        validate_claims(&claims, now)?;
        Ok(Principal::from(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &[u8] = b"test-secret";

    fn mint(secret: &[u8], exp: i64) -> String {
        let claims = JwtClaims {
            id: "u1".into(),
            uuid: "2f1d0b7e-4b43-4b8e-9a51-3c54e6f6a001".into(),
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_principal() {
        let now = Utc::now();
        let token = mint(SECRET, now.timestamp() + 300);
        let principal = Hs256JwtValidator::new(SECRET).validate(&token, now).unwrap();
        assert_eq!(principal.subject_id, "u1");
        assert_eq!(principal.user_uuid, "2f1d0b7e-4b43-4b8e-9a51-3c54e6f6a001");
    }

    #[test]
    fn failures_are_uniformly_unauthorized() {
        let now = Utc::now();
        let validator = Hs256JwtValidator::new(SECRET);

        let wrong_secret = mint(b"other-secret", now.timestamp() + 300);
        let expired = mint(SECRET, now.timestamp() - 1);

        for token in [wrong_secret.as_str(), expired.as_str(), "not.a.jwt", ""] {
            assert_eq!(
                validator.validate(token, now),
                Err(AuthError::Unauthorized),
                "token {token:?} should be rejected"
            );
        }
    }
}
