use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by a roster bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Human-assigned user ID of the subject.
    #[serde(rename = "ID")]
    pub id: String,

    /// System UUID of the subject.
    #[serde(rename = "UUID")]
    pub uuid: String,

    /// Expiration, seconds since the Unix epoch.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token carries no subject")]
    MissingSubject,

    #[error("token could not be decoded: {0}")]
    Malformed(String),
}

/// Deterministically validate decoded claims against `now`.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.id.is_empty() && claims.uuid.is_empty() {
        return Err(TokenValidationError::MissingSubject);
    }
    if now.timestamp() >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_claims(exp: i64) -> JwtClaims {
        JwtClaims {
            id: "u1".into(),
            uuid: "2f1d0b7e-4b43-4b8e-9a51-3c54e6f6a001".into(),
            exp,
        }
    }

    #[test]
    fn accepts_unexpired_claims() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(validate_claims(&test_claims(now.timestamp() + 60), now).is_ok());
    }

    #[test]
    fn rejects_expired_claims() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            validate_claims(&test_claims(now.timestamp()), now),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn rejects_claims_without_subject() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let claims = JwtClaims {
            id: String::new(),
            uuid: String::new(),
            exp: now.timestamp() + 60,
        };
        assert_eq!(
            validate_claims(&claims, now),
            Err(TokenValidationError::MissingSubject)
        );
    }
}
