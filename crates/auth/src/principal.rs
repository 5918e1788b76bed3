use serde::Serialize;

use crate::JwtClaims;

/// Identity of an authenticated caller, extracted from verified claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    #[serde(rename = "ID")]
    pub subject_id: String,
    #[serde(rename = "UUID")]
    pub user_uuid: String,
}

impl From<JwtClaims> for Principal {
    fn from(claims: JwtClaims) -> Self {
        Self {
            subject_id: claims.id,
            user_uuid: claims.uuid,
        }
    }
}
