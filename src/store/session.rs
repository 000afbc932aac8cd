use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

/// A signed-in user of the managed store.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub access_token: String,
}

impl Session {
    /// Reads the owner id out of a platform-issued access token.
    ///
    /// The signature is not checked here: the store verifies it on every
    /// request and row-level policies scope the data. Expiry is still enforced.
    pub fn from_access_token(token: &str) -> Result<Self, StoreError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| StoreError::InvalidToken(e.to_string()))?;
        let claims = data.claims;

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| StoreError::InvalidToken(format!("bad exp {}", claims.exp)))?;

        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            expires_at,
            access_token: token.to_string(),
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
