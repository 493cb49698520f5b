//! Token issuance and validation
//!
//! Compact signed credentials binding a subject identifier and a role claim,
//! with an absolute expiry. There is no refresh or revocation: a token is
//! valid for its full lifetime once issued.

use crate::core::errors::RegistrarError;
use crate::core::models::{Role, User, UserId};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// The identity and role extracted from a validated token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user id as a string
    pub sub: String,
    /// Display name, for logging only
    pub name: String,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Parse the subject back into a typed user id
    pub fn user_id(&self) -> Result<UserId, RegistrarError> {
        self.sub.parse().map_err(|_| RegistrarError::Unauthorized)
    }
}

/// Mints and validates HS256-signed identity tokens
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], issuer: &str, audience: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a token for the given user with the configured lifetime
    pub fn issue(&self, user: &User) -> Result<String, RegistrarError> {
        self.issue_with_ttl(user, self.ttl)
    }

    /// Issue a token with an explicit lifetime
    ///
    /// A non-positive lifetime yields an already-expired token; tests use
    /// this to exercise the expiry check without sleeping.
    pub fn issue_with_ttl(&self, user: &User, ttl: Duration) -> Result<String, RegistrarError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.user_id.to_string(),
            name: user.name.clone(),
            role: user.role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| RegistrarError::Infrastructure(format!("token signing failed: {}", e)))
    }

    /// Validate a token: signature, expiry, issuer, and audience
    ///
    /// Every failure collapses into the uniform Unauthorized error so a
    /// caller cannot distinguish which check rejected the token.
    pub fn validate(&self, token: &str) -> Result<Claims, RegistrarError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| RegistrarError::Unauthorized)
    }
}
