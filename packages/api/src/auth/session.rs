//! Session token codec.
//!
//! Tokens are HS256 JWTs carrying the user id and a 30 day expiry. Nothing is
//! stored server-side; a token is valid exactly as long as its signature and
//! `exp` claim check out.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Default token lifetime.
pub const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: Uuid,
    iat: i64,
    exp: i64,
}

pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::days(TOKEN_TTL_DAYS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user_id` expiring `ttl` from now.
    pub fn issue(&self, user_id: Uuid) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            id: user_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign session token");
            ApiError::Conflict("Failed to start a session. Try again".into())
        })
    }

    /// Check signature and expiry and return the embedded user id.
    pub fn verify(&self, token: &str) -> ApiResult<Uuid> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.id)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected session token");
                ApiError::InvalidToken
            })
    }
}
