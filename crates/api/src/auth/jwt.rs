//! Bearer token issuance and validation (HS256 JWT)

use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::MAX_TIME_WINDOW;

/// Claims embedded in every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id, as a decimal string
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token so two logins in the same second revoke independently
    pub jti: String,
}

/// A freshly signed token plus the metadata the login response needs.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token")]
    Invalid,
    #[error("token subject is not an identity id")]
    MalformedSubject,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, expiration: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against our own clock in `validate_at`
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiration: expiration.min(MAX_TIME_WINDOW),
        }
    }

    pub fn issue(
        &self,
        identity_id: i64,
        username: &str,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, TokenError> {
        // `exp` has whole-second resolution; report the same instant to callers
        let expires_at = now + self.expiration;
        let expires_at =
            expires_at - time::Duration::nanoseconds(i64::from(expires_at.nanosecond()));
        let jti = Uuid::new_v4().to_string();
        let claims = Claims {
            sub: identity_id.to_string(),
            username: username.to_string(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            jti: jti.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            token,
            jti,
            issued_at: now,
            expires_at,
        })
    }

    /// Signature-checked claims. Expiry is not checked here.
    pub fn claims(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token failed to decode");
                TokenError::Invalid
            })
    }

    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    /// True iff the signature verifies and the token expires after `now`.
    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> bool {
        match self.claims(token) {
            Ok(claims) => claims.exp > now.unix_timestamp(),
            Err(_) => false,
        }
    }

    pub fn username_of(&self, token: &str) -> Result<String, TokenError> {
        self.claims(token).map(|claims| claims.username)
    }

    pub fn subject_id_of(&self, token: &str) -> Result<i64, TokenError> {
        self.claims(token)?
            .sub
            .parse()
            .map_err(|_| TokenError::MalformedSubject)
    }
}

/// Shortened token for log lines; full tokens are never logged.
pub fn token_prefix(token: &str) -> &str {
    token.get(..12).unwrap_or(token)
}
