use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::JwtError;
use crate::clock::Clock;
use crate::clock::SystemClock;

/// A freshly signed token together with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens.
///
/// Uses HS256 (HMAC with SHA-256) with a secret fixed at construction.
/// Expiry is always judged against the codec's [`Clock`], never against the
/// JWT library's own notion of time, so that signature checks and expiry
/// checks can be performed independently.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Create a codec backed by the system clock.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens (should be stored securely)
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8]) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    /// Create a codec reading time from `clock`.
    pub fn with_clock(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            clock,
        }
    }

    /// Current instant according to the codec's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue a signed token for `login_id` valid for `ttl`.
    ///
    /// # Arguments
    /// * `login_id` - Login identifier to embed as subject
    /// * `ttl` - Lifetime of the token (must be positive)
    ///
    /// # Returns
    /// Signed token and its absolute expiry
    ///
    /// # Errors
    /// * `InvalidTtl` - Lifetime is zero, negative, or ends past the
    ///   representable range
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue(&self, login_id: &str, ttl: Duration) -> Result<IssuedToken, JwtError> {
        if ttl <= Duration::zero() {
            return Err(JwtError::InvalidTtl(format!(
                "expected a positive duration, got {}s",
                ttl.num_seconds()
            )));
        }

        let out_of_range = || JwtError::InvalidTtl("expiry out of range".to_string());
        let claims = Claims::new(login_id, self.clock.now(), ttl).ok_or_else(out_of_range)?;
        let expires_at = claims.expires_at().ok_or_else(out_of_range)?;

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify the signature and decode the claims, ignoring expiry.
    ///
    /// # Errors
    /// * `MalformedToken` - Signature is invalid or the token cannot be parsed
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| JwtError::MalformedToken(e.to_string()))
    }

    /// Extract the embedded login identifier without regard to expiry.
    ///
    /// # Errors
    /// * `MalformedToken` - Signature is invalid, the token cannot be parsed,
    ///   or the subject is empty
    pub fn extract_login_id(&self, token: &str) -> Result<String, JwtError> {
        let claims = self.decode(token)?;

        if claims.sub.trim().is_empty() {
            return Err(JwtError::MalformedToken("empty subject".to_string()));
        }

        Ok(claims.sub)
    }

    /// Whether the token's expiry lies in the past.
    ///
    /// Tokens that cannot be decoded count as expired.
    pub fn is_expired(&self, token: &str) -> bool {
        self.decode(token)
            .map(|claims| claims.is_expired(self.clock.now().timestamp()))
            .unwrap_or(true)
    }

    /// Decode a token that must be correctly signed and unexpired.
    ///
    /// # Errors
    /// * `MalformedToken` - Signature is invalid or the token cannot be parsed
    /// * `TokenExpired` - Token expiry lies in the past
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.decode(token)?;

        if claims.is_expired(self.clock.now().timestamp()) {
            return Err(JwtError::TokenExpired);
        }

        Ok(claims)
    }

    /// True iff the token is correctly signed, unexpired, and was issued for
    /// `expected_login_id`.
    pub fn validate(&self, token: &str, expected_login_id: &str) -> bool {
        self.verify(token)
            .map(|claims| claims.sub == expected_login_id)
            .unwrap_or(false)
    }
}
