use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Payload carried by every access token.
///
/// Only the RFC 7519 claims the portal relies on are present: the login
/// identifier as subject plus issue and expiry instants (Unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (login identifier)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create claims for a login identifier valid for `ttl` from `issued_at`.
    ///
    /// # Arguments
    /// * `subject` - Login identifier to embed
    /// * `issued_at` - Issue instant
    /// * `ttl` - Lifetime of the token
    ///
    /// # Returns
    /// Claims with sub, iat and exp set, or None if the expiry falls outside
    /// chrono's range
    pub fn new(subject: impl ToString, issued_at: DateTime<Utc>, ttl: Duration) -> Option<Self> {
        let expiration = issued_at.checked_add_signed(ttl)?;

        Some(Self {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
        })
    }

    /// Login identifier carried in the token.
    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// Expiry as a timestamp, if it fits chrono's range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Check if token is expired.
    ///
    /// A token is still valid during the second named by `exp`.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }
}
