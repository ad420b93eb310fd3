use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::JwtError;
use crate::jwt::TokenCodec;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Sign-in coordinator combining password verification and token issuance.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    token_codec: TokenCodec,
    token_ttl: Duration,
}

/// Result of successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    /// JWT access token
    pub access_token: String,
    /// Instant after which the token no longer validates
    pub expires_at: DateTime<Utc>,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `token_codec` - Codec used to sign issued tokens
    /// * `password_hasher` - Hasher used to check presented passwords
    /// * `token_ttl` - Lifetime of every issued token
    pub fn new(
        token_codec: TokenCodec,
        password_hasher: PasswordHasher,
        token_ttl: Duration,
    ) -> Self {
        Self {
            password_hasher,
            token_codec,
            token_ttl,
        }
    }

    pub fn token_codec(&self) -> &TokenCodec {
        &self.token_codec
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Verify credentials and issue a token for `login_id`.
    ///
    /// CPU-bound: callers on an async runtime should run this on a blocking
    /// worker.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash
    /// * `login_id` - Login identifier to embed in the token
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Stored hash could not be checked
    /// * `JwtError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        login_id: &str,
    ) -> Result<AuthenticationResult, AuthenticationError> {
        let is_valid = self.password_hasher.verify(password, stored_hash)?;

        if !is_valid {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.issue_token(login_id)?)
    }

    /// Spend the work of one password check, then fail.
    ///
    /// For sign-in attempts with no stored hash to check against (unknown
    /// login identifier, externally managed account), so they take as long
    /// to reject as a wrong password. CPU-bound like [`authenticate`](Self::authenticate).
    pub fn reject(&self, password: &str) -> AuthenticationError {
        // Hashing at the configured cost costs the same as verifying.
        let _ = self.password_hasher.hash(password);
        AuthenticationError::InvalidCredentials
    }

    /// Issue a token without password verification.
    ///
    /// For sign-in flows where identity was confirmed by an external provider.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn issue_token(&self, login_id: &str) -> Result<AuthenticationResult, JwtError> {
        let issued = self.token_codec.issue(login_id, self.token_ttl)?;

        Ok(AuthenticationResult {
            access_token: issued.token,
            expires_at: issued.expires_at,
        })
    }
}
