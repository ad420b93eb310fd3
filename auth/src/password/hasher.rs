use bcrypt::hash;
use bcrypt::verify;
use bcrypt::DEFAULT_COST;

use super::errors::PasswordError;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Password hashing implementation.
///
/// Provides one-way adaptive hashing (bcrypt) with a random salt per call.
/// Stored hashes are self-describing (`$2b$<cost>$<salt><digest>`), so hashes
/// produced under an older cost factor keep verifying after the cost changes.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher using bcrypt's default cost factor.
    pub fn new() -> Self {
        Self { cost: DEFAULT_COST }
    }

    /// Create a hasher with an explicit cost factor.
    ///
    /// # Arguments
    /// * `cost` - bcrypt cost (log2 of the number of rounds)
    ///
    /// # Errors
    /// * `InvalidCost` - Cost lies outside bcrypt's supported range
    pub fn with_cost(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }

        Ok(Self { cost })
    }

    /// Configured cost factor.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password securely.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to hash
    ///
    /// # Returns
    /// Modular crypt format hash (includes version, cost, salt, and digest)
    ///
    /// # Errors
    /// * `HashingFailed` - Password hashing operation failed
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash(password, self.cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a password against a stored hash.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `hash` - Stored bcrypt hash
    ///
    /// # Returns
    /// True if password matches, false otherwise
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored value is not a bcrypt hash
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        verify(password, hash).map_err(|e| {
            PasswordError::VerificationFailed(format!("Invalid password hash: {}", e))
        })
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
