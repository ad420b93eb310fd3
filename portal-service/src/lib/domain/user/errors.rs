use auth::JwtError;
use thiserror::Error;

/// Error for LoginId validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoginIdError {
    #[error("Login identifier is empty")]
    Empty,

    #[error("Login identifier too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Top-level error for user lookups against the credential store
#[derive(Debug, Clone, Error)]
pub enum UserError {
    #[error("Invalid login identifier: {0}")]
    InvalidLoginId(#[from] LoginIdError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Unknown role: {0}")]
    InvalidRole(String),

    #[error("Unknown auth provider: {0}")]
    InvalidAuthProvider(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Error for sign-in attempts.
///
/// `CredentialMismatch` covers unknown login identifiers, wrong
/// passwords and accounts that cannot sign in with a password, so callers
/// cannot tell them apart.
#[derive(Debug, Clone, Error)]
pub enum SignInError {
    #[error("Invalid credentials")]
    CredentialMismatch,

    #[error("Token generation failed: {0}")]
    Token(#[from] JwtError),

    #[error("Internal error: {0}")]
    Internal(String),
}
