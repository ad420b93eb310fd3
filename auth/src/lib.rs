//! Authentication utilities library
//!
//! Provides the stateless authentication building blocks used by the portal:
//! - Password hashing (bcrypt)
//! - JWT issuance and validation against an injectable clock
//! - Sign-in coordination
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::with_cost(4).unwrap();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## JWT Tokens
//! ```
//! use auth::TokenCodec;
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!");
//! let issued = codec.issue("alice@example.com", Duration::hours(1)).unwrap();
//! assert_eq!(codec.extract_login_id(&issued.token).unwrap(), "alice@example.com");
//! assert!(codec.validate(&issued.token, "alice@example.com"));
//! ```
//!
//! ## Complete Authentication Flow
//! ```
//! use auth::{Authenticator, PasswordHasher, TokenCodec};
//! use chrono::Duration;
//!
//! let auth = Authenticator::new(
//!     TokenCodec::new(b"secret_key_at_least_32_bytes_long!"),
//!     PasswordHasher::with_cost(4).unwrap(),
//!     Duration::hours(24),
//! );
//!
//! // Credential store keeps the hash
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Sign-in: verify and issue token
//! let result = auth.authenticate("password123", &hash, "alice").unwrap();
//! assert!(auth.token_codec().validate(&result.access_token, "alice"));
//! ```

pub mod authenticator;
pub mod clock;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::AuthenticationResult;
pub use authenticator::Authenticator;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use jwt::Claims;
pub use jwt::IssuedToken;
pub use jwt::JwtError;
pub use jwt::TokenCodec;
pub use password::PasswordError;
pub use password::PasswordHasher;
