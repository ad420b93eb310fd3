use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::user::errors::EmailError;
use crate::user::errors::LoginIdError;
use crate::user::errors::UserError;

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which credential-store column a login identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginIdKind {
    Email,
    Username,
}

/// Identifier a user signs in with: either their email or their username.
///
/// Becomes the `sub` claim of every token issued to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoginId(String);

impl LoginId {
    const MAX_LENGTH: usize = 254;

    /// Create a login identifier from raw input.
    ///
    /// Surrounding whitespace is dropped.
    ///
    /// # Errors
    /// * `Empty` - Nothing left after trimming
    /// * `TooLong` - Longer than 254 characters
    pub fn new(raw: impl Into<String>) -> Result<Self, LoginIdError> {
        let raw = raw.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(LoginIdError::Empty);
        }

        let length = trimmed.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(LoginIdError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn kind(&self) -> LoginIdKind {
        if email_address::EmailAddress::is_valid(&self.0) {
            LoginIdKind::Email
        } else {
            LoginIdKind::Username
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = UserError;

    /// Accepts `ADMIN` as well as the prefixed `ROLE_ADMIN`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);

        match name {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(UserError::InvalidRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a user proves their identity at sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthProvider {
    /// Password checked against the stored hash
    Local,
    /// Identity confirmed by Google; no password is stored
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "LOCAL",
            AuthProvider::Google => "GOOGLE",
        }
    }
}

impl FromStr for AuthProvider {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(AuthProvider::Local),
            "GOOGLE" => Ok(AuthProvider::Google),
            _ => Err(UserError::InvalidAuthProvider(s.to_string())),
        }
    }
}

/// User as known to the credential store.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: EmailAddress,
    pub username: Option<String>,
    /// Absent for accounts created through an external identity provider
    pub password_hash: Option<String>,
    pub role: Role,
    pub auth_provider: AuthProvider,
}

/// Identity attached to an authenticated request.
///
/// Built from the credential store on every request; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub login_id: LoginId,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    /// Principal for `record`, identified by the login identifier the token
    /// was issued for.
    pub fn new(record: &UserRecord, login_id: LoginId) -> Self {
        Self {
            user_id: record.id,
            login_id,
            roles: BTreeSet::from([record.role]),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Command to sign in with a login identifier and password.
#[derive(Debug)]
pub struct SignInCommand {
    pub login_id: LoginId,
    pub password: String,
}

impl SignInCommand {
    pub fn new(login_id: LoginId, password: String) -> Self {
        Self { login_id, password }
    }
}

/// Everything the sign-in boundary hands back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub user_id: UserId,
    pub login_id: LoginId,
    pub role: Role,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub auth_provider: AuthProvider,
}
