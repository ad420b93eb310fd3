use async_trait::async_trait;

use crate::domain::user::models::AuthProvider;
use crate::domain::user::models::LoginId;
use crate::domain::user::models::Principal;
use crate::domain::user::models::SignInCommand;
use crate::domain::user::models::SignInOutcome;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserRecord;
use crate::user::errors::SignInError;
use crate::user::errors::UserError;

/// Port for identity operations used by the HTTP layer.
#[async_trait]
pub trait IdentityServicePort: Send + Sync + 'static {
    /// Resolve the principal behind a token subject.
    ///
    /// Always consults the credential store; role changes take effect on the
    /// next request.
    ///
    /// # Errors
    /// * `NotFound` - No user with this login identifier
    /// * `DatabaseError` - Credential store lookup failed
    async fn resolve_principal(&self, login_id: &LoginId) -> Result<Principal, UserError>;

    /// Retrieve a user by internal identifier.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Credential store lookup failed
    async fn get_user(&self, id: &UserId) -> Result<UserRecord, UserError>;

    /// Check a password and issue an access token.
    ///
    /// # Errors
    /// * `CredentialMismatch` - Unknown login identifier, wrong password, or
    ///   an account without a local password
    /// * `Token` - Token could not be signed
    /// * `Internal` - Credential store or hashing worker failed
    async fn sign_in(&self, command: SignInCommand) -> Result<SignInOutcome, SignInError>;

    /// Issue an access token for an identity already confirmed by `provider`.
    ///
    /// The password check is skipped entirely.
    ///
    /// # Errors
    /// * `CredentialMismatch` - Unknown login identifier, or the account is
    ///   registered with a different provider
    /// * `Token` - Token could not be signed
    /// * `Internal` - Credential store lookup failed
    async fn sign_in_external(
        &self,
        login_id: &LoginId,
        provider: AuthProvider,
    ) -> Result<SignInOutcome, SignInError>;
}

/// Read access to the credential store.
///
/// Registration and password storage live outside this service.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Retrieve a user by email or username, depending on the identifier.
    ///
    /// # Returns
    /// Optional user record (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_login_identifier(
        &self,
        login_id: &LoginId,
    ) -> Result<Option<UserRecord>, UserError>;

    /// Retrieve a user by internal identifier.
    ///
    /// # Returns
    /// Optional user record (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, UserError>;
}
