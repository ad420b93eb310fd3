use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::AuthenticationResult;
use auth::Authenticator;

use crate::domain::user::models::AuthProvider;
use crate::domain::user::models::LoginId;
use crate::domain::user::models::Principal;
use crate::domain::user::models::SignInCommand;
use crate::domain::user::models::SignInOutcome;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserRecord;
use crate::user::errors::SignInError;
use crate::user::errors::UserError;
use crate::user::ports::CredentialStore;
use crate::user::ports::IdentityServicePort;

/// Domain service implementation for identity operations.
///
/// Concrete implementation of IdentityServicePort over an injected
/// credential store.
pub struct IdentityService<CS>
where
    CS: CredentialStore,
{
    store: Arc<CS>,
    authenticator: Arc<Authenticator>,
}

impl<CS> IdentityService<CS>
where
    CS: CredentialStore,
{
    /// Create a new identity service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Credential store implementation
    /// * `authenticator` - Password verification and token issuance
    pub fn new(store: Arc<CS>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            store,
            authenticator,
        }
    }

    async fn find_for_sign_in(&self, login_id: &LoginId) -> Result<UserRecord, SignInError> {
        match self.store.find_by_login_identifier(login_id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                tracing::debug!(login_id = %login_id, "Sign-in for unknown login identifier");
                Err(SignInError::CredentialMismatch)
            }
            Err(e) => {
                tracing::error!(error = %e, "Credential store lookup failed during sign-in");
                Err(SignInError::Internal(e.to_string()))
            }
        }
    }

    /// Fail a sign-in with no stored hash to check, after the same hashing
    /// work a wrong password costs.
    async fn reject(&self, password: String) -> SignInError {
        let authenticator = Arc::clone(&self.authenticator);
        if let Err(e) = tokio::task::spawn_blocking(move || authenticator.reject(&password)).await {
            tracing::warn!(error = %e, "Decoy password check did not complete");
        }

        SignInError::CredentialMismatch
    }

    fn outcome(
        user: &UserRecord,
        login_id: LoginId,
        result: AuthenticationResult,
    ) -> SignInOutcome {
        SignInOutcome {
            user_id: user.id,
            login_id,
            role: user.role,
            token: result.access_token,
            expires_at: result.expires_at,
            auth_provider: user.auth_provider,
        }
    }
}

#[async_trait]
impl<CS> IdentityServicePort for IdentityService<CS>
where
    CS: CredentialStore,
{
    async fn resolve_principal(&self, login_id: &LoginId) -> Result<Principal, UserError> {
        self.store
            .find_by_login_identifier(login_id)
            .await?
            .map(|ref user| Principal::new(user, login_id.clone()))
            .ok_or(UserError::NotFound(login_id.to_string()))
    }

    async fn get_user(&self, id: &UserId) -> Result<UserRecord, UserError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }

    async fn sign_in(&self, command: SignInCommand) -> Result<SignInOutcome, SignInError> {
        let user = match self.find_for_sign_in(&command.login_id).await {
            Ok(user) => user,
            Err(SignInError::CredentialMismatch) => {
                return Err(self.reject(command.password).await);
            }
            Err(e) => return Err(e),
        };

        let stored_hash = match (&user.auth_provider, &user.password_hash) {
            (AuthProvider::Local, Some(hash)) => hash.clone(),
            _ => {
                tracing::debug!(
                    user_id = %user.id,
                    auth_provider = user.auth_provider.as_str(),
                    "Password sign-in for account without local password"
                );
                return Err(self.reject(command.password).await);
            }
        };

        // bcrypt blocks for the whole cost factor.
        let authenticator = Arc::clone(&self.authenticator);
        let password = command.password;
        let subject = command.login_id.as_str().to_string();
        let result = tokio::task::spawn_blocking(move || {
            authenticator.authenticate(&password, &stored_hash, &subject)
        })
        .await
        .map_err(|e| SignInError::Internal(format!("Task join error: {}", e)))?;

        match result {
            Ok(result) => {
                tracing::info!(user_id = %user.id, role = %user.role, "User signed in");
                Ok(Self::outcome(&user, command.login_id, result))
            }
            Err(AuthenticationError::InvalidCredentials) => {
                tracing::debug!(user_id = %user.id, "Password mismatch");
                Err(SignInError::CredentialMismatch)
            }
            Err(AuthenticationError::PasswordError(e)) => {
                tracing::warn!(user_id = %user.id, error = %e, "Stored password hash unusable");
                Err(SignInError::CredentialMismatch)
            }
            Err(AuthenticationError::JwtError(e)) => Err(SignInError::Token(e)),
        }
    }

    async fn sign_in_external(
        &self,
        login_id: &LoginId,
        provider: AuthProvider,
    ) -> Result<SignInOutcome, SignInError> {
        let user = self.find_for_sign_in(login_id).await?;

        if user.auth_provider != provider {
            tracing::debug!(
                user_id = %user.id,
                expected = user.auth_provider.as_str(),
                presented = provider.as_str(),
                "Sign-in through a provider the account is not registered with"
            );
            return Err(SignInError::CredentialMismatch);
        }

        let result = self.authenticator.issue_token(login_id.as_str())?;
        tracing::info!(
            user_id = %user.id,
            auth_provider = provider.as_str(),
            "User signed in through external provider"
        );

        Ok(Self::outcome(&user, login_id.clone(), result))
    }
}
