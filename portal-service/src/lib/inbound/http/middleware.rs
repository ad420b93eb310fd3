use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::user::models::LoginId;
use crate::domain::user::models::Principal;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

const BEARER_PREFIX: &str = "Bearer ";

/// Identity of the caller for the current request.
///
/// Inserted into request extensions by [`authenticate`] and dropped with the
/// request. Anonymous when no usable token was presented.
#[derive(Debug, Clone, Default)]
pub struct AuthenticatedContext {
    principal: Option<Principal>,
}

impl AuthenticatedContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthenticatedContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Extractor for handlers that cannot run without a principal.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedContext>()
            .and_then(AuthenticatedContext::principal)
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// Middleware that turns a bearer token into an [`AuthenticatedContext`].
///
/// Never rejects: every failure leaves the request anonymous and the
/// decision to refuse it is left to [`authorize`].
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = bearer_token(req.headers()).map(str::to_owned);
    let existing = req.extensions().get::<AuthenticatedContext>().cloned();

    let context = resolve_context(&state, token.as_deref(), existing).await;
    req.extensions_mut().insert(context);

    next.run(req).await
}

/// Middleware that enforces the access policy against the published context.
pub async fn authorize(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let decision = {
        let principal = req
            .extensions()
            .get::<AuthenticatedContext>()
            .and_then(AuthenticatedContext::principal);

        state
            .access_policy
            .authorize(req.method(), req.uri().path(), principal)
    };

    if let Err(denied) = decision {
        tracing::debug!(
            method = %req.method(),
            path = %req.uri().path(),
            reason = %denied,
            "Request denied by access policy"
        );
        return Err(ApiError::from(denied));
    }

    Ok(next.run(req).await)
}

/// Token from an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

async fn resolve_context(
    state: &AppState,
    token: Option<&str>,
    existing: Option<AuthenticatedContext>,
) -> AuthenticatedContext {
    let Some(token) = token else {
        return AuthenticatedContext::anonymous();
    };

    let codec = state.authenticator.token_codec();

    let subject = match codec.extract_login_id(token) {
        Ok(subject) => subject,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unusable bearer token");
            return AuthenticatedContext::anonymous();
        }
    };

    if let Some(existing) = existing.filter(AuthenticatedContext::is_authenticated) {
        return existing;
    }

    let login_id = match LoginId::new(subject) {
        Ok(login_id) => login_id,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring token with invalid subject");
            return AuthenticatedContext::anonymous();
        }
    };

    let principal = match state.identity_service.resolve_principal(&login_id).await {
        Ok(principal) => principal,
        Err(UserError::NotFound(_)) => {
            tracing::debug!(login_id = %login_id, "Token subject no longer exists");
            return AuthenticatedContext::anonymous();
        }
        Err(e) => {
            tracing::warn!(login_id = %login_id, error = %e, "Principal resolution failed");
            return AuthenticatedContext::anonymous();
        }
    };

    if !codec.validate(token, login_id.as_str()) {
        tracing::debug!(login_id = %login_id, "Token expired or issued for another subject");
        return AuthenticatedContext::anonymous();
    }

    AuthenticatedContext::authenticated(principal)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use auth::Authenticator;
    use auth::PasswordHasher;
    use auth::TokenCodec;
    use axum::http::HeaderValue;
    use chrono::Duration;
    use mockall::mock;

    use super::*;
    use crate::domain::user::models::AuthProvider;
    use crate::domain::user::models::Role;
    use crate::domain::user::models::SignInCommand;
    use crate::domain::user::models::SignInOutcome;
    use crate::domain::user::models::UserId;
    use crate::domain::user::models::UserRecord;
    use crate::domain::user::ports::IdentityServicePort;
    use crate::inbound::http::policy::AccessPolicy;
    use crate::user::errors::SignInError;

    mock! {
        pub TestIdentityService {}

        #[async_trait]
        impl IdentityServicePort for TestIdentityService {
            async fn resolve_principal(&self, login_id: &LoginId) -> Result<Principal, UserError>;
            async fn get_user(&self, id: &UserId) -> Result<UserRecord, UserError>;
            async fn sign_in(&self, command: SignInCommand) -> Result<SignInOutcome, SignInError>;
            async fn sign_in_external(&self, login_id: &LoginId, provider: AuthProvider) -> Result<SignInOutcome, SignInError>;
        }
    }

    const SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

    fn state(identity_service: MockTestIdentityService) -> AppState {
        AppState {
            identity_service: Arc::new(identity_service),
            authenticator: Arc::new(Authenticator::new(
                TokenCodec::new(SECRET),
                PasswordHasher::with_cost(4).unwrap(),
                Duration::hours(1),
            )),
            access_policy: Arc::new(AccessPolicy::portal().unwrap()),
        }
    }

    fn principal(login_id: &str) -> Principal {
        Principal {
            user_id: UserId::new(),
            login_id: LoginId::new(login_id).unwrap(),
            roles: BTreeSet::from([Role::User]),
        }
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_no_token_is_anonymous() {
        let mut identity_service = MockTestIdentityService::new();
        identity_service.expect_resolve_principal().never();

        let context = resolve_context(&state(identity_service), None, None).await;
        assert!(!context.is_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_token_skips_resolution() {
        let mut identity_service = MockTestIdentityService::new();
        identity_service.expect_resolve_principal().never();

        let context =
            resolve_context(&state(identity_service), Some("not.a.token"), None).await;
        assert!(!context.is_authenticated());
    }

    #[tokio::test]
    async fn test_valid_token_resolves_principal() {
        let mut identity_service = MockTestIdentityService::new();
        identity_service
            .expect_resolve_principal()
            .times(1)
            .returning(|login_id| Ok(principal(login_id.as_str())));

        let state = state(identity_service);
        let issued = state
            .authenticator
            .token_codec()
            .issue("alice@example.com", Duration::hours(1))
            .unwrap();

        let context = resolve_context(&state, Some(&issued.token), None).await;
        assert_eq!(
            context.principal().map(|p| p.login_id.as_str()),
            Some("alice@example.com")
        );
    }

    #[tokio::test]
    async fn test_unknown_subject_is_anonymous() {
        let mut identity_service = MockTestIdentityService::new();
        identity_service
            .expect_resolve_principal()
            .returning(|login_id| Err(UserError::NotFound(login_id.to_string())));

        let state = state(identity_service);
        let issued = state
            .authenticator
            .token_codec()
            .issue("deleted@example.com", Duration::hours(1))
            .unwrap();

        let context = resolve_context(&state, Some(&issued.token), None).await;
        assert!(!context.is_authenticated());
    }

    #[tokio::test]
    async fn test_store_failure_is_anonymous() {
        let mut identity_service = MockTestIdentityService::new();
        identity_service
            .expect_resolve_principal()
            .returning(|_| Err(UserError::DatabaseError("connection reset".to_string())));

        let state = state(identity_service);
        let issued = state
            .authenticator
            .token_codec()
            .issue("alice@example.com", Duration::hours(1))
            .unwrap();

        let context = resolve_context(&state, Some(&issued.token), None).await;
        assert!(!context.is_authenticated());
    }

    #[tokio::test]
    async fn test_existing_principal_is_kept() {
        let mut identity_service = MockTestIdentityService::new();
        identity_service.expect_resolve_principal().never();

        let state = state(identity_service);
        let issued = state
            .authenticator
            .token_codec()
            .issue("alice@example.com", Duration::hours(1))
            .unwrap();
        let existing = AuthenticatedContext::authenticated(principal("alice@example.com"));

        let context = resolve_context(&state, Some(&issued.token), Some(existing)).await;
        assert!(context.is_authenticated());
    }
}
