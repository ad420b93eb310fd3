use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::INVALID_CREDENTIALS;
use crate::domain::user::models::AuthProvider;
use crate::domain::user::models::LoginId;
use crate::domain::user::models::Role;
use crate::domain::user::models::SignInCommand;
use crate::domain::user::models::SignInOutcome;
use crate::inbound::http::router::AppState;

pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequestBody>,
) -> Result<ApiSuccess<SignInResponseData>, ApiError> {
    // Malformed identifiers get the same answer as unknown ones.
    let login_id = LoginId::new(body.login_id)
        .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    state
        .identity_service
        .sign_in(SignInCommand::new(login_id, body.password))
        .await
        .map_err(ApiError::from)
        .map(|ref outcome| ApiSuccess::new(StatusCode::OK, outcome.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignInRequestBody {
    login_id: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInResponseData {
    pub user_id: String,
    pub login_id: String,
    pub role: Role,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub auth_provider: AuthProvider,
}

impl From<&SignInOutcome> for SignInResponseData {
    fn from(outcome: &SignInOutcome) -> Self {
        Self {
            user_id: outcome.user_id.to_string(),
            login_id: outcome.login_id.as_str().to_string(),
            role: outcome.role,
            token: outcome.token.clone(),
            expires_at: outcome.expires_at,
            auth_provider: outcome.auth_provider,
        }
    }
}
