use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::user::models::AuthProvider;
use crate::domain::user::models::Role;
use crate::inbound::http::middleware::CurrentPrincipal;
use crate::inbound::http::router::AppState;

pub async fn current_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<ApiSuccess<CurrentUserResponseData>, ApiError> {
    let user = state
        .identity_service
        .get_user(&principal.user_id)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        CurrentUserResponseData {
            user_id: principal.user_id.to_string(),
            login_id: principal.login_id.as_str().to_string(),
            email: user.email.as_str().to_string(),
            username: user.username,
            roles: principal.roles.into_iter().collect(),
            auth_provider: user.auth_provider,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUserResponseData {
    pub user_id: String,
    pub login_id: String,
    pub email: String,
    pub username: Option<String>,
    pub roles: Vec<Role>,
    pub auth_provider: AuthProvider,
}
