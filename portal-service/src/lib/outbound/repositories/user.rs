use async_trait::async_trait;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginId;
use crate::domain::user::models::LoginIdKind;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserRecord;
use crate::domain::user::ports::CredentialStore;
use crate::user::errors::UserError;

const SELECT_BY_EMAIL: &str = r#"
    SELECT id, email, username, password_hash, role, auth_provider
    FROM users
    WHERE lower(email) = lower($1)
"#;

const SELECT_BY_USERNAME: &str = r#"
    SELECT id, email, username, password_hash, role, auth_provider
    FROM users
    WHERE username = $1
"#;

const SELECT_BY_ID: &str = r#"
    SELECT id, email, username, password_hash, role, auth_provider
    FROM users
    WHERE id = $1
"#;

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: Option<String>,
    password_hash: Option<String>,
    role: String,
    auth_provider: String,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = UserError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRecord {
            id: UserId(row.id),
            email: EmailAddress::new(row.email)?,
            username: row.username,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            auth_provider: row.auth_provider.parse()?,
        })
    }
}

/// Credential store backed by an existing PostgreSQL `users` table.
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_by_login_identifier(
        &self,
        login_id: &LoginId,
    ) -> Result<Option<UserRecord>, UserError> {
        let query = match login_id.kind() {
            LoginIdKind::Email => SELECT_BY_EMAIL,
            LoginIdKind::Username => SELECT_BY_USERNAME,
        };

        let row = sqlx::query_as::<_, UserRow>(query)
            .bind(login_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(SELECT_BY_ID)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        row.map(UserRecord::try_from).transpose()
    }
}
