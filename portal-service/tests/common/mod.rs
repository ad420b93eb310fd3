#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use auth::Authenticator;
use auth::ManualClock;
use auth::PasswordHasher;
use auth::TokenCodec;
use axum::extract::Path;
use axum::routing::get;
use axum::Json;
use axum::Router;
use portal_service::domain::user::models::AuthProvider;
use portal_service::domain::user::models::EmailAddress;
use portal_service::domain::user::models::LoginId;
pub use portal_service::domain::user::models::Role;
use portal_service::domain::user::models::UserId;
use portal_service::domain::user::models::UserRecord;
use portal_service::domain::user::ports::CredentialStore;
use portal_service::domain::user::service::IdentityService;
use portal_service::inbound::http::middleware::AuthenticatedContext;
use portal_service::inbound::http::middleware::CurrentPrincipal;
use portal_service::inbound::http::policy::AccessPolicy;
use portal_service::inbound::http::router::create_router;
use portal_service::inbound::http::router::AppState;
use portal_service::user::errors::UserError;
use serde_json::json;
use serde_json::Value;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const PASSWORD: &str = "pass_word!";

/// Credential store kept in memory; users can be added or removed while the
/// server runs.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryCredentialStore {
    pub fn insert(&self, user: UserRecord) {
        self.users.write().unwrap().insert(user.id, user);
    }

    pub fn remove(&self, id: &UserId) {
        self.users.write().unwrap().remove(id);
    }

    pub fn set_role(&self, id: &UserId, role: Role) {
        if let Some(user) = self.users.write().unwrap().get_mut(id) {
            user.role = role;
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_login_identifier(
        &self,
        login_id: &LoginId,
    ) -> Result<Option<UserRecord>, UserError> {
        let users = self.users.read().unwrap();
        Ok(users
            .values()
            .find(|user| {
                user.email.as_str().eq_ignore_ascii_case(login_id.as_str())
                    || user.username.as_deref() == Some(login_id.as_str())
            })
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, UserError> {
        Ok(self.users.read().unwrap().get(id).cloned())
    }
}

/// Seeded accounts.
pub struct TestUsers {
    pub alice: UserRecord,
    pub admin: UserRecord,
    pub gina: UserRecord,
}

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub clock: Arc<ManualClock>,
    pub authenticator: Arc<Authenticator>,
    pub store: Arc<InMemoryCredentialStore>,
    pub users: TestUsers,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let clock = Arc::new(ManualClock::starting_now());
        let authenticator = Arc::new(Authenticator::new(
            TokenCodec::with_clock(JWT_SECRET, clock.clone()),
            PasswordHasher::with_cost(4).unwrap(),
            chrono::Duration::hours(1),
        ));

        let store = Arc::new(InMemoryCredentialStore::default());
        let users = seed_users(&store, &authenticator);

        let identity_service = Arc::new(IdentityService::new(
            Arc::clone(&store),
            Arc::clone(&authenticator),
        ));

        let router = create_router(
            identity_service,
            Arc::clone(&authenticator),
            Arc::new(AccessPolicy::portal().expect("Portal policy is valid")),
            downstream_routes(),
        );

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::new(),
            clock,
            authenticator,
            store,
            users,
        }
    }

    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.api_client
            .request(method, format!("{}{}", self.address, path))
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::POST, path)
    }

    /// Helper to make PUT request
    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::PUT, path)
    }

    /// Helper to make DELETE request
    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::DELETE, path)
    }

    /// Sign in through the HTTP API and return the issued token.
    pub async fn sign_in(&self, login_id: &str, password: &str) -> String {
        let response = self
            .post("/api/auth/signin")
            .json(&json!({ "login_id": login_id, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"]["token"]
            .as_str()
            .expect("Token missing from sign-in response")
            .to_string()
    }

    /// Issue a token directly, bypassing sign-in.
    pub fn token_for(&self, login_id: &str) -> String {
        self.authenticator
            .issue_token(login_id)
            .expect("Failed to issue token")
            .access_token
    }
}

fn seed_users(store: &InMemoryCredentialStore, authenticator: &Authenticator) -> TestUsers {
    let alice = UserRecord {
        id: UserId::new(),
        email: EmailAddress::new("alice@example.com".to_string()).unwrap(),
        username: Some("alice".to_string()),
        password_hash: Some(authenticator.hash_password(PASSWORD).unwrap()),
        role: Role::User,
        auth_provider: AuthProvider::Local,
    };
    let admin = UserRecord {
        id: UserId::new(),
        email: EmailAddress::new("admin@example.com".to_string()).unwrap(),
        username: Some("admin".to_string()),
        password_hash: Some(authenticator.hash_password(PASSWORD).unwrap()),
        role: Role::Admin,
        auth_provider: AuthProvider::Local,
    };
    let gina = UserRecord {
        id: UserId::new(),
        email: EmailAddress::new("gina@example.com".to_string()).unwrap(),
        username: None,
        password_hash: None,
        role: Role::User,
        auth_provider: AuthProvider::Google,
    };

    store.insert(alice.clone());
    store.insert(admin.clone());
    store.insert(gina.clone());

    TestUsers { alice, admin, gina }
}

/// Stand-ins for the course catalog handlers that live outside this crate.
fn downstream_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Json(json!({ "service": "portal" })) }))
        .route("/users/all", get(|| async { Json(json!({ "courses": [] })) }))
        .route("/saved-courses", get(saved_courses))
        .route("/courses", get(caller).post(caller))
        .route("/courses/:id", get(course).put(course).delete(course))
        .route("/courses/:id/lessons", get(course).put(course))
        .route("/admin/stats", get(caller))
}

async fn saved_courses(CurrentPrincipal(principal): CurrentPrincipal) -> Json<Value> {
    Json(json!({
        "login_id": principal.login_id.as_str(),
        "courses": [],
    }))
}

async fn caller(context: AuthenticatedContext) -> Json<Value> {
    Json(json!({
        "login_id": context.principal().map(|p| p.login_id.as_str().to_string()),
    }))
}

async fn course(Path(id): Path<String>, context: AuthenticatedContext) -> Json<Value> {
    Json(json!({
        "course_id": id,
        "login_id": context.principal().map(|p| p.login_id.as_str().to_string()),
    }))
}
