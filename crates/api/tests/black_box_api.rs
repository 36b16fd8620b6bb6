use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use rollcall_api::app::{build_app, services::AppServices};
use rollcall_api::config::ApiConfig;
use rollcall_auth::{Credential, CredentialStore, Role, SecretHasher};
use rollcall_infra::{InMemoryCredentialStore, InMemoryStudentStore};

const SECRET: &str = "black-box-test-secret-0123456789abcdef";
const ORIGIN: &str = "http://localhost:3000";

struct TestServer {
    base_url: String,
    credentials: Arc<InMemoryCredentialStore>,
    services: Arc<AppServices>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod with cheap hashing, bound to an ephemeral port.
        let config = ApiConfig::with_secret(SECRET).unwrap();
        let credentials = InMemoryCredentialStore::arc();
        let services = AppServices::new(&config, credentials.clone(), InMemoryStudentStore::arc())
            .unwrap()
            .with_hasher(SecretHasher::with_cost(1024, 1, 1).unwrap())
            .unwrap();
        let services = Arc::new(services);
        services.seed(&config.admin).await.unwrap();

        let app = build_app(&config, services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            credentials,
            services,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Store a credential directly and hand back a freshly issued token for it.
    async fn user_token(&self, username: &str, roles: &[Role]) -> String {
        let credential = Credential::new(
            username,
            format!("{username}@example.com"),
            "unused",
            roles.iter().copied(),
        );
        self.credentials.save(credential).await.unwrap();
        self.services.codec().issue(username).unwrap().token
    }

    async fn signin(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/signin"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn admin_token(&self) -> String {
        let res = self.signin("root", "root").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, sub: &str, issued: ChronoDuration, lifetime: ChronoDuration) -> String {
    let iat = Utc::now() + issued;
    let claims = json!({
        "sub": sub,
        "iat": iat.timestamp(),
        "exp": (iat + lifetime).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn assert_failure(res: reqwest::Response, status: StatusCode, path: &str) {
    assert_eq!(res.status(), status);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], status.as_u16());
    assert_eq!(body["error"], status.canonical_reason().unwrap());
    assert_eq!(body["path"], path);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn public_listing_needs_no_token() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/api/students")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!([]));

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_role_cannot_delete() {
    let srv = TestServer::spawn().await;
    let token = srv.user_token("ann", &[Role::User]).await;

    let path = "/api/students/0190a000-0000-7000-8000-000000000000";
    let res = srv
        .client
        .delete(srv.url(path))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_failure(res, StatusCode::FORBIDDEN, path).await;
}

#[tokio::test]
async fn expired_token_is_unauthenticated() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(SECRET, "root", ChronoDuration::hours(-2), ChronoDuration::hours(1));

    let res = srv
        .client
        .get(srv.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_failure(res, StatusCode::UNAUTHORIZED, "/api/auth/me").await;
}

#[tokio::test]
async fn deleted_subject_is_unauthenticated() {
    let srv = TestServer::spawn().await;
    let token = srv.user_token("ann", &[Role::User]).await;

    let res = srv
        .client
        .get(srv.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    srv.credentials.remove("ann").unwrap();

    let res = srv
        .client
        .get(srv.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_failure(res, StatusCode::UNAUTHORIZED, "/api/auth/me").await;
}

#[tokio::test]
async fn malformed_authorization_header_is_unauthenticated() {
    let srv = TestServer::spawn().await;
    let token = srv.user_token("ann", &[Role::User]).await;

    for value in [token.clone(), format!("Token {token}"), "Bearer ".to_string(), "Bearer garbage".to_string()] {
        let res = srv
            .client
            .get(srv.url("/api/auth/me"))
            .header("Authorization", value)
            .send()
            .await
            .unwrap();
        assert_failure(res, StatusCode::UNAUTHORIZED, "/api/auth/me").await;
    }
}

#[tokio::test]
async fn foreign_signature_is_unauthenticated() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(
        "another-secret-entirely-0123456789abcdef",
        "root",
        ChronoDuration::zero(),
        ChronoDuration::hours(1),
    );

    let res = srv
        .client
        .get(srv.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() {
    let srv = TestServer::spawn().await;
    let token = srv.user_token("ann", &[Role::User]).await;

    let res = srv
        .client
        .get(srv.url("/api/auth/me"))
        .header("Authorization", format!("bEaReR {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_student_lifecycle() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    // Create
    let res = srv
        .client
        .post(srv.url("/api/students"))
        .bearer_auth(&token)
        .json(&json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "schoolNumber": "S-1",
            "birthDate": "2010-12-10",
            "studentClass": "2b",
            "courses": { "math": "A" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let location = res.headers()["location"].to_str().unwrap().to_string();
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(location, format!("/api/students/{id}"));
    assert_eq!(created["studentClass"], "2B");

    // Public read
    let res = srv.client.get(srv.url(&location)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: serde_json::Value = res.json().await.unwrap();
    assert_eq!(fetched["firstName"], "Ada");

    // Update keeps the school number
    let res = srv
        .client
        .put(srv.url(&location))
        .bearer_auth(&token)
        .json(&json!({
            "firstName": "Augusta",
            "lastName": "King",
            "schoolNumber": "S-999",
            "birthDate": "2010-12-10",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["firstName"], "Augusta");
    assert_eq!(updated["schoolNumber"], "S-1");

    // Delete
    let res = srv
        .client
        .delete(srv.url(&location))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.client.get(srv.url(&location)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], format!("Student not found with id: {id}"));
}

#[tokio::test]
async fn anonymous_write_is_unauthenticated() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/students"))
        .json(&json!({ "firstName": "Ada" }))
        .send()
        .await
        .unwrap();
    assert_failure(res, StatusCode::UNAUTHORIZED, "/api/students").await;
}

#[tokio::test]
async fn moderator_can_write() {
    let srv = TestServer::spawn().await;
    let token = srv.user_token("mo", &[Role::Moderator]).await;

    let res = srv
        .client
        .post(srv.url("/api/students"))
        .bearer_auth(&token)
        .json(&json!({ "firstName": "Ada" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn role_grant_applies_to_existing_token() {
    let srv = TestServer::spawn().await;
    let token = srv.user_token("ann", &[Role::User]).await;

    let mut ann = srv.credentials.lookup("ann").await.unwrap().unwrap();
    ann.roles.insert(Role::Admin);
    srv.credentials.save(ann).await.unwrap();

    let res = srv
        .client
        .get(srv.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["username"], "ann");
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "ROLE_ADMIN"));
}

#[tokio::test]
async fn signup_then_signin() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/auth/signup"))
        .json(&json!({
            "username": "ann",
            "email": "ann@example.com",
            "password": "hunter22",
            "role": ["mod"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User registered successfully!");

    let res = srv.signin("ann", "hunter22").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["username"], "ann");
    assert_eq!(body["email"], "ann@example.com");
    assert_eq!(body["roles"], json!(["ROLE_MODERATOR"]));
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn signup_rejects_taken_username_and_email() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/auth/signup"))
        .json(&json!({ "username": "root", "email": "new@example.com", "password": "secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Error: Username is already taken!");

    let res = srv
        .client
        .post(srv.url("/api/auth/signup"))
        .json(&json!({ "username": "new", "email": "root@example.com", "password": "secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Error: Email is already in use!");
}

#[tokio::test]
async fn signin_failures_do_not_reveal_existence() {
    let srv = TestServer::spawn().await;

    let wrong_password = srv.signin("root", "nope").await;
    let unknown_user = srv.signin("ghost", "nope").await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let a: serde_json::Value = wrong_password.json().await.unwrap();
    let b: serde_json::Value = unknown_user.json().await.unwrap();
    assert_eq!(a["message"], b["message"]);
}

#[tokio::test]
async fn signin_hashes_for_unknown_users_too() {
    let srv = TestServer::spawn().await;

    let before = srv.services.secret_checks();
    assert_eq!(srv.signin("root", "nope").await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(srv.services.secret_checks(), before + 1);

    assert_eq!(srv.signin("ghost", "nope").await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(srv.services.secret_checks(), before + 2);

    // The decoy secret itself never signs anyone in.
    assert_eq!(
        srv.signin("ghost", "rollcall-decoy-secret").await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn preflight_is_answered_before_authentication() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .request(reqwest::Method::OPTIONS, srv.url("/api/students"))
        .header("Origin", ORIGIN)
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "authorization")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    assert_eq!(res.headers()["access-control-allow-origin"], ORIGIN);
    assert_eq!(res.headers()["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn denials_carry_cors_headers() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .get(srv.url("/api/auth/me"))
        .header("Origin", ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["access-control-allow-origin"], ORIGIN);
}
