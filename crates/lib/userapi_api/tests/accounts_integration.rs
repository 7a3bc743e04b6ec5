//! Integration tests: build the router over an in-memory store and drive it
//! with `oneshot` requests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use userapi_api::{AppState, config::ApiConfig};
use userapi_core::models::account::{Account, NewAccount, Role};
use userapi_core::store::{AccountStore, MemoryAccountStore, StoreError};
use uuid::Uuid;

fn test_config() -> ApiConfig {
    ApiConfig {
        jwt_secret: "test-secret".into(),
        bcrypt_cost: 4,
        ..ApiConfig::default()
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    store: Arc<MemoryAccountStore>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(MemoryAccountStore::new());
        let state = AppState::new(store.clone(), config);
        Self {
            router: userapi_api::router(state.clone()),
            state,
            store,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        self.raw(builder.body(body).unwrap()).await
    }

    async fn raw(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse JSON")
        };
        (status, json)
    }

    /// Sign up and return (token, user id).
    async fn sign_up(&self, email: &str, username: &str) -> (String, String) {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/auth/signup",
                None,
                Some(json!({
                    "email": email,
                    "username": username,
                    "password": "password123",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Insert an admin directly into the store and mint a token for it.
    async fn admin_token(&self) -> String {
        let account = self
            .store
            .create(NewAccount {
                email: "root@example.com".into(),
                username: "root".into(),
                password_hash: "unused".into(),
                first_name: "Root".into(),
                last_name: "Admin".into(),
                is_active: true,
                role: Role::Admin,
            })
            .await
            .unwrap();
        self.state.service.tokens().issue(&account).unwrap()
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["data"]["timestamp"].is_i64());
}

#[tokio::test]
async fn sign_up_returns_token_and_user_without_password() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "ada@example.com",
                "username": "ada",
                "password": "password123",
                "first_name": "Ada",
                "last_name": "Lovelace",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let user = &body["data"]["user"];
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["role"], "user");
    assert_eq!(user["is_active"], true);
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());
    assert!(body["data"]["token"].as_str().unwrap().split('.').count() == 3);
}

#[tokio::test]
async fn sign_up_duplicates_conflict() {
    let app = TestApp::new();
    app.sign_up("ada@example.com", "ada").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "ada@example.com", "username": "other", "password": "password123",
                "first_name": "A", "last_name": "B",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"success": false, "error": "user already exists"}));

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "new@example.com", "username": "ada", "password": "password123",
                "first_name": "A", "last_name": "B",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "username already exists");
}

#[tokio::test]
async fn concurrent_duplicate_sign_up_has_one_winner() {
    let app = Arc::new(TestApp::new());
    let attempt = |username: &'static str| {
        let app = app.clone();
        tokio::spawn(async move {
            app.send(
                "POST",
                "/api/v1/auth/signup",
                None,
                Some(json!({
                    "email": "race@example.com", "username": username,
                    "password": "password123", "first_name": "A", "last_name": "B",
                })),
            )
            .await
            .0
        })
    };
    let a = attempt("first");
    let b = attempt("second");
    let mut statuses = vec![a.await.unwrap(), b.await.unwrap()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn sign_up_validation_lists_every_field() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({ "email": "nope", "username": "a_b", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(
        body["data"],
        json!([
            "email must be a valid email address",
            "first_name must be between 1 and 50 characters long",
            "last_name must be between 1 and 50 characters long",
            "password must be between 8 and 100 characters long",
            "username must contain only alphanumeric characters",
        ])
    );
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = TestApp::new();
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/signin")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.raw(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Invalid request body"}));
}

#[tokio::test]
async fn sign_in_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.sign_up("ada@example.com", "ada").await;

    let wrong_password = app
        .send(
            "POST",
            "/api/v1/auth/signin",
            None,
            Some(json!({"email": "ada@example.com", "password": "wrong-password"})),
        )
        .await;
    let unknown_email = app
        .send(
            "POST",
            "/api/v1/auth/signin",
            None,
            Some(json!({"email": "ghost@example.com", "password": "password123"})),
        )
        .await;
    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password.1["error"], "invalid credentials");

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/signin",
            None,
            Some(json!({"email": "ada@example.com", "password": "password123"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "ada");
}

#[tokio::test]
async fn profile_requires_well_formed_bearer_token() {
    let app = TestApp::new();
    let (token, id) = app.sign_up("ada@example.com", "ada").await;

    let (status, body) = app.send("GET", "/api/v1/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header required");

    for value in [format!("Token {token}"), format!("Bearer  {token}"), "Bearer".into()] {
        let req = Request::builder()
            .uri("/api/v1/profile")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap();
        let (status, body) = app.raw(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid authorization header format");
    }

    let (status, body) = app
        .send("GET", "/api/v1/profile", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");

    let (status, body) = app.send("GET", "/api/v1/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());
}

#[tokio::test]
async fn get_user_by_id() {
    let app = TestApp::new();
    let (token, id) = app.sign_up("ada@example.com", "ada").await;

    let (status, body) = app
        .send("GET", &format!("/api/v1/users/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "ada");

    let (status, body) = app
        .send("GET", "/api/v1/users/not-an-id", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid user ID");

    let (status, _) = app
        .send(
            "GET",
            "/api/v1/users/00000000-0000-0000-0000-000000000000",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_is_self_or_admin() {
    let app = TestApp::new();
    let (ada_token, ada_id) = app.sign_up("ada@example.com", "ada").await;
    let (_, bob_id) = app.sign_up("bob@example.com", "bob").await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/v1/users/{ada_id}"),
            Some(&ada_token),
            Some(json!({"first_name": "Augusta", "email": "ignored@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Augusta");
    assert_eq!(body["data"]["last_name"], "Lovelace");
    assert_eq!(body["data"]["email"], "ada@example.com");

    let patch = json!({"first_name": "Robert"});
    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/v1/users/{bob_id}"),
            Some(&ada_token),
            Some(patch.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only update your own profile");

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/v1/users/{bob_id}"),
            Some(&admin),
            Some(patch),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Robert");

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/v1/users/{ada_id}"),
            Some(&ada_token),
            Some(json!({"username": "bob"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "username already exists");
}

#[tokio::test]
async fn self_check_is_exact_match() {
    let app = TestApp::new();
    let (token, id) = app.sign_up("ada@example.com", "ada").await;
    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/v1/users/{}", id.to_uppercase()),
            Some(&token),
            Some(json!({"first_name": "Augusta"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_account_flow() {
    let app = TestApp::new();
    let (token, id) = app.sign_up("ada@example.com", "ada").await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .send("DELETE", &format!("/api/v1/users/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "message": "User deleted successfully"})
    );

    let (status, _) = app
        .send("DELETE", &format!("/api/v1/users/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The deleted user's token is still accepted until it expires; the
    // record lookup behind it is what fails.
    let (status, body) = app.send("GET", "/api/v1/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user not found");
}

#[tokio::test]
async fn admin_listing_is_gated_and_paginated() {
    let app = TestApp::new();
    let (user_token, _) = app.sign_up("ada@example.com", "ada").await;
    for i in 0..3 {
        app.sign_up(&format!("u{i}@example.com"), &format!("user{i}"))
            .await;
    }
    let admin = app.admin_token().await;

    let (status, body) = app.send("GET", "/api/v1/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header required");

    let (status, body) = app
        .send("GET", "/api/v1/admin/users", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");

    let (status, body) = app
        .send("GET", "/api/v1/admin/users", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["limit"], 10);
    assert_eq!(body["data"]["offset"], 0);
    assert_eq!(body["data"]["total"], 5);
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 5);
    assert_eq!(users[0]["username"], "root");

    let (_, body) = app
        .send(
            "GET",
            "/api/v1/admin/users?limit=500&offset=-5",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(body["data"]["limit"], 100);
    assert_eq!(body["data"]["offset"], 0);

    let (_, body) = app
        .send("GET", "/api/v1/admin/users?limit=0", Some(&admin), None)
        .await;
    assert_eq!(body["data"]["limit"], 10);

    let (_, body) = app
        .send("GET", "/api/v1/admin/users?limit=2&offset=1", Some(&admin), None)
        .await;
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["username"], "user2");
}

#[tokio::test]
async fn unknown_route_is_not_found_without_auth() {
    let app = TestApp::new();
    let (status, _) = app.send("GET", "/api/v1/nothing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forbidden_update_is_decided_before_the_body() {
    let app = TestApp::new();
    let (ada_token, _) = app.sign_up("ada@example.com", "ada").await;
    let (_, bob_id) = app.sign_up("bob@example.com", "bob").await;
    let uri = format!("/api/v1/users/{bob_id}");

    let (status, body) = app
        .send("PUT", &uri, Some(&ada_token), Some(json!({"username": "x"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({"success": false, "error": "You can only update your own profile"})
    );

    let req = Request::builder()
        .method("PUT")
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {ada_token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.raw(req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only update your own profile");
}

#[tokio::test]
async fn own_update_still_validates_the_body() {
    let app = TestApp::new();
    let (token, id) = app.sign_up("ada@example.com", "ada").await;
    let uri = format!("/api/v1/users/{id}");

    let (status, body) = app
        .send("PUT", &uri, Some(&token), Some(json!({"username": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(
        body["data"],
        json!(["username must be between 3 and 20 characters long"])
    );

    let req = Request::builder()
        .method("PUT")
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.raw(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn oversized_token_lifetime_is_an_error_not_a_crash() {
    let app = TestApp::with_config(ApiConfig {
        jwt_expiry_hours: 1_000_000_000_000,
        ..test_config()
    });
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "ada@example.com", "username": "ada", "password": "password123",
                "first_name": "Ada", "last_name": "Lovelace",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "error": "Internal server error"})
    );
}

#[tokio::test]
async fn request_id_is_generated_or_echoed() {
    let app = TestApp::new();

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let generated = resp
        .headers()
        .get(userapi_api::REQUEST_ID_HEADER)
        .expect("generated request id")
        .to_str()
        .unwrap();
    assert!(Uuid::parse_str(generated).is_ok(), "{generated}");

    let req = Request::builder()
        .uri("/health")
        .header(userapi_api::REQUEST_ID_HEADER, "trace-me-42")
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(
        resp.headers().get(userapi_api::REQUEST_ID_HEADER).unwrap(),
        "trace-me-42"
    );
}

/// Store whose every call panics.
struct PanickingStore;

#[async_trait::async_trait]
impl AccountStore for PanickingStore {
    async fn create(&self, _: NewAccount) -> Result<Account, StoreError> {
        panic!("store exploded")
    }
    async fn get_by_id(&self, _: Uuid) -> Result<Account, StoreError> {
        panic!("store exploded")
    }
    async fn get_by_email(&self, _: &str) -> Result<Account, StoreError> {
        panic!("store exploded")
    }
    async fn get_by_username(&self, _: &str) -> Result<Account, StoreError> {
        panic!("store exploded")
    }
    async fn get_all(&self, _: i64, _: i64) -> Result<Vec<Account>, StoreError> {
        panic!("store exploded")
    }
    async fn update(&self, _: Uuid, _: &Account) -> Result<(), StoreError> {
        panic!("store exploded")
    }
    async fn delete(&self, _: Uuid) -> Result<(), StoreError> {
        panic!("store exploded")
    }
    async fn count(&self) -> Result<i64, StoreError> {
        panic!("store exploded")
    }
}

#[tokio::test]
async fn handler_panic_becomes_internal_error() {
    let router = userapi_api::router(AppState::new(Arc::new(PanickingStore), test_config()));
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/signin")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"email": "ada@example.com", "password": "password123"}).to_string(),
        ))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.headers().contains_key(userapi_api::REQUEST_ID_HEADER));
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({"success": false, "error": "Internal server error"})
    );
}
