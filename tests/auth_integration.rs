use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use user_service::configuration::get_configuration;
use user_service::startup::{run, Services};
use user_service::store::MemoryStore;

const SERVICE: &str = "/user_profile.UserService";

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn call(&self, method: &str, body: Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}/{}", self.address, SERVICE, method))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.call(
            "Register",
            json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "display_name": "Test User",
                "phone_number": "+1234567",
                "password": password
            }),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.call("Login", json!({"username": username, "password": password}))
            .await
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.auth.bcrypt_cost = 4;

    let store = Arc::new(MemoryStore::new());
    let services = Services::from_store(store.clone(), &configuration);
    let server = run(listener, services).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_201_and_user_id() {
    let app = spawn_app().await;

    let response = app.register("alice123", "secret1").await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user_id"], 1);
    assert!(body.get("tokens").is_none());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_username() {
    let app = spawn_app().await;
    app.register("alice123", "secret1").await;

    let response = app.register("alice123", "secret2").await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "DUPLICATE_USER");
}

#[tokio::test]
async fn register_returns_400_for_invalid_fields() {
    let app = spawn_app().await;
    let valid = json!({
        "username": "alice123",
        "email": "alice@example.com",
        "display_name": "Alice",
        "phone_number": "+1234567",
        "password": "secret1"
    });

    let cases = vec![
        ("username", json!("abc"), "username too short"),
        ("email", json!("not-an-email"), "invalid email"),
        ("display_name", json!(""), "empty display name"),
        ("phone_number", json!("1234567"), "phone without plus"),
        ("password", json!("short"), "password too short"),
        ("password", json!("p".repeat(25)), "password too long"),
    ];

    for (field, value, reason) in cases {
        let mut body = valid.clone();
        body[field] = value;

        let response = app.call("Register", body).await;

        assert_eq!(400, response.status().as_u16(), "Should reject: {}", reason);
        let error: Value = response.json().await.unwrap();
        assert_eq!(error["code"], "VALIDATION_ERROR");
    }
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_token_pair() {
    let app = spawn_app().await;
    app.register("alice123", "secret1").await;

    let response = app.login("alice123", "secret1").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let tokens = &body["tokens"];
    assert!(tokens["access_token"].as_str().is_some());
    assert_eq!(tokens["refresh_token"].as_str().map(str::len), Some(64));
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 900);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    app.register("alice123", "secret1").await;

    let wrong_password = app.login("alice123", "secret2").await;
    let unknown_user = app.login("nobody99", "secret1").await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_user.status().as_u16());

    let wrong_password: Value = wrong_password.json().await.unwrap();
    let unknown_user: Value = unknown_user.json().await.unwrap();
    assert_eq!(wrong_password["code"], "INVALID_CREDENTIALS");
    assert_eq!(wrong_password["code"], unknown_user["code"]);
    assert_eq!(wrong_password["message"], unknown_user["message"]);
}

// --- Refresh and Logout Tests ---

#[tokio::test]
async fn refresh_rotates_and_consumes_the_token() {
    let app = spawn_app().await;
    app.register("alice123", "secret1").await;
    let login: Value = app.login("alice123", "secret1").await.json().await.unwrap();
    let original = login["tokens"]["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .call("RefreshToken", json!({"refresh_token": original}))
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_ne!(body["tokens"]["refresh_token"], original.as_str());

    let replay = app
        .call("RefreshToken", json!({"refresh_token": original}))
        .await;
    assert_eq!(401, replay.status().as_u16());
    let error: Value = replay.json().await.unwrap();
    assert_eq!(error["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn unknown_and_used_tokens_look_the_same() {
    let app = spawn_app().await;
    app.register("alice123", "secret1").await;
    let login: Value = app.login("alice123", "secret1").await.json().await.unwrap();
    let token = login["tokens"]["refresh_token"].as_str().unwrap().to_string();
    app.call("Logout", json!({"refresh_token": token})).await;

    let used: Value = app
        .call("RefreshToken", json!({"refresh_token": token}))
        .await
        .json()
        .await
        .unwrap();
    let unknown: Value = app
        .call("RefreshToken", json!({"refresh_token": "never-issued"}))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(used["code"], unknown["code"]);
    assert_eq!(used["message"], unknown["message"]);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let app = spawn_app().await;
    app.register("alice123", "secret1").await;
    let login: Value = app.login("alice123", "secret1").await.json().await.unwrap();
    let token = login["tokens"]["refresh_token"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let response = app.call("Logout", json!({"refresh_token": token})).await;
        assert_eq!(200, response.status().as_u16());
    }
    assert_eq!(app.store.refresh_token_count(1), 0);
}

#[tokio::test]
async fn refresh_rejects_empty_token() {
    let app = spawn_app().await;

    let response = app.call("RefreshToken", json!({"refresh_token": ""})).await;

    assert_eq!(400, response.status().as_u16());
}
