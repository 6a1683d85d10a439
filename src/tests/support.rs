use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt; // for .collect()
use serde_json::{json, Value};
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::routes;
use crate::state::AppState;

pub const TEST_SECRET: &str = "bookworm-test-secret-bookworm-test-secret";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _dir: TempDir,
}

pub async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

pub async fn setup_with(tweak: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("bookworm-test.db").display());
    Sqlite::create_database(&db_url).await.unwrap();

    let pool = SqlitePoolOptions::new().max_connections(1).connect(&db_url).await.unwrap();
    crate::db::init_db(&pool).await.unwrap();

    let mut config = AppConfig::default();
    config.database.url = db_url;
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.auth.bcrypt_cost = 4;
    tweak(&mut config);

    let state = AppState::new(pool, config);
    let app = routes::router(state.clone());
    TestApp { app, state, _dir: dir }
}

impl TestApp {
    /// Sends one request and returns the status with the body parsed as JSON
    /// (plain text bodies come back as a JSON string, empty ones as null).
    pub async fn request(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request("GET", uri, Some(token), None).await
    }

    /// Signs up a regular user and returns the issued token.
    pub async fn signup(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/user/signup",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.request("POST", "/user/login", None, Some(json!({ "email": email, "password": password })))
            .await
    }

    /// Signs up, promotes to admin directly in the store, then logs in again so
    /// the token carries the admin role.
    pub async fn admin(&self, email: &str) -> String {
        self.signup("Admin", email).await;
        sqlx::query("UPDATE users SET role = 'admin' WHERE email = ?1")
            .bind(email)
            .execute(&self.state.db)
            .await
            .unwrap();
        let (status, body) = self.login(email, "secret123").await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn create_book(&self, admin: &str, title: &str, genres: &[&str], rating: f64) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/books",
                Some(admin),
                Some(json!({ "title": title, "author": "Anon", "genres": genres, "rating": rating })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create book failed: {}", body);
        body["insertedId"].as_str().unwrap().to_string()
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(&self.state.db).await.unwrap()
    }
}
