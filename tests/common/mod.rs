#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, NotSet, Set};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{
    api_routes,
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db::{self, DbPool},
    entities::{customer, product},
    AppState,
};

const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// In-process application instance backed by a throwaway SQLite file.
/// A file rather than `:memory:` so every pooled connection sees the same
/// database. The file is removed on drop.
pub struct TestApp {
    pub state: AppState,
    pub db: Arc<DbPool>,
    pub auth: Arc<AuthService>,
    db_path: PathBuf,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db_path =
            std::env::temp_dir().join(format!("storefront_test_{}.db", Uuid::new_v4()));
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let db = Arc::new(
            db::establish_connection(&database_url)
                .await
                .expect("connect to test database"),
        );
        db::run_migrations(&db).await.expect("run migrations");

        let auth = Arc::new(AuthService::new(AuthConfig::new(
            TEST_JWT_SECRET.to_string(),
            Duration::from_secs(3600),
        )));

        let config = AppConfig::new(
            database_url,
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );

        let state = AppState::new(db.clone(), config, auth.clone());

        Self {
            state,
            db,
            auth,
            db_path,
        }
    }

    fn router(&self) -> Router {
        api_routes().with_state(self.state.clone())
    }

    pub async fn seed_customer(&self, email: &str, blocked: bool) -> customer::Model {
        customer::ActiveModel {
            id: NotSet,
            first_name: Set(Some("Test".to_string())),
            last_name: Set(Some("Customer".to_string())),
            email: Set(email.to_string()),
            blocked: Set(blocked),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed customer")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> product::Model {
        product::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            image: Set(Some(format!("{name}.png"))),
            price: Set(price),
            stock: Set(stock),
        }
        .insert(&*self.db)
        .await
        .expect("seed product")
    }

    pub fn token_for(&self, email: &str) -> String {
        self.auth.issue_token(email).expect("issue token")
    }

    /// Sends a request with no Authorization header.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        self.send(method, uri, body, None).await
    }

    /// Sends a request with a bearer token for the given customer email.
    pub async fn request_as(
        &self,
        email: &str,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let token = self.token_for(email);
        self.send(method, uri, body, Some(&token)).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.router().oneshot(request).await.expect("send request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

/// Reads a response body as JSON.
pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse response body")
}
