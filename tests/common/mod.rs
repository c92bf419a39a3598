#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tradecheck_api::{
    build_app, config::Config, db, services::verification::SmsSender, AppState,
};

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:3000".into(),
        cors_extra_origins: Vec::new(),
        jwt_secret: "test-secret".into(),
        jwt_ttl_secs: 7 * 24 * 3600,
        sms_code_ttl_secs: 300,
        default_password: "123456".into(),
        auth_rate_limit_max: 1000,
        auth_rate_limit_window_secs: 60,
    }
}

/// Keeps every code "sent" so tests can read it back.
#[derive(Default)]
pub struct CapturingSms {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl CapturingSms {
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == phone)
            .map(|(_, code)| code.clone())
    }
}

impl SmsSender for CapturingSms {
    fn send_code(&self, phone: &str, code: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), code.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub sms: Arc<CapturingSms>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let pool = db::create_memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        let sms = Arc::new(CapturingSms::default());
        let state = AppState::with_sms_sender(pool, config, sms.clone());
        Self {
            router: build_app(state),
            sms,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> Value {
        self.request(Method::GET, uri, Some(token), None).await.1
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Value {
        self.request(Method::POST, uri, Some(token), Some(body)).await.1
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Value {
        self.request(Method::PUT, uri, Some(token), Some(body)).await.1
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Value {
        self.request(Method::DELETE, uri, Some(token), None).await.1
    }

    /// Registers a user and returns the issued token.
    pub async fn register(&self, username: &str, phone: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/user/register",
                None,
                Some(json!({ "username": username, "phone": phone, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200, "register failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }
}
