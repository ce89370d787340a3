// ABOUTME: Router-level tests for the Parley server
// ABOUTME: Shared harness: in-memory database, manual clock, and a recording mailer

mod health_tests;
mod middleware_chain_tests;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use parley_core::ManualClock;
use parley_security::{hash_password, Scope};
use parley_storage::{connect_in_memory, NewUser};
use serde_json::Value;
use tower::ServiceExt;

use crate::api::create_router;
use crate::config::Config;
use crate::mailer::Mailer;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub(crate) struct SentMail {
    pub recipient: String,
    pub template: String,
    pub data: Value,
}

#[derive(Default)]
pub(crate) struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        _sender: &str,
        recipient: &str,
        template: &str,
        data: &Value,
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            template: template.to_string(),
            data: data.clone(),
        });
        Ok(())
    }
}

impl RecordingMailer {
    /// Wait for the background dispatcher to deliver a message to `recipient`.
    pub async fn wait_for(&self, recipient: &str) -> SentMail {
        for _ in 0..200 {
            if let Some(mail) = self
                .sent
                .lock()
                .unwrap()
                .iter()
                .find(|mail| mail.recipient == recipient)
            {
                return mail.clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no mail delivered to {recipient}");
    }
}

pub(crate) struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<RecordingMailer>,
}

pub(crate) struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Limiter off so request-heavy tests are not throttled.
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.limiter.enabled = false;
    config
}

pub(crate) async fn test_app() -> TestApp {
    test_app_with(test_config()).await
}

pub(crate) async fn test_app_with(config: Config) -> TestApp {
    let pool = connect_in_memory().await.unwrap();
    let clock = Arc::new(ManualClock::starting_now());
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::with_clock(config, pool, mailer.clone(), clock.clone());

    TestApp {
        router: create_router(state.clone()),
        state,
        clock,
        mailer,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
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

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Insert a user directly and return its id with a fresh bearer token.
    pub async fn user_with_token(&self, email: &str, activated: bool) -> (i64, String) {
        let mut user = self
            .state
            .users
            .insert(&NewUser {
                name: "Test User".to_string(),
                email: email.to_string(),
                password_hash: hash_password("pa55word-long").unwrap(),
            })
            .await
            .unwrap();

        if activated {
            user.activated = true;
            user = self.state.users.update(&user).await.unwrap();
        }

        let token = self
            .state
            .issuer
            .issue(user.id, Scope::Authentication, Duration::from_secs(3600))
            .await
            .unwrap();

        (user.id, token.token)
    }
}
