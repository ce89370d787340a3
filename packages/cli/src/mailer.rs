// ABOUTME: Best-effort outbound mail delivery
// ABOUTME: Background dispatch with bounded retries so requests never wait on mail

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::constants::{MAIL_RETRY_BACKOFF, MAIL_SEND_ATTEMPTS};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Templates understood by the mail transport
pub const TEMPLATE_USER_WELCOME: &str = "user_welcome";

/// A transport that can deliver one templated message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        sender: &str,
        recipient: &str,
        template: &str,
        data: &Value,
    ) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of an SMTP relay.
///
/// Template data carries secrets such as activation tokens, so only the
/// names of its fields are logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

fn field_names(data: &Value) -> Vec<&str> {
    data.as_object()
        .map(|fields| fields.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        sender: &str,
        recipient: &str,
        template: &str,
        data: &Value,
    ) -> anyhow::Result<()> {
        info!(
            sender = %sender,
            recipient = %recipient,
            template = %template,
            fields = ?field_names(data),
            "Mail delivered to log transport"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct MailDispatcher {
    mailer: Arc<dyn Mailer>,
    sender: String,
    attempts: u32,
    backoff: Duration,
}

impl MailDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, sender: impl Into<String>) -> Self {
        Self {
            mailer,
            sender: sender.into(),
            attempts: MAIL_SEND_ATTEMPTS,
            backoff: MAIL_RETRY_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Send in a background task, retrying with a fixed backoff.
    /// Failures after the last attempt are logged and dropped.
    pub fn dispatch(&self, recipient: String, template: &'static str, data: Value) -> JoinHandle<()> {
        let mailer = Arc::clone(&self.mailer);
        let sender = self.sender.clone();
        let attempts = self.attempts.max(1);
        let backoff = self.backoff;

        tokio::spawn(async move {
            for attempt in 1..=attempts {
                match mailer.send(&sender, &recipient, template, &data).await {
                    Ok(()) => return,
                    Err(e) if attempt < attempts => {
                        warn!(
                            attempt,
                            template = %template,
                            error = %e,
                            "Mail send failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    Err(e) => {
                        error!(
                            attempts,
                            template = %template,
                            error = %e,
                            "Mail send failed, giving up"
                        );
                    }
                }
            }
        })
    }
}
