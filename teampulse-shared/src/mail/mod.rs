/// Transactional mail
///
/// Handlers depend on the [`Mailer`] trait only. [`LogMailer`] writes every
/// message to the log and is used in development and tests; [`HttpMailer`]
/// posts messages as JSON to a mail-delivery HTTP API.
///
/// # Example
///
/// ```no_run
/// use teampulse_shared::mail::{LogMailer, Mailer, OutgoingMail};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mailer = LogMailer::new("TeamPulse <no-reply@teampulse.local>");
/// mailer.send(OutgoingMail {
///     to: "ada@example.com".to_string(),
///     subject: "Hello".to_string(),
///     body: "Welcome aboard".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod invitation;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail configuration error: {0}")]
    Configuration(String),

    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for MailError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// A rendered plain-text message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Logs messages instead of delivering them
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from,
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "Mail (not delivered)"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct MailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Delivers messages through an HTTP mail API with bearer authentication
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, MailError> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(MailError::Configuration(format!(
                "mail endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&MailPayload {
                from: &self.from,
                to: &mail.to,
                subject: &mail.subject,
                text: &mail.body,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(to = %mail.to, subject = %mail.subject, "Mail delivered");
        Ok(())
    }
}
