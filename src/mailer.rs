use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::error::AppError;

/// Templated-message collaborator. Production delivers through an HTTP mail
/// relay; tests swap in recording/failing doubles.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, token: String, from: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        Self {
            client,
            endpoint,
            token,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let payload = json!({
            "from": self.from,
            "to": to,
            "subject": subject,
            "text": body,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Dispatch(format!("mail relay unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Dispatch(format!(
                "mail relay returned {}",
                response.status()
            )));
        }

        info!("mail dispatched to {to}");

        Ok(())
    }
}

#[cfg(test)]
pub mod doubles {
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Debug)]
    pub struct SentMail {
        pub to: String,
        pub subject: String,
        pub body: String,
    }

    /// Captures every message instead of delivering it.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<SentMail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
            self.sent.lock().unwrap().push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });

            Ok(())
        }
    }

    /// Reports a dispatch failure on every send.
    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), AppError> {
            Err(AppError::Dispatch("relay rejected message".to_string()))
        }
    }
}
