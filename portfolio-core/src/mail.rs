pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

/// A fully formed message. The dispatcher fills in the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    /// Passed through verbatim, e.g. `List-Unsubscribe`.
    pub headers: Vec<(String, String)>,
}

impl OutgoingMail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            text: text.into(),
            html: None,
            headers: vec![],
        }
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Uniform failure reason of the mail provider boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("mail provider unreachable: {0}")]
    Transport(String),
    #[error("mail provider rejected the request ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("malformed mail provider response: {0}")]
    MalformedResponse(String),
}

/// Sends exactly one message per call. No retries, no queueing.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Newsletter list membership.
#[async_trait]
pub trait MailingList: Send + Sync {
    /// Adds or re-subscribes `address`.
    async fn add_member(&self, address: &str) -> Result<(), MailError>;
    async fn remove_member(&self, address: &str) -> Result<(), MailError>;
}
