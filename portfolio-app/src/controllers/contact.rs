use crate::emails::EmailComposer;
use metrics::counter;
use portfolio_core::mail::{MailError, Mailer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("failed to render contact email: {0}")]
    Render(#[from] minijinja::Error),
    #[error(transparent)]
    Mail(#[from] MailError),
}

pub struct ContactController {
    mailer: Arc<dyn Mailer>,
    emails: Arc<EmailComposer>,
    admin_address: String,
}

impl ContactController {
    pub fn new(mailer: Arc<dyn Mailer>, emails: Arc<EmailComposer>, admin_address: String) -> Self {
        Self {
            mailer,
            emails,
            admin_address,
        }
    }

    /// Forwards the message to the site owner, then thanks the sender.
    /// Only the first email decides the outcome.
    pub async fn submit(&self, message: &ContactMessage) -> Result<(), ContactError> {
        let notification = self
            .emails
            .contact_notification(&self.admin_address, message)?;

        if let Err(e) = self.mailer.send(notification).await {
            counter!("mail_dispatch_failed").increment(1);
            error!(from = %message.email, "Failed to forward contact message: {e}");
            return Err(e.into());
        }
        counter!("contact_messages_sent").increment(1);
        info!(from = %message.email, "Contact message forwarded");

        let confirmation = match self.emails.contact_confirmation(message) {
            Ok(mail) => mail,
            Err(e) => {
                error!("Failed to render contact confirmation: {e}");
                return Ok(());
            }
        };
        if let Err(e) = self.mailer.send(confirmation).await {
            counter!("mail_dispatch_failed").increment(1);
            warn!(to = %message.email, "Contact confirmation was not delivered: {e}");
        }
        Ok(())
    }
}
