use crate::emails::EmailComposer;
use metrics::counter;
use portfolio_core::mail::{MailError, Mailer, MailingList, OutgoingMail};
use portfolio_core::throttle::{SubscriptionThrottle, ThrottleDecision};
use portfolio_core::token::{create_unsubscribe_url, TokenCodec};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("subscription attempt throttled")]
    Throttled,
    #[error("invalid or expired unsubscribe token")]
    InvalidToken,
    #[error("unsubscribe signing secret is not configured")]
    TokensNotConfigured,
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Returns the trimmed address if it looks deliverable and can be carried
/// inside an unsubscribe token.
pub fn normalize_email(raw: &str) -> Option<&str> {
    let email = raw.trim();
    if email.chars().any(|c| c.is_whitespace() || c == ':') {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(email)
}

pub struct NewsletterController {
    list: Arc<dyn MailingList>,
    mailer: Arc<dyn Mailer>,
    throttle: Arc<SubscriptionThrottle>,
    tokens: Option<Arc<TokenCodec>>,
    emails: Arc<EmailComposer>,
    public_url: Option<Url>,
    admin_address: Option<String>,
}

impl NewsletterController {
    pub fn new(
        list: Arc<dyn MailingList>,
        mailer: Arc<dyn Mailer>,
        throttle: Arc<SubscriptionThrottle>,
        tokens: Option<Arc<TokenCodec>>,
        emails: Arc<EmailComposer>,
    ) -> Self {
        Self {
            list,
            mailer,
            throttle,
            tokens,
            emails,
            public_url: None,
            admin_address: None,
        }
    }

    pub fn with_public_url(mut self, public_url: Option<Url>) -> Self {
        self.public_url = public_url;
        self
    }

    pub fn with_admin_address(mut self, admin_address: Option<String>) -> Self {
        self.admin_address = admin_address;
        self
    }

    /// Adds `email` to the mailing list and sends the welcome email.
    ///
    /// A failed list call releases the cooldown slot, so the visitor can retry
    /// right away. The welcome email is best effort.
    pub async fn subscribe(&self, email: &str) -> Result<(), NewsletterError> {
        let ThrottleDecision::Allowed(attempt) = self.throttle.check_and_record(email) else {
            counter!("newsletter_throttled").increment(1);
            info!(email, "Subscription attempt throttled");
            return Err(NewsletterError::Throttled);
        };

        if let Err(e) = self.list.add_member(email).await {
            self.throttle.release(email, attempt);
            counter!("mail_dispatch_failed").increment(1);
            error!(email, "Failed to add mailing list member: {e}");
            return Err(e.into());
        }
        counter!("newsletter_subscribed").increment(1);
        info!(email, "Subscribed to newsletter");

        self.deliver_secondary("welcome", self.welcome_mail(email)).await;
        Ok(())
    }

    fn welcome_mail(&self, email: &str) -> Result<OutgoingMail, minijinja::Error> {
        let unsubscribe_url = match (&self.tokens, &self.public_url) {
            (Some(tokens), Some(public_url)) => {
                match create_unsubscribe_url(public_url, &tokens.issue(email)) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!(%public_url, "Cannot build one-click unsubscribe URL: {e}");
                        None
                    }
                }
            }
            _ => None,
        };
        self.emails.welcome(email, unsubscribe_url.as_ref())
    }

    /// Returns the address carried by `token` without touching the list.
    pub fn verify_token(&self, token: &str) -> Result<String, NewsletterError> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or(NewsletterError::TokensNotConfigured)?;
        tokens
            .verify(token)
            .map(|subject| subject.email)
            .ok_or(NewsletterError::InvalidToken)
    }

    /// Removes the token's subject from the mailing list and returns the
    /// address. Confirmation and admin notice are best effort.
    pub async fn unsubscribe(&self, token: &str) -> Result<String, NewsletterError> {
        let email = self.verify_token(token)?;

        if let Err(e) = self.list.remove_member(&email).await {
            counter!("mail_dispatch_failed").increment(1);
            error!(email = %email, "Failed to remove mailing list member: {e}");
            return Err(e.into());
        }
        counter!("newsletter_unsubscribed").increment(1);
        info!(email = %email, "Unsubscribed from newsletter");

        self.deliver_secondary("unsubscribed", self.emails.unsubscribed(&email))
            .await;
        if let Some(admin) = &self.admin_address {
            self.deliver_secondary(
                "unsubscribe_notice",
                self.emails.unsubscribe_notice(admin, &email),
            )
            .await;
        }
        Ok(email)
    }

    async fn deliver_secondary(
        &self,
        kind: &'static str,
        mail: Result<OutgoingMail, minijinja::Error>,
    ) {
        let mail = match mail {
            Ok(mail) => mail,
            Err(e) => {
                error!(kind, "Failed to render email: {e}");
                return;
            }
        };
        if let Err(e) = self.mailer.send(mail).await {
            counter!("mail_dispatch_failed").increment(1);
            warn!(kind, "Secondary email was not delivered: {e}");
        }
    }
}
