use crate::mail::{MailError, Mailer, MailingList, OutgoingMail};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Keeps everything in memory. Useful for local runs and tests.
#[derive(Default, Debug)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    members: Mutex<BTreeSet<String>>,
    fail_sends: AtomicBool,
    fail_list: AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().clone()
    }

    pub fn members(&self) -> Vec<String> {
        self.members.lock().iter().cloned().collect()
    }

    pub fn is_member(&self, address: &str) -> bool {
        self.members.lock().contains(address)
    }

    fn simulated_failure() -> MailError {
        MailError::Provider {
            status: 503,
            message: "simulated failure".to_string(),
        }
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Self::simulated_failure());
        }
        info!(mail.to = %mail.to, mail.subject = %mail.subject, "Recorded message");
        self.sent.lock().push(mail);
        Ok(())
    }
}

#[async_trait]
impl MailingList for MemoryMailer {
    async fn add_member(&self, address: &str) -> Result<(), MailError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::simulated_failure());
        }
        self.members.lock().insert(address.to_owned());
        Ok(())
    }

    async fn remove_member(&self, address: &str) -> Result<(), MailError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::simulated_failure());
        }
        self.members.lock().remove(address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_messages_and_membership() {
        let mailer = MemoryMailer::new();

        mailer
            .send(OutgoingMail::new("a@x.com", "Hi", "Hello").header("List-Id", "<news.x.com>"))
            .await
            .unwrap();
        mailer.add_member("a@x.com").await.unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].get_header("list-id"), Some("<news.x.com>"));
        assert!(mailer.is_member("a@x.com"));

        mailer.remove_member("a@x.com").await.unwrap();
        assert!(mailer.members().is_empty());
    }

    #[tokio::test]
    async fn failures_are_reported_not_recorded() {
        let mailer = MemoryMailer::new();
        mailer.fail_sends(true);
        mailer.fail_list(true);

        let err = mailer
            .send(OutgoingMail::new("a@x.com", "Hi", "Hello"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "mail provider rejected the request (503): simulated failure"
        );
        assert!(mailer.add_member("a@x.com").await.is_err());
        assert!(mailer.sent().is_empty());
    }
}
