mod config;

pub use config::{MailgunConfig, DEFAULT_API_URL};

use async_trait::async_trait;
use portfolio_core::mail::{MailError, Mailer, MailingList, OutgoingMail};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info};
use url::Url;

pub struct MailgunTransport {
    client: reqwest::Client,
    config: MailgunConfig,
}

#[derive(Deserialize)]
struct SendResponse {
    id: Option<String>,
}

#[derive(Deserialize)]
struct ProviderMessage {
    message: String,
}

impl MailgunTransport {
    pub fn new(client: reqwest::Client, config: MailgunConfig) -> Self {
        Self { client, config }
    }

    pub fn list_address(&self) -> &str {
        &self.config.list_address
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, MailError> {
        let mut url = self.config.api_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| MailError::Transport("Mailgun API URL cannot be a base".into()))?;
            path.pop_if_empty().push("v3").extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth("api", Some(&self.config.api_key))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, MailError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| MailError::MalformedResponse(e.to_string()))?;
        let message = serde_json::from_str::<ProviderMessage>(&body)
            .map(|m| m.message)
            .unwrap_or(body);

        Err(MailError::Provider {
            status: status.as_u16(),
            message,
        })
    }

    /// Creates the newsletter list. Mailgun answers 400 when it already exists.
    pub async fn ensure_list(&self) -> Result<(), MailError> {
        let url = self.endpoint(&["lists"])?;
        let form = [
            ("address", self.config.list_address.as_str()),
            ("name", "Newsletter"),
            ("access_level", "readonly"),
        ];

        let response = self
            .request(Method::POST, url)
            .form(&form)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        match Self::check(response).await {
            Ok(_) => {
                info!(list = %self.config.list_address, "Created mailing list");
                Ok(())
            }
            Err(MailError::Provider { status: 400, .. }) => {
                debug!(list = %self.config.list_address, "Mailing list already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Mailer for MailgunTransport {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let url = self.endpoint(&[self.config.domain.as_str(), "messages"])?;

        let mut form: Vec<(String, String)> = vec![
            ("from".into(), self.config.from.clone()),
            ("to".into(), mail.to.clone()),
            ("subject".into(), mail.subject),
            ("text".into(), mail.text),
        ];
        if let Some(html) = mail.html {
            form.push(("html".into(), html));
        }
        for (name, value) in mail.headers {
            form.push((format!("h:{name}"), value));
        }

        let result = async {
            let response = self
                .request(Method::POST, url)
                .form(&form)
                .send()
                .await
                .map_err(|e| MailError::Transport(e.to_string()))?;
            let response = Self::check(response).await?;
            response
                .json::<SendResponse>()
                .await
                .map_err(|e| MailError::MalformedResponse(e.to_string()))
        }
        .await;

        match result {
            Ok(response) => {
                debug!(mail.to = %mail.to, mailgun.id = ?response.id, "Message accepted");
                Ok(())
            }
            Err(e) => {
                error!(mail.to = %mail.to, "Mailgun send failed: {e}");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl MailingList for MailgunTransport {
    async fn add_member(&self, address: &str) -> Result<(), MailError> {
        let url = self.endpoint(&["lists", self.config.list_address.as_str(), "members"])?;
        let form = [("address", address), ("subscribed", "yes"), ("upsert", "yes")];

        let response = self
            .request(Method::POST, url)
            .form(&form)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Self::check(response).await.inspect_err(|e| {
            error!(address, list = %self.config.list_address, "Mailgun add member failed: {e}")
        })?;
        Ok(())
    }

    async fn remove_member(&self, address: &str) -> Result<(), MailError> {
        let url = self.endpoint(&["lists", self.config.list_address.as_str(), "members", address])?;

        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(address, "Address was not on the mailing list");
            return Ok(());
        }
        Self::check(response).await.inspect_err(|e| {
            error!(address, list = %self.config.list_address, "Mailgun remove member failed: {e}")
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const AUTH: &str = "Basic YXBpOmtleS10ZXN0";

    fn transport(server: &MockServer) -> MailgunTransport {
        let config = MailgunConfig::new(
            Url::parse(&server.base_url()).unwrap(),
            "key-test".to_string(),
            "example.com".to_string(),
            "Jane Doe",
            "contact@example.com",
            None,
        );
        MailgunTransport::new(reqwest::Client::new(), config)
    }

    #[tokio::test]
    async fn send_posts_form_with_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/example.com/messages")
                    .header("authorization", AUTH)
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body_contains("to=a%40x.com")
                    .body_contains("html=%3Cp%3EHi%3C%2Fp%3E")
                    .body_contains("h%3AList-Unsubscribe-Post=List-Unsubscribe%3DOne-Click");
                then.status(200)
                    .header("content-type", "application/json")
                    .body("{\"id\":\"<1@example.com>\",\"message\":\"Queued. Thank you.\"}");
            })
            .await;

        let mail = OutgoingMail::new("a@x.com", "Hello", "Hi")
            .html("<p>Hi</p>")
            .header("List-Unsubscribe-Post", "List-Unsubscribe=One-Click");
        transport(&server).send(mail).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_reports_provider_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v3/example.com/messages");
                then.status(401)
                    .header("content-type", "application/json")
                    .body("{\"message\":\"Invalid private key\"}");
            })
            .await;

        let err = transport(&server)
            .send(OutgoingMail::new("a@x.com", "Hello", "Hi"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            MailError::Provider {
                status: 401,
                message: "Invalid private key".to_string()
            }
        );
    }

    #[tokio::test]
    async fn send_rejects_non_json_success() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v3/example.com/messages");
                then.status(200).body("<html>proxy page</html>");
            })
            .await;

        let err = transport(&server)
            .send(OutgoingMail::new("a@x.com", "Hello", "Hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn add_member_upserts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/lists/newsletter@example.com/members")
                    .header("authorization", AUTH)
                    .body_contains("address=a%40x.com")
                    .body_contains("upsert=yes");
                then.status(200)
                    .header("content-type", "application/json")
                    .body("{\"message\":\"Mailing list member has been created\"}");
            })
            .await;

        transport(&server).add_member("a@x.com").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remove_member_treats_missing_as_done() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/v3/lists/newsletter@example.com/members/a@x.com");
                then.status(404)
                    .header("content-type", "application/json")
                    .body("{\"message\":\"Member a@x.com not found\"}");
            })
            .await;

        transport(&server).remove_member("a@x.com").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remove_member_propagates_server_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE);
                then.status(500).body("upstream exploded");
            })
            .await;

        let err = transport(&server).remove_member("a@x.com").await.unwrap_err();
        assert_eq!(
            err,
            MailError::Provider {
                status: 500,
                message: "upstream exploded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn ensure_list_accepts_existing_list() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/lists")
                    .body_contains("address=newsletter%40example.com");
                then.status(400)
                    .header("content-type", "application/json")
                    .body("{\"message\":\"Duplicate object\"}");
            })
            .await;

        transport(&server).ensure_list().await.unwrap();
        mock.assert_async().await;
    }
}
