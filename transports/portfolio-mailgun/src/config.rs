use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.eu.mailgun.net";

#[derive(Debug, Clone)]
pub struct MailgunConfig {
    pub api_url: Url,
    pub api_key: String,
    pub domain: String,
    /// Full `From` value, e.g. `Site <contact@example.com>`.
    pub from: String,
    pub list_address: String,
}

impl MailgunConfig {
    pub fn new(
        api_url: Url,
        api_key: String,
        domain: String,
        from_name: &str,
        from_email: &str,
        list_address: Option<String>,
    ) -> Self {
        let list_address = list_address.unwrap_or_else(|| format!("newsletter@{domain}"));
        Self {
            api_url,
            api_key,
            from: format!("{from_name} <{from_email}>"),
            domain,
            list_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_address_defaults_to_newsletter_at_domain() {
        let config = MailgunConfig::new(
            Url::parse(DEFAULT_API_URL).unwrap(),
            "key".to_string(),
            "example.com".to_string(),
            "Jane Doe",
            "contact@example.com",
            None,
        );

        assert_eq!(config.list_address, "newsletter@example.com");
        assert_eq!(config.from, "Jane Doe <contact@example.com>");
    }
}
