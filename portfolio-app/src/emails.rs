use crate::controllers::contact::ContactMessage;
use minijinja::{context, Environment, Value};
use portfolio_core::mail::OutgoingMail;
use url::Url;

const TEMPLATES: &[(&str, &str)] = &[
    ("welcome.txt", include_str!("../templates/welcome.txt")),
    ("welcome.html", include_str!("../templates/welcome.html")),
    ("unsubscribed.txt", include_str!("../templates/unsubscribed.txt")),
    ("unsubscribed.html", include_str!("../templates/unsubscribed.html")),
    (
        "unsubscribe_notice.txt",
        include_str!("../templates/unsubscribe_notice.txt"),
    ),
    (
        "unsubscribe_notice.html",
        include_str!("../templates/unsubscribe_notice.html"),
    ),
    (
        "contact_notification.txt",
        include_str!("../templates/contact_notification.txt"),
    ),
    (
        "contact_notification.html",
        include_str!("../templates/contact_notification.html"),
    ),
    (
        "contact_confirmation.txt",
        include_str!("../templates/contact_confirmation.txt"),
    ),
    (
        "contact_confirmation.html",
        include_str!("../templates/contact_confirmation.html"),
    ),
];

pub const CONTACT_CONFIRMATION_SUBJECT: &str = "Thank you for reaching out!";

#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub name: String,
    pub url: Option<Url>,
    /// Mailing list address offered as the `mailto:` unsubscribe target.
    pub list_address: Option<String>,
}

/// Renders every outgoing email. `.html` parts are auto-escaped.
pub struct EmailComposer {
    env: Environment<'static>,
    site: SiteInfo,
}

impl EmailComposer {
    pub fn new(site: SiteInfo) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env, site })
    }

    fn site_context(&self) -> Value {
        context! {
            name => self.site.name,
            url => self.site.url.as_ref().map(Url::as_str),
        }
    }

    fn render(&self, name: &str, ctx: Value) -> Result<(String, String), minijinja::Error> {
        let text = self
            .env
            .get_template(&format!("{name}.txt"))?
            .render(&ctx)?;
        let html = self
            .env
            .get_template(&format!("{name}.html"))?
            .render(&ctx)?;
        Ok((text, html))
    }

    pub fn welcome(
        &self,
        to: &str,
        unsubscribe_url: Option<&Url>,
    ) -> Result<OutgoingMail, minijinja::Error> {
        let (text, html) = self.render(
            "welcome",
            context! {
                site => self.site_context(),
                unsubscribe_url => unsubscribe_url.map(Url::as_str),
            },
        )?;

        let mut mail = OutgoingMail::new(
            to,
            format!("Welcome to the {} newsletter!", self.site.name),
            text,
        )
        .html(html);

        let mut targets = vec![];
        if let Some(list) = &self.site.list_address {
            targets.push(format!("<mailto:{list}?subject=unsubscribe>"));
        }
        if let Some(url) = unsubscribe_url {
            targets.push(format!("<{url}>"));
            mail = mail.header("List-Unsubscribe-Post", "List-Unsubscribe=One-Click");
        }
        if !targets.is_empty() {
            mail = mail.header("List-Unsubscribe", targets.join(", "));
        }
        Ok(mail)
    }

    pub fn unsubscribed(&self, to: &str) -> Result<OutgoingMail, minijinja::Error> {
        let (text, html) = self.render(
            "unsubscribed",
            context! { site => self.site_context(), email => to },
        )?;
        Ok(OutgoingMail::new(
            to,
            format!("You have been unsubscribed from {}", self.site.name),
            text,
        )
        .html(html))
    }

    pub fn unsubscribe_notice(
        &self,
        admin: &str,
        email: &str,
    ) -> Result<OutgoingMail, minijinja::Error> {
        let (text, html) = self.render(
            "unsubscribe_notice",
            context! { site => self.site_context(), email => email },
        )?;
        Ok(OutgoingMail::new(admin, format!("Newsletter unsubscribe: {email}"), text).html(html))
    }

    pub fn contact_notification(
        &self,
        admin: &str,
        message: &ContactMessage,
    ) -> Result<OutgoingMail, minijinja::Error> {
        let (text, html) = self.render(
            "contact_notification",
            context! {
                site => self.site_context(),
                name => message.name,
                email => message.email,
                subject => message.subject,
                message => message.message,
            },
        )?;

        let subject = match &message.subject {
            Some(subject) => format!("Contact Form: {subject}"),
            None => format!("New Contact Form Submission from {}", message.name),
        };
        Ok(OutgoingMail::new(admin, subject, text)
            .html(html)
            .header("Reply-To", message.email.as_str()))
    }

    pub fn contact_confirmation(
        &self,
        message: &ContactMessage,
    ) -> Result<OutgoingMail, minijinja::Error> {
        let (text, html) = self.render(
            "contact_confirmation",
            context! {
                site => self.site_context(),
                name => message.name,
            },
        )?;
        Ok(OutgoingMail::new(message.email.as_str(), CONTACT_CONFIRMATION_SUBJECT, text).html(html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer(list_address: Option<&str>) -> EmailComposer {
        EmailComposer::new(SiteInfo {
            name: "Jane's Site".to_string(),
            url: Some(Url::parse("https://example.com/").unwrap()),
            list_address: list_address.map(str::to_string),
        })
        .unwrap()
    }

    fn contact(subject: Option<&str>) -> ContactMessage {
        ContactMessage {
            name: "<b>Mallory</b>".to_string(),
            email: "mallory@x.com".to_string(),
            subject: subject.map(str::to_string),
            message: "Hi & bye <script>".to_string(),
        }
    }

    #[test]
    fn welcome_carries_list_unsubscribe_headers() {
        let url = Url::parse("https://example.com/api/list-unsubscribe?token=abc").unwrap();
        let mail = composer(Some("newsletter@example.com"))
            .welcome("a@x.com", Some(&url))
            .unwrap();

        assert_eq!(mail.to, "a@x.com");
        assert_eq!(
            mail.get_header("List-Unsubscribe"),
            Some(
                "<mailto:newsletter@example.com?subject=unsubscribe>, \
                 <https://example.com/api/list-unsubscribe?token=abc>"
            )
        );
        assert_eq!(
            mail.get_header("List-Unsubscribe-Post"),
            Some("List-Unsubscribe=One-Click")
        );
        assert!(mail.text.contains("https://example.com/api/list-unsubscribe?token=abc"));
    }

    #[test]
    fn welcome_without_one_click_url_has_no_post_header() {
        let mail = composer(Some("newsletter@example.com"))
            .welcome("a@x.com", None)
            .unwrap();

        assert_eq!(
            mail.get_header("List-Unsubscribe"),
            Some("<mailto:newsletter@example.com?subject=unsubscribe>")
        );
        assert_eq!(mail.get_header("List-Unsubscribe-Post"), None);

        let mail = composer(None).welcome("a@x.com", None).unwrap();
        assert!(mail.headers.is_empty());
    }

    #[test]
    fn contact_notification_escapes_html_only() {
        let mail = composer(None)
            .contact_notification("admin@example.com", &contact(None))
            .unwrap();

        assert_eq!(mail.to, "admin@example.com");
        assert_eq!(
            mail.subject,
            "New Contact Form Submission from <b>Mallory</b>"
        );
        assert_eq!(mail.get_header("reply-to"), Some("mallory@x.com"));
        assert!(mail.text.contains("Hi & bye <script>"));

        let html = mail.html.unwrap();
        assert!(html.contains("&lt;b&gt;Mallory"));
        assert!(html.contains("Hi &amp; bye &lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn contact_notification_uses_given_subject() {
        let mail = composer(None)
            .contact_notification("admin@example.com", &contact(Some("Hiring")))
            .unwrap();
        assert_eq!(mail.subject, "Contact Form: Hiring");
    }

    #[test]
    fn contact_confirmation_goes_to_sender() {
        let mail = composer(None).contact_confirmation(&contact(None)).unwrap();
        assert_eq!(mail.to, "mallory@x.com");
        assert_eq!(mail.subject, CONTACT_CONFIRMATION_SUBJECT);
        assert!(!mail.text.contains("Hi & bye"));
        assert!(!mail.html.unwrap().contains("bye"));
    }

    #[test]
    fn unsubscribe_mails_mention_the_address() {
        let composer = composer(None);

        let confirmation = composer.unsubscribed("a@x.com").unwrap();
        assert!(confirmation.text.contains("a@x.com"));

        let notice = composer
            .unsubscribe_notice("admin@example.com", "a@x.com")
            .unwrap();
        assert_eq!(notice.to, "admin@example.com");
        assert_eq!(notice.subject, "Newsletter unsubscribe: a@x.com");
    }
}
