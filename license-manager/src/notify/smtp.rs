//! SMTP-based notifier for production
//!
//! Mirrors every notification into an operator mailbox. Chat destinations
//! are not email addresses, so the destination goes into the subject.

use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use license_core::ShareLink;

use super::Notifier;

/// Configuration for SMTP delivery
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server host (e.g., "smtp.resend.com")
    pub host: String,
    /// SMTP server port (typically 465 for TLS, 587 for STARTTLS)
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: Option<String>,
    /// Mailbox that receives every notification
    pub operator_email: String,
}

impl SmtpConfig {
    /// Create config from environment variables
    ///
    /// Required:
    /// - SMTP_HOST
    /// - SMTP_USERNAME
    /// - SMTP_PASSWORD
    /// - SMTP_FROM_EMAIL
    /// - SMTP_OPERATOR_EMAIL
    ///
    /// Optional:
    /// - SMTP_PORT (default: 465)
    /// - SMTP_FROM_NAME
    pub fn from_env() -> Option<Self> {
        fn get_env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.is_empty())
        }

        let host = get_env("SMTP_HOST")?;
        let username = get_env("SMTP_USERNAME")?;
        let password = get_env("SMTP_PASSWORD")?;
        let from_email = get_env("SMTP_FROM_EMAIL")?;
        let operator_email = get_env("SMTP_OPERATOR_EMAIL")?;

        let port = get_env("SMTP_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(465);

        Some(Self {
            host,
            port,
            username,
            password,
            from_email,
            from_name: get_env("SMTP_FROM_NAME"),
            operator_email,
        })
    }
}

/// SMTP notifier
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from_email: String,
    from_name: Option<String>,
    operator_email: String,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.username, config.password);

        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
            .port(config.port)
            .credentials(creds)
            .build();

        transport
            .test_connection()
            .map_err(|e| format!("SMTP connection test failed: {}", e))?;

        tracing::info!(host = %config.host, port = config.port, "SMTP connection established");

        Ok(Self {
            transport,
            from_email: config.from_email,
            from_name: config.from_name,
            operator_email: config.operator_email,
        })
    }

    fn from_address(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_email),
            None => self.from_email.clone(),
        }
    }
}

/// Plain-text mail body: the message followed by one line per link
pub fn render_body(text: &str, attachments: &[ShareLink]) -> String {
    let mut body = text.to_string();
    if !attachments.is_empty() {
        body.push_str("\n\n");
        for link in attachments {
            body.push_str(&format!("{}: {}\n", link.label, link.url));
        }
    }
    body
}

impl Notifier for SmtpNotifier {
    fn send(
        &self,
        destination: &str,
        text: &str,
        attachments: &[ShareLink],
    ) -> Result<(), String> {
        let from = self
            .from_address()
            .parse()
            .map_err(|e| format!("Invalid from address: {}", e))?;
        let to = self
            .operator_email
            .parse()
            .map_err(|e| format!("Invalid operator address: {}", e))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(format!("[license-manager] message for {}", destination))
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(text, attachments))
            .map_err(|e| format!("Failed to build email: {}", e))?;

        self.transport
            .send(&email)
            .map_err(|e| format!("Failed to send email: {}", e))?;

        tracing::info!(destination = %destination, "Notification mailed to operator");
        Ok(())
    }
}
