use std::fmt;
use std::time::Duration;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use trialwatch_core::error::AppError;
use trialwatch_core::report::Notification;
use trialwatch_core::traits::Notifier;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Sender identity, credential and recipient for notification mail.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub sender: String,
    pub password: String,
    pub recipient: String,
    pub timeout: Duration,
}

impl SmtpConfig {
    /// Build a config from possibly-missing values.
    ///
    /// Every missing or blank value is named in the returned error.
    pub fn new(
        sender: Option<String>,
        password: Option<String>,
        recipient: Option<String>,
    ) -> Result<Self, AppError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        let missing: Vec<&str> = [
            ("SENDER_EMAIL", present(&sender)),
            ("SENDER_PASSWORD", present(&password)),
            ("RECIPIENT_EMAIL", present(&recipient)),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| name)
        .collect();

        match (sender, password, recipient) {
            (Some(sender), Some(password), Some(recipient)) if missing.is_empty() => Ok(Self {
                host: DEFAULT_SMTP_HOST.to_string(),
                port: DEFAULT_SMTP_PORT,
                sender: sender.trim().to_string(),
                password,
                recipient: recipient.trim().to_string(),
                timeout: Duration::from_secs(30),
            }),
            _ => Err(AppError::ConfigError(format!(
                "{} not set. Required to send notifications.",
                missing.join(", ")
            ))),
        }
    }

    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Delivers notifications as HTML mail over authenticated STARTTLS SMTP.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Build the transport. No connection is made until the first send.
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let from: Mailbox = config.sender.parse().map_err(|e| {
            AppError::ConfigError(format!("Invalid sender address '{}': {e}", config.sender))
        })?;
        let to: Mailbox = config.recipient.parse().map_err(|e| {
            AppError::ConfigError(format!(
                "Invalid recipient address '{}': {e}",
                config.recipient
            ))
        })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::ConfigError(format!("Invalid SMTP host '{}': {e}", config.host)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.timeout))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    /// Build the mail for a notification without sending it.
    pub fn build_message(&self, notification: &Notification) -> Result<Message, AppError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(notification.html_body.clone())
            .map_err(|e| AppError::DeliveryError(format!("Failed to build message: {e}")))
    }
}

impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        let message = self.build_message(notification)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::DeliveryError(format!("SMTP delivery to {} failed: {e}", self.to)))?;
        tracing::info!(to = %self.to, "Notification mail delivered");
        Ok(())
    }
}
