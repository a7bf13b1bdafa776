use std::sync::Arc;

use crate::config::{EmailConfig, ConfigError};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("SMTP error: {0}")]
    SmtpError(String),

    #[error("Message building error: {0}")]
    MessageError(String),

    #[error("Address error: {0}")]
    AddressError(String),
}

impl From<ConfigError> for EmailError {
    fn from(err: ConfigError) -> Self {
        EmailError::ConfigError(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
}

impl EmailMessage {
    pub fn new(to: String, subject: String) -> Self {
        Self {
            to,
            subject,
            text_body: None,
            html_body: None,
        }
    }

    pub fn with_text_body(mut self, body: String) -> Self {
        self.text_body = Some(body);
        self
    }

    pub fn with_html_body(mut self, body: String) -> Self {
        self.html_body = Some(body);
        self
    }
}

/// Customer notifications sent by the quote and policy workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailTemplate {
    QuoteReceived { quote_number: String, customer_name: String },
    QuoteCompleted { quote_number: String, total_premium: i64 },
    PolicyIssued { quote_number: String, policy_number: String },
}

impl EmailTemplate {
    pub fn subject(&self) -> String {
        match self {
            EmailTemplate::QuoteReceived { quote_number, .. } => {
                format!("We received your quote {}", quote_number)
            }
            EmailTemplate::QuoteCompleted { quote_number, .. } => {
                format!("Your quote {} is ready", quote_number)
            }
            EmailTemplate::PolicyIssued { policy_number, .. } => {
                format!("Your policy {} has been issued", policy_number)
            }
        }
    }

    pub fn text_body(&self) -> String {
        let body = match self {
            EmailTemplate::QuoteReceived { quote_number, customer_name } => format!(
                "Hello {},\n\nThanks for starting your event insurance quote. Your quote number is {}.\nYou can return at any time to finish it.",
                greeting_name(customer_name),
                quote_number
            ),
            EmailTemplate::QuoteCompleted { quote_number, total_premium } => format!(
                "Hello,\n\nYour quote {} is complete. Total premium: ${}.",
                quote_number, total_premium
            ),
            EmailTemplate::PolicyIssued { quote_number, policy_number } => format!(
                "Hello,\n\nQuote {} has been converted to policy {}. Keep this number for any claim.",
                quote_number, policy_number
            ),
        };
        format!("{}\n\nThe Eventsure Team\n\n---\nThis is an automated message. Please do not reply to this email.", body)
    }

    pub fn html_body(&self) -> String {
        let (heading, paragraph) = match self {
            EmailTemplate::QuoteReceived { quote_number, customer_name } => (
                "Quote received",
                format!(
                    "Hello {}, your quote number is <strong>{}</strong>. You can return at any time to finish it.",
                    html_escape::encode_text(greeting_name(customer_name)),
                    html_escape::encode_text(quote_number)
                ),
            ),
            EmailTemplate::QuoteCompleted { quote_number, total_premium } => (
                "Quote complete",
                format!(
                    "Your quote <strong>{}</strong> is complete. Total premium: <strong>${}</strong>.",
                    html_escape::encode_text(quote_number),
                    total_premium
                ),
            ),
            EmailTemplate::PolicyIssued { quote_number, policy_number } => (
                "Policy issued",
                format!(
                    "Quote <strong>{}</strong> has been converted to policy <strong>{}</strong>.",
                    html_escape::encode_text(quote_number),
                    html_escape::encode_text(policy_number)
                ),
            ),
        };
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{heading}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: #f8f9fa; padding: 20px; text-align: center; border-radius: 8px 8px 0 0; }}
        .content {{ background-color: #ffffff; padding: 30px; border: 1px solid #dee2e6; }}
        .footer {{ background-color: #f8f9fa; padding: 15px; text-align: center; font-size: 12px; color: #6c757d; }}
    </style>
</head>
<body>
    <div class="header"><h1>Eventsure</h1><h2>{heading}</h2></div>
    <div class="content"><p>{paragraph}</p><p>Best regards,<br>The Eventsure Team</p></div>
    <div class="footer"><p>This is an automated message. Please do not reply to this email.</p></div>
</body>
</html>"#,
            heading = heading,
            paragraph = paragraph
        )
    }

    pub fn into_message(self, to: &str) -> EmailMessage {
        EmailMessage::new(to.to_string(), self.subject())
            .with_text_body(self.text_body())
            .with_html_body(self.html_body())
    }
}

fn greeting_name(name: &str) -> &str {
    if name.trim().is_empty() { "there" } else { name }
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send_template(&self, to: &str, template: EmailTemplate) -> Result<(), EmailError>;
}

/// Fire-and-forget delivery. The caller's request never waits on SMTP.
pub fn spawn_notification(service: Arc<dyn EmailService>, to: String, template: EmailTemplate) {
    tokio::spawn(async move {
        if let Err(e) = service.send_template(&to, template).await {
            warn!(to = %to, "Notification not delivered: {}", e);
        }
    });
}

/// Used when SMTP is not configured.
#[derive(Debug, Default, Clone)]
pub struct NoopEmailService;

#[async_trait]
impl EmailService for NoopEmailService {
    async fn send_template(&self, to: &str, template: EmailTemplate) -> Result<(), EmailError> {
        debug!(to = %to, subject = %template.subject(), "Email disabled, skipping notification");
        Ok(())
    }
}

pub struct SmtpEmailService {
    pub config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    #[instrument(skip(config), fields(host = %config.smtp_host, port = config.smtp_port))]
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        info!("Initializing SMTP email service");

        config.validate().map_err(EmailError::from)?;

        let mut transport_builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .timeout(Some(std::time::Duration::from_secs(config.connection_timeout_secs)));

        if config.use_tls {
            let tls_parameters = TlsParameters::new(config.smtp_host.clone())
                .map_err(|e| EmailError::ConfigError(format!("TLS configuration error: {}", e)))?;

            if config.use_starttls {
                transport_builder = transport_builder.tls(Tls::Required(tls_parameters));
            } else {
                transport_builder = transport_builder.tls(Tls::Wrapper(tls_parameters));
            }
        } else {
            transport_builder = transport_builder.tls(Tls::None);
        }

        if config.has_credentials() {
            let credentials = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );
            transport_builder = transport_builder.credentials(credentials);
        }

        let transport = transport_builder.build();

        info!("SMTP email service initialized successfully");
        Ok(Self { config, transport })
    }

    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    pub async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        validate_email_address(&message.to)?;

        let email_message = self.build_message(message)?;

        self.transport
            .send(email_message)
            .await
            .map_err(|e| {
                error!("Failed to send email: {}", e);
                EmailError::SmtpError(format!("Failed to send email: {}", e))
            })?;

        info!("Email sent successfully");
        Ok(())
    }

    pub fn build_message(&self, email_message: EmailMessage) -> Result<Message, EmailError> {
        let from_mailbox: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = email_message.to
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid to address: {}", e)))?;

        let message_builder = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email_message.subject);

        match (email_message.text_body, email_message.html_body) {
            (Some(text), Some(html)) => message_builder
                .multipart(
                    lettre::message::MultiPart::alternative()
                        .singlepart(
                            lettre::message::SinglePart::builder()
                                .header(ContentType::TEXT_PLAIN)
                                .body(text),
                        )
                        .singlepart(
                            lettre::message::SinglePart::builder()
                                .header(ContentType::TEXT_HTML)
                                .body(html),
                        ),
                )
                .map_err(|e| EmailError::MessageError(format!("Failed to build multipart message: {}", e))),
            (Some(text), None) => message_builder
                .body(text)
                .map_err(|e| EmailError::MessageError(format!("Failed to build text message: {}", e))),
            (None, Some(html)) => message_builder
                .singlepart(
                    lettre::message::SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html),
                )
                .map_err(|e| EmailError::MessageError(format!("Failed to build HTML message: {}", e))),
            (None, None) => Err(EmailError::MessageError("No message body provided".to_string())),
        }
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_template(&self, to: &str, template: EmailTemplate) -> Result<(), EmailError> {
        self.send_email(template.into_message(to)).await
    }
}

pub fn validate_email_address(email: &str) -> Result<(), EmailError> {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(EmailError::AddressError(format!("Invalid email format: {}", email))),
    }
}
