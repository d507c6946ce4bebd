use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

use crate::config::{ConfigError, EmailConfig};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Email transport is not configured")]
    NotConfigured,

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

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub reply_to: Option<String>,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
}

impl EmailMessage {
    pub fn new(to: String, subject: String) -> Self {
        Self {
            to,
            subject,
            reply_to: None,
            text_body: None,
            html_body: None,
        }
    }

    pub fn with_reply_to(mut self, reply_to: String) -> Self {
        self.reply_to = Some(reply_to);
        self
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

/// Anything that can deliver an [`EmailMessage`]. One attempt per call.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError>;
}

pub struct SmtpEmailService {
    pub config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    #[instrument(skip(config), fields(host = %config.smtp_host, port = config.smtp_port))]
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        config.validate()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .timeout(Some(std::time::Duration::from_secs(config.connection_timeout_secs)));

        builder = if config.use_tls {
            let tls = TlsParameters::new(config.smtp_host.clone())
                .map_err(|e| EmailError::ConfigError(format!("TLS configuration error: {}", e)))?;
            if config.use_starttls {
                builder.tls(Tls::Required(tls))
            } else {
                builder.tls(Tls::Wrapper(tls))
            }
        } else {
            builder.tls(Tls::None)
        };

        let transport = builder
            .credentials(Credentials::new(config.smtp_username.clone(), config.smtp_password.clone()))
            .build();

        info!("SMTP email service initialized");
        Ok(Self { config, transport })
    }

    fn build_message(&self, email: EmailMessage) -> Result<Message, EmailError> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid to address: {}", e)))?;

        let mut builder = Message::builder().from(from).to(to).subject(&email.subject);
        if let Some(reply_to) = email.reply_to {
            let reply_to: Mailbox = reply_to
                .parse()
                .map_err(|e| EmailError::AddressError(format!("Invalid reply-to address: {}", e)))?;
            builder = builder.reply_to(reply_to);
        }

        let built = match (email.text_body, email.html_body) {
            (Some(text), Some(html)) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html)),
            ),
            (Some(text), None) => builder.header(ContentType::TEXT_PLAIN).body(text),
            (None, Some(html)) => builder.header(ContentType::TEXT_HTML).body(html),
            (None, None) => return Err(EmailError::MessageError("No message body provided".to_string())),
        };
        built.map_err(|e| EmailError::MessageError(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpEmailService {
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        let message = self.build_message(message)?;
        self.transport.send(message).await.map_err(|e| {
            error!("Failed to send email: {}", e);
            EmailError::SmtpError(e.to_string())
        })?;
        info!("Email sent");
        Ok(())
    }
}

/// Builds the SMTP transport on first use. Without SMTP configuration every
/// send returns [`EmailError::NotConfigured`], which callers treat as non-fatal.
pub struct LazyMailer {
    config: Option<EmailConfig>,
    transport: OnceCell<SmtpEmailService>,
}

impl LazyMailer {
    pub fn new(config: Option<EmailConfig>) -> Self {
        LazyMailer { config, transport: OnceCell::new() }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl EmailSender for LazyMailer {
    async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        let Some(config) = self.config.as_ref() else {
            warn!(to = %message.to, "Email skipped, SMTP is not configured");
            return Err(EmailError::NotConfigured);
        };
        let transport = self
            .transport
            .get_or_try_init(|| async { SmtpEmailService::new(config.clone()) })
            .await?;
        transport.send_email(message).await
    }
}
