use async_trait::async_trait;
use interfaces::defs::{DispatchError, MailTransport, OutgoingMessage};
use lettre::message::{header::ContentType, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::fmt;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Sends digests through an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
}

impl SmtpMailer {
    /// Relay that upgrades the connection with STARTTLS before it authenticates.
    pub fn new(config: &SmtpConfig) -> Result<Self, DispatchError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| DispatchError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            relay: format!("{}:{}", config.host, config.port),
        })
    }

    /// Plaintext, unauthenticated relay. Only meant for local test servers.
    pub fn unencrypted_localhost(port: u16) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("localhost")
            .port(port)
            .build();

        Self {
            transport,
            relay: format!("localhost:{port}"),
        }
    }
}

/// Build the MIME message for an outgoing digest. Every recipient is listed in `To`.
pub fn build_message(message: &OutgoingMessage) -> Result<Message, DispatchError> {
    if message.recipients.is_empty() {
        return Err(DispatchError::NoRecipients);
    }

    let mut builder = Message::builder()
        .from(parse_mailbox(&message.from)?)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML);

    for recipient in &message.recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    builder
        .body(message.html_body.clone())
        .map_err(|e| DispatchError::Build(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DispatchError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| DispatchError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DispatchError> {
        let email = build_message(message)?;
        debug!(relay = %self.relay, recipients = message.recipients.len(), "Sending digest");

        self.transport
            .send(email)
            .await
            .map_err(|e| DispatchError::Transport(format!("SMTP send failed: {e}")))?;

        info!(relay = %self.relay, subject = %message.subject, "Digest email sent");
        Ok(())
    }
}
