use crate::config::MailConfig;
use crate::digest::Digest;
use interfaces::defs::{DispatchError, MailTransport, OutgoingMessage};
use std::sync::Arc;
use tracing::info;

/// Sends a composed digest to the configured recipients.
pub struct Dispatcher {
    mailer: Arc<dyn MailTransport>,
    from: String,
    recipients: Vec<String>,
    title: String,
}

impl Dispatcher {
    pub fn new(mailer: Arc<dyn MailTransport>, from: String, recipients: Vec<String>, title: String) -> Self {
        Self {
            mailer,
            from,
            recipients,
            title,
        }
    }

    pub fn from_config(mailer: Arc<dyn MailTransport>, config: &MailConfig) -> Self {
        Self::new(
            mailer,
            config.from.clone(),
            config.recipients.clone(),
            config.digest_title.clone(),
        )
    }

    pub fn compose(&self, digest: &Digest) -> OutgoingMessage {
        OutgoingMessage {
            subject: digest.subject(&self.title),
            from: self.from.clone(),
            recipients: self.recipients.clone(),
            html_body: digest.render_html(&self.title),
        }
    }

    /// One send attempt. Transport errors are returned as-is.
    pub async fn dispatch(&self, digest: &Digest) -> Result<OutgoingMessage, DispatchError> {
        let message = self.compose(digest);
        self.mailer.send(&message).await?;
        info!(
            recipients = self.recipients.len(),
            items = digest.total_items(),
            subject = %message.subject,
            "Dispatched digest"
        );
        Ok(message)
    }
}
