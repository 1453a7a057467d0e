pub mod smtp_mailer;

pub use smtp_mailer::{build_message, SmtpConfig, SmtpMailer};
