use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::info;
use thiserror::Error;
use uuid::Uuid;

use crate::config::TestMailConfig;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build probe message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A verification message with a unique marker subject. After delivery, a
/// subject search for the marker should find exactly this message — a
/// manual end-to-end check of the sweep path. Never used for remediation.
pub struct ProbeMail {
    pub subject: String,
    pub body: String,
}

pub fn build_probe() -> ProbeMail {
    let marker = Uuid::new_v4().simple().to_string();
    ProbeMail {
        subject: format!("mailsweep probe {marker}"),
        body: format!(
            "Verification probe {marker}.\n\
             Sweep for the subject above to confirm the search path works.\n\
             This message is safe to delete.\n"
        ),
    }
}

/// Deliver the probe through the configured relay, plain SMTP on port 25 as
/// internal relays expect.
pub async fn send_probe(config: &TestMailConfig, probe: &ProbeMail) -> Result<(), ProbeError> {
    let message = Message::builder()
        .from(config.sender.parse()?)
        .to(config.recipient.parse()?)
        .subject(probe.subject.as_str())
        .body(probe.body.clone())?;
    let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_server.as_str())
        .port(25)
        .build();
    mailer.send(message).await?;
    info!(
        "probe {:?} delivered to {} via {}",
        probe.subject, config.recipient, config.smtp_server
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_subjects_are_unique_markers() {
        let first = build_probe();
        let second = build_probe();
        assert!(first.subject.starts_with("mailsweep probe "));
        assert_ne!(first.subject, second.subject);
        // The marker also appears in the body for operators reading the mail.
        let marker = first.subject.rsplit(' ').next().unwrap();
        assert!(first.body.contains(marker));
    }
}
