//! Verification-mail delivery over SMTP.
//!
//! One connection per send: `lettre` is built without its pool, so each call walks
//! connect → EHLO → MAIL FROM → RCPT TO → DATA → body → QUIT and drops the socket on
//! every exit path. Success is reported once the relay has accepted the DATA block.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::domain::challenge::Challenge;
use crate::domain::repository::Mailer;
use crate::domain::types::{CODE_PLACEHOLDER, RESET_MAIL_SUBJECT};
use crate::error::MailError;

/// How the gateway talks to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Cleartext, no AUTH. Only for a trusted relay on a closed network.
    Plain,
    /// STARTTLS upgrade; credentials used when configured.
    StartTls,
    /// STARTTLS plus mandatory AUTH (mail submission).
    Submission,
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "none" => Ok(Self::Plain),
            "starttls" => Ok(Self::StartTls),
            "submission" => Ok(Self::Submission),
            other => Err(format!(
                "unknown SMTP security mode {other:?} (expected plain, starttls or submission)"
            )),
        }
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    template_path: PathBuf,
    send_deadline: Duration,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let builder = match config.security {
            SmtpSecurity::Plain => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            }
            SmtpSecurity::StartTls | SmtpSecurity::Submission => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .context("failed to create SMTP STARTTLS transport")?
            }
        };
        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(config.smtp_timeout));

        if config.security != SmtpSecurity::Plain {
            if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
                builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
            }
        }

        let from_address: Address = config
            .from
            .parse()
            .with_context(|| format!("MAIL_FROM {:?} is not a valid address", config.from))?;

        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(config.from_name.clone(), from_address),
            template_path: config.template_path.clone(),
            send_deadline: config.send_deadline,
        })
    }
}

/// Substitute the challenge into a template holding exactly one `{code}`.
pub fn render(template: &str, challenge: &Challenge) -> Result<String, MailError> {
    match template.matches(CODE_PLACEHOLDER).count() {
        1 => Ok(template.replacen(CODE_PLACEHOLDER, challenge.expose(), 1)),
        n => Err(MailError::Template(format!(
            "expected exactly one {CODE_PLACEHOLDER} placeholder, found {n}"
        ))),
    }
}

/// Read and render the template from disk. Re-read per send, so edits apply live.
pub async fn render_file(path: &Path, challenge: &Challenge) -> Result<String, MailError> {
    let template = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MailError::Template(format!("cannot read {}: {e}", path.display())))?;
    render(&template, challenge)
}

/// Assemble the HTML message: From/To/Subject headers, `text/html; charset=utf-8`.
pub fn build_message(from: &Mailbox, to: &str, html: String) -> Result<Message, MailError> {
    let to: Address = to
        .parse()
        .map_err(|e| MailError::Transport(format!("recipient rejected: {e}")))?;
    Message::builder()
        .from(from.clone())
        .to(Mailbox::new(None, to))
        .subject(RESET_MAIL_SUBJECT)
        .header(ContentType::TEXT_HTML)
        .body(html)
        .map_err(|e| MailError::Template(format!("cannot build message: {e}")))
}

impl Mailer for SmtpMailer {
    async fn send_code(&self, to: &str, challenge: &Challenge) -> Result<(), MailError> {
        let html = render_file(&self.template_path, challenge).await?;
        let message = build_message(&self.from, to, html)?;

        match tokio::time::timeout(self.send_deadline, self.transport.send(message)).await {
            Ok(Ok(_)) => {
                tracing::debug!("verification mail accepted by relay");
                Ok(())
            }
            Ok(Err(e)) => Err(MailError::Transport(e.to_string())),
            Err(_) => Err(MailError::Transport(format!(
                "send exceeded deadline of {:?}",
                self.send_deadline
            ))),
        }
    }
}
