//! Outgoing mail: the `Mailer` seam, an SMTP transport and a logging fallback.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::{error::AdminError, l10n::Localization, page::escape_html};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub html: bool,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Writes mails to the log instead of delivering them. Used when no SMTP host is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            html = email.html,
            "mail delivery disabled, message logged only"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpTls {
    #[default]
    StartTls,
    Implicit,
    None,
}

impl std::str::FromStr for SmtpTls {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" | "implicit" => Ok(Self::Implicit),
            "none" | "off" => Ok(Self::None),
            other => Err(anyhow!("unknown smtp tls mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: SmtpTls,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = match config.tls {
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .with_context(|| format!("invalid smtp host '{}'", config.host))?,
            SmtpTls::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .with_context(|| format!("invalid smtp host '{}'", config.host))?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };
        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = build_message(email)?;
        self.transport
            .send(message)
            .await
            .with_context(|| format!("smtp delivery to '{}' failed", email.to))?;
        Ok(())
    }
}

fn build_message(email: &OutgoingEmail) -> Result<Message> {
    let from: Mailbox = email
        .from
        .parse()
        .with_context(|| format!("invalid sender address '{}'", email.from))?;
    let to: Mailbox = email
        .to
        .parse()
        .with_context(|| format!("invalid recipient address '{}'", email.to))?;
    let content_type = if email.html {
        ContentType::TEXT_HTML
    } else {
        ContentType::TEXT_PLAIN
    };
    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.as_str())
        .header(content_type)
        .body(email.body.clone())
        .context("failed to build mail message")
}

/// Test mail sent from the administrator address to the current user.
pub fn test_email(
    l10n: &Localization,
    organization_name: &str,
    public_url: &str,
    from: &str,
    to: &str,
    html: bool,
) -> OutgoingEmail {
    let body = if html {
        l10n.get_with(
            "SYS_EMAIL_FUNCTION_TEST_CONTENT",
            &[&escape_html(organization_name), &escape_html(public_url)],
        )
        .replace('\n', "<br />")
    } else {
        l10n.get_with("SYS_EMAIL_FUNCTION_TEST_CONTENT", &[organization_name, public_url])
    };
    OutgoingEmail {
        from: from.to_string(),
        to: to.to_string(),
        subject: l10n.get_with("SYS_EMAIL_FUNCTION_TEST", &[organization_name]),
        body,
        html,
    }
}

pub async fn deliver(mailer: &dyn Mailer, email: &OutgoingEmail) -> Result<(), AdminError> {
    mailer
        .send(email)
        .await
        .map_err(|error| {
            warn!(recipient = %email.to, error = %format!("{error:#}"), "mail delivery failed");
            // the outermost context only; the cause chain stays in the log
            AdminError::DeliveryFailure {
                recipient: email.to.clone(),
                reason: error.to_string(),
            }
        })
}
