use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::metrics;

#[derive(Debug, Error)]
pub(crate) enum EmailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Email build error: {0}")]
    Build(String),
}

#[derive(Clone)]
pub(crate) struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Returns `None` when no SMTP host is configured.
    pub(crate) fn from_settings(settings: &Settings) -> Result<Option<Self>, EmailError> {
        let email = settings.email();
        if !email.is_enabled() {
            return Ok(None);
        }

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.smtp_host)?
            .port(email.smtp_port);
        if !email.smtp_user.is_empty() {
            builder = builder
                .credentials(Credentials::new(email.smtp_user.clone(), email.smtp_password.clone()));
        }

        Ok(Some(Self { transport: builder.build(), from: email.from_address.parse()? }))
    }

    pub(crate) async fn send(&self, to: &str, content: &EmailContent) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(content.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(content.html.clone())
            .map_err(|err| EmailError::Build(err.to_string()))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EmailContent {
    pub(crate) subject: String,
    pub(crate) html: String,
}

pub(crate) fn enrollment_approved(
    username: &str,
    course_title: &str,
    client_base_url: &str,
) -> EmailContent {
    let link = format!("{client_base_url}/my-courses");
    EmailContent {
        subject: format!("Enrollment Approved: {course_title}"),
        html: format!(
            "<h2>Hi {name},</h2>\
             <p>Your enrollment for <strong>{title}</strong> has been approved.</p>\
             <p>You can start learning right away.</p>\
             <p><a href=\"{link}\">Go to My Courses</a></p>",
            name = escape_html(username),
            title = escape_html(course_title),
            link = escape_html(&link),
        ),
    }
}

pub(crate) fn enrollment_rejected(
    username: &str,
    course_title: &str,
    reason: &str,
    client_base_url: &str,
) -> EmailContent {
    let link = format!("{client_base_url}/my-courses");
    EmailContent {
        subject: format!("Action Required: Enrollment for {course_title}"),
        html: format!(
            "<h2>Hi {name},</h2>\
             <p>We could not approve your enrollment for <strong>{title}</strong>.</p>\
             <p>Reason: {reason}</p>\
             <p>You can submit a new payment receipt from <a href=\"{link}\">My Courses</a>.</p>",
            name = escape_html(username),
            title = escape_html(course_title),
            reason = escape_html(reason),
            link = escape_html(&link),
        ),
    }
}

/// Sends in the background; delivery failures are logged and counted, never surfaced.
pub(crate) fn dispatch(mailer: Option<Mailer>, to: String, content: EmailContent) {
    let Some(mailer) = mailer else {
        tracing::debug!(subject = %content.subject, "Email delivery disabled, skipping");
        return;
    };

    tokio::spawn(async move {
        match mailer.send(&to, &content).await {
            Ok(()) => tracing::info!(to = %to, subject = %content.subject, "Email sent"),
            Err(err) => {
                metrics::side_effect_failed("email");
                tracing::warn!(
                    error = %err,
                    to = %to,
                    subject = %content.subject,
                    "Email delivery failed"
                );
            }
        }
    });
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_email_links_to_my_courses() {
        let email = enrollment_approved("neo", "Blender Basics", "https://nexus4d.com");
        assert_eq!(email.subject, "Enrollment Approved: Blender Basics");
        assert!(email.html.contains("https://nexus4d.com/my-courses"));
        assert!(email.html.contains("Hi neo"));
    }

    #[test]
    fn rejection_email_carries_reason() {
        let email = enrollment_rejected("neo", "Blender", "Blurry receipt", "http://localhost:5173");
        assert_eq!(email.subject, "Action Required: Enrollment for Blender");
        assert!(email.html.contains("Reason: Blurry receipt"));
    }

    #[test]
    fn user_supplied_text_is_escaped() {
        let email = enrollment_rejected("<b>x</b>", "A & B", "\"quoted\"", "http://x");
        assert!(email.html.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(email.html.contains("A &amp; B"));
        assert!(email.html.contains("&quot;quoted&quot;"));
    }

    #[test]
    fn address_errors_are_reported() {
        let err: Result<Mailbox, _> = "not-an-email".parse();
        let err = EmailError::Address(err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }
}
