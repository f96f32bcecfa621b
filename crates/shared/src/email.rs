//! Email service for sending transactional emails.
//!
//! Uses `lettre` for SMTP transport. When email is disabled in configuration
//! the message is logged instead of sent, which keeps local development free
//! of an SMTP dependency.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::info;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for sending transactional emails.
#[derive(Debug, Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| EmailError::SendError(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();
        Ok(transport)
    }

    /// Sends the six digit verification code issued at registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_verification_code(
        &self,
        to_email: &str,
        to_name: &str,
        code: &str,
    ) -> Result<(), EmailError> {
        let body = verification_body(to_name, code);
        self.send_email(to_email, "Verify your MBank account", &body)
            .await
    }

    /// Sends a temporary password after a reset request.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_password_reset(
        &self,
        to_email: &str,
        to_name: &str,
        temporary_password: &str,
    ) -> Result<(), EmailError> {
        let body = format!(
            r"Hi {to_name},

Your MBank password has been reset. Sign in with the temporary password below
and change it right away:

{temporary_password}

If you did not request a reset, contact your branch immediately.

MBank"
        );
        self.send_email(to_email, "Your MBank password was reset", &body)
            .await
    }

    /// Sends a generic plain-text email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))?;

        if !self.config.enabled {
            info!(to = %to_email, subject = %subject, "Email delivery disabled, message not sent");
            return Ok(());
        }

        let transport = self.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        Ok(())
    }
}

fn verification_body(to_name: &str, code: &str) -> String {
    format!(
        r"Hi {to_name},

Welcome to MBank! Your verification code is:

{code}

The code expires in 5 minutes.

MBank"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_config_default() {
        let config = EmailConfig::default();
        assert_eq!(config.smtp_host, "localhost");
        assert_eq!(config.smtp_port, 1025);
        assert!(!config.enabled);
    }

    #[test]
    fn test_verification_body_contains_code() {
        let body = verification_body("Dara", "482913");
        assert!(body.contains("Hi Dara"));
        assert!(body.contains("482913"));
    }

    #[tokio::test]
    async fn test_disabled_service_skips_delivery() {
        let service = EmailService::new(EmailConfig::default());
        service
            .send_verification_code("dara@example.com", "Dara", "123456")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected() {
        let service = EmailService::new(EmailConfig::default());
        let result = service.send_email("not an address", "s", "b").await;
        assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
    }
}
