// src/utils/mail.rs

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use rand::Rng;

use crate::{config::Config, error::AppError};

/// Generates a 6-digit numeric one-time passcode.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Outbound email collaborator. The join workflow only needs "send this HTML
/// to that address"; everything else (transport, credentials) stays behind
/// this trait so tests can swap in a no-op.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), AppError>;
}

/// SMTP-backed mailer (lettre, TLS relay).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(host: &str, user: &str, pass: &str, from: String) -> Result<Self, AppError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), AppError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|_| AppError::InternalServerError("Invalid MAIL_FROM".to_string()))?,
            )
            .to(to
                .parse()
                .map_err(|_| AppError::BadRequest("Invalid email address".to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

/// Fallback mailer used when SMTP is not configured (and in tests): logs the
/// message instead of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html: String) -> Result<(), AppError> {
        tracing::info!("Mail (not sent, SMTP unconfigured) to {}: {}", to, subject);
        Ok(())
    }
}

/// Builds the mailer from config: real SMTP when fully configured, LogMailer
/// otherwise.
pub fn mailer_from_config(config: &Config) -> Result<std::sync::Arc<dyn Mailer>, AppError> {
    match (&config.smtp_host, &config.smtp_user, &config.smtp_pass) {
        (Some(host), Some(user), Some(pass)) => Ok(std::sync::Arc::new(SmtpMailer::new(
            host,
            user,
            pass,
            config.mail_from.clone(),
        )?)),
        _ => {
            tracing::warn!("SMTP not configured; outbound email will only be logged");
            Ok(std::sync::Arc::new(LogMailer))
        }
    }
}

pub async fn send_otp_email(mailer: &dyn Mailer, to: &str, otp: &str) -> Result<(), AppError> {
    let html = format!(
        "<div style=\"font-family: sans-serif; max-width: 600px;\">\
           <h1>Welcome to Our Community!</h1>\
           <p>Please use the following verification code to complete your registration:</p>\
           <div style=\"font-size: 32px; font-weight: 700; letter-spacing: 2px;\">{}</div>\
           <p>Expires in 10 minutes. Don't share this code with anyone.</p>\
           <p>If you didn't request this code, please ignore this email.</p>\
         </div>",
        otp
    );

    mailer
        .send(to, "Your One-Time Passcode for Community Access", html)
        .await
}

pub async fn send_confirmation_email(
    mailer: &dyn Mailer,
    to: &str,
    full_name: &str,
) -> Result<(), AppError> {
    let html = format!(
        "<div style=\"font-family: sans-serif; max-width: 600px;\">\
           <h1>Welcome to the Community!</h1>\
           <h2>Hi {}, you're all set!</h2>\
           <p>Your email has been successfully verified. The community admin will \
              share a username and password with you soon.</p>\
         </div>",
        full_name
    );

    mailer
        .send(to, "Welcome Aboard! Your Email Is Verified", html)
        .await
}
