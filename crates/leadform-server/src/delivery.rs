//! Outbound email and SMS backends.
//!
//! Each transport is either a real backend or a log-only fallback used when
//! its config section is absent, so a development server runs without any
//! credentials.

use std::time::Duration;

use leadform_core::notify::{EmailSender, SmsSender};
use lettre::{
  AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
  message::{Mailbox, header::ContentType},
  transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::{SmsGatewayConfig, SmtpConfig};

/// HTTP timeout for a single gateway request.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DeliveryError {
  #[error("smtp transport error: {0}")]
  Smtp(#[from] lettre::transport::smtp::Error),

  #[error("email address parse error: {0}")]
  Address(#[from] lettre::address::AddressError),

  #[error("email build error: {0}")]
  Build(#[from] lettre::error::Error),

  #[error("sms gateway request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("sms gateway returned HTTP {0}")]
  HttpStatus(u16),
}

// ─── Email ───────────────────────────────────────────────────────────────────

pub enum EmailTransport {
  Smtp {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from:   Mailbox,
  },
  /// Writes each message to the log instead of sending it.
  Log,
}

impl EmailTransport {
  pub fn from_config(config: Option<&SmtpConfig>) -> Result<Self, DeliveryError> {
    let Some(config) = config else {
      return Ok(Self::Log);
    };

    let from: Mailbox = config.from.parse()?;
    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
      .port(config.port);
    if let (Some(user), Some(password)) = (&config.user, &config.password) {
      builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
    }

    Ok(Self::Smtp {
      mailer: builder.build(),
      from,
    })
  }
}

impl EmailSender for EmailTransport {
  type Error = DeliveryError;

  async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
    match self {
      Self::Smtp { mailer, from } => {
        let message = Message::builder()
          .from(from.clone())
          .to(to.parse()?)
          .subject(subject)
          .header(ContentType::TEXT_PLAIN)
          .body(body.to_owned())?;
        mailer.send(message).await?;
      }
      Self::Log => tracing::info!(to, subject, body, "email (log only)"),
    }
    Ok(())
  }
}

// ─── SMS ─────────────────────────────────────────────────────────────────────

pub enum SmsTransport {
  Gateway {
    client: reqwest::Client,
    config: SmsGatewayConfig,
  },
  /// Writes each message to the log instead of sending it.
  Log,
}

impl SmsTransport {
  pub fn from_config(config: Option<&SmsGatewayConfig>) -> Result<Self, DeliveryError> {
    let Some(config) = config else {
      return Ok(Self::Log);
    };

    let client = reqwest::Client::builder()
      .timeout(GATEWAY_TIMEOUT)
      .build()?;
    Ok(Self::Gateway {
      client,
      config: config.clone(),
    })
  }
}

impl SmsSender for SmsTransport {
  type Error = DeliveryError;

  async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
    match self {
      Self::Gateway { client, config } => {
        let payload = serde_json::json!({
          "to": to,
          "from": config.sender_id,
          "message": body,
        });
        let response = client
          .post(&config.url)
          .bearer_auth(&config.api_key)
          .json(&payload)
          .send()
          .await?;
        if !response.status().is_success() {
          return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }
      }
      Self::Log => tracing::info!(to, body, "sms (log only)"),
    }
    Ok(())
  }
}
