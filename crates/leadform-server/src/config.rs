//! Runtime configuration, deserialised from `config.toml` layered with
//! `LEADFORM_*` environment variables.

use std::{path::PathBuf, time::Duration};

use leadform_core::pipeline::{DispatchMode, SubmissionPolicy};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                      String,
  #[serde(default = "default_port")]
  pub port:                      u16,
  #[serde(default = "default_store_path")]
  pub store_path:                PathBuf,
  /// Prefix of the public form links sent by SMS, e.g. `https://forms.example`.
  #[serde(default = "default_public_base_url")]
  pub public_base_url:           String,
  #[serde(default = "enabled")]
  pub enforce_required:          bool,
  #[serde(default = "enabled")]
  pub background_notifications:  bool,
  /// Per-send bound; `0` disables it.
  #[serde(default = "default_notification_timeout_secs")]
  pub notification_timeout_secs: u64,
  #[serde(default)]
  pub smtp:                      Option<SmtpConfig>,
  #[serde(default)]
  pub sms_gateway:               Option<SmsGatewayConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
  pub host:     String,
  #[serde(default = "default_smtp_port")]
  pub port:     u16,
  pub from:     String,
  #[serde(default)]
  pub user:     Option<String>,
  #[serde(default)]
  pub password: Option<String>,
}

/// An HTTP SMS gateway accepting `{"to", "from", "message"}` as JSON with a
/// bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsGatewayConfig {
  pub url:       String,
  pub api_key:   String,
  #[serde(default = "default_sender_id")]
  pub sender_id: String,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/leadform/leadform.db") }

fn default_public_base_url() -> String { "http://localhost:8080".to_owned() }

fn enabled() -> bool { true }

fn default_notification_timeout_secs() -> u64 { 10 }

fn default_smtp_port() -> u16 { 587 }

fn default_sender_id() -> String { "Leadform".to_owned() }

impl ServerConfig {
  pub fn policy(&self) -> SubmissionPolicy {
    SubmissionPolicy {
      enforce_required: self.enforce_required,
      dispatch:         if self.background_notifications {
        DispatchMode::Background
      } else {
        DispatchMode::Inline
      },
    }
  }

  pub fn notification_timeout(&self) -> Option<Duration> {
    (self.notification_timeout_secs > 0)
      .then(|| Duration::from_secs(self.notification_timeout_secs))
  }
}
