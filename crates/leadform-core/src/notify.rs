//! Notification dispatch.
//!
//! After a submission is persisted, each of the four channels configured on
//! the form is resolved and delivered independently: a disabled channel or
//! one without a destination is skipped, templates are filled in with
//! [`substitute`], and the email or SMS sender is called. A failing channel
//! is logged and reported but never stops the others.

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::{
  answer::PHONE_PLACEHOLDER,
  form::{Channel, ChannelConfig, Medium, NotificationChannels},
  template::{self, TemplateVars, substitute},
};

// ─── Sender traits ───────────────────────────────────────────────────────────

/// Outbound email delivery (SMTP, API, log-only, ...).
pub trait EmailSender: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(
    &self,
    to: &str,
    subject: &str,
    body: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Outbound SMS delivery.
pub trait SmsSender: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(
    &self,
    to: &str,
    body: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("{channel}: send failed: {source}")]
  Send {
    channel: Channel,
    #[source]
    source:  Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("{channel}: no answer from sender after {after:?}")]
  Timeout { channel: Channel, after: Duration },
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Values available to notification templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContext {
  pub ticket:       String,
  pub client_phone: String,
  pub company:      String,
  /// Submission date, `dd/mm/YYYY`.
  pub date:         String,
}

impl TemplateContext {
  pub fn to_vars(&self) -> TemplateVars {
    template::vars([
      ("ticket", self.ticket.as_str()),
      ("client_phone", self.client_phone.as_str()),
      ("company", self.company.as_str()),
      ("date", self.date.as_str()),
    ])
  }
}

/// Everything the dispatcher needs about one submission.
#[derive(Debug, Clone, Default)]
pub struct DispatchRequest {
  pub context:      TemplateContext,
  /// Respondent email, used by the client email channel when it has no
  /// fixed destination.
  pub client_email: Option<String>,
  /// Respondent phone, used likewise by the client SMS channel.
  pub client_phone: Option<String>,
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  Disabled,
  NoDestination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChannelOutcome {
  Sent { destination: String },
  Skipped { reason: SkipReason },
  Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReport {
  pub channel: Channel,
  #[serde(flatten)]
  pub outcome: ChannelOutcome,
}

/// Per-channel result of one dispatch, in channel order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
  pub channels: Vec<ChannelReport>,
}

impl DispatchReport {
  pub fn outcome(&self, channel: Channel) -> Option<&ChannelOutcome> {
    self
      .channels
      .iter()
      .find(|r| r.channel == channel)
      .map(|r| &r.outcome)
  }

  pub fn sent(&self) -> usize {
    self
      .channels
      .iter()
      .filter(|r| matches!(r.outcome, ChannelOutcome::Sent { .. }))
      .count()
  }

  pub fn failed(&self) -> usize {
    self
      .channels
      .iter()
      .filter(|r| matches!(r.outcome, ChannelOutcome::Failed { .. }))
      .count()
  }
}

// ─── Default templates ───────────────────────────────────────────────────────

/// Subject used when an email channel has none configured.
pub fn default_subject(channel: Channel) -> &'static str {
  match channel {
    Channel::ClientEmail => "We received your request {{ticket}}",
    _ => "New request {{ticket}}",
  }
}

/// Body used when a channel's template is blank.
pub fn default_body(channel: Channel) -> &'static str {
  match channel {
    Channel::AdminEmail => {
      "Hello,\n\nA new request was submitted on {{date}} by {{client_phone}} \
       (ticket {{ticket}}).\n\nSign in to the dashboard to see the details."
    }
    Channel::AdminSms => "New request {{ticket}} from {{client_phone}}.",
    Channel::ClientEmail => {
      "Hello,\n\n{{company}} has received your request. Your ticket number is \
       {{ticket}}.\n\nWe will get back to you shortly."
    }
    Channel::ClientSms => "{{company}}: we received your request {{ticket}}.",
  }
}

fn or_default<'a>(template: Option<&'a str>, fallback: &'static str) -> &'a str {
  template.filter(|t| !t.trim().is_empty()).unwrap_or(fallback)
}

/// Where `channel` delivers for this request, if anywhere.
fn destination(
  channel: Channel,
  config: &ChannelConfig,
  request: &DispatchRequest,
) -> Option<String> {
  let configured = config.destination.trim();
  if !configured.is_empty() {
    return Some(configured.to_owned());
  }
  let fallback = match channel {
    Channel::ClientEmail => request.client_email.as_deref(),
    Channel::ClientSms => request.client_phone.as_deref(),
    Channel::AdminEmail | Channel::AdminSms => None,
  }?;
  let fallback = fallback.trim();
  (!fallback.is_empty() && fallback != PHONE_PLACEHOLDER).then(|| fallback.to_owned())
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Delivers the four notification channels of a form.
pub struct NotificationDispatcher<E, M> {
  email:   Arc<E>,
  sms:     Arc<M>,
  timeout: Option<Duration>,
}

impl<E, M> Clone for NotificationDispatcher<E, M> {
  fn clone(&self) -> Self {
    Self {
      email:   Arc::clone(&self.email),
      sms:     Arc::clone(&self.sms),
      timeout: self.timeout,
    }
  }
}

impl<E, M> NotificationDispatcher<E, M>
where
  E: EmailSender,
  M: SmsSender,
{
  pub fn new(email: Arc<E>, sms: Arc<M>) -> Self {
    Self {
      email,
      sms,
      timeout: None,
    }
  }

  /// Bound each send; a sender that does not answer in time counts as a
  /// failed channel.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn email(&self) -> &Arc<E> { &self.email }

  pub fn sms(&self) -> &Arc<M> { &self.sms }

  /// Deliver every channel concurrently. Never fails as a whole.
  pub async fn dispatch(
    &self,
    channels: &NotificationChannels,
    request: &DispatchRequest,
  ) -> DispatchReport {
    let vars = request.context.to_vars();

    let (admin_email, admin_sms, client_email, client_sms) = tokio::join!(
      self.deliver(Channel::AdminEmail, &channels.admin_email, request, &vars),
      self.deliver(Channel::AdminSms, &channels.admin_sms, request, &vars),
      self.deliver(Channel::ClientEmail, &channels.client_email, request, &vars),
      self.deliver(Channel::ClientSms, &channels.client_sms, request, &vars),
    );

    let channels = Channel::iter()
      .zip([admin_email, admin_sms, client_email, client_sms])
      .map(|(channel, outcome)| ChannelReport { channel, outcome })
      .collect();
    DispatchReport { channels }
  }

  async fn deliver(
    &self,
    channel: Channel,
    config: &ChannelConfig,
    request: &DispatchRequest,
    vars: &TemplateVars,
  ) -> ChannelOutcome {
    let ticket = request.context.ticket.as_str();

    if !config.enabled {
      return ChannelOutcome::Skipped {
        reason: SkipReason::Disabled,
      };
    }
    let Some(to) = destination(channel, config, request) else {
      tracing::debug!(ticket, %channel, "no destination, skipping");
      return ChannelOutcome::Skipped {
        reason: SkipReason::NoDestination,
      };
    };

    let body = substitute(
      or_default(Some(&config.body_template), default_body(channel)),
      vars,
    );
    let result = match channel.medium() {
      Medium::Email => {
        let subject = substitute(
          or_default(config.subject_template.as_deref(), default_subject(channel)),
          vars,
        );
        self
          .guarded(channel, self.email.send(&to, &subject, &body))
          .await
      }
      Medium::Sms => self.guarded(channel, self.sms.send(&to, &body)).await,
    };

    match result {
      Ok(()) => {
        tracing::info!(ticket, %channel, destination = %to, "notification sent");
        ChannelOutcome::Sent { destination: to }
      }
      Err(e) => {
        tracing::warn!(ticket, %channel, error = %e, "notification failed");
        ChannelOutcome::Failed {
          error: e.to_string(),
        }
      }
    }
  }

  async fn guarded<F, Er>(&self, channel: Channel, send: F) -> Result<(), NotifyError>
  where
    F: Future<Output = Result<(), Er>>,
    Er: std::error::Error + Send + Sync + 'static,
  {
    let result = match self.timeout {
      Some(after) => tokio::time::timeout(after, send)
        .await
        .map_err(|_| NotifyError::Timeout { channel, after })?,
      None => send.await,
    };
    result.map_err(|e| NotifyError::Send {
      channel,
      source: Box::new(e),
    })
  }
}

// ─── Test senders ────────────────────────────────────────────────────────────

#[cfg(any(test, feature = "test-util"))]
pub mod testing {
  //! Senders that record what they were asked to deliver.

  use std::sync::Mutex;

  use thiserror::Error;

  use super::{EmailSender, SmsSender};

  #[derive(Debug, Error)]
  #[error("simulated delivery failure")]
  pub struct SimulatedFailure;

  #[derive(Debug, Clone, PartialEq, Eq)]
  pub struct SentEmail {
    pub to:      String,
    pub subject: String,
    pub body:    String,
  }

  #[derive(Debug, Clone, PartialEq, Eq)]
  pub struct SentSms {
    pub to:   String,
    pub body: String,
  }

  #[derive(Debug, Default)]
  pub struct RecordingEmail {
    fail: bool,
    sent: Mutex<Vec<SentEmail>>,
  }

  impl RecordingEmail {
    /// A sender whose every send fails.
    pub fn failing() -> Self {
      Self {
        fail: true,
        ..Default::default()
      }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
      self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
  }

  impl EmailSender for RecordingEmail {
    type Error = SimulatedFailure;

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), Self::Error> {
      if self.fail {
        return Err(SimulatedFailure);
      }
      if let Ok(mut sent) = self.sent.lock() {
        sent.push(SentEmail {
          to:      to.to_owned(),
          subject: subject.to_owned(),
          body:    body.to_owned(),
        });
      }
      Ok(())
    }
  }

  #[derive(Debug, Default)]
  pub struct RecordingSms {
    fail: bool,
    sent: Mutex<Vec<SentSms>>,
  }

  impl RecordingSms {
    pub fn failing() -> Self {
      Self {
        fail: true,
        ..Default::default()
      }
    }

    pub fn sent(&self) -> Vec<SentSms> {
      self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
  }

  impl SmsSender for RecordingSms {
    type Error = SimulatedFailure;

    async fn send(&self, to: &str, body: &str) -> Result<(), Self::Error> {
      if self.fail {
        return Err(SimulatedFailure);
      }
      if let Ok(mut sent) = self.sent.lock() {
        sent.push(SentSms {
          to:   to.to_owned(),
          body: body.to_owned(),
        });
      }
      Ok(())
    }
  }
}
