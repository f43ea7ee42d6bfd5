//! The submission pipeline: validate, persist, notify.
//!
//! Persistence completes before any notification is attempted, and nothing
//! that happens during dispatch can fail a stored submission.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  ValidationError,
  answer::AnswerCollector,
  notify::{
    DispatchReport, DispatchRequest, EmailSender, NotificationDispatcher, SmsSender,
    TemplateContext,
  },
  store::LeadStore,
  submission::{NewSubmission, TicketNumber},
};

#[derive(Debug, Error)]
pub enum PipelineError<E: std::error::Error + 'static> {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("form is disabled for tenant {0}")]
  FormDisabled(Uuid),

  #[error("tenant not found: {0}")]
  TenantNotFound(Uuid),

  #[error("persistence failed: {0}")]
  Persistence(#[source] E),
}

/// When notifications run relative to the submit response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
  /// Await every channel before returning; the receipt carries the report.
  Inline,
  /// Spawn dispatch and return as soon as the submission is stored.
  #[default]
  Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionPolicy {
  /// Reject submissions whose required blocks are unanswered. When off, the
  /// pipeline trusts the client and stores whatever it received.
  pub enforce_required: bool,
  pub dispatch:         DispatchMode,
}

impl Default for SubmissionPolicy {
  fn default() -> Self {
    Self {
      enforce_required: true,
      dispatch:         DispatchMode::Background,
    }
  }
}

/// What the respondent gets back.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
  pub ticket_number: TicketNumber,
  pub submission_id: Uuid,
  /// Only present for [`DispatchMode::Inline`].
  #[serde(skip_serializing_if = "Option::is_none")]
  pub report:        Option<DispatchReport>,
}

pub struct SubmissionPipeline<S, E, M> {
  store:      Arc<S>,
  dispatcher: NotificationDispatcher<E, M>,
  policy:     SubmissionPolicy,
}

impl<S, E, M> Clone for SubmissionPipeline<S, E, M> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      dispatcher: self.dispatcher.clone(),
      policy:     self.policy,
    }
  }
}

impl<S, E, M> SubmissionPipeline<S, E, M>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  pub fn new(
    store: Arc<S>,
    dispatcher: NotificationDispatcher<E, M>,
    policy: SubmissionPolicy,
  ) -> Self {
    Self {
      store,
      dispatcher,
      policy,
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn dispatcher(&self) -> &NotificationDispatcher<E, M> { &self.dispatcher }

  pub fn policy(&self) -> SubmissionPolicy { self.policy }

  /// Store the respondent's answers as a new submission and notify.
  pub async fn submit(
    &self,
    tenant_id: Uuid,
    answers: &AnswerCollector,
  ) -> Result<SubmissionReceipt, PipelineError<S::Error>> {
    let tenant = self
      .store
      .get_tenant(tenant_id)
      .await
      .map_err(PipelineError::Persistence)?
      .ok_or(PipelineError::TenantNotFound(tenant_id))?;

    let form = self
      .store
      .get_form_definition(tenant_id)
      .await
      .map_err(PipelineError::Persistence)?
      .filter(|f| f.enabled)
      .ok_or(PipelineError::FormDisabled(tenant_id))?;

    if self.policy.enforce_required {
      ValidationError::check(answers.missing_required(&form))?;
    }

    let input = NewSubmission {
      ticket_number:   TicketNumber::generate(),
      tenant_id,
      phone:           answers.derive_phone(&form),
      answers:         answers.answers(&form),
      marketing_optin: form.marketing_optin.enabled && answers.marketing_optin(),
    };
    let submission = self.store.insert_submission(input).await.map_err(|e| {
      tracing::error!(%tenant_id, error = %e, "failed to store submission");
      PipelineError::Persistence(e)
    })?;

    let ticket = submission.ticket_number.clone();
    tracing::info!(
      ticket = %ticket,
      %tenant_id,
      answers = submission.answers.len(),
      "submission stored"
    );

    let request = DispatchRequest {
      context:      TemplateContext {
        ticket:       ticket.to_string(),
        client_phone: submission.phone.clone(),
        company:      tenant.company_name,
        date:         submission.created_at.format("%d/%m/%Y").to_string(),
      },
      client_email: answers.client_email(&form),
      client_phone: answers.client_phone(&form),
    };
    let channels = form.notifications;

    let report = match self.policy.dispatch {
      DispatchMode::Inline => Some(self.dispatcher.dispatch(&channels, &request).await),
      DispatchMode::Background => {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
          let report = dispatcher.dispatch(&channels, &request).await;
          tracing::debug!(
            ticket = %request.context.ticket,
            sent = report.sent(),
            failed = report.failed(),
            "notifications dispatched"
          );
        });
        None
      }
    };

    Ok(SubmissionReceipt {
      ticket_number: ticket,
      submission_id: submission.id,
      report,
    })
  }
}
