//! The respondent-facing form endpoint.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/public/forms/{tenant_id}` | Rendered form; 404 when missing or disabled |
//! | `POST` | `/public/forms/{tenant_id}/submissions` | Body: [`SubmitBody`]; 201 + `{"ticket_number":"#REQ-123456"}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use leadform_core::{
  answer::AnswerCollector,
  notify::{EmailSender, SmsSender},
  pipeline::PipelineError,
  render::{RenderMode, RenderedForm, render},
  store::LeadStore,
  submission::TicketNumber,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `GET /public/forms/{tenant_id}`
pub async fn show<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
) -> Result<Json<RenderedForm>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let form = state
    .store
    .get_form_definition(tenant_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .filter(|f| f.enabled)
    .ok_or_else(|| ApiError::NotFound(format!("no form for tenant {tenant_id}")))?;

  Ok(Json(render(&form, &AnswerCollector::new(), RenderMode::Live)))
}

/// Answers keyed by block id, in the shape each block expects: a string for
/// text and file blocks, a boolean for checkboxes, an object with
/// `lastName`/`firstName`/`email`/`phone`/`address` for contact blocks.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitBody {
  #[serde(default)]
  pub answers:         serde_json::Map<String, serde_json::Value>,
  #[serde(default)]
  pub marketing_optin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
  pub ticket_number: TicketNumber,
}

/// `POST /public/forms/{tenant_id}/submissions`
pub async fn submit<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let form = state
    .store
    .get_form_definition(tenant_id)
    .await
    .map_err(|e| {
      tracing::error!(%tenant_id, error = %e, "failed to load form");
      ApiError::SubmissionFailed
    })?
    .ok_or_else(|| ApiError::NotFound(format!("no form for tenant {tenant_id}")))?;
  if !form.enabled {
    return Err(ApiError::Forbidden("this form is not accepting submissions".into()));
  }

  let mut answers = AnswerCollector::from_json(&form, &body.answers)?;
  answers.set_marketing_optin(body.marketing_optin);

  let receipt = state
    .pipeline
    .submit(tenant_id, &answers)
    .await
    .map_err(|e| match e {
      PipelineError::Validation(v) => ApiError::Invalid(v),
      PipelineError::FormDisabled(_) => {
        ApiError::Forbidden("this form is not accepting submissions".into())
      }
      PipelineError::TenantNotFound(id) => ApiError::NotFound(format!("tenant {id} not found")),
      PipelineError::Persistence(e) => {
        tracing::error!(%tenant_id, error = %e, "submission not stored");
        ApiError::SubmissionFailed
      }
    })?;

  Ok((
    StatusCode::CREATED,
    Json(SubmitResponse {
      ticket_number: receipt.ticket_number,
    }),
  ))
}
