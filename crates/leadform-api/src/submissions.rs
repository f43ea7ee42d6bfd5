//! Handlers for the triage inbox.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/tenants/{tenant_id}/submissions` | `?bucket=to_process\|all\|archived&q=&limit=&offset=`; newest first |
//! | `GET`   | `/submissions/{id}` | 404 if not found |
//! | `PATCH` | `/submissions/{id}/status` | Body: `{"status":"done"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use leadform_core::{
  notify::{EmailSender, SmsSender},
  store::LeadStore,
  submission::{Submission, SubmissionFilter, SubmissionStatus, TriageBucket},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Defaults to `to_process`.
  pub bucket: Option<TriageBucket>,
  /// Matched against ticket number and phone.
  pub q:      Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /tenants/{tenant_id}/submissions`
pub async fn list<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Submission>>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let filter = SubmissionFilter {
    bucket: Some(params.bucket.unwrap_or_default()),
    text:   params.q.filter(|q| !q.trim().is_empty()),
    limit:  params.limit,
    offset: params.offset,
  };
  let submissions = state
    .store
    .list_submissions(tenant_id, &filter)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(submissions))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /submissions/{id}`
pub async fn get_one<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Submission>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let submission = state
    .store
    .get_submission(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("submission {id} not found")))?;
  Ok(Json(submission))
}

// ─── Transition ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: SubmissionStatus,
}

/// `PATCH /submissions/{id}/status`
pub async fn set_status<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Submission>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let submission = state
    .store
    .update_submission_status(id, body.status)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("submission {id} not found")))?;
  tracing::info!(
    ticket = %submission.ticket_number,
    status = %submission.status,
    "submission status changed"
  );
  Ok(Json(submission))
}
