//! Missed-call webhook, call log and dashboard stats.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/webhooks/missed-call` | Body: [`MissedCallBody`]; returns the call log entry |
//! | `GET`  | `/tenants/{tenant_id}/calls` | `?limit=`; newest first |
//! | `GET`  | `/tenants/{tenant_id}/stats` | Call and inbox counters |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, FixedOffset, Local};
use leadform_core::{
  call::{CallError, CallLog, CallStats, MissedCall},
  notify::{EmailSender, SmsSender},
  store::LeadStore,
  submission::{SubmissionFilter, TriageCounts},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError, tenants::load_tenant};

// ─── Webhook ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MissedCallBody {
  #[serde(flatten)]
  pub call: MissedCall,
  /// Local time of the call, used for schedule checks. Defaults to the
  /// server's local clock.
  pub at:   Option<DateTime<FixedOffset>>,
}

/// `POST /webhooks/missed-call`
pub async fn missed_call<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Json(body): Json<MissedCallBody>,
) -> Result<Json<CallLog>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let now = body.at.unwrap_or_else(|| Local::now().into());
  let log = state
    .responder
    .handle(body.call, now)
    .await
    .map_err(|e| match e {
      CallError::TenantNotFound(id) => ApiError::NotFound(format!("tenant {id} not found")),
      CallError::Store(e) => ApiError::Store(Box::new(e)),
    })?;
  Ok(Json(log))
}

// ─── Call log ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CallListParams {
  pub limit: Option<usize>,
}

/// `GET /tenants/{tenant_id}/calls`
pub async fn list<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
  Query(params): Query<CallListParams>,
) -> Result<Json<Vec<CallLog>>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let logs = state
    .store
    .list_call_logs(tenant_id, params.limit)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(logs))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Stats {
  pub sms_credits: i64,
  pub calls:       CallStats,
  pub submissions: TriageCounts,
}

/// `GET /tenants/{tenant_id}/stats`
pub async fn stats<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
) -> Result<Json<Stats>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let tenant = load_tenant(state.store.as_ref(), tenant_id).await?;
  let logs = state
    .store
    .list_call_logs(tenant_id, None)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let submissions = state
    .store
    .list_submissions(tenant_id, &SubmissionFilter::default())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(Stats {
    sms_credits: tenant.sms_credits,
    calls:       CallStats::tally(&logs),
    submissions: TriageCounts::tally(&submissions),
  }))
}
