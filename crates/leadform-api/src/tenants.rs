//! Handlers for `/tenants` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/tenants` | Body: `{"company_name":"...","admin_email":"..."}`; 201 + tenant and starter form, 400 on a malformed email |
//! | `GET`  | `/tenants` | Every tenant |
//! | `GET`  | `/tenants/{tenant_id}` | 404 if not found |
//! | `PUT`  | `/tenants/{tenant_id}/settings` | Body: [`SettingsBody`] |
//! | `POST` | `/tenants/{tenant_id}/credits` | Body: `{"amount":50}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use leadform_core::{
  form::FormDefinition,
  notify::{EmailSender, SmsSender},
  store::LeadStore,
  tenant::{self, NewTenant, OnboardError, Tenant, TenantSettings},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Onboarded {
  pub tenant: Tenant,
  pub form:   FormDefinition,
}

/// `POST /tenants`
pub async fn create<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Json(body): Json<NewTenant>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  if body.company_name.trim().is_empty() {
    return Err(ApiError::BadRequest("company_name must not be empty".into()));
  }
  let (tenant, form) = tenant::onboard(state.store.as_ref(), body)
    .await
    .map_err(|e| match e {
      OnboardError::Invalid(v) => ApiError::Invalid(v),
      OnboardError::Store(e) => ApiError::Store(Box::new(e)),
    })?;
  Ok((StatusCode::CREATED, Json(Onboarded { tenant, form })))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /tenants`
pub async fn list<S, E, M>(
  State(state): State<AppState<S, E, M>>,
) -> Result<Json<Vec<Tenant>>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let tenants = state
    .store
    .list_tenants()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(tenants))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

pub(crate) async fn load_tenant<S: LeadStore>(
  store: &S,
  tenant_id: Uuid,
) -> Result<Tenant, ApiError> {
  store
    .get_tenant(tenant_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("tenant {tenant_id} not found")))
}

/// `GET /tenants/{tenant_id}`
pub async fn get_one<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
) -> Result<Json<Tenant>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  Ok(Json(load_tenant(state.store.as_ref(), tenant_id).await?))
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SettingsBody {
  pub company_name: Option<String>,
  pub settings:     TenantSettings,
}

/// `PUT /tenants/{tenant_id}/settings`
pub async fn save<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
  Json(body): Json<SettingsBody>,
) -> Result<Json<Tenant>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let mut tenant = load_tenant(state.store.as_ref(), tenant_id).await?;
  if let Some(name) = body.company_name {
    tenant.company_name = name;
  }
  tenant.settings = body.settings;

  let saved = state
    .store
    .save_tenant(tenant)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("tenant {tenant_id} not found")))?;
  Ok(Json(saved))
}

// ─── Credits ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TopUpBody {
  pub amount: i64,
}

/// `POST /tenants/{tenant_id}/credits`
pub async fn top_up<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
  Json(body): Json<TopUpBody>,
) -> Result<Json<Tenant>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  if body.amount <= 0 {
    return Err(ApiError::BadRequest("amount must be positive".into()));
  }
  let tenant = load_tenant(state.store.as_ref(), tenant_id).await?;
  if tenant.sms_credits.checked_add(body.amount).is_none() {
    return Err(ApiError::BadRequest("amount would overflow the balance".into()));
  }
  state
    .store
    .adjust_credits(tenant_id, body.amount)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("tenant {tenant_id} not found")))?;
  tracing::info!(%tenant_id, amount = body.amount, "credits added");

  Ok(Json(load_tenant(state.store.as_ref(), tenant_id).await?))
}
