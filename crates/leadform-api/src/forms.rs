//! Handlers for the form editor.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/tenants/{tenant_id}/form` | 404 if the tenant has no form |
//! | `PUT`    | `/tenants/{tenant_id}/form` | Body: full [`FormDefinition`]; 400 on invalid channels |
//! | `GET`    | `/tenants/{tenant_id}/form/preview` | Rendered, non-interactive |
//! | `POST`   | `/tenants/{tenant_id}/form/blocks` | Body: `{"variant":"short_text"}`; 201 + new block |
//! | `PATCH`  | `/tenants/{tenant_id}/form/blocks/{block_id}` | Body: [`BlockPatch`] |
//! | `DELETE` | `/tenants/{tenant_id}/form/blocks/{block_id}` | 204 |
//! | `POST`   | `/tenants/{tenant_id}/form/blocks/{block_id}/move` | Body: `{"direction":"up"}` |
//! | `GET`    | `/blocks/palette` | Every variant with its schema row |
//!
//! Every editor mutation loads the whole form, applies one change and saves
//! it back. Concurrent editors are last-write-wins.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use leadform_core::{
  answer::AnswerCollector,
  block::{BlockDefinition, BlockPatch, BlockSchema, BlockVariant},
  form::{FormDefinition, MoveDirection},
  notify::{EmailSender, SmsSender},
  render::{RenderMode, RenderedForm, render},
  store::LeadStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError, tenants::load_tenant};

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn load_form<S: LeadStore>(store: &S, tenant_id: Uuid) -> Result<FormDefinition, ApiError> {
  store
    .get_form_definition(tenant_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("no form for tenant {tenant_id}")))
}

async fn save_form<S: LeadStore>(
  store: &S,
  tenant_id: Uuid,
  form: FormDefinition,
) -> Result<(), ApiError> {
  store
    .save_form_definition(tenant_id, form)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))
}

// ─── Whole form ──────────────────────────────────────────────────────────────

/// `GET /tenants/{tenant_id}/form`
pub async fn get_form<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
) -> Result<Json<FormDefinition>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  Ok(Json(load_form(state.store.as_ref(), tenant_id).await?))
}

/// `PUT /tenants/{tenant_id}/form`
pub async fn put_form<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
  Json(form): Json<FormDefinition>,
) -> Result<Json<FormDefinition>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  load_tenant(state.store.as_ref(), tenant_id).await?;
  form.validate()?;
  save_form(state.store.as_ref(), tenant_id, form.clone()).await?;
  tracing::info!(%tenant_id, blocks = form.blocks.len(), "form saved");
  Ok(Json(form))
}

/// `GET /tenants/{tenant_id}/form/preview`
pub async fn preview<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
) -> Result<Json<RenderedForm>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let form = load_form(state.store.as_ref(), tenant_id).await?;
  Ok(Json(render(&form, &AnswerCollector::new(), RenderMode::Preview)))
}

// ─── Blocks ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddBlockBody {
  pub variant: BlockVariant,
}

/// `POST /tenants/{tenant_id}/form/blocks`
pub async fn add_block<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path(tenant_id): Path<Uuid>,
  Json(body): Json<AddBlockBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let mut form = load_form(state.store.as_ref(), tenant_id).await?;
  let block = form.add_block(body.variant).clone();
  save_form(state.store.as_ref(), tenant_id, form).await?;
  Ok((StatusCode::CREATED, Json(block)))
}

/// `PATCH /tenants/{tenant_id}/form/blocks/{block_id}`
pub async fn update_block<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path((tenant_id, block_id)): Path<(Uuid, String)>,
  Json(patch): Json<BlockPatch>,
) -> Result<Json<BlockDefinition>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let mut form = load_form(state.store.as_ref(), tenant_id).await?;
  let block = form.update_block(&block_id, patch)?.clone();
  save_form(state.store.as_ref(), tenant_id, form).await?;
  Ok(Json(block))
}

/// `DELETE /tenants/{tenant_id}/form/blocks/{block_id}`
pub async fn remove_block<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path((tenant_id, block_id)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let mut form = load_form(state.store.as_ref(), tenant_id).await?;
  form.remove_block(&block_id)?;
  save_form(state.store.as_ref(), tenant_id, form).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
  pub direction: MoveDirection,
}

#[derive(Debug, Serialize)]
pub struct Moved {
  pub block_id: String,
  /// Zero-based position after the move.
  pub index:    usize,
}

/// `POST /tenants/{tenant_id}/form/blocks/{block_id}/move`
pub async fn move_block<S, E, M>(
  State(state): State<AppState<S, E, M>>,
  Path((tenant_id, block_id)): Path<(Uuid, String)>,
  Json(body): Json<MoveBody>,
) -> Result<Json<Moved>, ApiError>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  let mut form = load_form(state.store.as_ref(), tenant_id).await?;
  let index = form.move_block(&block_id, body.direction)?;
  save_form(state.store.as_ref(), tenant_id, form).await?;
  Ok(Json(Moved { block_id, index }))
}

/// `GET /blocks/palette`
pub async fn palette() -> Json<Vec<&'static BlockSchema>> { Json(BlockVariant::palette()) }
