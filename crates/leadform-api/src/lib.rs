//! JSON REST API for Leadform.
//!
//! Exposes an axum [`Router`] backed by any [`LeadStore`] and any pair of
//! notification senders. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", leadform_api::api_router(state))
//! ```

pub mod calls;
pub mod error;
pub mod forms;
pub mod public;
pub mod submissions;
pub mod tenants;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post, put},
};
use leadform_core::{
  call::CallResponder,
  notify::{EmailSender, NotificationDispatcher, SmsSender},
  pipeline::{SubmissionPipeline, SubmissionPolicy},
  store::LeadStore,
};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, E, M> {
  pub store:     Arc<S>,
  pub pipeline:  SubmissionPipeline<S, E, M>,
  pub responder: Arc<CallResponder<S, M>>,
}

impl<S, E, M> Clone for AppState<S, E, M> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      pipeline:  self.pipeline.clone(),
      responder: Arc::clone(&self.responder),
    }
  }
}

impl<S, E, M> AppState<S, E, M>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  /// Wire the pipeline and the missed-call responder over one store. The
  /// responder shares the dispatcher's SMS sender.
  pub fn new(
    store: Arc<S>,
    dispatcher: NotificationDispatcher<E, M>,
    policy: SubmissionPolicy,
    public_base_url: impl Into<String>,
  ) -> Self {
    let responder = Arc::new(CallResponder::new(
      Arc::clone(&store),
      Arc::clone(dispatcher.sms()),
      public_base_url,
    ));
    let pipeline = SubmissionPipeline::new(Arc::clone(&store), dispatcher, policy);
    Self {
      store,
      pipeline,
      responder,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, E, M>(state: AppState<S, E, M>) -> Router<()>
where
  S: LeadStore + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  Router::new()
    // Tenants
    .route(
      "/tenants",
      get(tenants::list::<S, E, M>).post(tenants::create::<S, E, M>),
    )
    .route("/tenants/{tenant_id}", get(tenants::get_one::<S, E, M>))
    .route("/tenants/{tenant_id}/settings", put(tenants::save::<S, E, M>))
    .route("/tenants/{tenant_id}/credits", post(tenants::top_up::<S, E, M>))
    // Editor
    .route(
      "/tenants/{tenant_id}/form",
      get(forms::get_form::<S, E, M>).put(forms::put_form::<S, E, M>),
    )
    .route("/tenants/{tenant_id}/form/preview", get(forms::preview::<S, E, M>))
    .route("/tenants/{tenant_id}/form/blocks", post(forms::add_block::<S, E, M>))
    .route(
      "/tenants/{tenant_id}/form/blocks/{block_id}",
      patch(forms::update_block::<S, E, M>).delete(forms::remove_block::<S, E, M>),
    )
    .route(
      "/tenants/{tenant_id}/form/blocks/{block_id}/move",
      post(forms::move_block::<S, E, M>),
    )
    .route("/blocks/palette", get(forms::palette))
    // Public form
    .route("/public/forms/{tenant_id}", get(public::show::<S, E, M>))
    .route(
      "/public/forms/{tenant_id}/submissions",
      post(public::submit::<S, E, M>),
    )
    // Triage
    .route(
      "/tenants/{tenant_id}/submissions",
      get(submissions::list::<S, E, M>),
    )
    .route("/submissions/{id}", get(submissions::get_one::<S, E, M>))
    .route(
      "/submissions/{id}/status",
      patch(submissions::set_status::<S, E, M>),
    )
    // Missed calls
    .route("/webhooks/missed-call", post(calls::missed_call::<S, E, M>))
    .route("/tenants/{tenant_id}/calls", get(calls::list::<S, E, M>))
    .route("/tenants/{tenant_id}/stats", get(calls::stats::<S, E, M>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
