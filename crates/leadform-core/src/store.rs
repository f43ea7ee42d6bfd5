//! The `LeadStore` trait.
//!
//! Implemented by storage backends (`leadform-store-sqlite`, and the
//! [`MemoryStore`](crate::memory::MemoryStore) used in tests). The pipeline,
//! the missed-call responder and the API depend on this abstraction, never on
//! a concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  call::{CallLog, NewCallLog},
  form::FormDefinition,
  submission::{NewSubmission, Submission, SubmissionFilter, SubmissionStatus},
  tenant::Tenant,
};

/// Abstraction over a Leadform storage backend.
///
/// Form definitions are last-write-wins: saves carry no version check.
/// Submissions are append-only apart from their triage status.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait LeadStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Tenants ───────────────────────────────────────────────────────────

  /// Create and persist a tenant with default settings and the welcome
  /// credit grant.
  fn add_tenant(
    &self,
    company_name: String,
  ) -> impl Future<Output = Result<Tenant, Self::Error>> + Send + '_;

  fn get_tenant(
    &self,
    tenant_id: Uuid,
  ) -> impl Future<Output = Result<Option<Tenant>, Self::Error>> + Send + '_;

  fn list_tenants(
    &self,
  ) -> impl Future<Output = Result<Vec<Tenant>, Self::Error>> + Send + '_;

  /// Overwrite the company name and settings of an existing tenant. The
  /// credit balance is left alone. Returns the stored tenant, or `None` if
  /// it does not exist.
  fn save_tenant(
    &self,
    tenant: Tenant,
  ) -> impl Future<Output = Result<Option<Tenant>, Self::Error>> + Send + '_;

  /// Atomically add `delta` (possibly negative) to the SMS balance and
  /// return the new balance. `None` if the tenant does not exist.
  fn adjust_credits(
    &self,
    tenant_id: Uuid,
    delta: i64,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  /// Atomically take one credit if the balance is positive and return the
  /// new balance. `None` if the tenant does not exist or has no credits
  /// left, in which case nothing changes.
  fn debit_credit(
    &self,
    tenant_id: Uuid,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  // ── Form definitions ──────────────────────────────────────────────────

  /// The tenant's form, or `None` if none was ever saved.
  fn get_form_definition(
    &self,
    tenant_id: Uuid,
  ) -> impl Future<Output = Result<Option<FormDefinition>, Self::Error>> + Send + '_;

  /// Replace the tenant's form. Block order is preserved exactly.
  fn save_form_definition(
    &self,
    tenant_id: Uuid,
    form: FormDefinition,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Submissions ───────────────────────────────────────────────────────

  /// Persist a new submission with status `new`. The store sets `id` and
  /// `created_at`.
  fn insert_submission(
    &self,
    input: NewSubmission,
  ) -> impl Future<Output = Result<Submission, Self::Error>> + Send + '_;

  fn get_submission(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  /// Set the triage status. Any status may move to any other. Returns the
  /// updated submission, or `None` if it does not exist.
  fn update_submission_status(
    &self,
    id: Uuid,
    status: SubmissionStatus,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  /// A tenant's submissions matching `filter`, newest first.
  fn list_submissions<'a>(
    &'a self,
    tenant_id: Uuid,
    filter: &'a SubmissionFilter,
  ) -> impl Future<Output = Result<Vec<Submission>, Self::Error>> + Send + 'a;

  // ── Call log ──────────────────────────────────────────────────────────

  fn insert_call_log(
    &self,
    input: NewCallLog,
  ) -> impl Future<Output = Result<CallLog, Self::Error>> + Send + '_;

  /// A tenant's call log, newest first.
  fn list_call_logs(
    &self,
    tenant_id: Uuid,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<CallLog>, Self::Error>> + Send + '_;
}
