//! In-memory [`LeadStore`] adapter for tests and demos.
//!
//! Each instance owns its own state; there is no process-wide singleton.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
  call::{CallLog, NewCallLog},
  form::FormDefinition,
  store::LeadStore,
  submission::{NewSubmission, Submission, SubmissionFilter, SubmissionStatus},
  tenant::Tenant,
};

#[derive(Debug, Error)]
pub enum MemoryStoreError {
  /// Simulated outage, see [`MemoryStore::set_unavailable`].
  #[error("store unavailable")]
  Unavailable,

  #[error("tenant not found: {0}")]
  TenantNotFound(Uuid),

  #[error("credit balance of tenant {0} would overflow")]
  CreditOverflow(Uuid),
}

#[derive(Default)]
struct Inner {
  unavailable: bool,
  tenants:     HashMap<Uuid, Tenant>,
  forms:       HashMap<Uuid, FormDefinition>,
  /// Insertion order, oldest first.
  submissions: Vec<Submission>,
  calls:       Vec<CallLog>,
}

impl Inner {
  fn check(&self) -> Result<(), MemoryStoreError> {
    if self.unavailable {
      Err(MemoryStoreError::Unavailable)
    } else {
      Ok(())
    }
  }
}

#[derive(Default)]
pub struct MemoryStore {
  inner: RwLock<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Make every subsequent operation fail with
  /// [`MemoryStoreError::Unavailable`] until switched back.
  pub async fn set_unavailable(&self, unavailable: bool) {
    self.inner.write().await.unavailable = unavailable;
  }
}

impl LeadStore for MemoryStore {
  type Error = MemoryStoreError;

  async fn add_tenant(&self, company_name: String) -> Result<Tenant, Self::Error> {
    let mut inner = self.inner.write().await;
    inner.check()?;
    let tenant = Tenant::new(company_name);
    inner.tenants.insert(tenant.tenant_id, tenant.clone());
    Ok(tenant)
  }

  async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, Self::Error> {
    let inner = self.inner.read().await;
    inner.check()?;
    Ok(inner.tenants.get(&tenant_id).cloned())
  }

  async fn list_tenants(&self) -> Result<Vec<Tenant>, Self::Error> {
    let inner = self.inner.read().await;
    inner.check()?;
    let mut tenants: Vec<_> = inner.tenants.values().cloned().collect();
    tenants.sort_by_key(|t| t.created_at);
    Ok(tenants)
  }

  async fn save_tenant(&self, tenant: Tenant) -> Result<Option<Tenant>, Self::Error> {
    let mut inner = self.inner.write().await;
    inner.check()?;
    Ok(inner.tenants.get_mut(&tenant.tenant_id).map(|stored| {
      stored.company_name = tenant.company_name;
      stored.settings = tenant.settings;
      stored.clone()
    }))
  }

  async fn adjust_credits(
    &self,
    tenant_id: Uuid,
    delta: i64,
  ) -> Result<Option<i64>, Self::Error> {
    let mut inner = self.inner.write().await;
    inner.check()?;
    let Some(t) = inner.tenants.get_mut(&tenant_id) else {
      return Ok(None);
    };
    t.sms_credits = t
      .sms_credits
      .checked_add(delta)
      .ok_or(MemoryStoreError::CreditOverflow(tenant_id))?;
    Ok(Some(t.sms_credits))
  }

  async fn debit_credit(&self, tenant_id: Uuid) -> Result<Option<i64>, Self::Error> {
    let mut inner = self.inner.write().await;
    inner.check()?;
    Ok(
      inner
        .tenants
        .get_mut(&tenant_id)
        .filter(|t| t.sms_credits > 0)
        .map(|t| {
          t.sms_credits -= 1;
          t.sms_credits
        }),
    )
  }

  async fn get_form_definition(
    &self,
    tenant_id: Uuid,
  ) -> Result<Option<FormDefinition>, Self::Error> {
    let inner = self.inner.read().await;
    inner.check()?;
    Ok(inner.forms.get(&tenant_id).cloned())
  }

  async fn save_form_definition(
    &self,
    tenant_id: Uuid,
    form: FormDefinition,
  ) -> Result<(), Self::Error> {
    let mut inner = self.inner.write().await;
    inner.check()?;
    if !inner.tenants.contains_key(&tenant_id) {
      return Err(MemoryStoreError::TenantNotFound(tenant_id));
    }
    inner.forms.insert(tenant_id, form);
    Ok(())
  }

  async fn insert_submission(
    &self,
    input: NewSubmission,
  ) -> Result<Submission, Self::Error> {
    let mut inner = self.inner.write().await;
    inner.check()?;
    let submission = input.into_submission();
    inner.submissions.push(submission.clone());
    Ok(submission)
  }

  async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, Self::Error> {
    let inner = self.inner.read().await;
    inner.check()?;
    Ok(inner.submissions.iter().find(|s| s.id == id).cloned())
  }

  async fn update_submission_status(
    &self,
    id: Uuid,
    status: SubmissionStatus,
  ) -> Result<Option<Submission>, Self::Error> {
    let mut inner = self.inner.write().await;
    inner.check()?;
    Ok(inner.submissions.iter_mut().find(|s| s.id == id).map(|s| {
      s.transition(status);
      s.clone()
    }))
  }

  async fn list_submissions<'a>(
    &'a self,
    tenant_id: Uuid,
    filter: &'a SubmissionFilter,
  ) -> Result<Vec<Submission>, Self::Error> {
    let inner = self.inner.read().await;
    inner.check()?;
    Ok(
      inner
        .submissions
        .iter()
        .rev()
        .filter(|s| s.tenant_id == tenant_id && filter.matches(s))
        .skip(filter.offset.unwrap_or(0))
        .take(filter.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect(),
    )
  }

  async fn insert_call_log(&self, input: NewCallLog) -> Result<CallLog, Self::Error> {
    let mut inner = self.inner.write().await;
    inner.check()?;
    let log = input.into_call_log();
    inner.calls.push(log.clone());
    Ok(log)
  }

  async fn list_call_logs(
    &self,
    tenant_id: Uuid,
    limit: Option<usize>,
  ) -> Result<Vec<CallLog>, Self::Error> {
    let inner = self.inner.read().await;
    inner.check()?;
    Ok(
      inner
        .calls
        .iter()
        .rev()
        .filter(|c| c.tenant_id == tenant_id)
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect(),
    )
  }
}
