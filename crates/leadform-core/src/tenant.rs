//! Tenants, the customer companies that own a form and a submission stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  call::Schedule,
  error::ValidationError,
  form::FormDefinition,
  store::LeadStore,
};

/// Credits granted to every new tenant.
pub const WELCOME_CREDITS: i64 = 10;

/// Default missed-call SMS template.
pub const DEFAULT_SMS_MESSAGE: &str = "Hello, {{company}} received your call. \
                                       Tell us about your request here: \
                                       {{form_link}}";

/// Per-tenant missed-call settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSettings {
  pub auto_sms_enabled:    bool,
  /// Supports `{{company}}` and `{{form_link}}`.
  pub sms_message:         String,
  #[serde(default)]
  pub schedule:            Schedule,
  /// Tenants on their own SMS provider are not charged credits.
  #[serde(default)]
  pub use_custom_provider: bool,
}

impl Default for TenantSettings {
  fn default() -> Self {
    Self {
      auto_sms_enabled:    true,
      sms_message:         DEFAULT_SMS_MESSAGE.to_owned(),
      schedule:            Schedule::default(),
      use_custom_provider: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
  pub tenant_id:    Uuid,
  pub company_name: String,
  pub created_at:   DateTime<Utc>,
  /// Prepaid SMS balance; debited once per auto-sent SMS.
  pub sms_credits:  i64,
  pub settings:     TenantSettings,
}

impl Tenant {
  /// A fresh tenant with default settings and the welcome credit grant.
  pub fn new(company_name: impl Into<String>) -> Self {
    Self {
      tenant_id:    Uuid::new_v4(),
      company_name: company_name.into(),
      created_at:   Utc::now(),
      sms_credits:  WELCOME_CREDITS,
      settings:     TenantSettings::default(),
    }
  }
}

/// Onboarding input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTenant {
  pub company_name: String,
  /// Destination for the admin email channel of the starter form.
  #[serde(default)]
  pub admin_email:  Option<String>,
}

#[derive(Debug, Error)]
pub enum OnboardError<E: std::error::Error + 'static> {
  #[error(transparent)]
  Invalid(ValidationError),

  #[error("store error: {0}")]
  Store(#[source] E),
}

/// Create a tenant and give it the starter form.
///
/// The starter form is validated before anything is stored, so a malformed
/// admin email leaves no tenant behind.
pub async fn onboard<S: LeadStore>(
  store: &S,
  input: NewTenant,
) -> Result<(Tenant, FormDefinition), OnboardError<S::Error>> {
  let form = FormDefinition::starter(input.admin_email.as_deref());
  form.validate().map_err(OnboardError::Invalid)?;

  let tenant = store
    .add_tenant(input.company_name)
    .await
    .map_err(OnboardError::Store)?;
  store
    .save_form_definition(tenant.tenant_id, form.clone())
    .await
    .map_err(OnboardError::Store)?;
  tracing::info!(tenant_id = %tenant.tenant_id, company = %tenant.company_name, "tenant onboarded");
  Ok((tenant, form))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{error::ValidationIssue, form::Channel, memory::MemoryStore};

  #[tokio::test]
  async fn onboarding_saves_a_valid_starter_form() {
    let store = MemoryStore::new();
    let (tenant, form) = onboard(&store, NewTenant {
      company_name: "Garage Martin".into(),
      admin_email:  Some("boss@garage.example".into()),
    })
    .await
    .unwrap();

    assert_eq!(tenant.sms_credits, WELCOME_CREDITS);
    assert!(form.notifications.admin_email.enabled);
    let stored = store.get_form_definition(tenant.tenant_id).await.unwrap();
    assert_eq!(stored, Some(form));
  }

  #[tokio::test]
  async fn malformed_admin_email_is_rejected_before_storing() {
    let store = MemoryStore::new();
    let err = onboard(&store, NewTenant {
      company_name: "Garage Martin".into(),
      admin_email:  Some("not-an-email".into()),
    })
    .await
    .unwrap_err();

    let OnboardError::Invalid(v) = err else {
      panic!("expected a validation error, got {err:?}");
    };
    assert!(matches!(
      v.issues[0],
      ValidationIssue::MalformedDestination {
        channel: Channel::AdminEmail,
        ..
      }
    ));
    assert!(store.list_tenants().await.unwrap().is_empty());
  }
}
