//! Missed-call responder.
//!
//! When a tenant misses a call from a mobile number, the responder texts the
//! caller a link to the tenant's public form. Every call is screened
//! (landline, auto-SMS switch, opening hours, credits) and recorded in the
//! call log whatever the outcome.

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  notify::SmsSender,
  store::LeadStore,
  template::{self, substitute},
  tenant::Tenant,
};

// ─── Schedule ────────────────────────────────────────────────────────────────

/// Opening hours during which auto-SMS is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
  pub enabled:    bool,
  /// Weekdays, `0` = Sunday.
  pub days:       Vec<u8>,
  #[serde(with = "hh_mm")]
  pub start_time: NaiveTime,
  #[serde(with = "hh_mm")]
  pub end_time:   NaiveTime,
}

impl Default for Schedule {
  fn default() -> Self {
    Self {
      enabled:    false,
      days:       vec![1, 2, 3, 4, 5],
      start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
      end_time:   NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
    }
  }
}

/// `HH:MM` (de)serialisation for schedule bounds.
mod hh_mm {
  use chrono::NaiveTime;
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  const FORMAT: &str = "%H:%M";

  pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&t.format(FORMAT))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(d)?;
    NaiveTime::parse_from_str(&raw, FORMAT)
      .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
      .map_err(D::Error::custom)
  }
}

// ─── Call log ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CallStatus {
  Sent,
  Filtered,
  Error,
}

/// Why a call ended in its [`CallStatus`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallReason {
  MobileOk,
  IsLandline,
  SystemDisabled,
  OutsideScheduleDay,
  OutsideScheduleTime,
  InsufficientCredits,
  ProviderError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLog {
  pub id:         Uuid,
  pub tenant_id:  Uuid,
  pub phone:      String,
  /// The SMS body actually sent; empty when filtered.
  pub message:    String,
  pub status:     CallStatus,
  pub reason:     CallReason,
  pub call_id:    String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`LeadStore::insert_call_log`]; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone)]
pub struct NewCallLog {
  pub tenant_id: Uuid,
  pub phone:     String,
  pub message:   String,
  pub status:    CallStatus,
  pub reason:    CallReason,
  pub call_id:   String,
}

impl NewCallLog {
  pub fn into_call_log(self) -> CallLog {
    CallLog {
      id:         Uuid::new_v4(),
      tenant_id:  self.tenant_id,
      phone:      self.phone,
      message:    self.message,
      status:     self.status,
      reason:     self.reason,
      call_id:    self.call_id,
      created_at: Utc::now(),
    }
  }
}

/// Dashboard counters over a tenant's call log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStats {
  pub sms_sent:       usize,
  pub calls_filtered: usize,
  pub errors:         usize,
}

impl CallStats {
  pub fn tally<'a>(logs: impl IntoIterator<Item = &'a CallLog>) -> Self {
    logs.into_iter().fold(Self::default(), |mut stats, log| {
      match log.status {
        CallStatus::Sent => stats.sms_sent += 1,
        CallStatus::Filtered => stats.calls_filtered += 1,
        CallStatus::Error => stats.errors += 1,
      }
      stats
    })
  }
}

// ─── Screening ───────────────────────────────────────────────────────────────

/// French mobile numbers start with 06/07 (or +336/+337 internationally).
pub fn is_mobile(number: &str) -> bool {
  let compact: String = number.chars().filter(|c| !c.is_whitespace()).collect();
  ["+336", "+337", "06", "07"]
    .iter()
    .any(|prefix| compact.starts_with(prefix))
}

/// Decide whether a missed call from `caller` gets an SMS at local time
/// `now`. Checks run in a fixed order and the first failure wins.
pub fn screen(
  tenant: &Tenant,
  caller: &str,
  now: DateTime<FixedOffset>,
) -> Result<(), CallReason> {
  let settings = &tenant.settings;

  if !is_mobile(caller) {
    return Err(CallReason::IsLandline);
  }
  if !settings.auto_sms_enabled {
    return Err(CallReason::SystemDisabled);
  }

  let schedule = &settings.schedule;
  if schedule.enabled {
    let weekday = now.weekday().num_days_from_sunday() as u8;
    if !schedule.days.contains(&weekday) {
      return Err(CallReason::OutsideScheduleDay);
    }
    // Compare at minute precision, like the HH:MM bounds themselves.
    let minute = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0)
      .unwrap_or_else(|| now.time());
    if minute < schedule.start_time || minute > schedule.end_time {
      return Err(CallReason::OutsideScheduleTime);
    }
  }

  if !settings.use_custom_provider && tenant.sms_credits <= 0 {
    return Err(CallReason::InsufficientCredits);
  }

  Ok(())
}

// ─── Responder ───────────────────────────────────────────────────────────────

/// A missed call reported by the telephony webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissedCall {
  pub tenant_id: Uuid,
  pub caller:    String,
  /// Provider call id, when the telephony side supplies one.
  #[serde(default)]
  pub call_id:   Option<String>,
}

#[derive(Debug, Error)]
pub enum CallError<E: std::error::Error + 'static> {
  #[error("tenant not found: {0}")]
  TenantNotFound(Uuid),

  #[error("store error: {0}")]
  Store(#[source] E),
}

/// Screens missed calls, sends the qualification SMS and keeps the call log.
pub struct CallResponder<S, M> {
  store:           Arc<S>,
  sms:             Arc<M>,
  public_base_url: String,
}

impl<S, M> CallResponder<S, M>
where
  S: LeadStore,
  M: SmsSender,
{
  pub fn new(store: Arc<S>, sms: Arc<M>, public_base_url: impl Into<String>) -> Self {
    Self {
      store,
      sms,
      public_base_url: public_base_url.into(),
    }
  }

  /// Public URL of a tenant's form.
  pub fn form_link(&self, tenant_id: Uuid) -> String {
    format!("{}/f/{tenant_id}", self.public_base_url.trim_end_matches('/'))
  }

  /// Screen one missed call, text the caller if it passes and record the
  /// outcome.
  ///
  /// The credit is reserved before the SMS goes out and refunded if the
  /// provider fails. Once a send has been attempted no store error can skip
  /// the call log entry.
  pub async fn handle(
    &self,
    call: MissedCall,
    now: DateTime<FixedOffset>,
  ) -> Result<CallLog, CallError<S::Error>> {
    let tenant = self
      .store
      .get_tenant(call.tenant_id)
      .await
      .map_err(CallError::Store)?
      .ok_or(CallError::TenantNotFound(call.tenant_id))?;

    let call_id = call
      .call_id
      .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));

    let mut entry = NewCallLog {
      tenant_id: tenant.tenant_id,
      phone: call.caller,
      message: String::new(),
      status: CallStatus::Filtered,
      reason: CallReason::MobileOk,
      call_id,
    };

    match screen(&tenant, &entry.phone, now) {
      Err(reason) => {
        tracing::info!(tenant_id = %tenant.tenant_id, caller = %entry.phone, %reason, "missed call filtered");
        entry.reason = reason;
      }
      Ok(()) => {
        let form_enabled = self
          .store
          .get_form_definition(tenant.tenant_id)
          .await
          .map_err(CallError::Store)?
          .is_some_and(|f| f.enabled);
        let link = if form_enabled {
          self.form_link(tenant.tenant_id)
        } else {
          String::new()
        };
        let message = substitute(
          &tenant.settings.sms_message,
          &template::vars([
            ("company", tenant.company_name.as_str()),
            ("form_link", link.as_str()),
          ]),
        );

        let charged = !tenant.settings.use_custom_provider;
        if charged
          && self
            .store
            .debit_credit(tenant.tenant_id)
            .await
            .map_err(CallError::Store)?
            .is_none()
        {
          // Another call took the last credit after screening.
          tracing::info!(tenant_id = %tenant.tenant_id, caller = %entry.phone, "missed call filtered, no credits left");
          entry.reason = CallReason::InsufficientCredits;
          return self
            .store
            .insert_call_log(entry)
            .await
            .map_err(CallError::Store);
        }

        match self.sms.send(&entry.phone, &message).await {
          Ok(()) => {
            entry.status = CallStatus::Sent;
            tracing::info!(tenant_id = %tenant.tenant_id, caller = %entry.phone, "qualification sms sent");
          }
          Err(e) => {
            entry.status = CallStatus::Error;
            entry.reason = CallReason::ProviderError;
            tracing::warn!(tenant_id = %tenant.tenant_id, caller = %entry.phone, error = %e, "qualification sms failed");
            if charged
              && let Err(e) = self.store.adjust_credits(tenant.tenant_id, 1).await
            {
              tracing::error!(tenant_id = %tenant.tenant_id, error = %e, "credit refund failed");
            }
          }
        }
        entry.message = message;
      }
    }

    self
      .store
      .insert_call_log(entry)
      .await
      .map_err(CallError::Store)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::{
    form::FormDefinition,
    memory::{MemoryStore, MemoryStoreError},
    notify::testing::RecordingSms,
    submission::{NewSubmission, Submission, SubmissionFilter, SubmissionStatus},
    tenant::{self, NewTenant},
  };

  /// A [`MemoryStore`] with injectable credit faults and a yield after each
  /// tenant lookup, so concurrent calls interleave deterministically.
  #[derive(Default)]
  struct FaultyStore {
    inner:           MemoryStore,
    yield_on_lookup: bool,
    fail_debit:      bool,
    fail_refund:     bool,
  }

  impl LeadStore for FaultyStore {
    type Error = MemoryStoreError;

    async fn add_tenant(&self, company_name: String) -> Result<Tenant, Self::Error> {
      self.inner.add_tenant(company_name).await
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, Self::Error> {
      let tenant = self.inner.get_tenant(tenant_id).await;
      if self.yield_on_lookup {
        tokio::task::yield_now().await;
      }
      tenant
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, Self::Error> {
      self.inner.list_tenants().await
    }

    async fn save_tenant(&self, tenant: Tenant) -> Result<Option<Tenant>, Self::Error> {
      self.inner.save_tenant(tenant).await
    }

    async fn adjust_credits(
      &self,
      tenant_id: Uuid,
      delta: i64,
    ) -> Result<Option<i64>, Self::Error> {
      if self.fail_refund && delta > 0 {
        return Err(MemoryStoreError::Unavailable);
      }
      self.inner.adjust_credits(tenant_id, delta).await
    }

    async fn debit_credit(&self, tenant_id: Uuid) -> Result<Option<i64>, Self::Error> {
      if self.fail_debit {
        return Err(MemoryStoreError::Unavailable);
      }
      self.inner.debit_credit(tenant_id).await
    }

    async fn get_form_definition(
      &self,
      tenant_id: Uuid,
    ) -> Result<Option<FormDefinition>, Self::Error> {
      self.inner.get_form_definition(tenant_id).await
    }

    async fn save_form_definition(
      &self,
      tenant_id: Uuid,
      form: FormDefinition,
    ) -> Result<(), Self::Error> {
      self.inner.save_form_definition(tenant_id, form).await
    }

    async fn insert_submission(
      &self,
      input: NewSubmission,
    ) -> Result<Submission, Self::Error> {
      self.inner.insert_submission(input).await
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, Self::Error> {
      self.inner.get_submission(id).await
    }

    async fn update_submission_status(
      &self,
      id: Uuid,
      status: SubmissionStatus,
    ) -> Result<Option<Submission>, Self::Error> {
      self.inner.update_submission_status(id, status).await
    }

    async fn list_submissions<'a>(
      &'a self,
      tenant_id: Uuid,
      filter: &'a SubmissionFilter,
    ) -> Result<Vec<Submission>, Self::Error> {
      self.inner.list_submissions(tenant_id, filter).await
    }

    async fn insert_call_log(&self, input: NewCallLog) -> Result<CallLog, Self::Error> {
      self.inner.insert_call_log(input).await
    }

    async fn list_call_logs(
      &self,
      tenant_id: Uuid,
      limit: Option<usize>,
    ) -> Result<Vec<CallLog>, Self::Error> {
      self.inner.list_call_logs(tenant_id, limit).await
    }
  }

  fn missed(tenant_id: Uuid, call_id: &str) -> MissedCall {
    MissedCall {
      tenant_id,
      caller: "+33612345678".into(),
      call_id: Some(call_id.into()),
    }
  }

  /// Wednesday 2026-10-14 at `h:m`, UTC+2.
  fn wednesday(h: u32, m: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
      .unwrap()
      .with_ymd_and_hms(2026, 10, 14, h, m, 0)
      .unwrap()
  }

  fn tenant() -> Tenant { Tenant::new("Garage Martin") }

  #[test]
  fn landlines_are_filtered_first() {
    let mut t = tenant();
    t.settings.auto_sms_enabled = false;
    assert_eq!(
      screen(&t, "+33140404040", wednesday(10, 0)),
      Err(CallReason::IsLandline)
    );
    assert!(is_mobile("06 12 34 56 78"));
    assert!(is_mobile("+33712345678"));
  }

  #[test]
  fn disabled_auto_sms_is_filtered() {
    let mut t = tenant();
    t.settings.auto_sms_enabled = false;
    assert_eq!(
      screen(&t, "+33612345678", wednesday(10, 0)),
      Err(CallReason::SystemDisabled)
    );
  }

  #[test]
  fn schedule_checks_day_then_time() {
    let mut t = tenant();
    t.settings.schedule.enabled = true;
    t.settings.schedule.days = vec![1, 2, 4, 5];
    assert_eq!(
      screen(&t, "+33612345678", wednesday(10, 0)),
      Err(CallReason::OutsideScheduleDay)
    );

    t.settings.schedule.days.push(3);
    assert_eq!(
      screen(&t, "+33612345678", wednesday(8, 59)),
      Err(CallReason::OutsideScheduleTime)
    );
    assert_eq!(screen(&t, "+33612345678", wednesday(18, 0)), Ok(()));
    assert_eq!(
      screen(&t, "+33612345678", wednesday(18, 1)),
      Err(CallReason::OutsideScheduleTime)
    );
  }

  #[test]
  fn empty_balance_is_filtered_unless_custom_provider() {
    let mut t = tenant();
    t.sms_credits = 0;
    assert_eq!(
      screen(&t, "+33612345678", wednesday(10, 0)),
      Err(CallReason::InsufficientCredits)
    );
    t.settings.use_custom_provider = true;
    assert_eq!(screen(&t, "+33612345678", wednesday(10, 0)), Ok(()));
  }

  #[test]
  fn schedule_serialises_as_hh_mm() {
    let json = serde_json::to_value(Schedule::default()).unwrap();
    assert_eq!(json["start_time"], "09:00");
    let back: Schedule = serde_json::from_value(json).unwrap();
    assert_eq!(back, Schedule::default());
  }

  #[test]
  fn stats_count_each_status() {
    let log = |status| {
      NewCallLog {
        tenant_id: Uuid::new_v4(),
        phone: String::new(),
        message: String::new(),
        status,
        reason: CallReason::MobileOk,
        call_id: String::new(),
      }
      .into_call_log()
    };
    let logs = [
      log(CallStatus::Sent),
      log(CallStatus::Sent),
      log(CallStatus::Filtered),
      log(CallStatus::Error),
    ];
    assert_eq!(CallStats::tally(&logs), CallStats {
      sms_sent:       2,
      calls_filtered: 1,
      errors:         1,
    });
  }

  #[tokio::test]
  async fn sent_sms_carries_form_link_and_debits_a_credit() {
    let store = Arc::new(MemoryStore::new());
    let (t, _) = tenant::onboard(store.as_ref(), NewTenant {
      company_name: "Garage Martin".into(),
      admin_email:  None,
    })
    .await
    .unwrap();
    let sms = Arc::new(RecordingSms::default());
    let responder = CallResponder::new(store.clone(), sms.clone(), "https://forms.example/");

    let log = responder
      .handle(
        MissedCall {
          tenant_id: t.tenant_id,
          caller:    "+33612345678".into(),
          call_id:   Some("c1".into()),
        },
        wednesday(10, 0),
      )
      .await
      .unwrap();

    assert_eq!(log.status, CallStatus::Sent);
    assert_eq!(log.call_id, "c1");
    let link = format!("https://forms.example/f/{}", t.tenant_id);
    assert!(log.message.contains("Garage Martin"), "{}", log.message);
    assert!(log.message.contains(&link), "{}", log.message);
    assert_eq!(sms.sent().len(), 1);

    let after = store.get_tenant(t.tenant_id).await.unwrap().unwrap();
    assert_eq!(after.sms_credits, t.sms_credits - 1);
    assert_eq!(store.list_call_logs(t.tenant_id, None).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn provider_failure_is_logged_without_debit() {
    let store = Arc::new(MemoryStore::new());
    let t = store.add_tenant("Garage Martin".into()).await.unwrap();
    let sms = Arc::new(RecordingSms::failing());
    let responder = CallResponder::new(store.clone(), sms, "https://forms.example");

    let log = responder
      .handle(
        MissedCall {
          tenant_id: t.tenant_id,
          caller:    "0612345678".into(),
          call_id:   None,
        },
        wednesday(10, 0),
      )
      .await
      .unwrap();

    assert_eq!(log.status, CallStatus::Error);
    assert_eq!(log.reason, CallReason::ProviderError);
    // No form saved for this tenant, so the link is blank.
    assert!(!log.message.contains("/f/"));
    let after = store.get_tenant(t.tenant_id).await.unwrap().unwrap();
    assert_eq!(after.sms_credits, t.sms_credits);
  }

  #[tokio::test]
  async fn unknown_tenant_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let responder = CallResponder::new(store, Arc::new(RecordingSms::default()), "");
    let err = responder
      .handle(
        MissedCall {
          tenant_id: Uuid::new_v4(),
          caller:    "0612345678".into(),
          call_id:   None,
        },
        wednesday(10, 0),
      )
      .await
      .unwrap_err();
    assert!(matches!(err, CallError::TenantNotFound(_)));
  }

  #[tokio::test]
  async fn concurrent_calls_cannot_overdraw_the_last_credit() {
    let store = Arc::new(FaultyStore {
      yield_on_lookup: true,
      ..Default::default()
    });
    let t = store.add_tenant("Garage Martin".into()).await.unwrap();
    store
      .adjust_credits(t.tenant_id, 1 - t.sms_credits)
      .await
      .unwrap();
    let sms = Arc::new(RecordingSms::default());
    let responder = CallResponder::new(store.clone(), sms.clone(), "https://forms.example");

    // Both lookups see one credit before either call debits it.
    let (a, b) = tokio::join!(
      responder.handle(missed(t.tenant_id, "a"), wednesday(10, 0)),
      responder.handle(missed(t.tenant_id, "b"), wednesday(10, 0)),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let mut statuses = [a.status, b.status];
    statuses.sort_by_key(|s| s.to_string());
    assert_eq!(statuses, [CallStatus::Filtered, CallStatus::Sent]);
    let filtered = if a.status == CallStatus::Filtered { &a } else { &b };
    assert_eq!(filtered.reason, CallReason::InsufficientCredits);
    assert!(filtered.message.is_empty());

    assert_eq!(sms.sent().len(), 1);
    let after = store.get_tenant(t.tenant_id).await.unwrap().unwrap();
    assert_eq!(after.sms_credits, 0);
    assert_eq!(store.list_call_logs(t.tenant_id, None).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn failed_debit_sends_nothing() {
    let store = Arc::new(FaultyStore {
      fail_debit: true,
      ..Default::default()
    });
    let t = store.add_tenant("Garage Martin".into()).await.unwrap();
    let sms = Arc::new(RecordingSms::default());
    let responder = CallResponder::new(store.clone(), sms.clone(), "https://forms.example");

    let err = responder
      .handle(missed(t.tenant_id, "c1"), wednesday(10, 0))
      .await
      .unwrap_err();

    assert!(matches!(err, CallError::Store(MemoryStoreError::Unavailable)));
    assert!(sms.sent().is_empty());
  }

  #[tokio::test]
  async fn failed_refund_still_records_the_call() {
    let store = Arc::new(FaultyStore {
      fail_refund: true,
      ..Default::default()
    });
    let t = store.add_tenant("Garage Martin".into()).await.unwrap();
    let responder = CallResponder::new(
      store.clone(),
      Arc::new(RecordingSms::failing()),
      "https://forms.example",
    );

    let log = responder
      .handle(missed(t.tenant_id, "c1"), wednesday(10, 0))
      .await
      .unwrap();

    assert_eq!(log.status, CallStatus::Error);
    assert_eq!(log.reason, CallReason::ProviderError);
    let logs = store.list_call_logs(t.tenant_id, None).await.unwrap();
    assert_eq!(logs, vec![log]);
    // The reserved credit stays spent when the refund cannot be written.
    let after = store.get_tenant(t.tenant_id).await.unwrap().unwrap();
    assert_eq!(after.sms_credits, t.sms_credits - 1);
  }
}
