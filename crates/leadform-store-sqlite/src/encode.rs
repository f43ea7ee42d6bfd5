//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with fixed nanosecond precision so that
//! lexical order is chronological. Nested structures (settings, forms,
//! answers) are compact JSON. UUIDs are hyphenated lowercase strings.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use leadform_core::{
  call::CallLog,
  submission::{Submission, TicketNumber},
  tenant::Tenant,
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a strum-backed enum column.
pub fn decode_enum<T>(s: &str) -> Result<T>
where
  T: FromStr,
  T::Err: Display,
{
  s.parse()
    .map_err(|e| Error::Decode(format!("{s:?}: {e}")))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `tenants` row.
pub struct RawTenant {
  pub tenant_id:     String,
  pub company_name:  String,
  pub created_at:    String,
  pub sms_credits:   i64,
  pub settings_json: String,
}

impl RawTenant {
  pub fn into_tenant(self) -> Result<Tenant> {
    Ok(Tenant {
      tenant_id:    decode_uuid(&self.tenant_id)?,
      company_name: self.company_name,
      created_at:   decode_dt(&self.created_at)?,
      sms_credits:  self.sms_credits,
      settings:     decode_json(&self.settings_json)?,
    })
  }
}

pub const TENANT_COLUMNS: &str =
  "tenant_id, company_name, created_at, sms_credits, settings_json";

pub fn raw_tenant(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTenant> {
  Ok(RawTenant {
    tenant_id:     row.get(0)?,
    company_name:  row.get(1)?,
    created_at:    row.get(2)?,
    sms_credits:   row.get(3)?,
    settings_json: row.get(4)?,
  })
}

/// Raw values read directly from a `submissions` row.
pub struct RawSubmission {
  pub submission_id:   String,
  pub tenant_id:       String,
  pub ticket_number:   String,
  pub phone:           String,
  pub created_at:      String,
  pub answers_json:    String,
  pub marketing_optin: bool,
  pub status:          String,
}

impl RawSubmission {
  pub fn into_submission(self) -> Result<Submission> {
    Ok(Submission {
      id:              decode_uuid(&self.submission_id)?,
      ticket_number:   TicketNumber::parse(&self.ticket_number)?,
      tenant_id:       decode_uuid(&self.tenant_id)?,
      phone:           self.phone,
      created_at:      decode_dt(&self.created_at)?,
      answers:         decode_json(&self.answers_json)?,
      marketing_optin: self.marketing_optin,
      status:          decode_enum(&self.status)?,
    })
  }
}

pub const SUBMISSION_COLUMNS: &str = "submission_id, tenant_id, ticket_number, \
                                      phone, created_at, answers_json, \
                                      marketing_optin, status";

pub fn raw_submission(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSubmission> {
  Ok(RawSubmission {
    submission_id:   row.get(0)?,
    tenant_id:       row.get(1)?,
    ticket_number:   row.get(2)?,
    phone:           row.get(3)?,
    created_at:      row.get(4)?,
    answers_json:    row.get(5)?,
    marketing_optin: row.get(6)?,
    status:          row.get(7)?,
  })
}

/// Raw values read directly from a `call_logs` row.
pub struct RawCallLog {
  pub call_log_id: String,
  pub tenant_id:   String,
  pub phone:       String,
  pub message:     String,
  pub status:      String,
  pub reason:      String,
  pub call_id:     String,
  pub created_at:  String,
}

impl RawCallLog {
  pub fn into_call_log(self) -> Result<CallLog> {
    Ok(CallLog {
      id:         decode_uuid(&self.call_log_id)?,
      tenant_id:  decode_uuid(&self.tenant_id)?,
      phone:      self.phone,
      message:    self.message,
      status:     decode_enum(&self.status)?,
      reason:     decode_enum(&self.reason)?,
      call_id:    self.call_id,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const CALL_LOG_COLUMNS: &str =
  "call_log_id, tenant_id, phone, message, status, reason, call_id, created_at";

pub fn raw_call_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCallLog> {
  Ok(RawCallLog {
    call_log_id: row.get(0)?,
    tenant_id:   row.get(1)?,
    phone:       row.get(2)?,
    message:     row.get(3)?,
    status:      row.get(4)?,
    reason:      row.get(5)?,
    call_id:     row.get(6)?,
    created_at:  row.get(7)?,
  })
}
