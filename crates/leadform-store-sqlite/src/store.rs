//! [`SqliteStore`], the SQLite implementation of [`LeadStore`].

use std::path::Path;

use chrono::Utc;
use leadform_core::{
  call::{CallLog, NewCallLog},
  form::FormDefinition,
  store::LeadStore,
  submission::{NewSubmission, Submission, SubmissionFilter, SubmissionStatus, TriageBucket},
  tenant::Tenant,
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    CALL_LOG_COLUMNS, RawCallLog, RawSubmission, RawTenant, SUBMISSION_COLUMNS,
    TENANT_COLUMNS, decode_json, encode_dt, encode_json, encode_uuid, raw_call_log,
    raw_submission, raw_tenant,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Leadform store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a fresh in-memory store. Used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// SQL predicate selecting a triage bucket.
fn bucket_clause(bucket: TriageBucket) -> &'static str {
  match bucket {
    TriageBucket::ToProcess => "status IN ('new', 'pending')",
    TriageBucket::All => "status != 'archived'",
    TriageBucket::Archived => "status = 'archived'",
  }
}

// ─── LeadStore impl ──────────────────────────────────────────────────────────

impl LeadStore for SqliteStore {
  type Error = Error;

  // ── Tenants ───────────────────────────────────────────────────────────────

  async fn add_tenant(&self, company_name: String) -> Result<Tenant> {
    let tenant = Tenant::new(company_name);

    let id_str        = encode_uuid(tenant.tenant_id);
    let name          = tenant.company_name.clone();
    let at_str        = encode_dt(tenant.created_at);
    let credits       = tenant.sms_credits;
    let settings_json = encode_json(&tenant.settings)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tenants (tenant_id, company_name, created_at, sms_credits, settings_json)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, at_str, credits, settings_json],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(tenant_id = %tenant.tenant_id, "tenant created");
    Ok(tenant)
  }

  async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>> {
    let id_str = encode_uuid(tenant_id);

    let raw: Option<RawTenant> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE tenant_id = ?1"),
              rusqlite::params![id_str],
              raw_tenant,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTenant::into_tenant).transpose()
  }

  async fn list_tenants(&self) -> Result<Vec<Tenant>> {
    let raws: Vec<RawTenant> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TENANT_COLUMNS} FROM tenants ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map([], raw_tenant)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTenant::into_tenant).collect()
  }

  async fn save_tenant(&self, tenant: Tenant) -> Result<Option<Tenant>> {
    let id_str        = encode_uuid(tenant.tenant_id);
    let settings_json = encode_json(&tenant.settings)?;
    let name          = tenant.company_name;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE tenants SET company_name = ?2, settings_json = ?3 WHERE tenant_id = ?1",
          rusqlite::params![id_str, name, settings_json],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_tenant(tenant.tenant_id).await
  }

  async fn adjust_credits(&self, tenant_id: Uuid, delta: i64) -> Result<Option<i64>> {
    let id_str = encode_uuid(tenant_id);

    let balance = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE tenants SET sms_credits = sms_credits + ?2
               WHERE tenant_id = ?1
               RETURNING sms_credits",
              rusqlite::params![id_str, delta],
              |row| row.get::<_, i64>(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(balance)
  }

  async fn debit_credit(&self, tenant_id: Uuid) -> Result<Option<i64>> {
    let id_str = encode_uuid(tenant_id);

    let balance = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE tenants SET sms_credits = sms_credits - 1
               WHERE tenant_id = ?1 AND sms_credits > 0
               RETURNING sms_credits",
              rusqlite::params![id_str],
              |row| row.get::<_, i64>(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(balance)
  }

  // ── Form definitions ──────────────────────────────────────────────────────

  async fn get_form_definition(&self, tenant_id: Uuid) -> Result<Option<FormDefinition>> {
    let id_str = encode_uuid(tenant_id);

    let json: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT definition_json FROM form_definitions WHERE tenant_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    json.as_deref().map(decode_json).transpose()
  }

  async fn save_form_definition(&self, tenant_id: Uuid, form: FormDefinition) -> Result<()> {
    let id_str = encode_uuid(tenant_id);
    let json   = encode_json(&form)?;
    let at_str = encode_dt(Utc::now());

    let saved = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM tenants WHERE tenant_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO form_definitions (tenant_id, definition_json, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (tenant_id) DO UPDATE
             SET definition_json = excluded.definition_json,
                 updated_at      = excluded.updated_at",
          rusqlite::params![id_str, json, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if saved {
      Ok(())
    } else {
      Err(Error::TenantNotFound(tenant_id))
    }
  }

  // ── Submissions ───────────────────────────────────────────────────────────

  async fn insert_submission(&self, input: NewSubmission) -> Result<Submission> {
    let submission = input.into_submission();

    let id_str       = encode_uuid(submission.id);
    let tenant_str   = encode_uuid(submission.tenant_id);
    let ticket       = submission.ticket_number.to_string();
    let phone        = submission.phone.clone();
    let at_str       = encode_dt(submission.created_at);
    let answers_json = encode_json(&submission.answers)?;
    let optin        = submission.marketing_optin;
    let status       = submission.status.as_ref().to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO submissions
             (submission_id, tenant_id, ticket_number, phone, created_at,
              answers_json, marketing_optin, status)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            tenant_str,
            ticket,
            phone,
            at_str,
            answers_json,
            optin,
            status
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(submission)
  }

  async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubmission> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE submission_id = ?1"
              ),
              rusqlite::params![id_str],
              raw_submission,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubmission::into_submission).transpose()
  }

  async fn update_submission_status(
    &self,
    id: Uuid,
    status: SubmissionStatus,
  ) -> Result<Option<Submission>> {
    let id_str     = encode_uuid(id);
    let status_str = status.as_ref().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE submissions SET status = ?2 WHERE submission_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_submission(id).await
  }

  async fn list_submissions(
    &self,
    tenant_id: Uuid,
    filter: &SubmissionFilter,
  ) -> Result<Vec<Submission>> {
    let tenant_str   = encode_uuid(tenant_id);
    let text         = filter.text.clone();
    let bucket       = filter.bucket.map(bucket_clause);
    let limit_val    = filter.limit.map_or(-1, |l| l as i64);
    let offset_val   = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawSubmission> = self
      .conn
      .call(move |conn| {
        let mut conds = vec!["tenant_id = ?1"];
        if text.is_some() {
          // Plain case-sensitive substring match, no LIKE wildcards.
          conds.push("(instr(ticket_number, ?2) > 0 OR instr(phone, ?2) > 0)");
        }
        if let Some(clause) = bucket {
          conds.push(clause);
        }

        let sql = format!(
          "SELECT {SUBMISSION_COLUMNS}
           FROM submissions
           WHERE {}
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?3 OFFSET ?4",
          conds.join(" AND ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![tenant_str, text.as_deref(), limit_val, offset_val],
            raw_submission,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  // ── Call log ──────────────────────────────────────────────────────────────

  async fn insert_call_log(&self, input: NewCallLog) -> Result<CallLog> {
    let log = input.into_call_log();

    let id_str     = encode_uuid(log.id);
    let tenant_str = encode_uuid(log.tenant_id);
    let phone      = log.phone.clone();
    let message    = log.message.clone();
    let status     = log.status.as_ref().to_owned();
    let reason     = log.reason.as_ref().to_owned();
    let call_id    = log.call_id.clone();
    let at_str     = encode_dt(log.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO call_logs ({CALL_LOG_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
          ),
          rusqlite::params![id_str, tenant_str, phone, message, status, reason, call_id, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(log)
  }

  async fn list_call_logs(&self, tenant_id: Uuid, limit: Option<usize>) -> Result<Vec<CallLog>> {
    let tenant_str = encode_uuid(tenant_id);
    let limit_val  = limit.map_or(-1, |l| l as i64);

    let raws: Vec<RawCallLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CALL_LOG_COLUMNS}
           FROM call_logs
           WHERE tenant_id = ?1
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![tenant_str, limit_val], raw_call_log)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCallLog::into_call_log).collect()
  }
}
