//! Async HTTP client wrapping the Leadform JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use leadform_core::{
  block::{BlockDefinition, BlockVariant},
  call::CallStats,
  form::{FormDefinition, MoveDirection},
  submission::{Submission, SubmissionStatus, TriageBucket, TriageCounts},
};
use reqwest::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the Leadform API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Dashboard counters, as returned by `GET /tenants/{id}/stats`.
#[derive(Debug, Deserialize)]
pub struct Stats {
  pub sms_credits: i64,
  pub calls:       CallStats,
  pub submissions: TriageCounts,
}

#[derive(Debug, Deserialize)]
pub struct Moved {
  pub block_id: String,
  pub index:    usize,
}

/// Async HTTP client for the Leadform JSON REST API.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// Turn a non-2xx response into an error carrying the server's message.
  async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_owned))
      .unwrap_or_default();
    Err(anyhow!("{what} → {status} {message}"))
  }

  async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    Self::check(resp, what)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising {what}"))
  }

  // ── Submissions ───────────────────────────────────────────────────────────

  /// `GET /api/tenants/{id}/submissions?bucket=<b>[&q=<text>]`
  pub async fn list_submissions(
    &self,
    tenant_id: Uuid,
    bucket: TriageBucket,
    query: Option<&str>,
  ) -> Result<Vec<Submission>> {
    let mut params = vec![("bucket", bucket.to_string())];
    if let Some(q) = query {
      params.push(("q", q.to_owned()));
    }
    let resp = self
      .client
      .get(self.url(&format!("/tenants/{tenant_id}/submissions")))
      .query(&params)
      .send()
      .await
      .context("GET /submissions failed")?;
    Self::decode(resp, "submissions").await
  }

  /// `GET /api/submissions/{id}`
  pub async fn get_submission(&self, id: Uuid) -> Result<Submission> {
    let resp = self
      .client
      .get(self.url(&format!("/submissions/{id}")))
      .send()
      .await
      .context("GET /submissions/{id} failed")?;
    Self::decode(resp, "submission").await
  }

  /// `PATCH /api/submissions/{id}/status`
  pub async fn set_status(&self, id: Uuid, status: SubmissionStatus) -> Result<Submission> {
    let resp = self
      .client
      .patch(self.url(&format!("/submissions/{id}/status")))
      .json(&json!({ "status": status }))
      .send()
      .await
      .context("PATCH /submissions/{id}/status failed")?;
    Self::decode(resp, "submission").await
  }

  // ── Form editor ───────────────────────────────────────────────────────────

  /// `GET /api/tenants/{id}/form`
  pub async fn get_form(&self, tenant_id: Uuid) -> Result<FormDefinition> {
    let resp = self
      .client
      .get(self.url(&format!("/tenants/{tenant_id}/form")))
      .send()
      .await
      .context("GET /form failed")?;
    Self::decode(resp, "form").await
  }

  /// `POST /api/tenants/{id}/form/blocks`
  pub async fn add_block(&self, tenant_id: Uuid, variant: BlockVariant) -> Result<BlockDefinition> {
    let resp = self
      .client
      .post(self.url(&format!("/tenants/{tenant_id}/form/blocks")))
      .json(&json!({ "variant": variant }))
      .send()
      .await
      .context("POST /form/blocks failed")?;
    Self::decode(resp, "block").await
  }

  /// `POST /api/tenants/{id}/form/blocks/{block}/move`
  pub async fn move_block(
    &self,
    tenant_id: Uuid,
    block_id: &str,
    direction: MoveDirection,
  ) -> Result<Moved> {
    let resp = self
      .client
      .post(self.url(&format!("/tenants/{tenant_id}/form/blocks/{block_id}/move")))
      .json(&json!({ "direction": direction }))
      .send()
      .await
      .context("POST /form/blocks/{block}/move failed")?;
    Self::decode(resp, "move result").await
  }

  /// `DELETE /api/tenants/{id}/form/blocks/{block}`
  pub async fn remove_block(&self, tenant_id: Uuid, block_id: &str) -> Result<()> {
    let resp = self
      .client
      .delete(self.url(&format!("/tenants/{tenant_id}/form/blocks/{block_id}")))
      .send()
      .await
      .context("DELETE /form/blocks/{block} failed")?;
    Self::check(resp, "remove block").await.map(drop)
  }

  // ── Dashboard ─────────────────────────────────────────────────────────────

  /// `GET /api/tenants/{id}/stats`
  pub async fn stats(&self, tenant_id: Uuid) -> Result<Stats> {
    let resp = self
      .client
      .get(self.url(&format!("/tenants/{tenant_id}/stats")))
      .send()
      .await
      .context("GET /stats failed")?;
    Self::decode(resp, "stats").await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_joins_api_prefix_without_double_slash() {
    let client = ApiClient::new(ApiConfig {
      base_url: "http://localhost:8080/".into(),
    })
    .unwrap();
    assert_eq!(client.url("/blocks/palette"), "http://localhost:8080/api/blocks/palette");
  }

  #[test]
  fn stats_payload_deserialises() {
    let stats: Stats = serde_json::from_value(json!({
      "sms_credits": 9,
      "calls": { "sms_sent": 1, "calls_filtered": 2, "errors": 0 },
      "submissions": { "new": 1, "to_process": 1, "all": 1, "archived": 0 }
    }))
    .unwrap();
    assert_eq!(stats.sms_credits, 9);
    assert_eq!(stats.calls.calls_filtered, 2);
    assert_eq!(stats.submissions.to_process, 1);
  }
}
