//! Error types for `leadform-core`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{block::AnswerShape, form::Channel};

#[derive(Debug, Error)]
pub enum Error {
  #[error("tenant not found: {0}")]
  TenantNotFound(Uuid),

  #[error("submission not found: {0}")]
  SubmissionNotFound(Uuid),

  #[error("block not found: {0:?}")]
  BlockNotFound(String),

  #[error("the form for tenant {0} is not accepting submissions")]
  FormDisabled(Uuid),

  #[error("malformed ticket number: {0:?}")]
  MalformedTicket(String),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Validation ──────────────────────────────────────────────────────────────

/// A single reason a form definition or an answer set was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
  #[error("required block {block_id:?} ({label:?}) has no answer")]
  MissingRequired { block_id: String, label: String },

  #[error("block {block_id:?} expects a {expected} answer")]
  ValueShape {
    block_id: String,
    expected: AnswerShape,
  },

  #[error("no block with id {block_id:?} in this form")]
  UnknownBlock { block_id: String },

  #[error("block id {block_id:?} appears more than once")]
  DuplicateBlockId { block_id: String },

  #[error("channel {channel} is enabled but has no destination")]
  MissingDestination { channel: Channel },

  #[error("channel {channel} destination {destination:?} is malformed")]
  MalformedDestination {
    channel:     Channel,
    destination: String,
  },
}

/// A non-empty collection of [`ValidationIssue`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
  pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
  /// Wrap `issues`, returning `Ok(())` when there are none.
  pub fn check(issues: Vec<ValidationIssue>) -> Result<(), Self> {
    if issues.is_empty() {
      Ok(())
    } else {
      Err(Self { issues })
    }
  }
}

impl From<ValidationIssue> for ValidationError {
  fn from(issue: ValidationIssue) -> Self { Self { issues: vec![issue] } }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "validation failed")?;
    for (i, issue) in self.issues.iter().enumerate() {
      let sep = if i == 0 { ": " } else { "; " };
      write!(f, "{sep}{issue}")?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationError {}
