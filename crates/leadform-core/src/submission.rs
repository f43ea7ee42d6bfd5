//! Submissions, ticket numbers and the triage state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, answer::Answer};

// ─── Ticket number ───────────────────────────────────────────────────────────

/// Human-facing correlation token for a submission, e.g. `#REQ-482913`.
///
/// Generated from six random digits; uniqueness is best-effort. The internal
/// [`Submission::id`] is the real key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(String);

impl TicketNumber {
  pub const PREFIX: &'static str = "#REQ-";

  pub fn generate() -> Self {
    // Rejection sampling keeps the 900 000 outcomes uniform.
    const SPAN: u32 = 900_000;
    const ZONE: u32 = u32::MAX - (u32::MAX % SPAN);
    let n = loop {
      let v = OsRng.next_u32();
      if v < ZONE {
        break 100_000 + v % SPAN;
      }
    };
    Self(format!("{}{n}", Self::PREFIX))
  }

  /// Parse and validate against `#REQ-` followed by 4 to 6 digits.
  pub fn parse(s: &str) -> Result<Self> {
    if Self::is_well_formed(s) {
      Ok(Self(s.to_owned()))
    } else {
      Err(Error::MalformedTicket(s.to_owned()))
    }
  }

  pub fn is_well_formed(s: &str) -> bool {
    s.strip_prefix(Self::PREFIX).is_some_and(|digits| {
      (4..=6).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
    })
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TicketNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Triage state of a submission. Any state may move to any other state by an
/// explicit tenant action; nothing transitions automatically.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubmissionStatus {
  #[default]
  New,
  Pending,
  Done,
  Archived,
}

/// Tenant-facing inbox tabs. A presentation filter over
/// [`SubmissionStatus`], never stored.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriageBucket {
  /// `new` or `pending`.
  #[default]
  ToProcess,
  /// Everything except `archived`.
  All,
  Archived,
}

impl TriageBucket {
  pub fn contains(self, status: SubmissionStatus) -> bool {
    match self {
      Self::ToProcess => {
        matches!(status, SubmissionStatus::New | SubmissionStatus::Pending)
      }
      Self::All => status != SubmissionStatus::Archived,
      Self::Archived => status == SubmissionStatus::Archived,
    }
  }
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// The persisted result of one form completion. `status` is the only field
/// that changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
  pub id:              Uuid,
  pub ticket_number:   TicketNumber,
  pub tenant_id:       Uuid,
  /// Derived from the first contact block; see
  /// [`AnswerCollector::derive_phone`](crate::answer::AnswerCollector::derive_phone).
  pub phone:           String,
  pub created_at:      DateTime<Utc>,
  pub answers:         Vec<Answer>,
  pub marketing_optin: bool,
  pub status:          SubmissionStatus,
}

impl Submission {
  /// Move to `to`, returning the previous status.
  pub fn transition(&mut self, to: SubmissionStatus) -> SubmissionStatus {
    std::mem::replace(&mut self.status, to)
  }
}

/// Input to [`crate::store::LeadStore::insert_submission`]. The store assigns
/// `id` and `created_at`; every submission starts as
/// [`SubmissionStatus::New`].
#[derive(Debug, Clone)]
pub struct NewSubmission {
  pub ticket_number:   TicketNumber,
  pub tenant_id:       Uuid,
  pub phone:           String,
  pub answers:         Vec<Answer>,
  pub marketing_optin: bool,
}

impl NewSubmission {
  /// Materialise the stored record with a fresh id and timestamp.
  pub fn into_submission(self) -> Submission {
    Submission {
      id:              Uuid::new_v4(),
      ticket_number:   self.ticket_number,
      tenant_id:       self.tenant_id,
      phone:           self.phone,
      created_at:      Utc::now(),
      answers:         self.answers,
      marketing_optin: self.marketing_optin,
      status:          SubmissionStatus::New,
    }
  }
}

// ─── Listing ─────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::LeadStore::list_submissions`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionFilter {
  /// `None` returns every status, archived included.
  pub bucket: Option<TriageBucket>,
  /// Substring match over ticket number and phone.
  pub text:   Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl SubmissionFilter {
  pub fn bucket(bucket: TriageBucket) -> Self {
    Self {
      bucket: Some(bucket),
      ..Default::default()
    }
  }

  /// Whether `submission` passes the bucket and text filters. Paging is
  /// applied separately.
  pub fn matches(&self, submission: &Submission) -> bool {
    let in_bucket = self.bucket.is_none_or(|b| b.contains(submission.status));
    let text_ok = self.text.as_deref().is_none_or(|t| {
      submission.ticket_number.as_str().contains(t) || submission.phone.contains(t)
    });
    in_bucket && text_ok
  }
}

/// Badge counts for the inbox tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageCounts {
  pub new:        usize,
  pub to_process: usize,
  pub all:        usize,
  pub archived:   usize,
}

impl TriageCounts {
  pub fn tally<'a>(submissions: impl IntoIterator<Item = &'a Submission>) -> Self {
    submissions
      .into_iter()
      .fold(Self::default(), |mut counts, s| {
        counts.new += usize::from(s.status == SubmissionStatus::New);
        counts.to_process += usize::from(TriageBucket::ToProcess.contains(s.status));
        counts.all += usize::from(TriageBucket::All.contains(s.status));
        counts.archived += usize::from(TriageBucket::Archived.contains(s.status));
        counts
      })
  }
}
