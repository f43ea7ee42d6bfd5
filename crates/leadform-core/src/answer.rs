//! Answer values and the per-session answer collector.
//!
//! The collector holds one value per block id while a respondent fills the
//! form. At submit time it walks the form's blocks in order and emits an
//! [`Answer`] for each block it holds a value for, copying the block's label
//! so the submission stays readable after the form changes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
  ValidationError, ValidationIssue,
  block::{AnswerShape, BlockDefinition, BlockVariant},
  form::FormDefinition,
};

/// Stored as the submission phone when no contact number can be derived.
pub const PHONE_PLACEHOLDER: &str = "0000000000";

// ─── Contact composite ───────────────────────────────────────────────────────

/// One key of the contact composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ContactField {
  LastName,
  FirstName,
  Email,
  Phone,
  Address,
}

impl ContactField {
  /// Every field in display order.
  pub const ALL: [ContactField; 5] = [
    Self::LastName,
    Self::FirstName,
    Self::Email,
    Self::Phone,
    Self::Address,
  ];

  /// The address line is optional even on a required contact block.
  pub fn required_when_block_required(self) -> bool { self != Self::Address }
}

/// The value of a `contact_info` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactValue {
  #[serde(default)]
  pub last_name:  String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub email:      String,
  #[serde(default)]
  pub phone:      String,
  #[serde(default)]
  pub address:    String,
}

/// A partial contact update; `None` keys leave the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatch {
  pub last_name:  Option<String>,
  pub first_name: Option<String>,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub address:    Option<String>,
}

impl ContactValue {
  pub fn get(&self, field: ContactField) -> &str {
    match field {
      ContactField::LastName => &self.last_name,
      ContactField::FirstName => &self.first_name,
      ContactField::Email => &self.email,
      ContactField::Phone => &self.phone,
      ContactField::Address => &self.address,
    }
  }

  /// Set one key, leaving the others untouched.
  pub fn set(&mut self, field: ContactField, value: impl Into<String>) {
    let slot = match field {
      ContactField::LastName => &mut self.last_name,
      ContactField::FirstName => &mut self.first_name,
      ContactField::Email => &mut self.email,
      ContactField::Phone => &mut self.phone,
      ContactField::Address => &mut self.address,
    };
    *slot = value.into();
  }

  /// Merge every key present in `patch` into `self`.
  pub fn merge(&mut self, patch: ContactPatch) {
    let ContactPatch {
      last_name,
      first_name,
      email,
      phone,
      address,
    } = patch;
    for (field, value) in [
      (ContactField::LastName, last_name),
      (ContactField::FirstName, first_name),
      (ContactField::Email, email),
      (ContactField::Phone, phone),
      (ContactField::Address, address),
    ] {
      if let Some(value) = value {
        self.set(field, value);
      }
    }
  }

  /// Whether every field a required contact block demands is filled in.
  pub fn is_complete(&self) -> bool {
    ContactField::ALL
      .into_iter()
      .filter(|f| f.required_when_block_required())
      .all(|f| !self.get(f).trim().is_empty())
  }
}

// ─── Answer values ───────────────────────────────────────────────────────────

/// The heterogeneous value of one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
  Flag(bool),
  /// Free text, or the file reference of a photo/video block.
  Text(String),
  Contact(ContactValue),
}

impl AnswerValue {
  pub fn fits(&self, shape: AnswerShape) -> bool {
    matches!(
      (self, shape),
      (Self::Text(_), AnswerShape::Text | AnswerShape::FileReference(_))
        | (Self::Flag(_), AnswerShape::Flag)
        | (Self::Contact(_), AnswerShape::Contact)
    )
  }

  /// Whether this value satisfies a `required` block. An unticked checkbox
  /// does not.
  pub fn satisfies_required(&self) -> bool {
    match self {
      Self::Flag(checked) => *checked,
      Self::Text(text) => !text.trim().is_empty(),
      Self::Contact(contact) => contact.is_complete(),
    }
  }
}

/// One answered block, as persisted inside a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
  #[serde(alias = "blockId")]
  pub block_id: String,
  /// Copy of the block label at submission time.
  pub label:    String,
  pub value:    AnswerValue,
}

// ─── Collector ───────────────────────────────────────────────────────────────

/// Respondent input for a single block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
  Text(String),
  Flag(bool),
  /// Reference returned by the file store for an attached photo or video.
  File(String),
  Contact(ContactPatch),
}

/// Accumulates answers for one respondent session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerCollector {
  values:          HashMap<String, AnswerValue>,
  marketing_optin: bool,
}

impl AnswerCollector {
  pub fn new() -> Self { Self::default() }

  pub fn value(&self, block_id: &str) -> Option<&AnswerValue> {
    self.values.get(block_id)
  }

  pub fn marketing_optin(&self) -> bool { self.marketing_optin }

  pub fn set_marketing_optin(&mut self, checked: bool) {
    self.marketing_optin = checked;
  }

  pub fn is_empty(&self) -> bool { self.values.is_empty() }

  /// Record input for `block`. Static blocks swallow input without storing
  /// anything; input of the wrong shape is rejected.
  pub fn record(
    &mut self,
    block: &BlockDefinition,
    input: AnswerInput,
  ) -> Result<(), ValidationIssue> {
    let Some(shape) = block.variant.answer_shape() else {
      return Ok(());
    };

    let value = match (shape, input) {
      (AnswerShape::Text, AnswerInput::Text(text)) => AnswerValue::Text(text),
      (AnswerShape::Flag, AnswerInput::Flag(checked)) => {
        AnswerValue::Flag(checked)
      }
      (AnswerShape::FileReference(_), AnswerInput::File(reference)) => {
        AnswerValue::Text(reference)
      }
      (AnswerShape::Contact, AnswerInput::Contact(patch)) => {
        self.merge_contact(&block.id, patch);
        return Ok(());
      }
      (expected, _) => {
        return Err(ValidationIssue::ValueShape {
          block_id: block.id.clone(),
          expected,
        });
      }
    };

    self.values.insert(block.id.clone(), value);
    Ok(())
  }

  /// Merge a partial contact update into the block's composite value,
  /// creating it on first touch.
  pub fn merge_contact(&mut self, block_id: &str, patch: ContactPatch) {
    let entry = self
      .values
      .entry(block_id.to_owned())
      .or_insert_with(|| AnswerValue::Contact(ContactValue::default()));
    match entry {
      AnswerValue::Contact(contact) => contact.merge(patch),
      other => {
        let mut contact = ContactValue::default();
        contact.merge(patch);
        *other = AnswerValue::Contact(contact);
      }
    }
  }

  /// Update one contact sub-field; shorthand for a single-key merge.
  pub fn set_contact_field(
    &mut self,
    block_id: &str,
    field: ContactField,
    value: impl Into<String>,
  ) {
    let mut patch = ContactPatch::default();
    let value = Some(value.into());
    match field {
      ContactField::LastName => patch.last_name = value,
      ContactField::FirstName => patch.first_name = value,
      ContactField::Email => patch.email = value,
      ContactField::Phone => patch.phone = value,
      ContactField::Address => patch.address = value,
    }
    self.merge_contact(block_id, patch);
  }

  /// Build a collector from a JSON object keyed by block id, as posted by
  /// the public form. Every entry is checked against `form`.
  pub fn from_json(
    form: &FormDefinition,
    raw: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<Self, ValidationError> {
    let mut collector = Self::new();
    let mut issues = Vec::new();

    for (block_id, json) in raw {
      let Some(block) = form.block(block_id) else {
        issues.push(ValidationIssue::UnknownBlock {
          block_id: block_id.clone(),
        });
        continue;
      };
      let Some(shape) = block.variant.answer_shape() else {
        continue;
      };
      let input = match (shape, json) {
        (AnswerShape::Text, serde_json::Value::String(s)) => {
          Some(AnswerInput::Text(s.clone()))
        }
        (AnswerShape::FileReference(_), serde_json::Value::String(s)) => {
          Some(AnswerInput::File(s.clone()))
        }
        (AnswerShape::Flag, serde_json::Value::Bool(b)) => {
          Some(AnswerInput::Flag(*b))
        }
        (AnswerShape::Contact, serde_json::Value::Object(_)) => {
          serde_json::from_value(json.clone())
            .ok()
            .map(AnswerInput::Contact)
        }
        _ => None,
      };
      match input {
        Some(input) => {
          if let Err(issue) = collector.record(block, input) {
            issues.push(issue);
          }
        }
        None => issues.push(ValidationIssue::ValueShape {
          block_id: block_id.clone(),
          expected: shape,
        }),
      }
    }

    ValidationError::check(issues).map(|()| collector)
  }

  // ── Submit-time derivations ───────────────────────────────────────────

  /// Required, answerable blocks without a satisfying value, in form order.
  pub fn missing_required(&self, form: &FormDefinition) -> Vec<ValidationIssue> {
    form
      .blocks
      .iter()
      .filter(|b| b.is_required() && !b.variant.is_static())
      .filter(|b| {
        !self
          .values
          .get(&b.id)
          .is_some_and(AnswerValue::satisfies_required)
      })
      .map(|b| ValidationIssue::MissingRequired {
        block_id: b.id.clone(),
        label:    b.label.clone(),
      })
      .collect()
  }

  /// The ordered answer set: one [`Answer`] per answerable block that holds a
  /// value, in block order, with the block's current label.
  pub fn answers(&self, form: &FormDefinition) -> Vec<Answer> {
    form
      .blocks
      .iter()
      .filter(|b| !b.variant.is_static())
      .filter_map(|b| {
        self.values.get(&b.id).map(|value| Answer {
          block_id: b.id.clone(),
          label:    b.label.clone(),
          value:    value.clone(),
        })
      })
      .collect()
  }

  fn first_contact(&self, form: &FormDefinition) -> Option<&ContactValue> {
    let block = form.first_contact_block()?;
    match self.values.get(&block.id)? {
      AnswerValue::Contact(contact) => Some(contact),
      _ => None,
    }
  }

  /// The submission's top-level phone: the first contact block's phone, else
  /// its email, else [`PHONE_PLACEHOLDER`].
  pub fn derive_phone(&self, form: &FormDefinition) -> String {
    self
      .first_contact(form)
      .and_then(|c| {
        [c.phone.trim(), c.email.trim()]
          .into_iter()
          .find(|s| !s.is_empty())
      })
      .unwrap_or(PHONE_PLACEHOLDER)
      .to_owned()
  }

  /// The respondent's email from the first contact block, if given.
  pub fn client_email(&self, form: &FormDefinition) -> Option<String> {
    self
      .first_contact(form)
      .map(|c| c.email.trim())
      .filter(|e| !e.is_empty())
      .map(str::to_owned)
  }

  /// The respondent's phone from the first contact block, if given.
  pub fn client_phone(&self, form: &FormDefinition) -> Option<String> {
    self
      .first_contact(form)
      .map(|c| c.phone.trim())
      .filter(|p| !p.is_empty())
      .map(str::to_owned)
  }
}
