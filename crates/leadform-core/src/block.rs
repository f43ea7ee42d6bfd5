//! Block schema: the closed set of form block variants.
//!
//! Every variant has one entry in a static lookup table ([`BlockSchema`])
//! describing whether it can be required, what shape its answer takes, and the
//! defaults the editor uses when a block of that variant is created. Adding a
//! variant forces every `match` over [`BlockVariant`] (schema, renderer,
//! answer normaliser) to be updated.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

// ─── Variant ─────────────────────────────────────────────────────────────────

/// The kind of a form block. The serde tag doubles as the wire and database
/// representation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlockVariant {
  Header,
  Paragraph,
  #[serde(alias = "text")]
  #[strum(to_string = "short_text", serialize = "text")]
  ShortText,
  #[serde(alias = "textarea")]
  #[strum(to_string = "long_text", serialize = "textarea")]
  LongText,
  Photo,
  Video,
  Checkbox,
  Separator,
  ContactInfo,
}

/// The kind of media a file block accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
  Image,
  Video,
}

impl MediaKind {
  /// The HTML `accept` filter for an upload control of this kind.
  pub fn accept(self) -> &'static str {
    match self {
      Self::Image => "image/*",
      Self::Video => "video/*",
    }
  }
}

/// The expected shape of the answer a block collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(tag = "shape", content = "media", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnswerShape {
  /// Free text, single- or multi-line.
  Text,
  /// A yes/no flag; absent until the respondent touches the control.
  Flag,
  /// A reference string returned by the file store once a file is attached.
  #[strum(to_string = "file reference")]
  FileReference(MediaKind),
  /// The composite `{lastName, firstName, email, phone, address}` object.
  Contact,
}

// ─── Schema table ────────────────────────────────────────────────────────────

/// One row of the block schema lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSchema {
  pub variant:             BlockVariant,
  /// Whether the `required` flag means anything for this variant.
  pub accepts_required:    bool,
  /// `None` for static blocks, which never produce answers.
  pub answer:              Option<AnswerShape>,
  pub default_label:       &'static str,
  pub default_placeholder: Option<&'static str>,
}

const NEW_QUESTION: &str = "New question";
const NEW_PLACEHOLDER: &str = "Your answer...";

static HEADER: BlockSchema = BlockSchema {
  variant:             BlockVariant::Header,
  accepts_required:    false,
  answer:              None,
  default_label:       "New heading",
  default_placeholder: None,
};

static PARAGRAPH: BlockSchema = BlockSchema {
  variant:             BlockVariant::Paragraph,
  accepts_required:    false,
  answer:              None,
  default_label:       NEW_QUESTION,
  default_placeholder: None,
};

static SHORT_TEXT: BlockSchema = BlockSchema {
  variant:             BlockVariant::ShortText,
  accepts_required:    true,
  answer:              Some(AnswerShape::Text),
  default_label:       NEW_QUESTION,
  default_placeholder: Some(NEW_PLACEHOLDER),
};

static LONG_TEXT: BlockSchema = BlockSchema {
  variant:             BlockVariant::LongText,
  accepts_required:    true,
  answer:              Some(AnswerShape::Text),
  default_label:       NEW_QUESTION,
  default_placeholder: Some(NEW_PLACEHOLDER),
};

static PHOTO: BlockSchema = BlockSchema {
  variant:             BlockVariant::Photo,
  accepts_required:    true,
  answer:              Some(AnswerShape::FileReference(MediaKind::Image)),
  default_label:       NEW_QUESTION,
  default_placeholder: None,
};

static VIDEO: BlockSchema = BlockSchema {
  variant:             BlockVariant::Video,
  accepts_required:    true,
  answer:              Some(AnswerShape::FileReference(MediaKind::Video)),
  default_label:       NEW_QUESTION,
  default_placeholder: None,
};

static CHECKBOX: BlockSchema = BlockSchema {
  variant:             BlockVariant::Checkbox,
  accepts_required:    true,
  answer:              Some(AnswerShape::Flag),
  default_label:       NEW_QUESTION,
  default_placeholder: None,
};

static SEPARATOR: BlockSchema = BlockSchema {
  variant:             BlockVariant::Separator,
  accepts_required:    false,
  answer:              None,
  default_label:       "",
  default_placeholder: None,
};

static CONTACT_INFO: BlockSchema = BlockSchema {
  variant:             BlockVariant::ContactInfo,
  accepts_required:    true,
  answer:              Some(AnswerShape::Contact),
  default_label:       NEW_QUESTION,
  default_placeholder: None,
};

impl BlockVariant {
  /// Look up this variant's row in the schema table.
  pub fn schema(self) -> &'static BlockSchema {
    match self {
      Self::Header => &HEADER,
      Self::Paragraph => &PARAGRAPH,
      Self::ShortText => &SHORT_TEXT,
      Self::LongText => &LONG_TEXT,
      Self::Photo => &PHOTO,
      Self::Video => &VIDEO,
      Self::Checkbox => &CHECKBOX,
      Self::Separator => &SEPARATOR,
      Self::ContactInfo => &CONTACT_INFO,
    }
  }

  /// Static blocks (`header`, `paragraph`, `separator`) are display-only and
  /// never bound to an answer.
  pub fn is_static(self) -> bool { self.schema().answer.is_none() }

  pub fn answer_shape(self) -> Option<AnswerShape> { self.schema().answer }

  /// The editor palette: every variant's schema row, in declaration order.
  pub fn palette() -> Vec<&'static BlockSchema> {
    Self::iter().map(Self::schema).collect()
  }
}

// ─── Block definition ────────────────────────────────────────────────────────

/// One question or content unit in a form. Its position in
/// [`FormDefinition::blocks`](crate::form::FormDefinition::blocks) is its
/// render and answer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDefinition {
  /// Stable identifier, unique within the form and never reused.
  pub id:          String,
  #[serde(alias = "type")]
  pub variant:     BlockVariant,
  /// Question text, heading text or paragraph content depending on variant.
  #[serde(default)]
  pub label:       String,
  #[serde(default)]
  pub required:    bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub placeholder: Option<String>,
}

impl BlockDefinition {
  /// A fresh block with the variant's editor defaults and a new id.
  pub fn new(variant: BlockVariant) -> Self {
    let schema = variant.schema();
    Self {
      id: new_block_id(),
      variant,
      label: schema.default_label.to_owned(),
      required: false,
      placeholder: schema.default_placeholder.map(str::to_owned),
    }
  }

  /// Whether an answer must be present at submission time. Always `false`
  /// for variants that ignore the flag.
  pub fn is_required(&self) -> bool {
    self.required && self.variant.schema().accepts_required
  }

  /// The placeholder, only for the text variants that display one.
  pub fn effective_placeholder(&self) -> Option<&str> {
    match self.variant {
      BlockVariant::ShortText | BlockVariant::LongText => {
        self.placeholder.as_deref()
      }
      _ => None,
    }
  }

  /// Apply an editor update. Fields the variant ignores are normalised away.
  pub fn apply(&mut self, patch: BlockPatch) {
    if let Some(label) = patch.label {
      self.label = label;
    }
    if let Some(required) = patch.required {
      self.required = required && self.variant.schema().accepts_required;
    }
    if let Some(placeholder) = patch.placeholder {
      self.placeholder = (!placeholder.is_empty()
        && matches!(
          self.variant,
          BlockVariant::ShortText | BlockVariant::LongText
        ))
      .then_some(placeholder);
    }
  }
}

/// A partial update to a [`BlockDefinition`]. An empty `placeholder` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockPatch {
  pub label:       Option<String>,
  pub required:    Option<bool>,
  pub placeholder: Option<String>,
}

fn new_block_id() -> String { format!("blk_{}", Uuid::new_v4().simple()) }
