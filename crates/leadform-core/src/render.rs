//! Form renderer.
//!
//! [`render`] turns a [`FormDefinition`] plus the answers collected so far
//! into a serialisable description of the page. The editor preview and the
//! public form use the same output; only [`RenderedForm::interactive`]
//! differs.

use serde::{Deserialize, Serialize};

use crate::{
  answer::{AnswerCollector, AnswerValue, ContactField, ContactValue},
  block::{BlockDefinition, BlockVariant, MediaKind},
  form::{FooterStyle, FormDefinition},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
  /// Editor preview; controls are shown but inert.
  #[default]
  Preview,
  /// The public page a respondent fills in.
  Live,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageHeader {
  pub title:          String,
  pub logo_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFooter {
  pub address: String,
  pub phone:   String,
  pub style:   FooterStyle,
}

/// One sub-field of a contact block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactInput {
  pub field:       ContactField,
  pub placeholder: &'static str,
  /// HTML input type.
  pub input_type:  &'static str,
  pub required:    bool,
  pub value:       String,
}

/// The control a block renders to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
  Heading,
  Paragraph,
  Separator,
  TextInput {
    multiline:   bool,
    placeholder: Option<String>,
    value:       String,
  },
  /// `checked` stays `None` until the respondent touches the box.
  Checkbox { checked: Option<bool> },
  FileInput {
    media:      MediaKind,
    accept:     &'static str,
    /// File reference once something is attached.
    attachment: Option<String>,
  },
  ContactFields { fields: Vec<ContactInput> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedBlock {
  pub block_id: String,
  pub label:    String,
  pub required: bool,
  #[serde(flatten)]
  pub control:  Control,
}

impl RenderedBlock {
  pub fn is_answerable(&self) -> bool {
    !matches!(
      self.control,
      Control::Heading | Control::Paragraph | Control::Separator
    )
  }
}

/// The synthetic opt-in checkbox shown after every block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptinControl {
  pub prompt_text: String,
  pub checked:     bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedForm {
  pub mode:            RenderMode,
  pub interactive:     bool,
  pub header:          PageHeader,
  pub blocks:          Vec<RenderedBlock>,
  pub marketing_optin: Option<OptinControl>,
  pub footer:          PageFooter,
}

impl RenderedForm {
  pub fn answerable(&self) -> impl Iterator<Item = &RenderedBlock> {
    self.blocks.iter().filter(|b| b.is_answerable())
  }
}

pub fn render(
  form: &FormDefinition,
  answers: &AnswerCollector,
  mode: RenderMode,
) -> RenderedForm {
  let blocks = form
    .blocks
    .iter()
    .map(|block| RenderedBlock {
      block_id: block.id.clone(),
      label:    block.label.clone(),
      required: block.is_required(),
      control:  control(block, answers.value(&block.id)),
    })
    .collect();

  let marketing_optin = form.marketing_optin.enabled.then(|| OptinControl {
    prompt_text: form.marketing_optin.prompt_text.clone(),
    checked:     answers.marketing_optin(),
  });

  RenderedForm {
    mode,
    interactive: mode == RenderMode::Live,
    header: PageHeader {
      title:          form.page_title.clone(),
      logo_reference: form.logo_reference.clone(),
    },
    blocks,
    marketing_optin,
    footer: PageFooter {
      address: form.footer_address.clone(),
      phone:   form.footer_phone.clone(),
      style:   form.footer_style.clone(),
    },
  }
}

fn control(block: &BlockDefinition, value: Option<&AnswerValue>) -> Control {
  let text = || match value {
    Some(AnswerValue::Text(s)) => Some(s.clone()),
    _ => None,
  };

  match block.variant {
    BlockVariant::Header => Control::Heading,
    BlockVariant::Paragraph => Control::Paragraph,
    BlockVariant::Separator => Control::Separator,
    BlockVariant::ShortText | BlockVariant::LongText => Control::TextInput {
      multiline:   block.variant == BlockVariant::LongText,
      placeholder: block.effective_placeholder().map(str::to_owned),
      value:       text().unwrap_or_default(),
    },
    BlockVariant::Checkbox => Control::Checkbox {
      checked: match value {
        Some(AnswerValue::Flag(checked)) => Some(*checked),
        _ => None,
      },
    },
    BlockVariant::Photo => file_input(MediaKind::Image, text()),
    BlockVariant::Video => file_input(MediaKind::Video, text()),
    BlockVariant::ContactInfo => {
      let empty = ContactValue::default();
      let contact = match value {
        Some(AnswerValue::Contact(c)) => c,
        _ => &empty,
      };
      Control::ContactFields {
        fields: ContactField::ALL
          .into_iter()
          .map(|field| contact_input(field, contact, block.is_required()))
          .collect(),
      }
    }
  }
}

fn file_input(media: MediaKind, attachment: Option<String>) -> Control {
  Control::FileInput {
    media,
    accept: media.accept(),
    attachment,
  }
}

fn contact_input(field: ContactField, contact: &ContactValue, required: bool) -> ContactInput {
  let (placeholder, input_type) = match field {
    ContactField::LastName => ("Last name", "text"),
    ContactField::FirstName => ("First name", "text"),
    ContactField::Email => ("Email", "email"),
    ContactField::Phone => ("Phone", "tel"),
    ContactField::Address => ("Address", "text"),
  };
  ContactInput {
    field,
    placeholder,
    input_type,
    required: required && field.required_when_block_required(),
    value: contact.get(field).to_owned(),
  }
}
