//! Form definitions and the editor operations over their block list.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{
  Error, Result, ValidationError, ValidationIssue,
  block::{BlockDefinition, BlockPatch, BlockVariant},
};

// ─── Page metadata ───────────────────────────────────────────────────────────

/// Custom colours and text for the public page footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterStyle {
  pub background_color: Option<String>,
  pub text_color:       Option<String>,
  pub custom_text:      Option<String>,
}

/// The synthetic opt-in checkbox appended after all blocks at render time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketingOptin {
  pub enabled:     bool,
  #[serde(default)]
  pub prompt_text: String,
}

// ─── Notification channels ───────────────────────────────────────────────────

/// One of the four notification delivery paths.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Channel {
  AdminEmail,
  AdminSms,
  ClientEmail,
  ClientSms,
}

/// Whether a channel delivers by email or by SMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
  Email,
  Sms,
}

impl Channel {
  pub fn medium(self) -> Medium {
    match self {
      Self::AdminEmail | Self::ClientEmail => Medium::Email,
      Self::AdminSms | Self::ClientSms => Medium::Sms,
    }
  }

  /// Client channels address the respondent rather than the tenant.
  pub fn is_client(self) -> bool {
    matches!(self, Self::ClientEmail | Self::ClientSms)
  }
}

/// Configuration of a single notification channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
  pub enabled:          bool,
  /// Email address or phone number; may be empty while disabled. For client
  /// channels an empty destination means "the respondent's own contact".
  #[serde(default)]
  pub destination:      String,
  /// Only used by email channels.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject_template: Option<String>,
  #[serde(default)]
  pub body_template:    String,
}

/// The four per-form notification channel configurations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannels {
  pub admin_email:  ChannelConfig,
  pub admin_sms:    ChannelConfig,
  pub client_email: ChannelConfig,
  pub client_sms:   ChannelConfig,
}

impl NotificationChannels {
  pub fn get(&self, channel: Channel) -> &ChannelConfig {
    match channel {
      Channel::AdminEmail => &self.admin_email,
      Channel::AdminSms => &self.admin_sms,
      Channel::ClientEmail => &self.client_email,
      Channel::ClientSms => &self.client_sms,
    }
  }

  pub fn get_mut(&mut self, channel: Channel) -> &mut ChannelConfig {
    match channel {
      Channel::AdminEmail => &mut self.admin_email,
      Channel::AdminSms => &mut self.admin_sms,
      Channel::ClientEmail => &mut self.client_email,
      Channel::ClientSms => &mut self.client_sms,
    }
  }
}

// ─── FormDefinition ──────────────────────────────────────────────────────────

/// A tenant's public form: page metadata, the ordered block list, the
/// marketing opt-in and the notification configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDefinition {
  /// Master switch; the public endpoint refuses submissions while `false`.
  pub enabled:         bool,
  #[serde(default)]
  pub page_title:      String,
  #[serde(default)]
  pub logo_reference:  Option<String>,
  #[serde(default)]
  pub footer_address:  String,
  #[serde(default)]
  pub footer_phone:    String,
  #[serde(default)]
  pub footer_style:    FooterStyle,
  /// Insertion order is render order. May be empty.
  #[serde(default)]
  pub blocks:          Vec<BlockDefinition>,
  #[serde(default)]
  pub marketing_optin: MarketingOptin,
  #[serde(default)]
  pub notifications:   NotificationChannels,
}

/// Direction for [`FormDefinition::move_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MoveDirection {
  Up,
  Down,
}

impl FormDefinition {
  // ── Lookups ───────────────────────────────────────────────────────────

  pub fn block(&self, id: &str) -> Option<&BlockDefinition> {
    self.blocks.iter().find(|b| b.id == id)
  }

  pub fn position(&self, id: &str) -> Option<usize> {
    self.blocks.iter().position(|b| b.id == id)
  }

  /// The first `contact_info` block, which is the single source for the
  /// submission's derived phone number.
  pub fn first_contact_block(&self) -> Option<&BlockDefinition> {
    self
      .blocks
      .iter()
      .find(|b| b.variant == BlockVariant::ContactInfo)
  }

  // ── Editor operations ─────────────────────────────────────────────────

  /// Append a new block of `variant` with its editor defaults.
  pub fn add_block(&mut self, variant: BlockVariant) -> &BlockDefinition {
    self.blocks.push(BlockDefinition::new(variant));
    &self.blocks[self.blocks.len() - 1]
  }

  pub fn remove_block(&mut self, id: &str) -> Result<BlockDefinition> {
    let index = self
      .position(id)
      .ok_or_else(|| Error::BlockNotFound(id.to_owned()))?;
    Ok(self.blocks.remove(index))
  }

  /// Swap a block with its neighbour. Moving past either end is a no-op.
  /// Returns the block's new index.
  pub fn move_block(&mut self, id: &str, direction: MoveDirection) -> Result<usize> {
    let index = self
      .position(id)
      .ok_or_else(|| Error::BlockNotFound(id.to_owned()))?;
    let target = match direction {
      MoveDirection::Up if index > 0 => index - 1,
      MoveDirection::Down if index + 1 < self.blocks.len() => index + 1,
      _ => return Ok(index),
    };
    self.blocks.swap(index, target);
    Ok(target)
  }

  pub fn update_block(
    &mut self,
    id: &str,
    patch: BlockPatch,
  ) -> Result<&BlockDefinition> {
    let block = self
      .blocks
      .iter_mut()
      .find(|b| b.id == id)
      .ok_or_else(|| Error::BlockNotFound(id.to_owned()))?;
    block.apply(patch);
    Ok(block)
  }

  // ── Validation ────────────────────────────────────────────────────────

  /// Check the definition before it is saved: block ids must be unique and
  /// every enabled admin channel needs a well-formed destination. Client
  /// channels may leave the destination empty.
  pub fn validate(&self) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    let mut seen = std::collections::HashSet::new();
    for block in &self.blocks {
      if !seen.insert(block.id.as_str()) {
        issues.push(ValidationIssue::DuplicateBlockId {
          block_id: block.id.clone(),
        });
      }
    }

    for channel in Channel::iter() {
      let config = self.notifications.get(channel);
      if !config.enabled {
        continue;
      }
      let destination = config.destination.trim();
      if destination.is_empty() {
        if !channel.is_client() {
          issues.push(ValidationIssue::MissingDestination { channel });
        }
        continue;
      }
      let well_formed = match channel.medium() {
        Medium::Email => looks_like_email(destination),
        Medium::Sms => looks_like_phone(destination),
      };
      if !well_formed {
        issues.push(ValidationIssue::MalformedDestination {
          channel,
          destination: destination.to_owned(),
        });
      }
    }

    ValidationError::check(issues)
  }

  // ── Defaults ──────────────────────────────────────────────────────────

  /// The starter form every new tenant receives.
  ///
  /// The admin email channel is only switched on when an address is known.
  /// A malformed address still switches it on and fails
  /// [`FormDefinition::validate`].
  pub fn starter(admin_email: Option<&str>) -> Self {
    let block = |id: &str, variant, label: &str, required| BlockDefinition {
      id: id.to_owned(),
      variant,
      label: label.to_owned(),
      required,
      placeholder: None,
    };

    let mut description = block(
      "description",
      BlockVariant::LongText,
      "Describe the problem",
      true,
    );
    description.placeholder = Some("Give us the details here...".to_owned());

    let blocks = vec![
      block(
        "intro",
        BlockVariant::Paragraph,
        "Send us a photo of the faulty part to save time.",
        false,
      ),
      block("contact", BlockVariant::ContactInfo, "Your details", true),
      block("request", BlockVariant::Header, "Your request", false),
      description,
      block("photo", BlockVariant::Photo, "Add a photo", false),
      block("divider", BlockVariant::Separator, "", false),
      block("urgent", BlockVariant::Checkbox, "Is this urgent?", false),
      block(
        "consent",
        BlockVariant::Checkbox,
        "I agree that my data is processed to handle this request",
        true,
      ),
    ];

    let admin_email = admin_email.map(str::trim).unwrap_or_default();

    Self {
      enabled: true,
      page_title: "Tell us about your request".to_owned(),
      logo_reference: None,
      footer_address: String::new(),
      footer_phone: String::new(),
      footer_style: FooterStyle::default(),
      blocks,
      marketing_optin: MarketingOptin {
        enabled:     true,
        prompt_text: "I would like to receive exclusive offers and promotions."
          .to_owned(),
      },
      notifications: NotificationChannels {
        admin_email:  ChannelConfig {
          enabled:          !admin_email.is_empty(),
          destination:      admin_email.to_owned(),
          subject_template: Some("New request {{ticket}}".to_owned()),
          body_template:    "Hello,\n\nA new request was submitted by \
                             {{client_phone}} (ticket {{ticket}}).\n\nSign in \
                             to the dashboard to see the photos and details."
            .to_owned(),
        },
        admin_sms:    ChannelConfig {
          enabled:          false,
          destination:      String::new(),
          subject_template: None,
          body_template:    "Alert: new request {{ticket}} from {{client_phone}}."
            .to_owned(),
        },
        client_email: ChannelConfig {
          enabled:          true,
          destination:      String::new(),
          subject_template: Some("Your request {{ticket}}".to_owned()),
          body_template:    "Hello,\n\nWe have received your request.\nYour \
                             tracking number is {{ticket}}.\n\nWe will get back \
                             to you shortly.\n\n{{company}}"
            .to_owned(),
        },
        client_sms:   ChannelConfig {
          enabled:          false,
          destination:      String::new(),
          subject_template: None,
          body_template:    "Thank you. Request {{ticket}} received. We will \
                             call you back soon. {{company}}"
            .to_owned(),
        },
      },
    }
  }
}

fn looks_like_email(s: &str) -> bool {
  if s.chars().any(char::is_whitespace) {
    return false;
  }
  match s.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain
          .split_once('.')
          .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
    }
    None => false,
  }
}

fn looks_like_phone(s: &str) -> bool {
  let digits = s.strip_prefix('+').unwrap_or(s);
  let count = digits.chars().filter(char::is_ascii_digit).count();
  count >= 6
    && digits
      .chars()
      .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '.' | '-'))
}
