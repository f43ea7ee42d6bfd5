//! `leadform`: command-line client for the tenant inbox and form editor.
//!
//! # Usage
//!
//! ```text
//! leadform --url http://localhost:8080 inbox <tenant-id> --bucket archived
//! leadform status <submission-id> done
//! leadform add-block <tenant-id> short_text
//! ```

mod client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use leadform_core::{
  answer::{AnswerValue, ContactValue},
  block::BlockVariant,
  form::MoveDirection,
  submission::{Submission, SubmissionStatus, TriageBucket},
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "leadform", about = "Inbox and form editor for Leadform tenants")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the leadform server (default: http://localhost:8080).
  #[arg(long, env = "LEADFORM_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List a tenant's submissions.
  Inbox {
    tenant: Uuid,
    /// to_process, all or archived.
    #[arg(long, default_value_t = TriageBucket::ToProcess)]
    bucket: TriageBucket,
    /// Substring of a ticket number or phone.
    #[arg(long)]
    query:  Option<String>,
  },
  /// Print one submission with its answers.
  Show { submission: Uuid },
  /// Move a submission to new, pending, done or archived.
  Status {
    submission: Uuid,
    status:     SubmissionStatus,
  },
  /// Print a tenant's form blocks in order.
  Form { tenant: Uuid },
  /// Append a block of the given variant.
  AddBlock {
    tenant:  Uuid,
    variant: BlockVariant,
  },
  /// Move a block one position up or down.
  MoveBlock {
    tenant:    Uuid,
    block:     String,
    direction: MoveDirection,
  },
  RemoveBlock { tenant: Uuid, block: String },
  /// Print credit balance, call and inbox counters.
  Stats { tenant: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
  };
  tracing::debug!(base_url = %api_config.base_url, "using server");

  let client = ApiClient::new(api_config)?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Inbox {
      tenant,
      bucket,
      query,
    } => {
      let submissions = client
        .list_submissions(tenant, bucket, query.as_deref())
        .await?;
      if submissions.is_empty() {
        println!("no submissions in {bucket}");
      }
      for s in &submissions {
        println!("{}", inbox_line(s));
      }
    }
    Command::Show { submission } => {
      let s = client.get_submission(submission).await?;
      println!("{}", inbox_line(&s));
      println!("marketing opt-in: {}", yes_no(s.marketing_optin));
      for answer in &s.answers {
        println!("  {}: {}", answer.label, describe(&answer.value));
      }
    }
    Command::Status { submission, status } => {
      let s = client.set_status(submission, status).await?;
      println!("{} is now {}", s.ticket_number, s.status);
    }
    Command::Form { tenant } => {
      let form = client.get_form(tenant).await?;
      let state = if form.enabled { "enabled" } else { "disabled" };
      println!("{} ({state})", form.page_title);
      for (i, block) in form.blocks.iter().enumerate() {
        let required = if block.required { " *" } else { "" };
        println!(
          "{i:>3}  {:<14} {:<24} {}{required}",
          block.variant.to_string(),
          block.id,
          block.label
        );
      }
    }
    Command::AddBlock { tenant, variant } => {
      let block = client.add_block(tenant, variant).await?;
      println!("added {} ({})", block.id, block.label);
    }
    Command::MoveBlock {
      tenant,
      block,
      direction,
    } => {
      let moved = client.move_block(tenant, &block, direction).await?;
      println!("moved {} to position {}", moved.block_id, moved.index);
    }
    Command::RemoveBlock { tenant, block } => {
      client.remove_block(tenant, &block).await?;
      println!("removed {block}");
    }
    Command::Stats { tenant } => {
      let stats = client.stats(tenant).await?;
      println!("sms credits     {}", stats.sms_credits);
      println!("sms sent        {}", stats.calls.sms_sent);
      println!("calls filtered  {}", stats.calls.calls_filtered);
      println!("sms errors      {}", stats.calls.errors);
      println!("new             {}", stats.submissions.new);
      println!("to process      {}", stats.submissions.to_process);
      println!("archived        {}", stats.submissions.archived);
    }
  }
  Ok(())
}

// ─── Formatting ───────────────────────────────────────────────────────────────

fn inbox_line(s: &Submission) -> String {
  format!(
    "{}  {:<9} {:<14} {}  {}",
    s.ticket_number,
    s.status.to_string(),
    s.phone,
    s.created_at.format("%d/%m/%Y %H:%M"),
    s.id
  )
}

fn yes_no(flag: bool) -> &'static str { if flag { "yes" } else { "no" } }

fn describe(value: &AnswerValue) -> String {
  match value {
    AnswerValue::Flag(checked) => yes_no(*checked).to_owned(),
    AnswerValue::Text(text) => text.clone(),
    AnswerValue::Contact(contact) => describe_contact(contact),
  }
}

fn describe_contact(c: &ContactValue) -> String {
  [
    format!("{} {}", c.first_name, c.last_name).trim().to_owned(),
    c.email.clone(),
    c.phone.clone(),
    c.address.clone(),
  ]
  .into_iter()
  .filter(|part| !part.is_empty())
  .collect::<Vec<_>>()
  .join(", ")
}
