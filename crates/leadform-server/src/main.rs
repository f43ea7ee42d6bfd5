//! leadform-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API under `/api`.
//!
//! Without `[smtp]` or `[sms_gateway]` sections, notifications are written to
//! the log instead of being sent.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use leadform_api::AppState;
use leadform_core::notify::NotificationDispatcher;
use leadform_server::{EmailTransport, ServerConfig, SmsTransport};
use leadform_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Leadform lead-qualification server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("LEADFORM"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Delivery backends.
  let email = EmailTransport::from_config(server_cfg.smtp.as_ref())
    .context("failed to configure SMTP transport")?;
  if matches!(email, EmailTransport::Log) {
    tracing::warn!("no [smtp] section, emails will only be logged");
  }
  let sms = SmsTransport::from_config(server_cfg.sms_gateway.as_ref())
    .context("failed to configure SMS gateway")?;
  if matches!(sms, SmsTransport::Log) {
    tracing::warn!("no [sms_gateway] section, text messages will only be logged");
  }

  let mut dispatcher = NotificationDispatcher::new(Arc::new(email), Arc::new(sms));
  if let Some(timeout) = server_cfg.notification_timeout() {
    dispatcher = dispatcher.with_timeout(timeout);
  }

  let state = AppState::new(
    Arc::new(store),
    dispatcher,
    server_cfg.policy(),
    server_cfg.public_base_url.clone(),
  );

  let app = Router::new()
    .nest("/api", leadform_api::api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
