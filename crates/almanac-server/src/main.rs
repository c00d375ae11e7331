//! almanac-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `ALMANAC_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! # Bootstrapping
//!
//! A fresh store has no accounts. Create the first admin with:
//!
//! ```text
//! almanac-server --create-admin principal
//! ```

use std::path::{Path, PathBuf};

use almanac_core::{
  account::NewAccount,
  credential::hash_password,
  role::Role,
  store::CalendarStore,
};
use almanac_server::{AppState, ServerConfig};
use almanac_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Almanac school calendar server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create an admin account with this username (password read from stdin)
  /// and exit.
  #[arg(long, value_name = "USERNAME")]
  create_admin: Option<String>,
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

  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).context("failed to hash password")?;
    println!("{}", hash.as_phc());
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ALMANAC"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(username) = cli.create_admin {
    let password = read_password()?;
    let prepared = NewAccount {
      display_name: username.clone(),
      username,
      password,
      role: Role::Admin,
    }
    .prepare()
    .context("invalid admin account")?;
    let account = store
      .create_account(prepared)
      .await
      .context("failed to create admin account")?;
    tracing::info!(account_id = %account.id, username = %account.username, "created admin");
    println!("{}", account.id);
    return Ok(());
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  if store.count_admins().await.context("failed to count admins")? == 0 {
    tracing::warn!("store has no admin account; create one with --create-admin");
  }

  let state = AppState::new(store, server_cfg).context("invalid token configuration")?;
  let app = almanac_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
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
