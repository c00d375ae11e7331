//! JSON HTTP API for Almanac.
//!
//! Exposes an axum [`Router`] backed by any [`CalendarStore`]. Event browsing
//! is public; everything else requires a bearer token issued by
//! `POST /api/auth/login`.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use almanac_core::{
  gate::Gate,
  store::CalendarStore,
  token::TokenSigner,
};
use axum::{
  Router,
  routing::{get, patch, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{accounts, events, session};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ALMANAC_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  /// HMAC key for session tokens; at least 32 bytes.
  pub token_secret:     String,
  /// Use the role carried in the token instead of re-reading the account on
  /// every request.
  #[serde(default)]
  pub trust_token_role: bool,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CalendarStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub tokens: Arc<TokenSigner>,
  pub gate:   Gate,
}

impl<S: CalendarStore> AppState<S> {
  /// Fails if the configured token secret is too short.
  pub fn new(store: S, config: ServerConfig) -> almanac_core::Result<Self> {
    let tokens = TokenSigner::new(config.token_secret.as_bytes())?;
    Ok(Self {
      store:  Arc::new(store),
      config: Arc::new(config),
      tokens: Arc::new(tokens),
      gate:   Gate::default(),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the Almanac API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CalendarStore + Clone + 'static,
{
  Router::new()
    .route("/healthz",                get(healthz))
    // Session
    .route("/api/auth/login",         post(session::login::<S>))
    .route("/api/auth/verify",        get(session::verify::<S>))
    // Account administration
    .route("/api/admin/users",        get(accounts::list::<S>).post(accounts::create::<S>))
    .route("/api/admin/users/{id}",   patch(accounts::update::<S>).delete(accounts::remove::<S>))
    // Events
    .route("/api/events",             get(events::list::<S>).post(events::create::<S>))
    .route(
      "/api/events/{id}",
      get(events::get_one::<S>).put(events::update::<S>).delete(events::remove::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn healthz() -> &'static str { "ok" }
