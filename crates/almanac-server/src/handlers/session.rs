//! Handlers for `/api/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/auth/login` | Body: `{"username":…,"password":…}` |
//! | `GET`  | `/api/auth/verify` | Bearer token required |

use almanac_core::{
  account::Account,
  credential::{verify_password, verify_placeholder},
  id::AccountId,
  role::{PermissionSet, Role},
  store::CalendarStore,
};
use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::Authenticated, error::Error};

/// The signed-in user as reported to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAccount {
  pub id:             AccountId,
  pub name:           String,
  pub role:           Role,
  pub permission_set: PermissionSet,
}

impl From<&Account> for SessionAccount {
  fn from(account: &Account) -> Self {
    Self {
      id:             account.id,
      name:           account.display_name.clone(),
      role:           account.role,
      permission_set: account.permissions(),
    }
  }
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
  pub token:      String,
  pub expires_at: Option<DateTime<Utc>>,
  pub user:       SessionAccount,
}

/// `POST /api/auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<LoginResponse>, Error>
where
  S: CalendarStore + Clone + 'static,
{
  let Json(body) = body?;

  let found = state
    .store
    .find_account_by_username(body.username.trim())
    .await
    .map_err(Error::store)?;
  let account = match found {
    Some(a) => verify_password(&body.password, &a.credential_hash).then_some(a),
    None => {
      verify_placeholder(&body.password);
      None
    }
  };

  let Some(account) = account else {
    tracing::info!(username = %body.username.trim(), "rejected login");
    return Err(Error::InvalidCredentials);
  };

  let issued = state.tokens.issue(account.id, account.role)?;
  tracing::info!(account_id = %account.id, role = %account.role, "issued session token");

  Ok(Json(LoginResponse {
    token:      issued.token,
    expires_at: issued.claims.expires_at(),
    user:       SessionAccount::from(&account),
  }))
}

// ─── Verify ───────────────────────────────────────────────────────────────────

/// `GET /api/auth/verify`
pub async fn verify<S>(
  State(state): State<AppState<S>>,
  Authenticated(who): Authenticated,
) -> Result<Json<SessionAccount>, Error>
where
  S: CalendarStore + Clone + 'static,
{
  let id = who.id().ok_or(Error::UnknownAccount)?;
  let account = state
    .store
    .get_account(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::UnknownAccount)?;
  Ok(Json(SessionAccount::from(&account)))
}
