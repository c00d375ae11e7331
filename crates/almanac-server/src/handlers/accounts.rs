//! Handlers for `/api/admin/users` endpoints. Admin only.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/admin/users` | Ordered by username |
//! | `POST`   | `/api/admin/users` | Body: `{"username","password","name","role"?}` |
//! | `PATCH`  | `/api/admin/users/{id}` | Body: `{"name"?,"role"?,"password"?}` |
//! | `DELETE` | `/api/admin/users/{id}` | 409 for the last admin |

use almanac_core::{
  account::{Account, AccountChanges, AccountRemoval, AccountUpdate, NewAccount, PublicAccount},
  gate::{DenyReason, Operation},
  id::AccountId,
  identity::Identity,
  role::Role,
  store::CalendarStore,
};
use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{AppState, auth::Authenticated, error::Error};

fn parse_role(raw: Option<&str>) -> Result<Option<Role>, Error> {
  Ok(raw.map(Role::parse).transpose()?)
}

/// Look up the target of an account write. Non-admins are refused before
/// learning whether it exists.
async fn target_account<S>(
  state: &AppState<S>,
  who: &Identity,
  id: AccountId,
) -> Result<Account, Error>
where
  S: CalendarStore,
{
  state.gate.decide(who, Operation::ModifyAccount).into_result()?;
  state
    .store
    .get_account(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::NotFound("account"))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /api/admin/users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Authenticated(who): Authenticated,
) -> Result<Json<Vec<PublicAccount>>, Error>
where
  S: CalendarStore + Clone + 'static,
{
  state.gate.decide(&who, Operation::ListAccounts).into_result()?;

  let accounts = state.store.list_accounts().await.map_err(Error::store)?;
  Ok(Json(accounts.iter().map(|a| a.to_public()).collect()))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub username: String,
  pub password: String,
  #[serde(alias = "displayName")]
  pub name:     String,
  pub role:     Option<String>,
}

/// `POST /api/admin/users` — new accounts default to `guest`.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(who): Authenticated,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, Error>
where
  S: CalendarStore + Clone + 'static,
{
  state.gate.decide(&who, Operation::CreateAccount).into_result()?;
  let Json(body) = body?;

  let role = parse_role(body.role.as_deref())?.unwrap_or_default();
  let prepared = NewAccount {
    username:     body.username,
    password:     body.password,
    display_name: body.name,
    role,
  }
  .prepare()?;

  let existing = state
    .store
    .find_account_by_username(prepared.username())
    .await
    .map_err(Error::store)?;
  if existing.is_some() {
    return Err(Error::UsernameTaken(prepared.username().to_owned()));
  }

  let account = state.store.create_account(prepared).await.map_err(Error::store)?;
  tracing::info!(account_id = %account.id, role = %account.role, "created account");
  Ok((StatusCode::CREATED, Json(account.to_public())))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(alias = "displayName")]
  pub name:     Option<String>,
  pub role:     Option<String>,
  pub password: Option<String>,
}

/// `PATCH /api/admin/users/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(who): Authenticated,
  id: Result<Path<AccountId>, PathRejection>,
  body: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<Json<PublicAccount>, Error>
where
  S: CalendarStore + Clone + 'static,
{
  let Path(id) = id?;
  let target = target_account(&state, &who, id).await?;
  let Json(body) = body?;

  let new_role = parse_role(body.role.as_deref())?;
  let admin_count = state.store.count_admins().await.map_err(Error::store)?;
  state
    .gate
    .decide(&who, Operation::UpdateAccount { target_role: target.role, new_role, admin_count })
    .into_result()?;

  let changes = AccountChanges {
    display_name: body.name,
    role:         new_role,
    password:     body.password,
  }
  .prepare()?;
  if changes.is_empty() {
    return Ok(Json(target.to_public()));
  }

  match state.store.update_account(id, changes).await.map_err(Error::store)? {
    AccountUpdate::Updated(account) => {
      tracing::info!(account_id = %account.id, role = %account.role, "updated account");
      Ok(Json(account.to_public()))
    }
    AccountUpdate::NotFound => Err(Error::NotFound("account")),
    AccountUpdate::LastAdminProtected => Err(DenyReason::LastAdminProtected.into()),
  }
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /api/admin/users/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Authenticated(who): Authenticated,
  id: Result<Path<AccountId>, PathRejection>,
) -> Result<StatusCode, Error>
where
  S: CalendarStore + Clone + 'static,
{
  let Path(id) = id?;
  let target = target_account(&state, &who, id).await?;

  let admin_count = state.store.count_admins().await.map_err(Error::store)?;
  state
    .gate
    .decide(&who, Operation::DeleteAccount { target_role: target.role, admin_count })
    .into_result()?;

  match state.store.delete_account(id).await.map_err(Error::store)? {
    AccountRemoval::Deleted(account) => {
      tracing::info!(account_id = %account.id, "deleted account");
      Ok(StatusCode::NO_CONTENT)
    }
    AccountRemoval::NotFound => Err(Error::NotFound("account")),
    AccountRemoval::LastAdminProtected => Err(DenyReason::LastAdminProtected.into()),
  }
}
