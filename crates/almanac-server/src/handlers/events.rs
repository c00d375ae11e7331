//! Handlers for `/api/events` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/events` | Public. Optional `?from=&to=&kind=` |
//! | `GET`    | `/api/events/{id}` | Public. 404 if not found |
//! | `POST`   | `/api/events` | Needs the `create` permission |
//! | `PUT`    | `/api/events/{id}` | Creator or admin. Partial body |
//! | `DELETE` | `/api/events/{id}` | Creator or admin |
//!
//! Every returned event carries an `author` summary of its creator while that
//! account still exists.

use std::collections::HashMap;

use almanac_core::{
  account::Account,
  event::{Event, EventKind, EventQuery},
  gate::Operation,
  id::{AccountId, EventId},
  identity::Identity,
  role::Role,
  store::CalendarStore,
  validate::{validate_body, validate_update},
};
use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, auth::Authenticated, error::Error};

// ─── Views ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Author {
  pub id:   AccountId,
  pub name: String,
  pub role: Role,
}

impl From<&Account> for Author {
  fn from(account: &Account) -> Self {
    Self { id: account.id, name: account.display_name.clone(), role: account.role }
  }
}

#[derive(Debug, Serialize)]
pub struct EventView {
  #[serde(flatten)]
  pub event:  Event,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub author: Option<Author>,
}

async fn author_of<S>(state: &AppState<S>, id: AccountId) -> Result<Option<Author>, Error>
where
  S: CalendarStore,
{
  let account = state.store.get_account(id).await.map_err(Error::store)?;
  Ok(account.as_ref().map(Author::from))
}

async fn view<S>(state: &AppState<S>, event: Event) -> Result<EventView, Error>
where
  S: CalendarStore,
{
  let author = author_of(state, event.created_by).await?;
  Ok(EventView { event, author })
}

async fn existing_event<S>(state: &AppState<S>, id: EventId) -> Result<Event, Error>
where
  S: CalendarStore,
{
  state
    .store
    .get_event(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::NotFound("event"))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub from: Option<NaiveDate>,
  pub to:   Option<NaiveDate>,
  pub kind: Option<EventKind>,
}

/// `GET /api/events[?from=YYYY-MM-DD&to=YYYY-MM-DD&kind=<kind>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<EventView>>, Error>
where
  S: CalendarStore + Clone + 'static,
{
  state.gate.decide(&Identity::anonymous(), Operation::ViewEvents).into_result()?;
  let Query(params) = params?;

  let query = EventQuery { from: params.from, to: params.to, kind: params.kind };
  let events = state.store.list_events(&query).await.map_err(Error::store)?;

  let mut authors: HashMap<AccountId, Option<Author>> = HashMap::new();
  let mut views = Vec::with_capacity(events.len());
  for event in events {
    let author = match authors.get(&event.created_by) {
      Some(cached) => cached.clone(),
      None => {
        let fetched = author_of(&state, event.created_by).await?;
        authors.insert(event.created_by, fetched.clone());
        fetched
      }
    };
    views.push(EventView { event, author });
  }
  Ok(Json(views))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /api/events/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  id: Result<Path<EventId>, PathRejection>,
) -> Result<Json<EventView>, Error>
where
  S: CalendarStore + Clone + 'static,
{
  state.gate.decide(&Identity::anonymous(), Operation::ViewEvents).into_result()?;
  let Path(id) = id?;

  let event = existing_event(&state, id).await?;
  Ok(Json(view(&state, event).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /api/events` — body is validated before anything is stored.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(who): Authenticated,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, Error>
where
  S: CalendarStore + Clone + 'static,
{
  state.gate.decide(&who, Operation::CreateEvent).into_result()?;
  let owner = who.id().ok_or(Error::UnknownAccount)?;
  let Json(body) = body?;

  let draft = validate_body(&body)?;
  let event = state.store.create_event(owner, draft).await.map_err(Error::store)?;
  tracing::info!(event_id = %event.id, kind = %event.kind(), created_by = %owner, "created event");

  Ok((StatusCode::CREATED, Json(view(&state, event).await?)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /api/events/{id}`. Fields not present in the body keep their values.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(who): Authenticated,
  id: Result<Path<EventId>, PathRejection>,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<EventView>, Error>
where
  S: CalendarStore + Clone + 'static,
{
  let Path(id) = id?;
  let current = existing_event(&state, id).await?;
  state
    .gate
    .decide(&who, Operation::EditEvent { owner: current.created_by })
    .into_result()?;
  let Json(body) = body?;

  let changes = validate_update(&current, &body)?;
  let updated = state
    .store
    .update_event(id, changes)
    .await
    .map_err(Error::store)?
    .ok_or(Error::NotFound("event"))?;
  tracing::info!(event_id = %id, "updated event");

  Ok(Json(view(&state, updated).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /api/events/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Authenticated(who): Authenticated,
  id: Result<Path<EventId>, PathRejection>,
) -> Result<StatusCode, Error>
where
  S: CalendarStore + Clone + 'static,
{
  let Path(id) = id?;
  let current = existing_event(&state, id).await?;
  state
    .gate
    .decide(&who, Operation::DeleteEvent { owner: current.created_by })
    .into_result()?;

  if !state.store.delete_event(id).await.map_err(Error::store)? {
    return Err(Error::NotFound("event"));
  }
  tracing::info!(event_id = %id, "deleted event");
  Ok(StatusCode::NO_CONTENT)
}
