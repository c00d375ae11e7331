//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, UUIDs
//! are hyphenated lowercase. Variant payloads and permission sets are compact
//! JSON.

use almanac_core::{
  account::Account,
  credential::CredentialHash,
  event::{Event, EventDetails, EventKind},
  id::{AccountId, EventId},
  role::{PermissionSet, Role, permissions_for},
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates ────────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Permissions ──────────────────────────────────────────────────────────────

pub fn encode_permissions(p: PermissionSet) -> Result<String> {
  Ok(serde_json::to_string(&p)?)
}

// ─── Event details ────────────────────────────────────────────────────────────

/// `(kind, assessment_json, class_change_json)`; exactly one payload is set.
pub fn encode_details(
  details: &EventDetails,
) -> Result<(&'static str, Option<String>, Option<String>)> {
  Ok(match details {
    EventDetails::Assessment(a) => {
      (EventKind::Assessment.as_str(), Some(serde_json::to_string(a)?), None)
    }
    EventDetails::ClassChange(c) => {
      (EventKind::ClassChange.as_str(), None, Some(serde_json::to_string(c)?))
    }
  })
}

// ─── Corruption ───────────────────────────────────────────────────────────────

fn corrupt_account(id: &str, reason: impl Into<String>) -> Error {
  let reason = reason.into();
  tracing::error!(account_id = %id, %reason, "corrupt account row");
  Error::CorruptAccount { id: id.to_owned(), reason }
}

fn corrupt_event(id: &str, reason: impl Into<String>) -> Error {
  let reason = reason.into();
  tracing::error!(event_id = %id, %reason, "corrupt event row");
  Error::CorruptEvent { id: id.to_owned(), reason }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ACCOUNT_COLUMNS: &str =
  "account_id, username, display_name, role, permissions, credential_hash, created_at";

/// Raw strings read directly from an `accounts` row.
pub struct RawAccount {
  pub account_id:      String,
  pub username:        String,
  pub display_name:    String,
  pub role:            String,
  pub permissions:     String,
  pub credential_hash: String,
  pub created_at:      String,
}

impl RawAccount {
  /// Map a row selected with [`ACCOUNT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:      row.get(0)?,
      username:        row.get(1)?,
      display_name:    row.get(2)?,
      role:            row.get(3)?,
      permissions:     row.get(4)?,
      credential_hash: row.get(5)?,
      created_at:      row.get(6)?,
    })
  }

  pub fn is_admin(&self) -> bool { self.role == Role::Admin.as_str() }

  pub fn into_account(self) -> Result<Account> {
    let role = Role::parse(&self.role)
      .map_err(|_| corrupt_account(&self.account_id, format!("unknown role {:?}", self.role)))?;

    let stored: PermissionSet = serde_json::from_str(&self.permissions).map_err(|e| {
      corrupt_account(&self.account_id, format!("unreadable permissions: {e}"))
    })?;
    if stored != permissions_for(role) {
      return Err(corrupt_account(
        &self.account_id,
        format!("permissions {stored:?} do not match role {role}"),
      ));
    }

    Ok(Account {
      id:              AccountId::from_uuid(decode_uuid(&self.account_id)?),
      username:        self.username,
      display_name:    self.display_name,
      role,
      credential_hash: CredentialHash::from_phc(self.credential_hash),
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub const EVENT_COLUMNS: &str = "event_id, kind, title, description, occurs_on, created_by, \
                                 assessment_json, class_change_json, created_at, updated_at";

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:          String,
  pub kind:              String,
  pub title:             String,
  pub description:       Option<String>,
  pub occurs_on:         String,
  pub created_by:        String,
  pub assessment_json:   Option<String>,
  pub class_change_json: Option<String>,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawEvent {
  /// Map a row selected with [`EVENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:          row.get(0)?,
      kind:              row.get(1)?,
      title:             row.get(2)?,
      description:       row.get(3)?,
      occurs_on:         row.get(4)?,
      created_by:        row.get(5)?,
      assessment_json:   row.get(6)?,
      class_change_json: row.get(7)?,
      created_at:        row.get(8)?,
      updated_at:        row.get(9)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    let id = &self.event_id;
    let kind: EventKind = self
      .kind
      .parse()
      .map_err(|_| corrupt_event(id, format!("unknown kind {:?}", self.kind)))?;

    let details = match (kind, &self.assessment_json, &self.class_change_json) {
      (_, Some(_), Some(_)) => {
        return Err(corrupt_event(id, "both variant payloads are populated"));
      }
      (_, None, None) => return Err(corrupt_event(id, "no variant payload is populated")),
      (EventKind::Assessment, Some(json), None) => EventDetails::Assessment(
        serde_json::from_str(json)
          .map_err(|e| corrupt_event(id, format!("unreadable assessment payload: {e}")))?,
      ),
      (EventKind::ClassChange, None, Some(json)) => EventDetails::ClassChange(
        serde_json::from_str(json)
          .map_err(|e| corrupt_event(id, format!("unreadable classChange payload: {e}")))?,
      ),
      (kind, _, _) => {
        return Err(corrupt_event(id, format!("payload does not match kind {kind}")));
      }
    };

    Ok(Event {
      id: EventId::from_uuid(decode_uuid(&self.event_id)?),
      title: self.title,
      description: self.description,
      occurs_on: decode_date(&self.occurs_on)?,
      created_by: AccountId::from_uuid(decode_uuid(&self.created_by)?),
      details,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
