//! Calendar events: a tagged union over assessments and class changes.
//!
//! The variant payload is a real enum ([`EventDetails`]), so an event with
//! both or neither payload cannot be constructed. On the wire an event always
//! carries `kind` plus exactly the matching sub-object; the other one is
//! omitted rather than `null`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::id::{AccountId, EventId};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The discriminator of an event.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
  #[strum(to_string = "assessment")]
  Assessment,
  #[serde(alias = "class-change", alias = "class_change")]
  #[strum(to_string = "classChange", serialize = "class-change", serialize = "class_change")]
  ClassChange,
}

impl EventKind {
  /// Canonical name, also the sub-object key on the wire.
  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Assessment ──────────────────────────────────────────────────────────────

/// One line of a grading rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricItem {
  pub criteria: String,
  /// Always non-negative and finite.
  pub points:   f64,
}

/// A graded assessment (test, quiz, project).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
  pub subject:  String,
  /// Possibly empty; order is significant.
  #[serde(default)]
  pub rubric:   Vec<RubricItem>,
  pub due_date: NaiveDate,
}

// ─── Class change ────────────────────────────────────────────────────────────

/// What happened to the affected class periods.
///
/// Parsing also accepts the Korean labels staff use (교체, 단축, 휴강, 기타).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
  #[serde(alias = "교체")]
  #[strum(to_string = "replace", serialize = "교체")]
  Replace,
  #[serde(alias = "단축")]
  #[strum(to_string = "shorten", serialize = "단축")]
  Shorten,
  #[serde(alias = "휴강")]
  #[strum(to_string = "cancel", serialize = "휴강")]
  Cancel,
  #[serde(alias = "기타")]
  #[strum(to_string = "other", serialize = "기타")]
  Other,
}

/// Lowest and highest class period a change may refer to.
pub const PERIOD_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// A change to the regular class schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassChange {
  pub change_kind:    ChangeKind,
  /// Non-empty, sorted, de-duplicated, each within [`PERIOD_RANGE`].
  pub periods:        Vec<u8>,
  pub original_class: String,
  pub new_class:      String,
}

// ─── Details ─────────────────────────────────────────────────────────────────

/// The variant payload of an event, keyed by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventDetails {
  Assessment(Assessment),
  ClassChange(ClassChange),
}

impl EventDetails {
  pub fn kind(&self) -> EventKind {
    match self {
      Self::Assessment(_) => EventKind::Assessment,
      Self::ClassChange(_) => EventKind::ClassChange,
    }
  }

  pub fn as_assessment(&self) -> Option<&Assessment> {
    match self {
      Self::Assessment(a) => Some(a),
      Self::ClassChange(_) => None,
    }
  }

  pub fn as_class_change(&self) -> Option<&ClassChange> {
    match self {
      Self::ClassChange(c) => Some(c),
      Self::Assessment(_) => None,
    }
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A stored calendar entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
  pub id:          EventId,
  pub title:       String,
  pub description: Option<String>,
  pub occurs_on:   NaiveDate,
  /// The creating account. Set once by the store, never reassigned.
  pub created_by:  AccountId,
  pub details:     EventDetails,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Event {
  pub fn kind(&self) -> EventKind { self.details.kind() }
}

/// Borrowed wire shape: `kind` plus the flattened, externally-tagged details
/// (`"assessment": {…}` or `"classChange": {…}`).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRepr<'a> {
  id:          EventId,
  kind:        EventKind,
  title:       &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  description: Option<&'a str>,
  occurs_on:   NaiveDate,
  created_by:  AccountId,
  created_at:  DateTime<Utc>,
  updated_at:  DateTime<Utc>,
  #[serde(flatten)]
  details:     &'a EventDetails,
}

impl Serialize for Event {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    EventRepr {
      id:          self.id,
      kind:        self.kind(),
      title:       &self.title,
      description: self.description.as_deref(),
      occurs_on:   self.occurs_on,
      created_by:  self.created_by,
      created_at:  self.created_at,
      updated_at:  self.updated_at,
      details:     &self.details,
    }
    .serialize(serializer)
  }
}

// ─── Write inputs ────────────────────────────────────────────────────────────

/// A validated event body, ready to be stored once an owner is attached.
/// Produced by [`crate::validate::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
  pub title:       String,
  pub description: Option<String>,
  pub occurs_on:   NaiveDate,
  pub details:     EventDetails,
}

/// The full set of mutable fields after an update has been applied.
///
/// Only [`crate::validate::validate_update`] constructs this, which guarantees
/// the details keep the event's original kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EventChanges {
  pub(crate) title:       String,
  pub(crate) description: Option<String>,
  pub(crate) occurs_on:   NaiveDate,
  pub(crate) details:     EventDetails,
}

impl EventChanges {
  pub fn title(&self) -> &str { &self.title }

  pub fn description(&self) -> Option<&str> { self.description.as_deref() }

  pub fn occurs_on(&self) -> NaiveDate { self.occurs_on }

  pub fn details(&self) -> &EventDetails { &self.details }

  pub fn kind(&self) -> EventKind { self.details.kind() }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::CalendarStore::list_events`].
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
  /// Inclusive lower bound on `occurs_on`.
  pub from: Option<NaiveDate>,
  /// Inclusive upper bound on `occurs_on`.
  pub to:   Option<NaiveDate>,
  pub kind: Option<EventKind>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  fn event(details: EventDetails) -> Event {
    let now = Utc::now();
    Event {
      id: EventId::new(),
      title: "Unit test".into(),
      description: None,
      occurs_on: date("2025-03-10"),
      created_by: AccountId::new(),
      details,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn assessment_serialises_with_only_its_sub_object() {
    let ev = event(EventDetails::Assessment(Assessment {
      subject:  "Math".into(),
      rubric:   vec![],
      due_date: date("2025-03-12"),
    }));
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["kind"], "assessment");
    assert_eq!(json["assessment"]["subject"], "Math");
    assert_eq!(json["assessment"]["dueDate"], "2025-03-12");
    assert!(json.get("classChange").is_none());
    assert!(json.get("description").is_none());
  }

  #[test]
  fn class_change_serialises_with_only_its_sub_object() {
    let ev = event(EventDetails::ClassChange(ClassChange {
      change_kind:    ChangeKind::Cancel,
      periods:        vec![3, 4],
      original_class: "Physics".into(),
      new_class:      "Self study".into(),
    }));
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["kind"], "classChange");
    assert_eq!(json["classChange"]["changeKind"], "cancel");
    assert_eq!(json["classChange"]["periods"], serde_json::json!([3, 4]));
    assert!(json.get("assessment").is_none());
  }

  #[test]
  fn kind_parsing_accepts_legacy_spelling() {
    assert_eq!("classChange".parse::<EventKind>().unwrap(), EventKind::ClassChange);
    assert_eq!("class-change".parse::<EventKind>().unwrap(), EventKind::ClassChange);
    assert!("meeting".parse::<EventKind>().is_err());
  }

  #[test]
  fn change_kind_accepts_korean_labels() {
    assert_eq!("휴강".parse::<ChangeKind>().unwrap(), ChangeKind::Cancel);
    assert_eq!("replace".parse::<ChangeKind>().unwrap(), ChangeKind::Replace);
    let from_json: ChangeKind = serde_json::from_str("\"단축\"").unwrap();
    assert_eq!(from_json, ChangeKind::Shorten);
  }
}
