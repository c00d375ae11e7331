//! Validation and normalisation of submitted event bodies.
//!
//! Bodies are plain JSON objects. Variant fields may sit at the top level or
//! inside a sub-object named after the kind (`"assessment": {…}` or
//! `"classChange": {…}`). Checks run in a fixed order: kind, then the variant
//! payload, then the common envelope (`title`, `description`, `occursOn`).
//!
//! Everything here is pure; nothing touches storage.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
  event::{
    Assessment, ChangeKind, ClassChange, Event, EventChanges, EventDetails,
    EventDraft, EventKind, PERIOD_RANGE, RubricItem,
  },
  id::AccountId,
};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("invalid value {value:?} for {field}")]
  InvalidEnum { field: &'static str, value: String },

  #[error("{field} out of range: {reason}")]
  InvalidRange { field: &'static str, reason: String },

  #[error("{0} cannot be changed after creation")]
  ImmutableField(&'static str),

  #[error("{field} must be {expected}")]
  InvalidType { field: &'static str, expected: &'static str },

  #[error("event body must be a JSON object")]
  NotAnObject,
}

impl ValidationError {
  /// Stable machine-readable code for API responses.
  pub fn code(&self) -> &'static str {
    match self {
      Self::MissingField(_) => "missing_field",
      Self::InvalidEnum { .. } => "invalid_enum",
      Self::InvalidRange { .. } => "invalid_range",
      Self::ImmutableField(_) => "immutable_field",
      Self::InvalidType { .. } => "invalid_type",
      Self::NotAnObject => "not_an_object",
    }
  }
}

type Result<T, E = ValidationError> = std::result::Result<T, E>;

// ─── Field names ─────────────────────────────────────────────────────────────

const KIND: &[&str] = &["kind", "type"];
const TITLE: &[&str] = &["title"];
const DESCRIPTION: &[&str] = &["description"];
const OCCURS_ON: &[&str] = &["occursOn", "date"];
const CREATED_BY: &[&str] = &["createdBy"];

const SUBJECT: &[&str] = &["subject"];
const RUBRIC: &[&str] = &["rubric"];
const DUE_DATE: &[&str] = &["dueDate"];

const CHANGE_KIND: &[&str] = &["changeKind", "changeType"];
const PERIODS: &[&str] = &["periods", "period"];
const ORIGINAL_CLASS: &[&str] = &["originalClass"];
const NEW_CLASS: &[&str] = &["newClass"];

const ASSESSMENT_FIELDS: &[&[&str]] = &[SUBJECT, RUBRIC, DUE_DATE];
const CLASS_CHANGE_FIELDS: &[&[&str]] =
  &[CHANGE_KIND, PERIODS, ORIGINAL_CLASS, NEW_CLASS];

// ─── Field lookup ────────────────────────────────────────────────────────────

/// A view over the top-level object plus the optional variant sub-object.
struct Fields<'a> {
  top:    &'a Map<String, Value>,
  nested: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
  fn new(raw: &'a Value, kind: EventKind) -> Result<Self> {
    let top = raw.as_object().ok_or(ValidationError::NotAnObject)?;
    let nested = match top.get(kind.as_str()) {
      None | Some(Value::Null) => None,
      Some(Value::Object(map)) => Some(map),
      Some(_) => {
        return Err(ValidationError::InvalidType {
          field:    kind.as_str(),
          expected: "an object",
        });
      }
    };
    Ok(Self { top, nested })
  }

  /// The first non-null value under any of `names`, variant sub-object first.
  fn get(&self, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| {
      self
        .nested
        .and_then(|m| m.get(*name))
        .or_else(|| self.top.get(*name))
        .filter(|v| !v.is_null())
    })
  }

  /// `Some(value)` if any of `names` is present, even as `null`.
  fn supplied(&self, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| {
      self.nested.and_then(|m| m.get(*name)).or_else(|| self.top.get(*name))
    })
  }
}

// ─── Scalar parsers ──────────────────────────────────────────────────────────

fn opt_string(value: Option<&Value>, field: &'static str) -> Result<Option<String>> {
  match value {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => {
      let s = s.trim();
      Ok((!s.is_empty()).then(|| s.to_owned()))
    }
    Some(_) => Err(ValidationError::InvalidType { field, expected: "a string" }),
  }
}

fn req_string(value: Option<&Value>, field: &'static str) -> Result<String> {
  opt_string(value, field)?.ok_or(ValidationError::MissingField(field))
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its local date is kept).
fn parse_date(s: &str) -> Option<NaiveDate> {
  let s = s.trim();
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn req_date(value: Option<&Value>, field: &'static str) -> Result<NaiveDate> {
  match value {
    None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
    Some(Value::String(s)) if s.trim().is_empty() => {
      Err(ValidationError::MissingField(field))
    }
    Some(Value::String(s)) => parse_date(s).ok_or(ValidationError::InvalidType {
      field,
      expected: "a date (YYYY-MM-DD)",
    }),
    Some(_) => Err(ValidationError::InvalidType {
      field,
      expected: "a date (YYYY-MM-DD)",
    }),
  }
}

fn rubric(value: Option<&Value>) -> Result<Vec<RubricItem>> {
  const EXPECTED: &str = "an array of {criteria, points}";
  let items = match value {
    None | Some(Value::Null) => return Ok(Vec::new()),
    Some(Value::Array(items)) => items,
    Some(_) => {
      return Err(ValidationError::InvalidType { field: "rubric", expected: EXPECTED });
    }
  };

  items
    .iter()
    .map(|item| {
      let obj = item.as_object().ok_or(ValidationError::InvalidType {
        field:    "rubric",
        expected: EXPECTED,
      })?;
      let criteria = req_string(obj.get("criteria"), "rubric.criteria")?;
      let points = match obj.get("points") {
        None | Some(Value::Null) => {
          return Err(ValidationError::MissingField("rubric.points"));
        }
        Some(v) => v.as_f64().ok_or(ValidationError::InvalidType {
          field:    "rubric.points",
          expected: "a number",
        })?,
      };
      if !points.is_finite() || points < 0.0 {
        return Err(ValidationError::InvalidRange {
          field:  "rubric.points",
          reason: format!("{points} is negative"),
        });
      }
      Ok(RubricItem { criteria, points })
    })
    .collect()
}

fn change_kind(value: Option<&Value>) -> Result<ChangeKind> {
  let raw = req_string(value, "changeKind")?;
  ChangeKind::from_str(&raw).map_err(|_| ValidationError::InvalidEnum {
    field: "changeKind",
    value: raw,
  })
}

/// Non-empty list of integer periods within [`PERIOD_RANGE`]; the result is
/// sorted and de-duplicated.
fn periods(value: Option<&Value>) -> Result<Vec<u8>> {
  const EXPECTED: &str = "an array of integers";
  let items = match value {
    None | Some(Value::Null) => return Err(ValidationError::MissingField("periods")),
    Some(Value::Array(items)) => items,
    Some(_) => {
      return Err(ValidationError::InvalidType { field: "periods", expected: EXPECTED });
    }
  };
  if items.is_empty() {
    return Err(ValidationError::InvalidRange {
      field:  "periods",
      reason: "at least one period is required".into(),
    });
  }

  let mut out = items
    .iter()
    .map(|item| {
      let n = item.as_i64().ok_or(ValidationError::InvalidType {
        field:    "periods",
        expected: EXPECTED,
      })?;
      u8::try_from(n)
        .ok()
        .filter(|p| PERIOD_RANGE.contains(p))
        .ok_or_else(|| ValidationError::InvalidRange {
          field:  "periods",
          reason: format!(
            "{n} is outside {}..={}",
            PERIOD_RANGE.start(),
            PERIOD_RANGE.end()
          ),
        })
    })
    .collect::<Result<Vec<u8>>>()?;
  out.sort_unstable();
  out.dedup();
  Ok(out)
}

fn parse_kind(raw: &str) -> Result<EventKind> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err(ValidationError::MissingField("kind"));
  }
  EventKind::from_str(raw).map_err(|_| ValidationError::InvalidEnum {
    field: "kind",
    value: raw.to_owned(),
  })
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// Validate a new event body against the variant selected by `kind`.
pub fn validate(kind: &str, raw: &Value) -> Result<EventDraft> {
  let kind = parse_kind(kind)?;
  let fields = Fields::new(raw, kind)?;

  let details = match kind {
    EventKind::Assessment => EventDetails::Assessment(Assessment {
      subject:  req_string(fields.get(SUBJECT), "subject")?,
      rubric:   rubric(fields.get(RUBRIC))?,
      due_date: req_date(fields.get(DUE_DATE), "dueDate")?,
    }),
    EventKind::ClassChange => EventDetails::ClassChange(ClassChange {
      change_kind:    change_kind(fields.get(CHANGE_KIND))?,
      periods:        periods(fields.get(PERIODS))?,
      original_class: req_string(fields.get(ORIGINAL_CLASS), "originalClass")?,
      new_class:      req_string(fields.get(NEW_CLASS), "newClass")?,
    }),
  };

  Ok(EventDraft {
    title: req_string(fields.get(TITLE), "title")?,
    description: opt_string(fields.get(DESCRIPTION), "description")?,
    occurs_on: req_date(fields.get(OCCURS_ON), "occursOn")?,
    details,
  })
}

/// Like [`validate`], reading the discriminator from the body's `kind` field
/// (or its alias `type`).
pub fn validate_body(raw: &Value) -> Result<EventDraft> {
  let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;
  let kind = match KIND.iter().find_map(|k| obj.get(*k)) {
    None | Some(Value::Null) => return Err(ValidationError::MissingField("kind")),
    Some(Value::String(s)) => s.as_str(),
    Some(_) => {
      return Err(ValidationError::InvalidType { field: "kind", expected: "a string" });
    }
  };
  validate(kind, raw)
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// Apply a (possibly partial) update body over `current`.
///
/// Only supplied fields are validated and replaced. `kind` and `createdBy`
/// are immutable; supplying a field that belongs to the other variant counts
/// as an attempt to change `kind`.
pub fn validate_update(current: &Event, raw: &Value) -> Result<EventChanges> {
  let kind = current.kind();
  let fields = Fields::new(raw, kind)?;

  if let Some(value) = fields.get(KIND) {
    let requested = match value {
      Value::String(s) => parse_kind(s)?,
      _ => {
        return Err(ValidationError::InvalidType { field: "kind", expected: "a string" });
      }
    };
    if requested != kind {
      return Err(ValidationError::ImmutableField("kind"));
    }
  }

  if let Some(value) = fields.get(CREATED_BY) {
    let same_owner = value
      .as_str()
      .and_then(|s| s.parse::<AccountId>().ok())
      .is_some_and(|id| id == current.created_by);
    if !same_owner {
      return Err(ValidationError::ImmutableField("createdBy"));
    }
  }

  let (other_key, other_fields) = match kind {
    EventKind::Assessment => (EventKind::ClassChange.as_str(), CLASS_CHANGE_FIELDS),
    EventKind::ClassChange => (EventKind::Assessment.as_str(), ASSESSMENT_FIELDS),
  };
  let foreign = fields.top.get(other_key).is_some_and(|v| !v.is_null())
    || other_fields.iter().any(|names| fields.get(names).is_some());
  if foreign {
    return Err(ValidationError::ImmutableField("kind"));
  }

  let details = match &current.details {
    EventDetails::Assessment(a) => {
      let mut a = a.clone();
      if let Some(v) = fields.supplied(SUBJECT) {
        a.subject = req_string(Some(v), "subject")?;
      }
      if let Some(v) = fields.supplied(RUBRIC) {
        a.rubric = rubric(Some(v))?;
      }
      if let Some(v) = fields.supplied(DUE_DATE) {
        a.due_date = req_date(Some(v), "dueDate")?;
      }
      EventDetails::Assessment(a)
    }
    EventDetails::ClassChange(c) => {
      let mut c = c.clone();
      if let Some(v) = fields.supplied(CHANGE_KIND) {
        c.change_kind = change_kind(Some(v))?;
      }
      if let Some(v) = fields.supplied(PERIODS) {
        c.periods = periods(Some(v))?;
      }
      if let Some(v) = fields.supplied(ORIGINAL_CLASS) {
        c.original_class = req_string(Some(v), "originalClass")?;
      }
      if let Some(v) = fields.supplied(NEW_CLASS) {
        c.new_class = req_string(Some(v), "newClass")?;
      }
      EventDetails::ClassChange(c)
    }
  };

  let title = match fields.supplied(TITLE) {
    Some(v) => req_string(Some(v), "title")?,
    None => current.title.clone(),
  };
  let description = match fields.supplied(DESCRIPTION) {
    Some(v) => opt_string(Some(v), "description")?,
    None => current.description.clone(),
  };
  let occurs_on = match fields.supplied(OCCURS_ON) {
    Some(v) => req_date(Some(v), "occursOn")?,
    None => current.occurs_on,
  };

  Ok(EventChanges { title, description, occurs_on, details })
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use serde_json::json;

  use super::*;
  use crate::id::EventId;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  fn stored(details: EventDetails) -> Event {
    let now = Utc::now();
    Event {
      id: EventId::new(),
      title: "Midterm".into(),
      description: Some("Chapters 1-4".into()),
      occurs_on: date("2025-04-14"),
      created_by: AccountId::new(),
      details,
      created_at: now,
      updated_at: now,
    }
  }

  fn stored_assessment() -> Event {
    stored(EventDetails::Assessment(Assessment {
      subject:  "Math".into(),
      rubric:   vec![RubricItem { criteria: "Accuracy".into(), points: 10.0 }],
      due_date: date("2025-04-14"),
    }))
  }

  fn stored_class_change() -> Event {
    stored(EventDetails::ClassChange(ClassChange {
      change_kind:    ChangeKind::Replace,
      periods:        vec![2],
      original_class: "History".into(),
      new_class:      "Biology".into(),
    }))
  }

  // ── create: assessment ────────────────────────────────────────────────────

  #[test]
  fn assessment_without_rubric_normalises_to_empty() {
    let draft = validate(
      "assessment",
      &json!({
        "title": "Quiz 1",
        "occursOn": "2025-03-10",
        "subject": "Math",
        "dueDate": "2025-03-10",
      }),
    )
    .unwrap();

    assert_eq!(draft.title, "Quiz 1");
    assert_eq!(draft.occurs_on, date("2025-03-10"));
    let a = draft.details.as_assessment().unwrap();
    assert_eq!(a.subject, "Math");
    assert!(a.rubric.is_empty());
  }

  #[test]
  fn assessment_fields_may_be_nested() {
    let draft = validate_body(&json!({
      "type": "assessment",
      "title": "Essay",
      "date": "2025-05-01T09:00:00+09:00",
      "assessment": {
        "subject": "English",
        "rubric": [{ "criteria": "Structure", "points": 5 }, { "criteria": "Style", "points": 2.5 }],
        "dueDate": "2025-05-08",
      },
    }))
    .unwrap();

    assert_eq!(draft.occurs_on, date("2025-05-01"));
    let a = draft.details.as_assessment().unwrap();
    assert_eq!(a.rubric.len(), 2);
    assert_eq!(a.rubric[1].points, 2.5);
  }

  #[test]
  fn negative_rubric_points_are_out_of_range() {
    let err = validate(
      "assessment",
      &json!({
        "title": "Quiz",
        "occursOn": "2025-03-10",
        "subject": "Math",
        "dueDate": "2025-03-10",
        "rubric": [{ "criteria": "Effort", "points": -1 }],
      }),
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidRange { field: "rubric.points", .. }));
  }

  #[test]
  fn assessment_requires_subject_and_due_date() {
    let base = json!({ "title": "Quiz", "occursOn": "2025-03-10" });
    assert_eq!(
      validate("assessment", &base).unwrap_err(),
      ValidationError::MissingField("subject")
    );

    let with_subject = json!({ "title": "Quiz", "occursOn": "2025-03-10", "subject": "Art" });
    assert_eq!(
      validate("assessment", &with_subject).unwrap_err(),
      ValidationError::MissingField("dueDate")
    );
  }

  #[test]
  fn envelope_fields_are_required() {
    let body = json!({ "subject": "Math", "dueDate": "2025-03-10", "occursOn": "2025-03-10" });
    assert_eq!(
      validate("assessment", &body).unwrap_err(),
      ValidationError::MissingField("title")
    );

    let body = json!({ "subject": "Math", "dueDate": "2025-03-10", "title": "  " });
    assert_eq!(
      validate("assessment", &body).unwrap_err(),
      ValidationError::MissingField("title")
    );

    let body = json!({ "subject": "Math", "dueDate": "2025-03-10", "title": "Quiz" });
    assert_eq!(
      validate("assessment", &body).unwrap_err(),
      ValidationError::MissingField("occursOn")
    );
  }

  #[test]
  fn unparseable_date_is_a_type_error() {
    let body = json!({
      "title": "Quiz", "occursOn": "next tuesday", "subject": "Math", "dueDate": "2025-03-10",
    });
    assert!(matches!(
      validate("assessment", &body).unwrap_err(),
      ValidationError::InvalidType { field: "occursOn", .. }
    ));
  }

  // ── create: class change ──────────────────────────────────────────────────

  #[test]
  fn unknown_change_kind_is_invalid_enum() {
    let err = validate(
      "classChange",
      &json!({
        "changeKind": "invalid-value",
        "periods": [1],
        "originalClass": "A",
        "newClass": "B",
      }),
    )
    .unwrap_err();
    assert_eq!(
      err,
      ValidationError::InvalidEnum { field: "changeKind", value: "invalid-value".into() }
    );
  }

  #[test]
  fn class_change_normalises_periods() {
    let draft = validate(
      "classChange",
      &json!({
        "title": "Swap",
        "occursOn": "2025-03-11",
        "changeKind": "휴강",
        "periods": [5, 3, 5],
        "originalClass": "Chemistry",
        "newClass": "Self study",
      }),
    )
    .unwrap();
    let c = draft.details.as_class_change().unwrap();
    assert_eq!(c.change_kind, ChangeKind::Cancel);
    assert_eq!(c.periods, vec![3, 5]);
  }

  #[test]
  fn periods_must_be_non_empty_and_in_range() {
    let body = |periods: Value| {
      json!({
        "title": "Swap", "occursOn": "2025-03-11", "changeKind": "replace",
        "periods": periods, "originalClass": "A", "newClass": "B",
      })
    };

    for bad in [json!([]), json!([0]), json!([11]), json!([3, -1])] {
      assert!(
        matches!(
          validate("classChange", &body(bad.clone())).unwrap_err(),
          ValidationError::InvalidRange { field: "periods", .. }
        ),
        "expected InvalidRange for {bad}"
      );
    }
    assert!(matches!(
      validate("classChange", &body(json!([1.5]))).unwrap_err(),
      ValidationError::InvalidType { field: "periods", .. }
    ));
    assert!(validate("classChange", &body(json!([1, 10]))).is_ok());
  }

  #[test]
  fn class_change_requires_both_classes() {
    let err = validate(
      "classChange",
      &json!({ "changeKind": "shorten", "periods": [1], "originalClass": "A" }),
    )
    .unwrap_err();
    assert_eq!(err, ValidationError::MissingField("newClass"));
  }

  // ── create: kind / shape ──────────────────────────────────────────────────

  #[test]
  fn kind_is_required_and_closed() {
    assert_eq!(validate("", &json!({})).unwrap_err(), ValidationError::MissingField("kind"));
    assert!(matches!(
      validate("meeting", &json!({})).unwrap_err(),
      ValidationError::InvalidEnum { field: "kind", .. }
    ));
    assert_eq!(
      validate_body(&json!({ "title": "x" })).unwrap_err(),
      ValidationError::MissingField("kind")
    );
  }

  #[test]
  fn non_object_body_is_rejected() {
    assert_eq!(
      validate("assessment", &json!([1, 2])).unwrap_err(),
      ValidationError::NotAnObject
    );
  }

  // ── update ────────────────────────────────────────────────────────────────

  #[test]
  fn partial_update_keeps_unsupplied_fields() {
    let current = stored_assessment();
    let changes = validate_update(&current, &json!({ "title": "Final" })).unwrap();
    assert_eq!(changes.title(), "Final");
    assert_eq!(changes.description(), Some("Chapters 1-4"));
    assert_eq!(changes.occurs_on(), current.occurs_on);
    assert_eq!(changes.details(), &current.details);
  }

  #[test]
  fn update_validates_supplied_variant_fields() {
    let current = stored_class_change();
    let err = validate_update(&current, &json!({ "periods": [12] })).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidRange { field: "periods", .. }));

    let changes =
      validate_update(&current, &json!({ "classChange": { "changeKind": "shorten" } })).unwrap();
    let c = changes.details().as_class_change().unwrap();
    assert_eq!(c.change_kind, ChangeKind::Shorten);
    assert_eq!(c.periods, vec![2]);
  }

  #[test]
  fn changing_kind_is_rejected() {
    let current = stored_assessment();
    assert_eq!(
      validate_update(&current, &json!({ "kind": "classChange" })).unwrap_err(),
      ValidationError::ImmutableField("kind")
    );
    assert_eq!(
      validate_update(&current, &json!({ "changeKind": "cancel" })).unwrap_err(),
      ValidationError::ImmutableField("kind")
    );
    assert!(validate_update(&current, &json!({ "kind": "assessment" })).is_ok());
  }

  #[test]
  fn reassigning_owner_is_rejected() {
    let current = stored_assessment();
    let other = AccountId::new().to_string();
    assert_eq!(
      validate_update(&current, &json!({ "createdBy": other })).unwrap_err(),
      ValidationError::ImmutableField("createdBy")
    );
    let same = current.created_by.to_string();
    assert!(validate_update(&current, &json!({ "createdBy": same })).is_ok());
  }

  #[test]
  fn update_can_clear_description_but_not_title() {
    let current = stored_assessment();
    let changes = validate_update(&current, &json!({ "description": null })).unwrap();
    assert_eq!(changes.description(), None);

    assert_eq!(
      validate_update(&current, &json!({ "title": null })).unwrap_err(),
      ValidationError::MissingField("title")
    );
  }

  #[test]
  fn update_with_null_rubric_empties_it() {
    let current = stored_assessment();
    let changes = validate_update(&current, &json!({ "rubric": null })).unwrap();
    assert!(changes.details().as_assessment().unwrap().rubric.is_empty());
  }
}
