//! Error type for `almanac-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("username {0:?} is already taken")]
  DuplicateUsername(String),

  /// A stored account row violates an invariant (e.g. its permission set does
  /// not match its role).
  #[error("account {id} is corrupt: {reason}")]
  CorruptAccount { id: String, reason: String },

  /// A stored event row has both, neither, or the wrong variant payload.
  #[error("event {id} is corrupt: {reason}")]
  CorruptEvent { id: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
