//! Error types for `almanac-core`.
//!
//! Token, validation and authorization failures have their own enums in
//! [`crate::token`], [`crate::validate`] and [`crate::gate`]; this one covers
//! the role model and credential handling.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid role: {0:?}")]
  InvalidRole(String),

  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("credential must not be empty")]
  EmptyCredential,

  #[error("password hashing failed: {0}")]
  PasswordHash(String),

  #[error("token signing secret must be at least {min} bytes, got {actual}")]
  WeakSecret { min: usize, actual: usize },

  #[error("token expiry is out of the representable time range")]
  TimestampOutOfRange,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
