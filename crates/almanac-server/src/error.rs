//! Error types and axum `IntoResponse` implementation.
//!
//! Every error leaves the server as `{"error": <message>, "code": <code>}`.

use almanac_core::{gate::DenyReason, token::TokenError, validate::ValidationError};
use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Token(#[from] TokenError),

  /// The token was valid but its account no longer exists.
  #[error("account no longer exists")]
  UnknownAccount,

  #[error("invalid username or password")]
  InvalidCredentials,

  #[error(transparent)]
  Denied(#[from] DenyReason),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Core(#[from] almanac_core::Error),

  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("username {0:?} is already taken")]
  UsernameTaken(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }

  fn status_and_code(&self) -> (StatusCode, &'static str) {
    match self {
      Error::Token(TokenError::Missing) => (StatusCode::UNAUTHORIZED, "token_missing"),
      Error::Token(TokenError::Malformed) => (StatusCode::UNAUTHORIZED, "token_malformed"),
      Error::Token(TokenError::Expired) => (StatusCode::UNAUTHORIZED, "token_expired"),
      Error::UnknownAccount => (StatusCode::UNAUTHORIZED, "account_unknown"),
      Error::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
      Error::Denied(DenyReason::LastAdminProtected) => {
        (StatusCode::CONFLICT, DenyReason::LastAdminProtected.code())
      }
      Error::Denied(reason) => (StatusCode::FORBIDDEN, reason.code()),
      Error::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.code()),
      Error::Core(almanac_core::Error::InvalidRole(_)) => {
        (StatusCode::UNPROCESSABLE_ENTITY, "invalid_role")
      }
      Error::Core(almanac_core::Error::MissingField(_)) => {
        (StatusCode::UNPROCESSABLE_ENTITY, "missing_field")
      }
      Error::Core(almanac_core::Error::EmptyCredential) => {
        (StatusCode::UNPROCESSABLE_ENTITY, "empty_credential")
      }
      Error::Core(_) | Error::Store(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
      }
      Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
      Error::UsernameTaken(_) => (StatusCode::CONFLICT, "username_taken"),
      Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
    }
  }
}

impl From<JsonRejection> for Error {
  fn from(rejection: JsonRejection) -> Self { Error::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for Error {
  fn from(rejection: PathRejection) -> Self { Error::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for Error {
  fn from(rejection: QueryRejection) -> Self { Error::BadRequest(rejection.body_text()) }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, code) = self.status_and_code();

    let message = if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
      "internal server error".to_owned()
    } else {
      self.to_string()
    };

    let mut res = (status, Json(json!({ "error": message, "code": code }))).into_response();
    if matches!(self, Error::Token(_) | Error::UnknownAccount) {
      res.headers_mut().insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn body_json(res: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test]
  async fn expired_token_is_401_with_challenge() {
    let res = Error::Token(TokenError::Expired).into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    assert_eq!(body_json(res).await["code"], "token_expired");
  }

  #[tokio::test]
  async fn last_admin_is_a_conflict() {
    let res = Error::Denied(DenyReason::LastAdminProtected).into_response();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(res).await["code"], "last_admin_protected");
  }

  #[tokio::test]
  async fn not_owner_is_forbidden() {
    let res = Error::Denied(DenyReason::NotOwner).into_response();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await["code"], "not_owner");
  }

  #[tokio::test]
  async fn store_failures_hide_details() {
    let inner = std::io::Error::other("disk on fire");
    let res = Error::store(inner).into_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(res).await;
    assert_eq!(body["code"], "internal_error");
    assert_eq!(body["error"], "internal server error");
  }

  #[tokio::test]
  async fn validation_errors_carry_their_code() {
    let err = ValidationError::InvalidEnum { field: "changeKind", value: "x".into() };
    let res = Error::from(err).into_response();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["code"], "invalid_enum");
  }
}
