//! Bearer-token extractor.

use almanac_core::{
  identity::Identity,
  store::CalendarStore,
  token::{Claims, TokenError, bearer_token},
};
use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts},
};

use crate::{AppState, error::Error};

/// The verified actor behind a request. Present in a handler means the
/// request carried a valid, unexpired token for an existing account.
pub struct Authenticated(pub Identity);

/// Turn verified claims into the identity used for authorization.
///
/// Unless `trust_token_role` is set, the account is re-read so that role
/// changes and deletions take effect before the token expires.
pub async fn resolve_identity<S>(state: &AppState<S>, claims: Claims) -> Result<Identity, Error>
where
  S: CalendarStore,
{
  if state.config.trust_token_role {
    return Ok(claims.identity());
  }

  let account = state
    .store
    .get_account(claims.sub)
    .await
    .map_err(Error::store)?
    .ok_or(Error::UnknownAccount)?;

  if account.role != claims.role {
    tracing::debug!(
      account_id = %account.id,
      token_role = %claims.role,
      current_role = %account.role,
      "role changed since token was issued"
    );
  }
  Ok(Identity::of_account(&account))
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: CalendarStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let header = parts
      .headers
      .get(header::AUTHORIZATION)
      .map(|v| v.to_str().map_err(|_| TokenError::Malformed))
      .transpose()?;

    let token = bearer_token(header)?;
    let claims = state.tokens.verify(Some(token))?;
    resolve_identity(state, claims).await.map(Authenticated)
  }
}
