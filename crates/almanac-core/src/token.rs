//! Stateless session tokens.
//!
//! A token is `<payload>.<signature>` where `payload` is the base64url
//! (unpadded) JSON encoding of [`Claims`] and `signature` is the base64url
//! HMAC-SHA256 of the payload segment under the process-wide secret.
//!
//! Nothing is stored server-side: verification is a signature check followed
//! by an expiry comparison.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::{Error, Result, id::AccountId, identity::Identity, role::Role};

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Validity window of every issued token.
pub const TTL_HOURS: i64 = 24;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
  /// No token was supplied.
  #[error("no token supplied")]
  Missing,
  /// The token cannot be decoded or its signature does not match.
  #[error("token is malformed or has an invalid signature")]
  Malformed,
  /// The token was valid but its `exp` has passed.
  #[error("token has expired")]
  Expired,
}

// ─── Claims ──────────────────────────────────────────────────────────────────

/// The identity assertion carried inside a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub:  AccountId,
  pub role: Role,
  /// Issued-at, unix seconds.
  pub iat:  i64,
  /// Expiry, unix seconds.
  pub exp:  i64,
}

impl Claims {
  /// The identity as asserted by the token, without consulting storage.
  pub fn identity(&self) -> Identity { Identity::authenticated(self.sub, self.role) }

  pub fn expires_at(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(self.exp, 0)
  }
}

/// A freshly issued token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
  pub token:  String,
  pub claims: Claims,
}

// ─── Signer ──────────────────────────────────────────────────────────────────

/// Issues and verifies tokens under a single secret.
#[derive(Clone)]
pub struct TokenSigner {
  mac: HmacSha256,
}

impl TokenSigner {
  /// Build a signer issuing tokens valid for [`TTL_HOURS`].
  pub fn new(secret: &[u8]) -> Result<Self> {
    if secret.len() < MIN_SECRET_LEN {
      return Err(Error::WeakSecret { min: MIN_SECRET_LEN, actual: secret.len() });
    }
    let mac = <HmacSha256 as Mac>::new_from_slice(secret)
      .map_err(|_| Error::WeakSecret { min: MIN_SECRET_LEN, actual: secret.len() })?;
    Ok(Self { mac })
  }

  pub fn issue(&self, account_id: AccountId, role: Role) -> Result<IssuedToken> {
    self.issue_at(account_id, role, Utc::now())
  }

  /// Issue a token as if the current time were `now`.
  pub fn issue_at(
    &self,
    account_id: AccountId,
    role: Role,
    now: DateTime<Utc>,
  ) -> Result<IssuedToken> {
    let expires = now
      .checked_add_signed(Duration::hours(TTL_HOURS))
      .ok_or(Error::TimestampOutOfRange)?;
    let claims = Claims {
      sub:  account_id,
      role,
      iat:  now.timestamp(),
      exp:  expires.timestamp(),
    };
    let payload = B64.encode(serde_json::to_vec(&claims)?);
    let signature = B64.encode(self.sign(payload.as_bytes()));
    Ok(IssuedToken { token: format!("{payload}.{signature}"), claims })
  }

  pub fn verify(&self, token: Option<&str>) -> Result<Claims, TokenError> {
    self.verify_at(token, Utc::now())
  }

  /// Verify a token as if the current time were `now`.
  pub fn verify_at(
    &self,
    token: Option<&str>,
    now: DateTime<Utc>,
  ) -> Result<Claims, TokenError> {
    let token = token.map(str::trim).filter(|t| !t.is_empty());
    let token = token.ok_or(TokenError::Missing)?;

    let (payload, signature) =
      token.split_once('.').ok_or(TokenError::Malformed)?;
    let signature = B64.decode(signature).map_err(|_| TokenError::Malformed)?;

    let mut mac = self.mac.clone();
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).map_err(|_| TokenError::Malformed)?;

    let json = B64.decode(payload).map_err(|_| TokenError::Malformed)?;
    let claims: Claims =
      serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

    if now.timestamp() >= claims.exp {
      return Err(TokenError::Expired);
    }
    Ok(claims)
  }

  fn sign(&self, data: &[u8]) -> Vec<u8> {
    let mut mac = self.mac.clone();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
  }
}

/// Extract the token from an `Authorization` header value.
///
/// An absent header or an empty bearer value is [`TokenError::Missing`]; any
/// scheme other than `Bearer` is [`TokenError::Malformed`].
pub fn bearer_token(header: Option<&str>) -> Result<&str, TokenError> {
  let header = header.map(str::trim).filter(|h| !h.is_empty());
  let header = header.ok_or(TokenError::Missing)?;

  let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));
  if !scheme.eq_ignore_ascii_case("bearer") {
    return Err(TokenError::Malformed);
  }
  let token = rest.trim();
  if token.is_empty() {
    return Err(TokenError::Missing);
  }
  Ok(token)
}
