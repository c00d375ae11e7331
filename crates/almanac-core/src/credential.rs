//! Password hashing and verification (argon2id, PHC strings).

use std::{fmt, sync::OnceLock};

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::OsRng;

use crate::{Error, Result};

/// An argon2 PHC string, e.g. `$argon2id$v=19$…`.
///
/// Not `Serialize`; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
  /// Wrap a PHC string previously produced by [`hash_password`], e.g. when
  /// reading it back from storage.
  pub fn from_phc(phc: impl Into<String>) -> Self { Self(phc.into()) }

  pub fn as_phc(&self) -> &str { &self.0 }
}

impl fmt::Debug for CredentialHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("CredentialHash(<redacted>)")
  }
}

/// Hash a raw password with a fresh random salt.
pub fn hash_password(raw: &str) -> Result<CredentialHash> {
  if raw.is_empty() {
    return Err(Error::EmptyCredential);
  }
  let salt = SaltString::generate(&mut OsRng);
  let phc = Argon2::default()
    .hash_password(raw.as_bytes(), &salt)
    .map_err(|e| Error::PasswordHash(e.to_string()))?
    .to_string();
  Ok(CredentialHash(phc))
}

/// `true` iff `raw` matches `hash`. A malformed stored hash never matches.
pub fn verify_password(raw: &str, hash: &CredentialHash) -> bool {
  let Ok(parsed) = PasswordHash::new(hash.as_phc()) else {
    return false;
  };
  Argon2::default()
    .verify_password(raw.as_bytes(), &parsed)
    .is_ok()
}

fn dummy_hash() -> Option<&'static CredentialHash> {
  static DUMMY: OnceLock<Option<CredentialHash>> = OnceLock::new();
  DUMMY
    .get_or_init(|| hash_password("almanac-placeholder-credential").ok())
    .as_ref()
}

/// Run one argon2 verification against a fixed placeholder hash and return
/// `false`. Used when a login names no stored account, so both rejections
/// cost the same.
pub fn verify_placeholder(raw: &str) -> bool {
  if let Some(hash) = dummy_hash() {
    let _ = verify_password(raw, hash);
  }
  false
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.as_phc().starts_with("$argon2"));
    assert!(verify_password("correct horse", &hash));
    assert!(!verify_password("battery staple", &hash));
  }

  #[test]
  fn salts_differ_between_hashes() {
    let a = hash_password("same").unwrap();
    let b = hash_password("same").unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn empty_password_is_rejected() {
    assert!(matches!(hash_password(""), Err(Error::EmptyCredential)));
  }

  #[test]
  fn garbage_hash_never_verifies() {
    let hash = CredentialHash::from_phc("not-a-phc-string");
    assert!(!verify_password("anything", &hash));
  }

  #[test]
  fn debug_is_redacted() {
    let hash = hash_password("secret").unwrap();
    assert!(!format!("{hash:?}").contains("argon2"));
  }

  #[test]
  fn placeholder_is_a_real_hash_that_never_matches() {
    let hash = dummy_hash().unwrap();
    assert!(hash.as_phc().starts_with("$argon2"));
    assert!(!verify_placeholder("almanac-placeholder-credential"));
    assert!(!verify_placeholder(""));
  }
}
