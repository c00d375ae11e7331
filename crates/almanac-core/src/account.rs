//! Accounts and the prepared forms the store accepts for writes.
//!
//! Account writes go through [`NewAccount::prepare`] and
//! [`AccountChanges::prepare`]. Preparation hashes any raw credential and
//! derives the permission set from the role, so a store only ever sees a
//! role together with its recomputed permissions, and never a raw password.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  Error, Result,
  credential::{CredentialHash, hash_password},
  id::AccountId,
  role::{PermissionSet, Role, permissions_for},
};

// ─── Stored account ──────────────────────────────────────────────────────────

/// A registered user as held by the store.
///
/// Not `Serialize`: use [`Account::to_public`] for anything leaving the
/// process.
#[derive(Debug, Clone)]
pub struct Account {
  pub id:              AccountId,
  pub username:        String,
  pub display_name:    String,
  pub role:            Role,
  pub credential_hash: CredentialHash,
  pub created_at:      DateTime<Utc>,
}

impl Account {
  pub fn permissions(&self) -> PermissionSet { permissions_for(self.role) }

  pub fn to_public(&self) -> PublicAccount {
    PublicAccount {
      id:             self.id,
      username:       self.username.clone(),
      name:           self.display_name.clone(),
      role:           self.role,
      permission_set: self.permissions(),
      created_at:     self.created_at,
    }
  }
}

/// The outward representation of an account. Carries no credential material.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
  pub id:             AccountId,
  pub username:       String,
  pub name:           String,
  pub role:           Role,
  pub permission_set: PermissionSet,
  pub created_at:     DateTime<Utc>,
}

// ─── Creation ────────────────────────────────────────────────────────────────

/// Caller input for creating an account.
#[derive(Clone)]
pub struct NewAccount {
  pub username:     String,
  pub password:     String,
  pub display_name: String,
  pub role:         Role,
}

impl NewAccount {
  /// Validate the input, hash the password and derive the permission set.
  pub fn prepare(self) -> Result<PreparedAccount> {
    let username = self.username.trim().to_owned();
    if username.is_empty() {
      return Err(Error::MissingField("username"));
    }
    let display_name = self.display_name.trim().to_owned();
    if display_name.is_empty() {
      return Err(Error::MissingField("name"));
    }
    let credential_hash = hash_password(&self.password)?;

    Ok(PreparedAccount {
      username,
      display_name,
      role: RoleChange::new(self.role),
      credential_hash,
    })
  }
}

/// A validated account ready to be inserted.
#[derive(Debug, Clone)]
pub struct PreparedAccount {
  username:        String,
  display_name:    String,
  role:            RoleChange,
  credential_hash: CredentialHash,
}

impl PreparedAccount {
  pub fn username(&self) -> &str { &self.username }

  pub fn display_name(&self) -> &str { &self.display_name }

  pub fn role(&self) -> RoleChange { self.role }

  pub fn credential_hash(&self) -> &CredentialHash { &self.credential_hash }
}

// ─── Role change ─────────────────────────────────────────────────────────────

/// A role bundled with the permission set derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChange {
  role:        Role,
  permissions: PermissionSet,
}

impl RoleChange {
  pub fn new(role: Role) -> Self {
    Self { role, permissions: permissions_for(role) }
  }

  pub fn role(&self) -> Role { self.role }

  pub fn permissions(&self) -> PermissionSet { self.permissions }
}

// ─── Updates ─────────────────────────────────────────────────────────────────

/// Caller input for updating an account. `None` fields are left unchanged.
#[derive(Clone, Default)]
pub struct AccountChanges {
  pub display_name: Option<String>,
  pub role:         Option<Role>,
  pub password:     Option<String>,
}

impl AccountChanges {
  pub fn prepare(self) -> Result<PreparedAccountChanges> {
    let display_name = match self.display_name {
      Some(name) => {
        let name = name.trim().to_owned();
        if name.is_empty() {
          return Err(Error::MissingField("name"));
        }
        Some(name)
      }
      None => None,
    };
    let credential_hash =
      self.password.as_deref().map(hash_password).transpose()?;

    Ok(PreparedAccountChanges {
      display_name,
      role: self.role.map(RoleChange::new),
      credential_hash,
    })
  }
}

/// Validated account changes; any role carries its recomputed permissions and
/// any password has already been hashed.
#[derive(Debug, Clone, Default)]
pub struct PreparedAccountChanges {
  display_name:    Option<String>,
  role:            Option<RoleChange>,
  credential_hash: Option<CredentialHash>,
}

impl PreparedAccountChanges {
  pub fn display_name(&self) -> Option<&str> { self.display_name.as_deref() }

  pub fn role(&self) -> Option<RoleChange> { self.role }

  pub fn credential_hash(&self) -> Option<&CredentialHash> {
    self.credential_hash.as_ref()
  }

  pub fn is_empty(&self) -> bool {
    self.display_name.is_none()
      && self.role.is_none()
      && self.credential_hash.is_none()
  }
}

// ─── Store outcomes ──────────────────────────────────────────────────────────

/// Result of [`CalendarStore::update_account`](crate::store::CalendarStore::update_account).
#[derive(Debug, Clone)]
pub enum AccountUpdate {
  Updated(Account),
  NotFound,
  /// The change would demote the only remaining admin.
  LastAdminProtected,
}

/// Result of [`CalendarStore::delete_account`](crate::store::CalendarStore::delete_account).
#[derive(Debug, Clone)]
pub enum AccountRemoval {
  Deleted(Account),
  NotFound,
  /// The target is the only remaining admin.
  LastAdminProtected,
}
