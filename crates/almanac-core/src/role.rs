//! Roles, permissions and the fixed role → permission mapping.
//!
//! The mapping is a pure function over a closed enumeration. Nothing in the
//! system stores a permission set that was not produced by
//! [`permissions_for`].

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr};

use crate::{Error, Result};

// ─── Role ────────────────────────────────────────────────────────────────────

/// The role of an account. Anonymous actors are treated as [`Role::Guest`].
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Teacher,
  #[default]
  Guest,
}

impl Role {
  /// Parse a role name, failing with [`Error::InvalidRole`] for anything
  /// outside the closed set.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::InvalidRole(s.to_owned()))
  }

  pub fn as_str(self) -> &'static str { self.into() }

  pub fn is_admin(self) -> bool { self == Self::Admin }
}

// ─── Permission ──────────────────────────────────────────────────────────────

/// A single capability granted in bulk per role.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Permission {
  View,
  Create,
  Edit,
  Delete,
}

impl Permission {
  const fn bit(self) -> u8 {
    match self {
      Self::View => 1 << 0,
      Self::Create => 1 << 1,
      Self::Edit => 1 << 2,
      Self::Delete => 1 << 3,
    }
  }
}

// ─── PermissionSet ───────────────────────────────────────────────────────────

/// A set of [`Permission`]s. Serialises as a JSON array in the fixed order
/// `view, create, edit, delete`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Permission>", from = "Vec<Permission>")]
pub struct PermissionSet(u8);

impl PermissionSet {
  pub const fn empty() -> Self { Self(0) }

  pub const fn with(self, permission: Permission) -> Self {
    Self(self.0 | permission.bit())
  }

  pub const fn contains(&self, permission: Permission) -> bool {
    self.0 & permission.bit() != 0
  }

  pub const fn is_superset(&self, other: &PermissionSet) -> bool {
    self.0 & other.0 == other.0
  }

  pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
    Permission::iter().filter(|p| self.contains(*p))
  }

  pub fn len(&self) -> usize { self.0.count_ones() as usize }

  pub fn is_empty(&self) -> bool { self.0 == 0 }
}

impl FromIterator<Permission> for PermissionSet {
  fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
    iter.into_iter().fold(Self::empty(), Self::with)
  }
}

impl From<Vec<Permission>> for PermissionSet {
  fn from(value: Vec<Permission>) -> Self { value.into_iter().collect() }
}

impl From<PermissionSet> for Vec<Permission> {
  fn from(value: PermissionSet) -> Self { value.iter().collect() }
}

impl fmt::Debug for PermissionSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.iter()).finish()
  }
}

// ─── Mapping ─────────────────────────────────────────────────────────────────

/// The fixed role → permission table.
pub const fn permissions_for(role: Role) -> PermissionSet {
  let base = PermissionSet::empty().with(Permission::View);
  match role {
    Role::Admin => base
      .with(Permission::Create)
      .with(Permission::Edit)
      .with(Permission::Delete),
    Role::Teacher => base.with(Permission::Create).with(Permission::Edit),
    Role::Guest => base,
  }
}

/// Signature of a role → permission lookup, as injected into
/// [`Gate`](crate::gate::Gate).
pub type PermissionTable = fn(Role) -> PermissionSet;

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;
  use Permission::*;

  #[test]
  fn table_matches_fixed_mapping() {
    let admin: PermissionSet = [View, Create, Edit, Delete].into_iter().collect();
    let teacher: PermissionSet = [View, Create, Edit].into_iter().collect();
    let guest: PermissionSet = [View].into_iter().collect();

    assert_eq!(permissions_for(Role::Admin), admin);
    assert_eq!(permissions_for(Role::Teacher), teacher);
    assert_eq!(permissions_for(Role::Guest), guest);
  }

  #[test]
  fn roles_form_a_superset_chain() {
    let admin = permissions_for(Role::Admin);
    let teacher = permissions_for(Role::Teacher);
    let guest = permissions_for(Role::Guest);
    assert!(admin.is_superset(&teacher));
    assert!(teacher.is_superset(&guest));
    assert!(!guest.is_superset(&teacher));
  }

  #[test]
  fn mapping_is_stable_across_calls() {
    for role in Role::iter() {
      assert_eq!(permissions_for(role), permissions_for(role));
    }
  }

  #[test]
  fn parse_known_and_unknown_roles() {
    assert_eq!(Role::parse("teacher").unwrap(), Role::Teacher);
    assert_eq!(Role::parse("admin").unwrap(), Role::Admin);
    assert!(matches!(
      Role::parse("principal"),
      Err(Error::InvalidRole(r)) if r == "principal"
    ));
  }

  #[test]
  fn permission_set_serialises_in_fixed_order() {
    let json = serde_json::to_string(&permissions_for(Role::Admin)).unwrap();
    assert_eq!(json, r#"["view","create","edit","delete"]"#);

    let back: PermissionSet =
      serde_json::from_str(r#"["edit","view","create"]"#).unwrap();
    assert_eq!(back, permissions_for(Role::Teacher));
  }

  #[test]
  fn default_role_is_guest() {
    assert_eq!(Role::default(), Role::Guest);
  }
}
