//! The actor behind a request.

use serde::Serialize;

use crate::{
  account::Account,
  id::AccountId,
  role::{Permission, PermissionSet, Role, permissions_for},
};

/// An authenticated or anonymous actor.
///
/// The permission set is never stored on the identity; it is always derived
/// from `role` on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
  id:   Option<AccountId>,
  role: Role,
}

impl Identity {
  /// An unauthenticated visitor.
  pub const fn anonymous() -> Self { Self { id: None, role: Role::Guest } }

  pub const fn authenticated(id: AccountId, role: Role) -> Self {
    Self { id: Some(id), role }
  }

  /// The identity of a stored account, using its current role.
  pub fn of_account(account: &Account) -> Self {
    Self::authenticated(account.id, account.role)
  }

  pub fn id(&self) -> Option<AccountId> { self.id }

  pub fn role(&self) -> Role { self.role }

  pub fn is_authenticated(&self) -> bool { self.id.is_some() }

  pub fn permissions(&self) -> PermissionSet { permissions_for(self.role) }

  pub fn has_permission(&self, action: Permission) -> bool {
    self.permissions().contains(action)
  }
}

impl Default for Identity {
  fn default() -> Self { Self::anonymous() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn anonymous_is_a_guest_without_id() {
    let who = Identity::anonymous();
    assert_eq!(who.role(), Role::Guest);
    assert!(who.id().is_none());
    assert!(who.has_permission(Permission::View));
    assert!(!who.has_permission(Permission::Create));
  }

  #[test]
  fn teacher_can_create_but_not_delete() {
    let who = Identity::authenticated(AccountId::new(), Role::Teacher);
    assert!(who.has_permission(Permission::Create));
    assert!(who.has_permission(Permission::Edit));
    assert!(!who.has_permission(Permission::Delete));
  }
}
