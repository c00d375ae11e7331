//! The authorization gate, the single decision point for protected
//! operations.
//!
//! The gate is a pure function of the identity, the requested operation, and
//! whatever resource snapshot the caller attaches to that operation. It never
//! mutates state; fetching a consistent snapshot (event owner, admin count) is
//! the caller's job.

use thiserror::Error;

use crate::{
  id::AccountId,
  identity::Identity,
  role::{Permission, PermissionTable, Role, permissions_for},
};

/// An operation together with the resource facts needed to decide it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  /// Browse the calendar. Public.
  ViewEvents,
  CreateEvent,
  EditEvent { owner: AccountId },
  DeleteEvent { owner: AccountId },
  ListAccounts,
  CreateAccount,
  /// Locate an existing account in order to update or delete it. Decided
  /// before the target is read, so callers learn nothing about it when
  /// refused.
  ModifyAccount,
  /// `new_role` is `None` when the update leaves the role alone.
  UpdateAccount {
    target_role: Role,
    new_role:    Option<Role>,
    admin_count: u64,
  },
  DeleteAccount { target_role: Role, admin_count: u64 },
}

/// Why an operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DenyReason {
  #[error("insufficient role for this operation")]
  InsufficientRole,
  #[error("only the creator or an admin may modify this event")]
  NotOwner,
  #[error("the last remaining admin cannot be removed or demoted")]
  LastAdminProtected,
}

impl DenyReason {
  pub fn code(&self) -> &'static str {
    match self {
      Self::InsufficientRole => "insufficient_role",
      Self::NotOwner => "not_owner",
      Self::LastAdminProtected => "last_admin_protected",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Deny(DenyReason),
}

impl Decision {
  pub fn is_allowed(&self) -> bool { matches!(self, Self::Allow) }

  pub fn into_result(self) -> Result<(), DenyReason> {
    match self {
      Self::Allow => Ok(()),
      Self::Deny(reason) => Err(reason),
    }
  }
}

/// Decides operations against an injected role → permission table.
#[derive(Clone, Copy)]
pub struct Gate {
  permissions: PermissionTable,
}

impl Default for Gate {
  fn default() -> Self { Self::new(permissions_for) }
}

impl std::fmt::Debug for Gate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Gate").finish_non_exhaustive()
  }
}

impl Gate {
  pub fn new(permissions: PermissionTable) -> Self { Self { permissions } }

  fn has_permission(&self, who: &Identity, action: Permission) -> bool {
    (self.permissions)(who.role()).contains(action)
  }

  pub fn decide(&self, who: &Identity, op: Operation) -> Decision {
    use Decision::{Allow, Deny};
    use DenyReason::*;

    let is_admin = who.is_authenticated() && who.role().is_admin();

    match op {
      Operation::ViewEvents => Allow,

      Operation::CreateEvent => {
        if who.is_authenticated() && self.has_permission(who, Permission::Create) {
          Allow
        } else {
          Deny(InsufficientRole)
        }
      }

      // Ownership alone suffices for non-admins; no edit/delete bit needed.
      Operation::EditEvent { owner } | Operation::DeleteEvent { owner } => {
        if is_admin || who.id() == Some(owner) {
          Allow
        } else {
          Deny(NotOwner)
        }
      }

      Operation::ListAccounts | Operation::CreateAccount | Operation::ModifyAccount => {
        if is_admin { Allow } else { Deny(InsufficientRole) }
      }

      Operation::UpdateAccount { target_role, new_role, admin_count } => {
        if !is_admin {
          Deny(InsufficientRole)
        } else if target_role.is_admin()
          && new_role.is_some_and(|r| !r.is_admin())
          && admin_count <= 1
        {
          Deny(LastAdminProtected)
        } else {
          Allow
        }
      }

      Operation::DeleteAccount { target_role, admin_count } => {
        if !is_admin {
          Deny(InsufficientRole)
        } else if target_role.is_admin() && admin_count <= 1 {
          Deny(LastAdminProtected)
        } else {
          Allow
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::role::PermissionSet;

  fn gate() -> Gate { Gate::default() }

  fn admin() -> Identity { Identity::authenticated(AccountId::new(), Role::Admin) }

  fn teacher() -> Identity { Identity::authenticated(AccountId::new(), Role::Teacher) }

  fn guest() -> Identity { Identity::authenticated(AccountId::new(), Role::Guest) }

  #[test]
  fn viewing_is_public() {
    for who in [Identity::anonymous(), guest(), teacher(), admin()] {
      assert_eq!(gate().decide(&who, Operation::ViewEvents), Decision::Allow);
    }
  }

  #[test]
  fn create_requires_create_permission() {
    let g = gate();
    assert_eq!(
      g.decide(&Identity::anonymous(), Operation::CreateEvent),
      Decision::Deny(DenyReason::InsufficientRole)
    );
    assert_eq!(
      g.decide(&guest(), Operation::CreateEvent),
      Decision::Deny(DenyReason::InsufficientRole)
    );
    assert!(g.decide(&teacher(), Operation::CreateEvent).is_allowed());
    assert!(g.decide(&admin(), Operation::CreateEvent).is_allowed());
  }

  #[test]
  fn edit_and_delete_allowed_iff_admin_or_owner() {
    let g = gate();
    let owner = teacher();
    let owner_id = owner.id().unwrap();
    let ops = [
      Operation::EditEvent { owner: owner_id },
      Operation::DeleteEvent { owner: owner_id },
    ];

    for op in ops {
      assert!(g.decide(&owner, op).is_allowed());
      assert!(g.decide(&admin(), op).is_allowed());
      for other in [teacher(), guest(), Identity::anonymous()] {
        assert_eq!(g.decide(&other, op), Decision::Deny(DenyReason::NotOwner));
      }
    }
  }

  #[test]
  fn owning_guest_is_allowed_by_ownership_alone() {
    // A guest who somehow owns an event (e.g. demoted after creating it)
    // still passes: ownership does not require the edit/delete bits.
    let who = guest();
    let op = Operation::DeleteEvent { owner: who.id().unwrap() };
    assert!(gate().decide(&who, op).is_allowed());
  }

  #[test]
  fn account_management_is_admin_only() {
    let g = gate();
    for op in [Operation::ListAccounts, Operation::CreateAccount] {
      assert!(g.decide(&admin(), op).is_allowed());
      for who in [teacher(), guest(), Identity::anonymous()] {
        assert_eq!(g.decide(&who, op), Decision::Deny(DenyReason::InsufficientRole));
      }
    }
    let delete = Operation::DeleteAccount { target_role: Role::Guest, admin_count: 1 };
    assert_eq!(
      g.decide(&teacher(), delete),
      Decision::Deny(DenyReason::InsufficientRole)
    );
  }

  #[test]
  fn modifying_an_account_is_admin_only() {
    let g = gate();
    assert!(g.decide(&admin(), Operation::ModifyAccount).is_allowed());
    for who in [teacher(), guest(), Identity::anonymous()] {
      assert_eq!(
        g.decide(&who, Operation::ModifyAccount),
        Decision::Deny(DenyReason::InsufficientRole)
      );
    }
  }

  #[test]
  fn modifying_consults_only_the_role() {
    // A table granting every permission to guests does not open account
    // management to them.
    fn everyone_everything(_: Role) -> PermissionSet { permissions_for(Role::Admin) }
    let g = Gate::new(everyone_everything);
    assert_eq!(
      g.decide(&guest(), Operation::ModifyAccount),
      Decision::Deny(DenyReason::InsufficientRole)
    );
  }

  #[test]
  fn last_admin_cannot_be_deleted() {
    let g = gate();
    let sole = Operation::DeleteAccount { target_role: Role::Admin, admin_count: 1 };
    assert_eq!(g.decide(&admin(), sole), Decision::Deny(DenyReason::LastAdminProtected));

    let two = Operation::DeleteAccount { target_role: Role::Admin, admin_count: 2 };
    assert!(g.decide(&admin(), two).is_allowed());

    let teacher_target = Operation::DeleteAccount { target_role: Role::Teacher, admin_count: 1 };
    assert!(g.decide(&admin(), teacher_target).is_allowed());
  }

  #[test]
  fn last_admin_cannot_be_demoted() {
    let g = gate();
    let demote = |admin_count| Operation::UpdateAccount {
      target_role: Role::Admin,
      new_role: Some(Role::Teacher),
      admin_count,
    };
    assert_eq!(
      g.decide(&admin(), demote(1)),
      Decision::Deny(DenyReason::LastAdminProtected)
    );
    assert!(g.decide(&admin(), demote(2)).is_allowed());

    let rename_only = Operation::UpdateAccount {
      target_role: Role::Admin,
      new_role:    None,
      admin_count: 1,
    };
    assert!(g.decide(&admin(), rename_only).is_allowed());
  }

  #[test]
  fn injected_table_is_consulted() {
    fn nobody_creates(_: Role) -> PermissionSet {
      PermissionSet::empty().with(Permission::View)
    }
    let g = Gate::new(nobody_creates);
    assert_eq!(
      g.decide(&teacher(), Operation::CreateEvent),
      Decision::Deny(DenyReason::InsufficientRole)
    );
  }

  #[test]
  fn into_result_exposes_reason() {
    let denied = gate().decide(&guest(), Operation::CreateEvent);
    assert_eq!(denied.into_result(), Err(DenyReason::InsufficientRole));
  }
}
