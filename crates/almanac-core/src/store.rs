//! The `CalendarStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `almanac-store-sqlite`).
//! The server depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  account::{Account, AccountRemoval, AccountUpdate, PreparedAccount, PreparedAccountChanges},
  event::{Event, EventChanges, EventDraft, EventQuery},
  id::{AccountId, EventId},
};

/// Abstraction over an Almanac storage backend.
///
/// Implementations must uphold two guarantees the core cannot enforce alone:
///
/// - a role and its permission set are written in one atomic step;
/// - the last-admin check in [`delete_account`](Self::delete_account) and in
///   role-demoting [`update_account`](Self::update_account) calls is re-done
///   inside the same transaction as the write, so concurrent removals of two
///   admins cannot both succeed when only two exist.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CalendarStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Persist a new account. Fails if the username is already taken.
  fn create_account(
    &self,
    account: PreparedAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    id: AccountId,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn find_account_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// All accounts, ordered by username.
  fn list_accounts(
    &self,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;

  fn count_admins(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Apply prepared changes. A role change and its permission set are written
  /// together; demoting the last admin yields
  /// [`AccountUpdate::LastAdminProtected`] and writes nothing.
  fn update_account(
    &self,
    id: AccountId,
    changes: PreparedAccountChanges,
  ) -> impl Future<Output = Result<AccountUpdate, Self::Error>> + Send + '_;

  /// Delete an account unless it is the last remaining admin.
  fn delete_account(
    &self,
    id: AccountId,
  ) -> impl Future<Output = Result<AccountRemoval, Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  /// Persist a validated event owned by `created_by`. The store assigns the
  /// ID and timestamps.
  fn create_event(
    &self,
    created_by: AccountId,
    draft: EventDraft,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  fn get_event(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Events matching `query`, ordered by `occurs_on` then creation time.
  fn list_events<'a>(
    &'a self,
    query: &'a EventQuery,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + 'a;

  /// Overwrite the mutable fields of an event. `created_by` and `kind` are
  /// never touched. Returns `None` if no event of that ID and kind exists.
  fn update_event(
    &self,
    id: EventId,
    changes: EventChanges,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Returns `false` if the event did not exist.
  fn delete_event(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
