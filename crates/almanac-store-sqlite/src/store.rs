//! [`SqliteStore`]: the SQLite implementation of [`CalendarStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use almanac_core::{
  account::{Account, AccountRemoval, AccountUpdate, PreparedAccount, PreparedAccountChanges},
  event::{Event, EventChanges, EventDraft, EventQuery},
  id::{AccountId, EventId},
  role::Role,
  store::CalendarStore,
};

use crate::{
  Error, Result,
  encode::{
    ACCOUNT_COLUMNS, EVENT_COLUMNS, RawAccount, RawEvent, encode_date, encode_details,
    encode_dt, encode_permissions, encode_uuid,
  },
  schema::SCHEMA,
};

/// Outcome of a guarded account write. A row that fails to decode leaves the
/// transaction uncommitted.
enum Guarded {
  Done(Account),
  NotFound,
  LastAdmin,
  Corrupt(Error),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Almanac store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the connection. Test-only escape hatch for planting
  /// rows that the typed API refuses to write.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str, params: Vec<String>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(sql, rusqlite::params_from_iter(params))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_account(&self, sql: String, param: String) -> Result<Option<Account>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params![param], RawAccount::from_row).optional()?)
      })
      .await?;
    raw.map(RawAccount::into_account).transpose()
  }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

fn count_admins_in(conn: &rusqlite::Connection) -> rusqlite::Result<u64> {
  let n: i64 = conn.query_row(
    "SELECT COUNT(*) FROM accounts WHERE role = ?1",
    rusqlite::params![Role::Admin.as_str()],
    |r| r.get(0),
  )?;
  Ok(n.max(0) as u64)
}

// ─── CalendarStore impl ──────────────────────────────────────────────────────

impl CalendarStore for SqliteStore {
  type Error = Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account(&self, account: PreparedAccount) -> Result<Account> {
    let created = Account {
      id:              AccountId::new(),
      username:        account.username().to_owned(),
      display_name:    account.display_name().to_owned(),
      role:            account.role().role(),
      credential_hash: account.credential_hash().clone(),
      created_at:      Utc::now(),
    };

    let id_str      = encode_uuid(created.id.as_uuid());
    let username    = created.username.clone();
    let name        = created.display_name.clone();
    let role_str    = created.role.as_str();
    let perms_str   = encode_permissions(account.role().permissions())?;
    let hash_str    = created.credential_hash.as_phc().to_owned();
    let at_str      = encode_dt(created.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO accounts (
             account_id, username, display_name, role, permissions,
             credential_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, username, name, role_str, perms_str, hash_str, at_str],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateUsername(created.username));
    }
    Ok(created)
  }

  async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
    self
      .query_account(
        format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
        encode_uuid(id.as_uuid()),
      )
      .await
  }

  async fn find_account_by_username<'a>(&'a self, username: &'a str) -> Result<Option<Account>> {
    self
      .query_account(
        format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
        username.trim().to_owned(),
      )
      .await
  }

  async fn list_accounts(&self) -> Result<Vec<Account>> {
    let raws: Vec<RawAccount> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY username"))?;
        let rows = stmt
          .query_map([], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }

  async fn count_admins(&self) -> Result<u64> {
    Ok(self.conn.call(|conn| Ok(count_admins_in(conn)?)).await?)
  }

  async fn update_account(
    &self,
    id: AccountId,
    changes: PreparedAccountChanges,
  ) -> Result<AccountUpdate> {
    let id_str    = encode_uuid(id.as_uuid());
    let name      = changes.display_name().map(str::to_owned);
    let role      = changes.role();
    let role_str  = role.map(|r| r.role().as_str());
    let perms_str = role.map(|r| encode_permissions(r.permissions())).transpose()?;
    let hash_str  = changes.credential_hash().map(|h| h.as_phc().to_owned());
    let demotes   = role.is_some_and(|r| !r.role().is_admin());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let select = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1");

        let Some(current) = tx
          .query_row(&select, rusqlite::params![id_str], RawAccount::from_row)
          .optional()?
        else {
          return Ok(Guarded::NotFound);
        };
        if demotes && current.is_admin() && count_admins_in(&tx)? <= 1 {
          return Ok(Guarded::LastAdmin);
        }

        // Role and permissions always move together in this one statement.
        tx.execute(
          "UPDATE accounts SET
             display_name    = COALESCE(?2, display_name),
             role            = COALESCE(?3, role),
             permissions     = COALESCE(?4, permissions),
             credential_hash = COALESCE(?5, credential_hash)
           WHERE account_id = ?1",
          rusqlite::params![id_str, name, role_str, perms_str, hash_str],
        )?;

        let updated = tx.query_row(&select, rusqlite::params![id_str], RawAccount::from_row)?;
        let updated = match updated.into_account() {
          Ok(account) => account,
          Err(e) => return Ok(Guarded::Corrupt(e)),
        };
        tx.commit()?;
        Ok(Guarded::Done(updated))
      })
      .await?;

    match outcome {
      Guarded::Done(account) => Ok(AccountUpdate::Updated(account)),
      Guarded::NotFound => Ok(AccountUpdate::NotFound),
      Guarded::LastAdmin => Ok(AccountUpdate::LastAdminProtected),
      Guarded::Corrupt(e) => Err(e),
    }
  }

  async fn delete_account(&self, id: AccountId) -> Result<AccountRemoval> {
    let id_str = encode_uuid(id.as_uuid());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(current) = tx
          .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
            rusqlite::params![id_str],
            RawAccount::from_row,
          )
          .optional()?
        else {
          return Ok(Guarded::NotFound);
        };
        if current.is_admin() && count_admins_in(&tx)? <= 1 {
          return Ok(Guarded::LastAdmin);
        }
        let removed = match current.into_account() {
          Ok(account) => account,
          Err(e) => return Ok(Guarded::Corrupt(e)),
        };

        tx.execute("DELETE FROM accounts WHERE account_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(Guarded::Done(removed))
      })
      .await?;

    match outcome {
      Guarded::Done(account) => Ok(AccountRemoval::Deleted(account)),
      Guarded::NotFound => Ok(AccountRemoval::NotFound),
      Guarded::LastAdmin => Ok(AccountRemoval::LastAdminProtected),
      Guarded::Corrupt(e) => Err(e),
    }
  }

  // ── Events ────────────────────────────────────────────────────────────────

  async fn create_event(&self, created_by: AccountId, draft: EventDraft) -> Result<Event> {
    let now = Utc::now();
    let event = Event {
      id: EventId::new(),
      title: draft.title,
      description: draft.description,
      occurs_on: draft.occurs_on,
      created_by,
      details: draft.details,
      created_at: now,
      updated_at: now,
    };

    let id_str         = encode_uuid(event.id.as_uuid());
    let (kind, a, c)   = encode_details(&event.details)?;
    let title          = event.title.clone();
    let description    = event.description.clone();
    let occurs_on_str  = encode_date(event.occurs_on);
    let created_by_str = encode_uuid(created_by.as_uuid());
    let at_str         = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (
             event_id, kind, title, description, occurs_on, created_by,
             assessment_json, class_change_json, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            id_str,
            kind,
            title,
            description,
            occurs_on_str,
            created_by_str,
            a,
            c,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
    let id_str = encode_uuid(id.as_uuid());

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
              rusqlite::params![id_str],
              RawEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn list_events<'a>(&'a self, query: &'a EventQuery) -> Result<Vec<Event>> {
    let from_str = query.from.map(encode_date);
    let to_str   = query.to.map(encode_date);
    let kind_str = query.kind.map(|k| k.as_str());

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM events
           WHERE (?1 IS NULL OR occurs_on >= ?1)
             AND (?2 IS NULL OR occurs_on <= ?2)
             AND (?3 IS NULL OR kind = ?3)
           ORDER BY occurs_on, created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![from_str, to_str, kind_str], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn update_event(&self, id: EventId, changes: EventChanges) -> Result<Option<Event>> {
    let id_str        = encode_uuid(id.as_uuid());
    let (kind, a, c)  = encode_details(changes.details())?;
    let title         = changes.title().to_owned();
    let description   = changes.description().map(str::to_owned);
    let occurs_on_str = encode_date(changes.occurs_on());
    let at_str        = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE events SET
             title             = ?2,
             description       = ?3,
             occurs_on         = ?4,
             assessment_json   = ?5,
             class_change_json = ?6,
             updated_at        = ?7
           WHERE event_id = ?1 AND kind = ?8",
          rusqlite::params![id_str, title, description, occurs_on_str, a, c, at_str, kind],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !updated {
      return Ok(None);
    }
    self.get_event(id).await
  }

  async fn delete_event(&self, id: EventId) -> Result<bool> {
    let id_str = encode_uuid(id.as_uuid());
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM events WHERE event_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(n > 0)
  }
}
