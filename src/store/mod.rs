//! Durable registration store.
//!
//! Maps the private chat a user registered from to the handle they want to
//! be notified for. Backed by a single SQLite connection behind a mutex;
//! every operation runs as one transaction, so concurrent callers see either
//! the old row or the new one, never a mix.

pub mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::common::error::{StoreError, StoreResult};
use crate::common::types::{ChatId, UserId};

/// A stored registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user_id: UserId,
    pub chat_id: ChatId,
    /// Handle without the leading `@`.
    pub handle: String,
    pub registered_at: String,
    pub updated_at: String,
}

pub struct RegistrationStore {
    conn: Mutex<Connection>,
}

impl RegistrationStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;

        let store = Self::with_connection(conn)?;
        info!("Registration store opened at {}", path.display());
        Ok(store)
    }

    /// A throwaway store, used by tests.
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        schema::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Register `handle` for `chat_id`, or update the existing registration
    /// of that chat in place.
    ///
    /// Returns `Ok(false)` without touching the database when any input is
    /// empty or zero. A handle currently held by another chat moves to this
    /// one.
    pub fn upsert(&self, user_id: UserId, chat_id: ChatId, handle: &str) -> StoreResult<bool> {
        let handle = normalize_handle(handle);
        if user_id == 0 || chat_id == 0 || handle.is_empty() {
            debug!(
                "Rejected registration (user {}, chat {}, handle {:?})",
                user_id, chat_id, handle
            );
            return Ok(false);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let released = tx.execute(
            "DELETE FROM registrations WHERE handle = ?1 AND chat_id <> ?2",
            params![handle, chat_id],
        )?;
        let changed = tx.execute(
            "INSERT INTO registrations (chat_id, user_id, handle) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id) DO UPDATE SET
                user_id = excluded.user_id,
                handle = excluded.handle,
                updated_at = datetime('now')",
            params![chat_id, user_id, handle],
        )?;
        tx.commit()?;

        if released > 0 {
            info!("Handle @{} moved to chat {}", handle, chat_id);
        }
        Ok(changed > 0)
    }

    /// Remove the registration of `chat_id`.
    ///
    /// Returns `Ok(true)` only if a row was removed.
    pub fn delete(&self, chat_id: ChatId) -> StoreResult<bool> {
        if chat_id == 0 {
            return Ok(false);
        }

        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM registrations WHERE chat_id = ?1",
            params![chat_id],
        )?;
        Ok(removed > 0)
    }

    /// The chat registered for `handle`, matched case-insensitively.
    pub fn find_chat_id_by_handle(&self, handle: &str) -> StoreResult<Option<ChatId>> {
        let handle = normalize_handle(handle);
        if handle.is_empty() {
            return Ok(None);
        }

        let conn = self.lock()?;
        let chat_id = conn
            .query_row(
                "SELECT chat_id FROM registrations WHERE handle = ?1 LIMIT 1",
                params![handle],
                |row| row.get(0),
            )
            .optional()?;
        Ok(chat_id)
    }

    /// The user who registered from `chat_id`.
    pub fn find_user_id_by_chat_id(&self, chat_id: ChatId) -> StoreResult<Option<UserId>> {
        if chat_id == 0 {
            return Ok(None);
        }

        let conn = self.lock()?;
        let user_id = conn
            .query_row(
                "SELECT user_id FROM registrations WHERE chat_id = ?1",
                params![chat_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id)
    }

    /// The full registration of `chat_id`.
    pub fn find_by_chat_id(&self, chat_id: ChatId) -> StoreResult<Option<Registration>> {
        if chat_id == 0 {
            return Ok(None);
        }

        let conn = self.lock()?;
        let registration = conn
            .query_row(
                "SELECT user_id, chat_id, handle, registered_at, updated_at
                 FROM registrations WHERE chat_id = ?1",
                params![chat_id],
                |row| {
                    Ok(Registration {
                        user_id: row.get(0)?,
                        chat_id: row.get(1)?,
                        handle: row.get(2)?,
                        registered_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(registration)
    }

    /// Number of live registrations.
    pub fn count(&self) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM registrations", [], |row| {
            row.get(0)
        })?;
        Ok(count as u64)
    }

    /// Flush and close the database.
    pub fn close(self) -> StoreResult<()> {
        let conn = self.conn.into_inner().map_err(|_| StoreError::Poisoned)?;
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        info!("Registration store closed");
        Ok(())
    }

    /// Poison the connection lock, as a panic inside an operation would.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.conn.lock();
            panic!("poisoning registration store");
        }));
    }
}

/// Trim whitespace and a single leading `@`.
fn normalize_handle(handle: &str) -> &str {
    let handle = handle.trim();
    handle.strip_prefix('@').unwrap_or(handle)
}
