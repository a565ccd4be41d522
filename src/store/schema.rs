use rusqlite::Connection;
use tracing::info;

use crate::common::error::StoreResult;

/// Create the registration table and its indexes if they do not exist.
///
/// `chat_id` is the mutation key. Handles compare case-insensitively and at
/// most one chat holds a given handle.
pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS registrations (
            chat_id         INTEGER PRIMARY KEY,
            user_id         INTEGER NOT NULL,
            handle          TEXT NOT NULL COLLATE NOCASE,
            registered_at   TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_registrations_handle
            ON registrations(handle);

        CREATE INDEX IF NOT EXISTS idx_registrations_user
            ON registrations(user_id);
        ",
    )?;

    info!("Registration schema ready");
    Ok(())
}
