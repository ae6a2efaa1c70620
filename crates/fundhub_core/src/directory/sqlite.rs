//! SQLite adapter over the `users` table.
//!
//! # Invariants
//! - Read-only: no statement here writes.
//! - Batch lookups use one `IN (...)` query per chunk of ids.

use super::{DirectoryError, DirectoryResult, UserDirectory};
use crate::config::StoreConfig;
use crate::db::deadline::Deadline;
use crate::model::id::UserId;
use crate::model::user::UserSnapshot;
use crate::search::criteria::placeholders;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Keeps each batch well under SQLite's bound-parameter limit.
const LOOKUP_CHUNK_SIZE: usize = 500;

pub struct SqliteUserDirectory<'conn> {
    conn: &'conn Connection,
    operation_timeout: Duration,
}

impl<'conn> SqliteUserDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_config(conn, &StoreConfig::default())
    }

    pub fn with_config(conn: &'conn Connection, config: &StoreConfig) -> Self {
        Self {
            conn,
            operation_timeout: config.operation_timeout(),
        }
    }
}

impl UserDirectory for SqliteUserDirectory<'_> {
    fn lookup(&self, id: UserId) -> DirectoryResult<UserSnapshot> {
        let _deadline = Deadline::arm(self.conn, self.operation_timeout);
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, name, avatar_url FROM users WHERE uuid = ?1;")
            .map_err(unavailable)?;
        let mut rows = stmt.query([id.to_string()]).map_err(unavailable)?;
        match rows.next().map_err(unavailable)? {
            Some(row) => parse_user_row(row),
            None => Err(DirectoryError::NotFound(id)),
        }
    }

    fn lookup_many(&self, ids: &[UserId]) -> DirectoryResult<HashMap<UserId, UserSnapshot>> {
        let _deadline = Deadline::arm(self.conn, self.operation_timeout);
        let mut found = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(LOOKUP_CHUNK_SIZE) {
            let sql = format!(
                "SELECT uuid, name, avatar_url FROM users WHERE uuid IN ({});",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql).map_err(unavailable)?;
            let mut rows = stmt
                .query(params_from_iter(chunk.iter().map(Uuid::to_string)))
                .map_err(unavailable)?;
            while let Some(row) = rows.next().map_err(unavailable)? {
                let user = parse_user_row(row)?;
                found.insert(user.id, user);
            }
        }
        Ok(found)
    }
}

fn parse_user_row(row: &Row<'_>) -> DirectoryResult<UserSnapshot> {
    let uuid_text: String = row.get("uuid").map_err(unavailable)?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        DirectoryError::Unavailable(format!("invalid uuid value `{uuid_text}` in users.uuid"))
    })?;
    Ok(UserSnapshot {
        id,
        name: row.get("name").map_err(unavailable)?,
        avatar: row.get("avatar_url").map_err(unavailable)?,
    })
}

fn unavailable(err: rusqlite::Error) -> DirectoryError {
    DirectoryError::Unavailable(err.to_string())
}
