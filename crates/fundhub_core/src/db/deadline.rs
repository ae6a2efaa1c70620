//! Per-call deadlines for SQLite work.
//!
//! A deadline is armed as a progress handler: SQLite polls it every few
//! hundred VM steps and aborts the running statement with
//! `SQLITE_INTERRUPT` once it returns `true`. Dropping the guard disarms it.

use rusqlite::{Connection, ErrorCode};
use std::time::{Duration, Instant};

const PROGRESS_POLL_STEPS: i32 = 500;

pub(crate) struct Deadline<'conn> {
    conn: &'conn Connection,
}

impl<'conn> Deadline<'conn> {
    pub(crate) fn arm(conn: &'conn Connection, timeout: Duration) -> Self {
        let expires_at = Instant::now() + timeout;
        conn.progress_handler(
            PROGRESS_POLL_STEPS,
            Some(move || Instant::now() >= expires_at),
        );
        Self { conn }
    }
}

impl Drop for Deadline<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

/// Lock contention past `busy_timeout`, or an expired deadline.
pub(crate) fn is_timeout_error(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::OperationInterrupted)
    )
}
