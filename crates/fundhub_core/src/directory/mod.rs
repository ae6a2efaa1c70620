//! User directory contract consulted for author display data.
//!
//! # Responsibility
//! - Define the read-only lookup the core needs from the user store.
//! - Provide SQLite and in-memory adapters.
//!
//! # Invariants
//! - The core never writes through this contract.
//! - A missing user is `DirectoryError::NotFound`, distinct from the store
//!   being unreachable.

pub mod memory;
pub mod sqlite;

use crate::model::id::UserId;
use crate::model::user::UserSnapshot;
use log::warn;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use memory::InMemoryUserDirectory;
pub use sqlite::SqliteUserDirectory;

pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    NotFound(UserId),
    /// Backend failed or timed out.
    Unavailable(String),
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::Unavailable(message) => write!(f, "user directory unavailable: {message}"),
        }
    }
}

impl Error for DirectoryError {}

/// Read-only user lookup.
pub trait UserDirectory {
    fn lookup(&self, id: UserId) -> DirectoryResult<UserSnapshot>;

    /// Resolves several users at once.
    ///
    /// Users that cannot be resolved are absent from the map. The default
    /// issues one `lookup` per id; adapters with a cheaper batch path
    /// override it.
    fn lookup_many(&self, ids: &[UserId]) -> DirectoryResult<HashMap<UserId, UserSnapshot>> {
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            match self.lookup(*id) {
                Ok(user) => {
                    found.insert(*id, user);
                }
                Err(DirectoryError::NotFound(_)) => {}
                Err(err) => {
                    warn!("event=user_lookup module=directory status=error user_id={id} error={err}");
                }
            }
        }
        Ok(found)
    }
}

impl<D: UserDirectory + ?Sized> UserDirectory for &D {
    fn lookup(&self, id: UserId) -> DirectoryResult<UserSnapshot> {
        (**self).lookup(id)
    }

    fn lookup_many(&self, ids: &[UserId]) -> DirectoryResult<HashMap<UserId, UserSnapshot>> {
        (**self).lookup_many(ids)
    }
}
