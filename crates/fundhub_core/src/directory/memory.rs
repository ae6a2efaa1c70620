//! In-process user directory, for tests and embedded hosts.

use super::{DirectoryError, DirectoryResult, UserDirectory};
use crate::model::id::UserId;
use crate::model::user::UserSnapshot;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Map-backed directory with interior mutability so hosts can keep
/// editing users while a service borrows it.
///
/// Every operation is a single map call, so a poisoned lock still guards a
/// consistent map and is recovered rather than reported.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserSnapshot>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: UserSnapshot) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.id, user);
    }

    /// Removes a user, returning the previous entry.
    pub fn remove(&self, id: UserId) -> Option<UserSnapshot> {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn lookup(&self, id: UserId) -> DirectoryResult<UserSnapshot> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.get(&id).cloned().ok_or(DirectoryError::NotFound(id))
    }
}
