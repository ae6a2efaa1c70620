//! Read-only view of a user identity, as served by the user directory.

use crate::model::id::UserId;
use serde::{Deserialize, Serialize};

/// Current display data of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
}
