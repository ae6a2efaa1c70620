//! Identifier scheme for every persisted entity.
//!
//! # Responsibility
//! - Mint collision-resistant, time-sortable identifiers.
//! - Validate caller-supplied identifier text before it reaches storage.
//!
//! # Invariants
//! - Minted identifiers are UUID v7, so lexical order of the canonical text
//!   form follows creation order.
//! - The nil UUID is never a valid entity identifier.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ProjectId = Uuid;
pub type UserId = Uuid;
pub type CommentId = Uuid;
pub type ContributionId = Uuid;

/// Caller-supplied identifier text that does not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdError {
    pub input: String,
}

impl Display for IdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid identifier `{}`", self.input)
    }
}

impl Error for IdError {}

/// Mints a new identifier.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// Parses identifier text received from an outer layer.
///
/// Surrounding whitespace is ignored. Any RFC 4122 text form is accepted,
/// the nil UUID is rejected.
pub fn parse_id(value: &str) -> Result<Uuid, IdError> {
    let trimmed = value.trim();
    match Uuid::parse_str(trimmed) {
        Ok(id) if !id.is_nil() => Ok(id),
        _ => Err(IdError {
            input: value.to_string(),
        }),
    }
}
