//! Project aggregate model.
//!
//! # Responsibility
//! - Define the canonical Project record and its embedded children.
//! - Own the write-side shaping rules: tag normalization, server-assigned
//!   fields and the edit whitelist.
//!
//! # Invariants
//! - `votes_count == votes.len()` for every Project read from storage.
//! - `tags` are lowercase; order and duplicates are preserved.
//! - `owner`, `id`, `created_at`, `votes`, `views`, `comments` and
//!   `contributions` are never touched by an edit.
//! - Child author references are written with an identifier only; display
//!   fields are filled at read time.

use crate::model::id::{new_id, CommentId, ContributionId, ProjectId, UserId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Canonical project record, including its embedded children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Fixed at creation.
    pub owner: UserId,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub category: String,
    pub location: String,
    /// Lowercase, insertion ordered.
    pub tags: Vec<String>,
    /// Unix epoch milliseconds, server-assigned.
    pub created_at: i64,
    /// Users that upvoted, in vote order. No duplicates.
    pub votes: Vec<UserId>,
    pub votes_count: i64,
    pub views: i64,
    /// Campaign duration in days.
    pub duration: i64,
    pub image_url: String,
    pub video_url: String,
    pub comments: Vec<Comment>,
    pub contributions: Vec<Contribution>,
}

/// Display data supplied by a caller creating a project.
///
/// Server-authoritative fields have no place here, so extraneous input such
/// as `views` or `owner` is dropped at deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProject {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub tags: Vec<String>,
    pub duration: i64,
    pub image_url: String,
    pub video_url: String,
}

/// Partial-update payload carrying only the mutable display fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditProject {
    pub title: String,
    pub subtitle: String,
    pub location: String,
    pub category: String,
    pub tags: Vec<String>,
    pub image_url: String,
    pub video_url: String,
    pub duration: i64,
    pub description: String,
}

/// Reference to a user embedded in a child record.
///
/// `name` and `avatar` are a point-in-time snapshot; storage writes them
/// empty and reads refresh them from the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
}

impl UserRef {
    /// Reference carrying only the identifier.
    pub fn bare(id: UserId) -> Self {
        Self {
            id,
            name: String::new(),
            avatar: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author: UserRef,
    /// Unix epoch milliseconds, server-assigned.
    pub created_at: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub user: UserRef,
    pub amount: f64,
    /// Unix epoch milliseconds, server-assigned.
    pub created_at: i64,
}

/// Contribution amount rejected before persistence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidAmount(pub f64);

impl Display for InvalidAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "contribution amount must be a finite non-negative number, got {}",
            self.0
        )
    }
}

impl Error for InvalidAmount {}

impl Project {
    /// Builds a fresh project owned by `owner` from caller display data.
    ///
    /// # Invariants
    /// - `id` is freshly minted, `created_at` is now.
    /// - `views`, `votes_count` start at zero; votes and children are empty.
    /// - Tags are lowercased.
    pub fn new(owner: UserId, draft: NewProject) -> Self {
        let mut tags = draft.tags;
        normalize_tags(&mut tags);
        Self {
            id: new_id(),
            owner,
            title: draft.title,
            subtitle: draft.subtitle,
            description: draft.description,
            category: draft.category,
            location: draft.location,
            tags,
            created_at: now_epoch_ms(),
            votes: Vec::new(),
            votes_count: 0,
            views: 0,
            duration: draft.duration,
            image_url: draft.image_url,
            video_url: draft.video_url,
            comments: Vec::new(),
            contributions: Vec::new(),
        }
    }

    /// Overwrites the mutable display fields from `edit`.
    pub fn apply_edit(&mut self, edit: &EditProject) {
        self.title = edit.title.clone();
        self.subtitle = edit.subtitle.clone();
        self.location = edit.location.clone();
        self.category = edit.category.clone();
        self.tags = edit.tags.clone();
        normalize_tags(&mut self.tags);
        self.image_url = edit.image_url.clone();
        self.video_url = edit.video_url.clone();
        self.duration = edit.duration;
        self.description = edit.description.clone();
    }

    /// Whether `user` currently has a vote on this project.
    pub fn has_vote_from(&self, user: UserId) -> bool {
        self.votes.contains(&user)
    }
}

impl Comment {
    /// New comment stamped now, with an identifier-only author reference.
    pub fn new(author: UserId, text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            author: UserRef::bare(author),
            created_at: now_epoch_ms(),
            text: text.into(),
        }
    }
}

impl Contribution {
    /// New contribution stamped now, with an identifier-only user reference.
    ///
    /// Negative, NaN and infinite amounts are rejected. Zero is accepted.
    pub fn new(user: UserId, amount: f64) -> Result<Self, InvalidAmount> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(InvalidAmount(amount));
        }
        Ok(Self {
            id: new_id(),
            user: UserRef::bare(user),
            amount,
            created_at: now_epoch_ms(),
        })
    }
}

/// Lowercases every tag in place.
///
/// Order and duplicates are kept as supplied.
pub fn normalize_tags(tags: &mut [String]) {
    for tag in tags.iter_mut() {
        if tag.chars().any(char::is_uppercase) {
            *tag = tag.to_lowercase();
        }
    }
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
