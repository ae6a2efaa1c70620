//! Read-time refresh of author snapshots embedded in projects.
//!
//! # Responsibility
//! - Replace comment/contribution user display fields with the directory's
//!   current data.
//! - Substitute a "removed user" sentinel when a user cannot be resolved.
//!
//! # Invariants
//! - Only the in-memory response is rewritten; storage is never touched.
//! - The embedded user identifier is always preserved.
//! - Lookup failures are absorbed here and never reach the caller.
//! - Distinct user ids across the whole result set are resolved in one
//!   batched directory call.

use crate::directory::UserDirectory;
use crate::model::id::UserId;
use crate::model::project::{Project, UserRef};
use crate::model::user::UserSnapshot;
use log::warn;
use std::collections::{BTreeSet, HashMap};

/// Display name shown for users missing from the directory.
pub const REMOVED_USER_NAME: &str = "Eliminado";

/// Refreshes author/user references of every comment and contribution.
pub fn resolve_authors<D: UserDirectory + ?Sized>(directory: &D, projects: &mut [Project]) {
    let ids: Vec<UserId> = projects
        .iter()
        .flat_map(|project| {
            project
                .comments
                .iter()
                .map(|comment| comment.author.id)
                .chain(project.contributions.iter().map(|c| c.user.id))
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if ids.is_empty() {
        return;
    }

    let users = directory.lookup_many(&ids).unwrap_or_else(|err| {
        warn!(
            "event=author_fanout module=service status=degraded users={} error={}",
            ids.len(),
            err
        );
        HashMap::new()
    });

    for missing in ids.iter().filter(|id| !users.contains_key(*id)) {
        warn!("event=author_fanout module=service status=missing user_id={missing}");
    }

    for project in projects.iter_mut() {
        for comment in &mut project.comments {
            refresh(&mut comment.author, &users);
        }
        for contribution in &mut project.contributions {
            refresh(&mut contribution.user, &users);
        }
    }
}

fn refresh(reference: &mut UserRef, users: &HashMap<UserId, UserSnapshot>) {
    match users.get(&reference.id) {
        Some(user) => {
            reference.name = user.name.clone();
            reference.avatar = user.avatar.clone();
        }
        None => {
            reference.name = REMOVED_USER_NAME.to_string();
            reference.avatar.clear();
        }
    }
}
