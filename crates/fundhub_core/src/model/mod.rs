//! Domain model for crowdfunding projects.
//!
//! # Responsibility
//! - Define the Project aggregate and its embedded child records.
//! - Define the identifier scheme shared by every entity.
//!
//! # Invariants
//! - Every entity is identified by a time-ordered `Uuid` (v7).
//! - A Project is one consistency boundary together with its votes,
//!   comments and contributions.
//! - Deletion is hard: no tombstones are kept.

pub mod id;
pub mod project;
pub mod user;
