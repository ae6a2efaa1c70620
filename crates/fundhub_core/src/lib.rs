//! Persistence core for the FundHub crowdfunding platform.
//! This crate owns project aggregates, their votes, comments and
//! contributions, and the discovery queries over them.

pub mod config;
pub mod db;
pub mod directory;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, CoreConfig, LoggingConfig, StoreConfig};
pub use directory::{
    DirectoryError, DirectoryResult, InMemoryUserDirectory, SqliteUserDirectory, UserDirectory,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::id::{new_id, parse_id, CommentId, ContributionId, IdError, ProjectId, UserId};
pub use model::project::{
    Comment, Contribution, EditProject, InvalidAmount, NewProject, Project, UserRef,
};
pub use model::user::UserSnapshot;
pub use repo::project_repo::{ProjectRepository, RepoError, RepoResult, SqliteProjectRepository};
pub use search::criteria::{ProjectFilter, ProjectOrder, ProjectQuery, SearchKind, UnknownSearchKind};
pub use service::author_fanout::{resolve_authors, REMOVED_USER_NAME};
pub use service::project_service::{ProjectService, StoreError, StoreResult};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
