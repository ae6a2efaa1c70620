//! Project aggregate use-case service.
//!
//! # Responsibility
//! - Validate identifier text received from outer layers.
//! - Apply server-authoritative fields and edit rules before persistence.
//! - Route every read that returns projects through author resolution.
//! - Map repository failures to the caller-facing error kinds.
//!
//! # Invariants
//! - Malformed ids fail with `InvalidIdentifier` before any storage access.
//! - `NotFound` is never folded into a generic failure.
//! - No automatic retries; the calling layer owns retry policy.

use crate::directory::UserDirectory;
use crate::model::id::{parse_id, IdError, ProjectId, UserId};
use crate::model::project::{
    Comment, Contribution, EditProject, InvalidAmount, NewProject, Project,
};
use crate::repo::project_repo::{ProjectRepository, RepoError};
use crate::search::criteria::{ProjectOrder, ProjectQuery, SearchKind, UnknownSearchKind};
use crate::service::author_fanout::resolve_authors;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Caller-facing error for project store use-cases.
#[derive(Debug)]
pub enum StoreError {
    /// Identifier text does not parse.
    InvalidIdentifier(IdError),
    /// Well-formed id, but no such project.
    NotFound(ProjectId),
    InvalidSearchKind(UnknownSearchKind),
    InvalidAmount(InvalidAmount),
    /// Requester is not the project owner.
    NotOwner { project: ProjectId, requester: UserId },
    /// Write path storage failure, timeouts included.
    Persistence(RepoError),
    /// Read path storage failure, timeouts included.
    Query(RepoError),
    /// Insert returned no usable key; the write must not be assumed visible.
    IdentifierGeneration(String),
}

impl StoreError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Persistence(err) | Self::Query(err) => err.is_timeout(),
            _ => false,
        }
    }

    fn from_write(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::IdentifierGeneration(message) => Self::IdentifierGeneration(message),
            other => Self::Persistence(other),
        }
    }

    fn from_read(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Query(other),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::NotFound(_) => "not_found",
            Self::InvalidSearchKind(_) => "invalid_search_kind",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::NotOwner { .. } => "not_owner",
            Self::Persistence(_) | Self::Query(_) if self.is_timeout() => "timeout",
            Self::Persistence(_) => "persistence_failed",
            Self::Query(_) => "query_failed",
            Self::IdentifierGeneration(_) => "id_generation_failed",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "project not found: {id}"),
            Self::InvalidSearchKind(err) => write!(f, "{err}"),
            Self::InvalidAmount(err) => write!(f, "{err}"),
            Self::NotOwner { project, requester } => {
                write!(f, "user {requester} does not own project {project}")
            }
            Self::Persistence(err) => write!(f, "project write failed: {err}"),
            Self::Query(err) => write!(f, "project query failed: {err}"),
            Self::IdentifierGeneration(message) => {
                write!(f, "project id generation failed: {message}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidIdentifier(err) => Some(err),
            Self::InvalidSearchKind(err) => Some(err),
            Self::InvalidAmount(err) => Some(err),
            Self::Persistence(err) | Self::Query(err) => Some(err),
            Self::NotFound(_) | Self::NotOwner { .. } | Self::IdentifierGeneration(_) => None,
        }
    }
}

impl From<IdError> for StoreError {
    fn from(value: IdError) -> Self {
        Self::InvalidIdentifier(value)
    }
}

impl From<UnknownSearchKind> for StoreError {
    fn from(value: UnknownSearchKind) -> Self {
        Self::InvalidSearchKind(value)
    }
}

impl From<InvalidAmount> for StoreError {
    fn from(value: InvalidAmount) -> Self {
        Self::InvalidAmount(value)
    }
}

/// Project store facade over a repository and a user directory.
pub struct ProjectService<R: ProjectRepository, D: UserDirectory> {
    repo: R,
    directory: D,
}

impl<R: ProjectRepository, D: UserDirectory> ProjectService<R, D> {
    pub fn new(repo: R, directory: D) -> Self {
        Self { repo, directory }
    }

    /// Creates a project owned by `owner_id`.
    ///
    /// # Contract
    /// - `owner`, `views`, `votes_count` and `created_at` are server-assigned.
    /// - Tags are lowercased.
    /// - Returns the stored project including its new id.
    pub fn create_project(&self, draft: NewProject, owner_id: &str) -> StoreResult<Project> {
        let started_at = Instant::now();
        let owner = parse_id(owner_id)?;
        let mut project = Project::new(owner, draft);

        let result = self.repo.create_project(&project).map_err(StoreError::from_write);
        log_outcome("project_create", started_at, &result);
        project.id = result?;
        Ok(project)
    }

    /// Gets one project with refreshed author data.
    pub fn get_project(&self, id: &str) -> StoreResult<Project> {
        let started_at = Instant::now();
        let project_id = parse_id(id)?;

        let result = self
            .repo
            .get_project(project_id)
            .map_err(StoreError::from_read)
            .and_then(|found| found.ok_or(StoreError::NotFound(project_id)));
        log_outcome("project_get", started_at, &result);

        let mut projects = [result?];
        resolve_authors(&self.directory, &mut projects);
        let [project] = projects;
        Ok(project)
    }

    /// Applies `edit` to `project` and persists the mutable fields.
    ///
    /// Identity, ownership, votes, views and children are never written.
    pub fn update_project(&self, project: &mut Project, edit: &EditProject) -> StoreResult<()> {
        let started_at = Instant::now();
        project.apply_edit(edit);

        let result = self
            .repo
            .update_project(project)
            .map_err(StoreError::from_write);
        log_outcome("project_update", started_at, &result);
        result
    }

    /// Permanently removes a project and everything embedded in it.
    pub fn delete_project(&self, id: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        let project_id = parse_id(id)?;

        let result = self
            .repo
            .delete_project(project_id)
            .map_err(StoreError::from_write);
        log_outcome("project_delete", started_at, &result);
        result
    }

    /// Deletes a project only when `requester_id` owns it.
    pub fn delete_owned_project(&self, id: &str, requester_id: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        let project_id = parse_id(id)?;
        let requester = parse_id(requester_id)?;

        let result = self.check_owner(project_id, requester).and_then(|()| {
            self.repo
                .delete_project(project_id)
                .map_err(StoreError::from_write)
        });
        log_outcome("project_delete_owned", started_at, &result);
        result
    }

    /// Counts one view.
    pub fn view_project(&self, id: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        let project_id = parse_id(id)?;

        let result = self
            .repo
            .increment_views(project_id)
            .map_err(StoreError::from_write);
        log_outcome("project_view", started_at, &result);
        result
    }

    /// Adds (`upvote = true`) or removes a user's vote.
    ///
    /// Repeating the same call is a no-op; the counter only moves when
    /// membership changes.
    pub fn vote(&self, project_id: &str, user_id: &str, upvote: bool) -> StoreResult<()> {
        let started_at = Instant::now();
        let project_id = parse_id(project_id)?;
        let user_id = parse_id(user_id)?;

        let result = self
            .repo
            .set_vote(project_id, user_id, upvote)
            .map_err(StoreError::from_write);
        match &result {
            Ok(changed) => info!(
                "event=project_vote module=store status=ok upvote={upvote} changed={changed} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("project_vote", started_at, err),
        }
        result.map(|_| ())
    }

    /// Appends a comment authored by `author_id`.
    pub fn add_comment(&self, project_id: &str, author_id: &str, text: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        let project_id = parse_id(project_id)?;
        let author = parse_id(author_id)?;
        let comment = Comment::new(author, text);

        let result = self
            .repo
            .append_comment(project_id, &comment)
            .map_err(StoreError::from_write);
        log_outcome("project_comment", started_at, &result);
        result
    }

    /// Appends a contribution of `amount` by `user_id`.
    pub fn add_contribution(&self, project_id: &str, user_id: &str, amount: f64) -> StoreResult<()> {
        let started_at = Instant::now();
        let project_id = parse_id(project_id)?;
        let user = parse_id(user_id)?;
        let contribution = Contribution::new(user, amount)?;

        let result = self
            .repo
            .append_contribution(project_id, &contribution)
            .map_err(StoreError::from_write);
        log_outcome("project_contribute", started_at, &result);
        result
    }

    /// Single-field search with the kind given as text (`title|category|tags`).
    pub fn search_by_field(&self, kind: &str, keywords: &str) -> StoreResult<Vec<Project>> {
        let kind: SearchKind = kind.parse()?;
        self.search(kind, keywords)
    }

    /// Single-field search.
    ///
    /// - `Title`: unanchored substring.
    /// - `Category`: exact match.
    /// - `Tags`: whitespace-separated tokens, any one matching.
    pub fn search(&self, kind: SearchKind, keywords: &str) -> StoreResult<Vec<Project>> {
        self.list("project_search", &ProjectQuery::by_field(kind, keywords))
    }

    /// Title substring plus optional category, ordered by `order`.
    ///
    /// `"todos"`/`"all"` disables the category filter; `order` is
    /// `popularity`, `date`, or anything else for insertion order.
    pub fn full_search(&self, title: &str, category: &str, order: &str) -> StoreResult<Vec<Project>> {
        let query = ProjectQuery::full_search(title, category, ProjectOrder::from_keyword(order));
        self.list("project_full_search", &query)
    }

    pub fn projects_by_owner(&self, user_id: &str) -> StoreResult<Vec<Project>> {
        let owner = parse_id(user_id)?;
        self.list("project_by_owner", &ProjectQuery::owned_by(owner))
    }

    pub fn voted_projects(&self, user_id: &str) -> StoreResult<Vec<Project>> {
        let user = parse_id(user_id)?;
        self.list("project_voted", &ProjectQuery::voted_by(user))
    }

    pub fn contributed_projects(&self, user_id: &str) -> StoreResult<Vec<Project>> {
        let user = parse_id(user_id)?;
        self.list("project_contributed", &ProjectQuery::contributed_by(user))
    }

    fn check_owner(&self, project_id: ProjectId, requester: UserId) -> StoreResult<()> {
        let project = self
            .repo
            .get_project(project_id)
            .map_err(StoreError::from_read)?
            .ok_or(StoreError::NotFound(project_id))?;
        if project.owner != requester {
            return Err(StoreError::NotOwner {
                project: project_id,
                requester,
            });
        }
        Ok(())
    }

    fn list(&self, event: &str, query: &ProjectQuery) -> StoreResult<Vec<Project>> {
        let started_at = Instant::now();
        let result = self
            .repo
            .find_projects(query)
            .map_err(StoreError::from_read);
        match &result {
            Ok(projects) => debug!(
                "event={event} module=store status=ok results={} duration_ms={}",
                projects.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure(event, started_at, err),
        }

        let mut projects = result?;
        resolve_authors(&self.directory, &mut projects);
        Ok(projects)
    }
}

fn log_outcome<T>(event: &str, started_at: Instant, result: &StoreResult<T>) {
    match result {
        Ok(_) => info!(
            "event={event} module=store status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => log_failure(event, started_at, err),
    }
}

fn log_failure(event: &str, started_at: Instant, err: &StoreError) {
    warn!(
        "event={event} module=store status=error duration_ms={} error_code={} error={}",
        started_at.elapsed().as_millis(),
        err.code(),
        err
    );
}
