//! Project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist project aggregates and their vote set, comments and
//!   contributions.
//! - Run list queries built from [`ProjectQuery`].
//!
//! # Invariants
//! - `votes_count` is only ever changed by the vote triggers, so it equals
//!   the number of vote rows.
//! - View counting is one `UPDATE ... SET views = views + 1`.
//! - Comment/contribution appends are one `INSERT ... SELECT` each and never
//!   rewrite earlier entries.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Every call runs under the configured operation deadline.
//! - A read sees one snapshot: parent rows and children are loaded inside
//!   the same deferred transaction.

use crate::config::StoreConfig;
use crate::db::deadline::{is_timeout_error, Deadline};
use crate::db::DbError;
use crate::model::id::{ProjectId, UserId};
use crate::model::project::{now_epoch_ms, Comment, Contribution, Project, UserRef};
use crate::search::criteria::ProjectQuery;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    owner_uuid,
    title,
    subtitle,
    description,
    category,
    location,
    duration,
    image_url,
    video_url,
    created_at,
    views,
    votes_count
FROM projects";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for project persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(ProjectId),
    /// Lock wait or operation deadline ran out; nothing was applied.
    Timeout(DbError),
    /// Insert went through but the store handed back no usable key.
    IdentifierGeneration(String),
    InvalidData(String),
}

impl RepoError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "project not found: {id}"),
            Self::Timeout(err) => write!(f, "store operation timed out: {err}"),
            Self::IdentifierGeneration(message) => {
                write!(f, "store returned no usable project id: {message}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted project data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) | Self::Timeout(err) => Some(err),
            Self::NotFound(_) | Self::IdentifierGeneration(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_timeout() {
            Self::Timeout(value)
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if is_timeout_error(&value) {
            Self::Timeout(DbError::Sqlite(value))
        } else {
            Self::Db(DbError::Sqlite(value))
        }
    }
}

/// Repository interface for project aggregates.
pub trait ProjectRepository {
    /// Inserts a project with its tags and returns the key read back from storage.
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Replaces the mutable display fields and tags of an existing project.
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    /// Hard delete, children included.
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
    fn increment_views(&self, id: ProjectId) -> RepoResult<()>;
    /// Adds or removes `user` from the vote set.
    ///
    /// Returns whether membership changed.
    fn set_vote(&self, id: ProjectId, user: UserId, upvote: bool) -> RepoResult<bool>;
    fn append_comment(&self, id: ProjectId, comment: &Comment) -> RepoResult<()>;
    fn append_contribution(&self, id: ProjectId, contribution: &Contribution) -> RepoResult<()>;
    fn find_projects(&self, query: &ProjectQuery) -> RepoResult<Vec<Project>>;
}

/// SQLite-backed project repository borrowing an open connection.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
    operation_timeout: Duration,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_config(conn, &StoreConfig::default())
    }

    pub fn with_config(conn: &'conn Connection, config: &StoreConfig) -> Self {
        Self {
            conn,
            operation_timeout: config.operation_timeout(),
        }
    }

    fn deadline(&self) -> Deadline<'conn> {
        Deadline::arm(self.conn, self.operation_timeout)
    }

    /// Parent rows and children of one call share a single read snapshot.
    fn read_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Deferred,
        )?)
    }

    fn immediate_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        let _deadline = self.deadline();
        let tx = self.immediate_tx()?;

        let returned: Option<String> = tx
            .query_row(
                "INSERT INTO projects (
                    uuid,
                    owner_uuid,
                    title,
                    subtitle,
                    description,
                    category,
                    location,
                    duration,
                    image_url,
                    video_url,
                    created_at,
                    views,
                    votes_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, 0)
                RETURNING uuid;",
                params![
                    project.id.to_string(),
                    project.owner.to_string(),
                    project.title.as_str(),
                    project.subtitle.as_str(),
                    project.description.as_str(),
                    project.category.as_str(),
                    project.location.as_str(),
                    project.duration,
                    project.image_url.as_str(),
                    project.video_url.as_str(),
                    project.created_at,
                ],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        let generated = returned
            .as_deref()
            .and_then(|text| Uuid::parse_str(text).ok())
            .filter(|id| *id == project.id)
            .ok_or_else(|| {
                RepoError::IdentifierGeneration(format!("{returned:?} for {}", project.id))
            })?;

        insert_tags(&tx, &generated.to_string(), &project.tags)?;
        tx.commit()?;
        Ok(generated)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let _deadline = self.deadline();
        let tx = self.read_tx()?;
        let found = tx
            .query_row(
                &format!("{PROJECT_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_project_row(row)),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        let Some(project) = found else {
            return Ok(None);
        };
        let mut project = project?;
        load_children(&tx, &mut project)?;
        tx.commit()?;
        Ok(Some(project))
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        let _deadline = self.deadline();
        let tx = self.immediate_tx()?;
        let project_uuid = project.id.to_string();

        let changed = tx.execute(
            "UPDATE projects
             SET
                title = ?2,
                subtitle = ?3,
                description = ?4,
                category = ?5,
                location = ?6,
                duration = ?7,
                image_url = ?8,
                video_url = ?9
             WHERE uuid = ?1;",
            params![
                project_uuid.as_str(),
                project.title.as_str(),
                project.subtitle.as_str(),
                project.description.as_str(),
                project.category.as_str(),
                project.location.as_str(),
                project.duration,
                project.image_url.as_str(),
                project.video_url.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(project.id));
        }

        tx.execute(
            "DELETE FROM project_tags WHERE project_uuid = ?1;",
            [project_uuid.as_str()],
        )?;
        insert_tags(&tx, &project_uuid, &project.tags)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let _deadline = self.deadline();
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn increment_views(&self, id: ProjectId) -> RepoResult<()> {
        let _deadline = self.deadline();
        let changed = self.conn.execute(
            "UPDATE projects SET views = views + 1 WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn set_vote(&self, id: ProjectId, user: UserId, upvote: bool) -> RepoResult<bool> {
        let _deadline = self.deadline();
        let tx = self.immediate_tx()?;
        let project_uuid = id.to_string();

        if !project_exists(&tx, &project_uuid)? {
            return Err(RepoError::NotFound(id));
        }

        let changed = if upvote {
            tx.execute(
                "INSERT OR IGNORE INTO project_votes (project_uuid, user_uuid, voted_at)
                 VALUES (?1, ?2, ?3);",
                params![project_uuid.as_str(), user.to_string(), now_epoch_ms()],
            )?
        } else {
            tx.execute(
                "DELETE FROM project_votes WHERE project_uuid = ?1 AND user_uuid = ?2;",
                params![project_uuid.as_str(), user.to_string()],
            )?
        };

        tx.commit()?;
        Ok(changed > 0)
    }

    fn append_comment(&self, id: ProjectId, comment: &Comment) -> RepoResult<()> {
        let _deadline = self.deadline();
        let changed = self.conn.execute(
            "INSERT INTO project_comments (
                uuid,
                project_uuid,
                author_uuid,
                author_name,
                author_avatar,
                created_at,
                body
            )
            SELECT ?1, uuid, ?3, ?4, ?5, ?6, ?7
            FROM projects
            WHERE uuid = ?2;",
            params![
                comment.id.to_string(),
                id.to_string(),
                comment.author.id.to_string(),
                comment.author.name.as_str(),
                comment.author.avatar.as_str(),
                comment.created_at,
                comment.text.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn append_contribution(&self, id: ProjectId, contribution: &Contribution) -> RepoResult<()> {
        let _deadline = self.deadline();
        let changed = self.conn.execute(
            "INSERT INTO project_contributions (
                uuid,
                project_uuid,
                user_uuid,
                user_name,
                user_avatar,
                amount,
                created_at
            )
            SELECT ?1, uuid, ?3, ?4, ?5, ?6, ?7
            FROM projects
            WHERE uuid = ?2;",
            params![
                contribution.id.to_string(),
                id.to_string(),
                contribution.user.id.to_string(),
                contribution.user.name.as_str(),
                contribution.user.avatar.as_str(),
                contribution.amount,
                contribution.created_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn find_projects(&self, query: &ProjectQuery) -> RepoResult<Vec<Project>> {
        let _deadline = self.deadline();
        let (clauses, bind_values) = query.filter.sql_clauses();
        let sql = format!(
            "{PROJECT_SELECT_SQL} WHERE 1 = 1{clauses}{};",
            query.order.sql()
        );

        let tx = self.read_tx()?;
        let mut projects = Vec::new();
        {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            while let Some(row) = rows.next()? {
                projects.push(parse_project_row(row)?);
            }
        }

        for project in &mut projects {
            load_children(&tx, project)?;
        }
        tx.commit()?;
        Ok(projects)
    }
}

fn insert_tags(tx: &Transaction<'_>, project_uuid: &str, tags: &[String]) -> RepoResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO project_tags (project_uuid, position, tag) VALUES (?1, ?2, ?3);",
    )?;
    for (position, tag) in tags.iter().enumerate() {
        stmt.execute(params![project_uuid, position as i64, tag.as_str()])?;
    }
    Ok(())
}

fn project_exists(tx: &Transaction<'_>, project_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE uuid = ?1);",
        [project_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let uuid_text: String = row.get("uuid")?;
    let owner_text: String = row.get("owner_uuid")?;

    Ok(Project {
        id: parse_uuid(&uuid_text, "projects.uuid")?,
        owner: parse_uuid(&owner_text, "projects.owner_uuid")?,
        title: row.get("title")?,
        subtitle: row.get("subtitle")?,
        description: row.get("description")?,
        category: row.get("category")?,
        location: row.get("location")?,
        tags: Vec::new(),
        created_at: row.get("created_at")?,
        votes: Vec::new(),
        votes_count: row.get("votes_count")?,
        views: row.get("views")?,
        duration: row.get("duration")?,
        image_url: row.get("image_url")?,
        video_url: row.get("video_url")?,
        comments: Vec::new(),
        contributions: Vec::new(),
    })
}

fn load_children(conn: &Connection, project: &mut Project) -> RepoResult<()> {
    let project_uuid = project.id.to_string();

    let mut stmt = conn.prepare(
        "SELECT tag FROM project_tags WHERE project_uuid = ?1 ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([project_uuid.as_str()])?;
    while let Some(row) = rows.next()? {
        project.tags.push(row.get(0)?);
    }

    let mut stmt = conn.prepare(
        "SELECT user_uuid FROM project_votes WHERE project_uuid = ?1 ORDER BY rowid ASC;",
    )?;
    let mut rows = stmt.query([project_uuid.as_str()])?;
    while let Some(row) = rows.next()? {
        let user_text: String = row.get(0)?;
        project
            .votes
            .push(parse_uuid(&user_text, "project_votes.user_uuid")?);
    }

    if project.votes.len() as i64 != project.votes_count {
        return Err(RepoError::InvalidData(format!(
            "votes_count {} does not match {} vote rows for project {}",
            project.votes_count,
            project.votes.len(),
            project.id
        )));
    }

    let mut stmt = conn.prepare(
        "SELECT uuid, author_uuid, author_name, author_avatar, created_at, body
         FROM project_comments
         WHERE project_uuid = ?1
         ORDER BY seq ASC;",
    )?;
    let mut rows = stmt.query([project_uuid.as_str()])?;
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get("uuid")?;
        let author_text: String = row.get("author_uuid")?;
        project.comments.push(Comment {
            id: parse_uuid(&uuid_text, "project_comments.uuid")?,
            author: UserRef {
                id: parse_uuid(&author_text, "project_comments.author_uuid")?,
                name: row.get("author_name")?,
                avatar: row.get("author_avatar")?,
            },
            created_at: row.get("created_at")?,
            text: row.get("body")?,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT uuid, user_uuid, user_name, user_avatar, amount, created_at
         FROM project_contributions
         WHERE project_uuid = ?1
         ORDER BY seq ASC;",
    )?;
    let mut rows = stmt.query([project_uuid.as_str()])?;
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get("uuid")?;
        let user_text: String = row.get("user_uuid")?;
        project.contributions.push(Contribution {
            id: parse_uuid(&uuid_text, "project_contributions.uuid")?,
            user: UserRef {
                id: parse_uuid(&user_text, "project_contributions.user_uuid")?,
                name: row.get("user_name")?,
                avatar: row.get("user_avatar")?,
            },
            amount: row.get("amount")?,
            created_at: row.get("created_at")?,
        });
    }

    Ok(())
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
