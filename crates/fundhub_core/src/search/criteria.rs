//! Search criteria for project list queries.
//!
//! # Responsibility
//! - Parse search discriminators and sort keywords received as text.
//! - Build SQL predicates with bound parameters for `projects` listings.
//!
//! # Invariants
//! - Title matching is a literal, case-sensitive, unanchored substring test.
//! - Category matching is exact string equality.
//! - Tag matching is OR across tokens; tokens are lowercased.
//! - Without an explicit order, rows come back in insertion order.

use crate::model::id::UserId;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Category values meaning "do not filter by category".
const ANY_CATEGORY_SENTINELS: &[&str] = &["todos", "all"];

/// Field targeted by a single-field search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Title,
    Category,
    Tags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSearchKind(pub String);

impl Display for UnknownSearchKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown search kind `{}`; expected title|category|tags",
            self.0
        )
    }
}

impl Error for UnknownSearchKind {}

impl FromStr for SearchKind {
    type Err = UnknownSearchKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "title" => Ok(Self::Title),
            "category" => Ok(Self::Category),
            "tags" => Ok(Self::Tags),
            other => Err(UnknownSearchKind(other.to_string())),
        }
    }
}

/// Result ordering for full searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectOrder {
    /// Insertion order.
    #[default]
    Default,
    /// Most votes first.
    Popularity,
    /// Oldest first.
    Date,
}

impl ProjectOrder {
    /// Maps a sort keyword; anything unrecognized means no explicit sort.
    pub fn from_keyword(value: &str) -> Self {
        match value {
            "popularity" => Self::Popularity,
            "date" => Self::Date,
            _ => Self::Default,
        }
    }

    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Default => " ORDER BY projects.seq ASC",
            Self::Popularity => " ORDER BY projects.votes_count DESC, projects.seq ASC",
            Self::Date => " ORDER BY projects.created_at ASC, projects.seq ASC",
        }
    }
}

/// Conjunction of optional predicates over projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub title_contains: Option<String>,
    pub category: Option<String>,
    /// Matches when any of these tags is present. An empty list matches nothing.
    pub any_tag: Option<Vec<String>>,
    pub owner: Option<UserId>,
    pub voter: Option<UserId>,
    pub contributor: Option<UserId>,
}

/// A list query: filter plus ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectQuery {
    pub filter: ProjectFilter,
    pub order: ProjectOrder,
}

impl ProjectQuery {
    /// Single-field search as used by the keyword search box.
    pub fn by_field(kind: SearchKind, keywords: &str) -> Self {
        let mut filter = ProjectFilter::default();
        match kind {
            SearchKind::Title => filter.title_contains = Some(keywords.to_string()),
            SearchKind::Category => filter.category = Some(keywords.to_string()),
            SearchKind::Tags => filter.any_tag = Some(tag_tokens(keywords)),
        }
        Self {
            filter,
            order: ProjectOrder::Default,
        }
    }

    /// Title substring plus optional category, with an explicit order.
    pub fn full_search(title: &str, category: &str, order: ProjectOrder) -> Self {
        let category = if is_any_category(category) {
            None
        } else {
            Some(category.to_string())
        };
        Self {
            filter: ProjectFilter {
                title_contains: Some(title.to_string()),
                category,
                ..ProjectFilter::default()
            },
            order,
        }
    }

    pub fn owned_by(owner: UserId) -> Self {
        Self {
            filter: ProjectFilter {
                owner: Some(owner),
                ..ProjectFilter::default()
            },
            order: ProjectOrder::Default,
        }
    }

    pub fn voted_by(user: UserId) -> Self {
        Self {
            filter: ProjectFilter {
                voter: Some(user),
                ..ProjectFilter::default()
            },
            order: ProjectOrder::Default,
        }
    }

    pub fn contributed_by(user: UserId) -> Self {
        Self {
            filter: ProjectFilter {
                contributor: Some(user),
                ..ProjectFilter::default()
            },
            order: ProjectOrder::Default,
        }
    }
}

impl ProjectFilter {
    /// Renders `AND ...` clauses (to follow `WHERE 1 = 1`) and their bindings.
    pub(crate) fn sql_clauses(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut bind_values = Vec::new();

        if let Some(title) = self.title_contains.as_ref() {
            sql.push_str(" AND instr(projects.title, ?) > 0");
            bind_values.push(Value::Text(title.clone()));
        }

        if let Some(category) = self.category.as_ref() {
            sql.push_str(" AND projects.category = ?");
            bind_values.push(Value::Text(category.clone()));
        }

        if let Some(tags) = self.any_tag.as_ref() {
            if tags.is_empty() {
                sql.push_str(" AND 0 = 1");
            } else {
                sql.push_str(&format!(
                    " AND EXISTS (
                        SELECT 1
                        FROM project_tags pt
                        WHERE pt.project_uuid = projects.uuid
                          AND pt.tag IN ({})
                    )",
                    placeholders(tags.len())
                ));
                bind_values.extend(tags.iter().cloned().map(Value::Text));
            }
        }

        if let Some(owner) = self.owner {
            sql.push_str(" AND projects.owner_uuid = ?");
            bind_values.push(Value::Text(owner.to_string()));
        }

        if let Some(voter) = self.voter {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM project_votes pv
                    WHERE pv.project_uuid = projects.uuid
                      AND pv.user_uuid = ?
                )",
            );
            bind_values.push(Value::Text(voter.to_string()));
        }

        if let Some(contributor) = self.contributor {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM project_contributions pc
                    WHERE pc.project_uuid = projects.uuid
                      AND pc.user_uuid = ?
                )",
            );
            bind_values.push(Value::Text(contributor.to_string()));
        }

        (sql, bind_values)
    }
}

/// Splits tag keywords on whitespace and lowercases every token.
pub fn tag_tokens(keywords: &str) -> Vec<String> {
    keywords
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// Whether a category value is the "no category filter" sentinel.
pub fn is_any_category(category: &str) -> bool {
    let trimmed = category.trim();
    ANY_CATEGORY_SENTINELS
        .iter()
        .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
