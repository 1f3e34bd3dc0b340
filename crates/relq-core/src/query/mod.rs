//! The fluent query surface.

mod builder;
mod select;

use serde::{Deserialize, Serialize};

pub use builder::Query;
pub use select::ProjectedQuery;

/// How an included navigation is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `LEFT JOIN` (the default for includes).
    Left,
    /// `INNER JOIN`.
    Inner,
}

impl JoinKind {
    /// The SQL join keyword.
    pub fn sql(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Inner => "INNER JOIN",
        }
    }
}

/// A registered navigation include.
///
/// Held in an ordered set inside the query builder; re-including the same
/// navigation replaces the previous entry rather than duplicating it.
#[derive(Debug, Clone)]
pub struct IncludeSpec {
    /// Logical navigation property name (also the join alias).
    pub property: String,
    /// Allow-list of target members to project; empty means all mapped
    /// members.
    pub fields: Vec<String>,
    /// Join shape.
    pub join: JoinKind,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// One page of results plus the total matching row count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingResult<T> {
    /// Total rows matching the query across all pages.
    pub record_count: i64,
    /// The requested page.
    pub items: Vec<T>,
}
