//! One-to-many rollups: parent rows plus the summaries of their linked children.
//!
//! Children are fetched in bounded chunks keyed by the parent key set and
//! folded in memory. The link is inner-joined to the child table, so links to
//! rows that no longer exist never surface, and a parent without links gets an
//! empty list rather than a placeholder entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use ts_rs::TS;

/// Upper bound on bound parameters per child query.
const PARENT_CHUNK: usize = 500;

/// `{ id, name }` of one associated child row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ChildSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChildRow {
    pub parent_id: i64,
    pub id: i64,
    pub name: String,
}

/// A many-to-many link table and the child table it points into.
#[derive(Debug, Clone, Copy)]
pub struct Association {
    pub link_table: &'static str,
    pub parent_column: &'static str,
    pub child_column: &'static str,
    pub child_table: &'static str,
    pub label_column: &'static str,
}

pub const USER_ROLES: Association = Association {
    link_table: "user_roles",
    parent_column: "user_id",
    child_column: "role_id",
    child_table: "roles",
    label_column: "name",
};

pub const TASK_TAGS: Association = Association {
    link_table: "task_tags",
    parent_column: "task_id",
    child_column: "tag_id",
    child_table: "tags",
    label_column: "name",
};

impl Association {
    /// Child summaries for every key in `parent_ids`. Keys without links are
    /// absent from the map; use [`attach`] to give them an empty list.
    pub async fn fetch(
        &self,
        conn: &mut SqliteConnection,
        parent_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<ChildSummary>>, sqlx::Error> {
        let mut rows = Vec::new();
        for chunk in parent_ids.chunks(PARENT_CHUNK) {
            let mut qb = self.child_query(chunk);
            rows.extend(qb.build_query_as::<ChildRow>().fetch_all(&mut *conn).await?);
        }
        Ok(fold_children(rows))
    }

    fn child_query(&self, parent_ids: &[i64]) -> QueryBuilder<'static, Sqlite> {
        let mut qb: QueryBuilder<'static, Sqlite> = QueryBuilder::new(format!(
            "SELECT l.{parent} AS parent_id, c.id AS id, c.{label} AS name \
             FROM {link} l JOIN {child} c ON c.id = l.{child_col} \
             WHERE l.{parent} IN (",
            parent = self.parent_column,
            label = self.label_column,
            link = self.link_table,
            child = self.child_table,
            child_col = self.child_column,
        ));
        {
            let mut keys = qb.separated(", ");
            for id in parent_ids {
                keys.push_bind(*id);
            }
        }
        qb.push(")");
        qb
    }
}

/// Group child rows by parent, dropping repeated children, ordered by child key.
pub fn fold_children(rows: impl IntoIterator<Item = ChildRow>) -> HashMap<i64, Vec<ChildSummary>> {
    let mut grouped: HashMap<i64, Vec<ChildSummary>> = HashMap::new();
    for row in rows {
        let children = grouped.entry(row.parent_id).or_default();
        if !children.iter().any(|c| c.id == row.id) {
            children.push(ChildSummary {
                id: row.id,
                name: row.name,
            });
        }
    }
    for children in grouped.values_mut() {
        children.sort_by_key(|c| c.id);
    }
    grouped
}

/// Pair each parent with its children, keeping the parents' order.
pub fn attach<P>(
    parents: Vec<P>,
    key: impl Fn(&P) -> i64,
    mut children: HashMap<i64, Vec<ChildSummary>>,
) -> Vec<(P, Vec<ChildSummary>)> {
    parents
        .into_iter()
        .map(|parent| {
            let list = children.remove(&key(&parent)).unwrap_or_default();
            (parent, list)
        })
        .collect()
}
