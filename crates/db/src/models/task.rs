use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqliteConnection};
use ts_rs::TS;

use crate::{
    id_allocator::EntityTable,
    partial_update::{Assignment, FieldValue, PartialUpdate, push_present},
    rollup::{self, ChildSummary, TASK_TAGS},
};

const TASK_COLUMNS: &str = "id, owner_id, description, status_id, assigned_on, completed, created_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: i64,
    pub owner_id: i64,        // Foreign key to User
    pub description: String,
    pub status_id: i64,       // Foreign key to TaskStatus
    pub assigned_on: NaiveDate,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A task rolled up with the tags linked to it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskWithTags {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub tags: Vec<ChildSummary>,
}

impl std::ops::Deref for TaskWithTags {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

/// Create request as received from callers; every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub owner_id: Option<i64>,
    pub description: Option<String>,
    pub status_id: Option<i64>,
    /// `YYYY-MM-DD`; blank or missing means today.
    pub assigned_on: Option<String>,
}

/// A create request with defaults applied and required fields checked.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub owner_id: i64,
    pub description: String,
    pub status_id: i64,
    pub assigned_on: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateTask {
    pub description: Option<String>,
    pub owner_id: Option<i64>,
    pub status_id: Option<i64>,
    pub assigned_on: Option<NaiveDate>,
    pub completed: Option<bool>,
}

impl PartialUpdate for UpdateTask {
    const TABLE: EntityTable = EntityTable::Tasks;
    const FIELDS: &'static [&'static str] =
        &["description", "owner_id", "status_id", "assigned_on", "completed"];

    fn into_assignments(self) -> Vec<Assignment> {
        let mut assignments = Vec::new();
        push_present(&mut assignments, "description", self.description, FieldValue::Text);
        push_present(&mut assignments, "owner_id", self.owner_id, FieldValue::Integer);
        push_present(&mut assignments, "status_id", self.status_id, FieldValue::Integer);
        push_present(&mut assignments, "assigned_on", self.assigned_on, FieldValue::Date);
        push_present(&mut assignments, "completed", self.completed, FieldValue::Bool);
        assignments
    }
}

/// Which tasks to select, and implicitly in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    /// Most recent assignment first, then highest key.
    All,
    Key(i64),
    /// Incomplete before complete, then most recent assignment, then highest key.
    Owner(i64),
}

impl Task {
    pub async fn find<'e, E>(executor: E, filter: TaskFilter) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        qb.push(TASK_COLUMNS);
        qb.push(" FROM tasks");
        match filter {
            TaskFilter::All => {
                qb.push(" ORDER BY assigned_on DESC, id DESC");
            }
            TaskFilter::Key(id) => {
                qb.push(" WHERE id = ");
                qb.push_bind(id);
            }
            TaskFilter::Owner(owner_id) => {
                qb.push(" WHERE owner_id = ");
                qb.push_bind(owner_id);
                qb.push(" ORDER BY completed ASC, assigned_on DESC, id DESC");
            }
        }
        qb.build_query_as::<Task>().fetch_all(executor).await
    }

    pub async fn exists<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    pub async fn any_owned_by<'e, E>(executor: E, owner_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM tasks WHERE owner_id = $1)")
            .bind(owner_id)
            .fetch_one(executor)
            .await
    }

    pub async fn create<'e, E>(executor: E, id: i64, data: &NewTask) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"INSERT INTO tasks (id, owner_id, description, status_id, assigned_on)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {TASK_COLUMNS}"#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(data.owner_id)
            .bind(data.description.as_str())
            .bind(data.status_id)
            .bind(data.assigned_on)
            .fetch_one(executor)
            .await
    }

    /// Deletes and returns the key, or `None` when no row matched.
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("DELETE FROM tasks WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Links a tag; returns false when the link already existed.
    pub async fn add_tag<'e, E>(executor: E, task_id: i64, tag_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("INSERT OR IGNORE INTO task_tags (task_id, tag_id) VALUES ($1, $2)")
            .bind(task_id)
            .bind(tag_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_tag<'e, E>(executor: E, task_id: i64, tag_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM task_tags WHERE task_id = $1 AND tag_id = $2")
            .bind(task_id)
            .bind(tag_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl TaskWithTags {
    pub async fn find(
        conn: &mut SqliteConnection,
        filter: TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = Task::find(&mut *conn, filter).await?;
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        let tags = TASK_TAGS.fetch(conn, &ids).await?;

        Ok(rollup::attach(tasks, |t| t.id, tags)
            .into_iter()
            .map(|(task, tags)| TaskWithTags { task, tags })
            .collect())
    }
}
