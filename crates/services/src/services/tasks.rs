//! Service for task persistence: creation with defaults, partial updates, and tag rollups.

use chrono::{Local, NaiveDate};
use db::{
    id_allocator::{EntityTable, next_id},
    models::{
        tag::Tag,
        task::{CreateTask, NewTask, Task, TaskFilter, TaskWithTags, UpdateTask},
        task_status::{INITIAL_STATUS_ID, TaskStatus},
        user::User,
    },
    partial_update::{PartialUpdate, UnknownFieldPolicy, build_update, parse_fields},
};
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::entity_error::{EntityError, required_text, supplied_text};

#[derive(Clone)]
pub struct TaskService {
    pool: SqlitePool,
    unknown_fields: UnknownFieldPolicy,
}

impl TaskService {
    pub fn new(pool: SqlitePool, unknown_fields: UnknownFieldPolicy) -> Self {
        Self {
            pool,
            unknown_fields,
        }
    }

    /// All tasks, most recent assignment first.
    pub async fn list(&self) -> Result<Vec<TaskWithTags>, EntityError> {
        let mut conn = self.pool.acquire().await?;
        let tasks = TaskWithTags::find(&mut conn, TaskFilter::All).await?;
        debug!(count = tasks.len(), "Listed tasks");
        Ok(tasks)
    }

    /// An owner's tasks: incomplete first, then most recent assignment.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<TaskWithTags>, EntityError> {
        let mut conn = self.pool.acquire().await?;
        Ok(TaskWithTags::find(&mut conn, TaskFilter::Owner(owner_id)).await?)
    }

    pub async fn get(&self, id: i64) -> Result<TaskWithTags, EntityError> {
        let mut conn = self.pool.acquire().await?;
        Self::find_one(&mut conn, id).await
    }

    pub async fn create(&self, data: CreateTask) -> Result<Task, EntityError> {
        let new_task = prepare_create(data, today())?;

        let mut tx = self.pool.begin().await?;
        // Allocate first so the transaction takes the write lock before any read.
        let id = next_id(&mut *tx, EntityTable::Tasks).await?;
        if !User::exists(&mut *tx, new_task.owner_id).await? {
            return Err(EntityError::validation(format!(
                "owner {} does not exist",
                new_task.owner_id
            )));
        }
        if !TaskStatus::exists(&mut *tx, new_task.status_id).await? {
            return Err(EntityError::validation(format!(
                "status {} does not exist",
                new_task.status_id
            )));
        }
        let task = Task::create(&mut *tx, id, &new_task).await?;
        tx.commit().await?;

        info!(task_id = task.id, owner_id = task.owner_id, "Created task");
        Ok(task)
    }

    /// Applies only the supplied fields. Unrecognised names follow the configured policy.
    pub async fn update(&self, id: i64, fields: &Map<String, Value>) -> Result<Task, EntityError> {
        let mut changes: UpdateTask = parse_fields(fields, self.unknown_fields)?;
        changes.description = supplied_text(changes.description, "description")?;
        let owner_id = changes.owner_id;
        let status_id = changes.status_id;
        let mut query = build_update(UpdateTask::TABLE, id, changes.into_assignments())?;

        let mut conn = self.pool.acquire().await?;
        if !Task::exists(&mut *conn, id).await? {
            return Err(EntityError::not_found("task", id));
        }
        if let Some(owner_id) = owner_id {
            if !User::exists(&mut *conn, owner_id).await? {
                return Err(EntityError::validation(format!("owner {owner_id} does not exist")));
            }
        }
        if let Some(status_id) = status_id {
            if !TaskStatus::exists(&mut *conn, status_id).await? {
                return Err(EntityError::validation(format!("status {status_id} does not exist")));
            }
        }

        let task = query
            .build_query_as::<Task>()
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| EntityError::not_found("task", id))?;

        info!(task_id = id, "Updated task");
        Ok(task)
    }

    pub async fn delete(&self, id: i64) -> Result<(), EntityError> {
        Task::delete(&self.pool, id)
            .await?
            .ok_or_else(|| EntityError::not_found("task", id))?;
        info!(task_id = id, "Deleted task");
        Ok(())
    }

    pub async fn add_tag(&self, task_id: i64, tag_id: i64) -> Result<TaskWithTags, EntityError> {
        let mut conn = self.pool.acquire().await?;
        Self::ensure_linkable(&mut conn, task_id, tag_id).await?;
        if Task::add_tag(&mut *conn, task_id, tag_id).await? {
            info!(task_id, tag_id, "Tagged task");
        }
        Self::find_one(&mut conn, task_id).await
    }

    pub async fn remove_tag(&self, task_id: i64, tag_id: i64) -> Result<TaskWithTags, EntityError> {
        let mut conn = self.pool.acquire().await?;
        Self::ensure_linkable(&mut conn, task_id, tag_id).await?;
        if Task::remove_tag(&mut *conn, task_id, tag_id).await? {
            info!(task_id, tag_id, "Untagged task");
        }
        Self::find_one(&mut conn, task_id).await
    }

    async fn ensure_linkable(
        conn: &mut SqliteConnection,
        task_id: i64,
        tag_id: i64,
    ) -> Result<(), EntityError> {
        if !Task::exists(&mut *conn, task_id).await? {
            return Err(EntityError::not_found("task", task_id));
        }
        if !Tag::exists(&mut *conn, tag_id).await? {
            return Err(EntityError::not_found("tag", tag_id));
        }
        Ok(())
    }

    async fn find_one(conn: &mut SqliteConnection, id: i64) -> Result<TaskWithTags, EntityError> {
        TaskWithTags::find(conn, TaskFilter::Key(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EntityError::not_found("task", id))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Checks required fields and fills defaults; runs before any statement.
fn prepare_create(data: CreateTask, today: NaiveDate) -> Result<NewTask, EntityError> {
    let owner_id = data
        .owner_id
        .ok_or_else(|| EntityError::validation("owner_id is required"))?;
    let description = required_text(data.description, "description")?;
    let assigned_on = match data.assigned_on.as_deref().map(str::trim) {
        None | Some("") => today,
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            EntityError::validation(format!("assigned_on must be YYYY-MM-DD, got {raw:?}"))
        })?,
    };

    Ok(NewTask {
        owner_id,
        description,
        status_id: data.status_id.unwrap_or(INITIAL_STATUS_ID),
        assigned_on,
    })
}
