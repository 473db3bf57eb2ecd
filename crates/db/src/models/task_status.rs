use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;

/// Status assigned to new tasks when the caller gives none (`pending`).
pub const INITIAL_STATUS_ID: i64 = 1;

/// Row of the `task_statuses` reference table. Any transition between
/// existing codes is allowed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize, TS)]
pub struct TaskStatus {
    pub id: i64,
    pub name: String,
}

impl TaskStatus {
    pub async fn find_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, TaskStatus>("SELECT id, name FROM task_statuses ORDER BY id ASC")
            .fetch_all(executor)
            .await
    }

    pub async fn exists<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM task_statuses WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn test_reference_codes_are_seeded() {
        let db = DBService::new_in_memory().await.unwrap();

        let statuses = TaskStatus::find_all(&db.pool).await.unwrap();
        let names: Vec<&str> = statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["pending", "in_progress", "completed", "cancelled"]);
        assert_eq!(statuses[0].id, INITIAL_STATUS_ID);
        assert!(!TaskStatus::exists(&db.pool, 99).await.unwrap());
    }
}
