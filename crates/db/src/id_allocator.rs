//! Surrogate key allocation for entity tables.
//!
//! Keys come from `id_allocations`, a per-table high-water mark. The first
//! allocation for a table starts at `max(id) + 1` (or 1 when empty), and every
//! later one is strictly greater than any key ever handed out, so a deleted
//! maximum key is never reissued.
//!
//! The allocation is one upsert statement. Call it on the same transaction as
//! the insert that consumes the key: SQLite serialises writers, so two
//! concurrent creates can no longer observe the same maximum.

use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite};
use strum_macros::{Display, EnumString};
use tracing::debug;

/// Tables whose keys are allocated by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityTable {
    Tasks,
    Users,
    Roles,
    Tags,
}

impl EntityTable {
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Users => "users",
            Self::Roles => "roles",
            Self::Tags => "tags",
        }
    }
}

pub async fn next_id<'e, E>(executor: E, table: EntityTable) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    // Table names come from the closed enum above, never from callers.
    let sql = format!(
        r#"INSERT INTO id_allocations (entity, last_id)
           VALUES ($1, (SELECT COALESCE(MAX(id), 0) FROM {table}) + 1)
           ON CONFLICT(entity) DO UPDATE SET
               last_id = MAX(id_allocations.last_id, (SELECT COALESCE(MAX(id), 0) FROM {table})) + 1
           RETURNING last_id"#,
        table = table.table_name()
    );
    let id: i64 = sqlx::query_scalar(&sql)
        .bind(table.table_name())
        .fetch_one(executor)
        .await?;
    debug!(table = %table, id, "Allocated surrogate key");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn test_sequential_allocation_starts_at_one() {
        let db = DBService::new_in_memory().await.unwrap();

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(next_id(&db.pool, EntityTable::Roles).await.unwrap());
        }

        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_allocation_continues_after_existing_rows() {
        let db = DBService::new_in_memory().await.unwrap();
        sqlx::query("INSERT INTO tags (id, name) VALUES (41, 'legacy')")
            .execute(&db.pool)
            .await
            .unwrap();

        assert_eq!(next_id(&db.pool, EntityTable::Tags).await.unwrap(), 42);
        assert_eq!(next_id(&db.pool, EntityTable::Tags).await.unwrap(), 43);
    }

    #[tokio::test]
    async fn test_deleted_max_key_is_not_reused() {
        let db = DBService::new_in_memory().await.unwrap();

        let first = next_id(&db.pool, EntityTable::Roles).await.unwrap();
        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, 'admin')")
            .bind(first)
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(first)
            .execute(&db.pool)
            .await
            .unwrap();

        let second = next_id(&db.pool, EntityTable::Roles).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_tables_allocate_independently() {
        let db = DBService::new_in_memory().await.unwrap();

        assert_eq!(next_id(&db.pool, EntityTable::Users).await.unwrap(), 1);
        assert_eq!(next_id(&db.pool, EntityTable::Users).await.unwrap(), 2);
        assert_eq!(next_id(&db.pool, EntityTable::Tasks).await.unwrap(), 1);
    }

    #[test]
    fn test_entity_table_parses_from_snake_case() {
        assert_eq!("tasks".parse::<EntityTable>().unwrap(), EntityTable::Tasks);
        assert_eq!(EntityTable::Users.to_string(), "users");
    }
}
