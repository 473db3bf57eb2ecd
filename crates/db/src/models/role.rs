use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize, TS)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateRole {
    pub name: Option<String>,
}

impl Role {
    pub async fn find_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY name ASC")
            .fetch_all(executor)
            .await
    }

    pub async fn exists<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    pub async fn create<'e, E>(executor: E, id: i64, name: &str) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Role>("INSERT INTO roles (id, name) VALUES ($1, $2) RETURNING id, name")
            .bind(id)
            .bind(name)
            .fetch_one(executor)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("DELETE FROM roles WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}
