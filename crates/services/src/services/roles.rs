//! Service for the role catalogue granted to users.

use db::{
    id_allocator::{EntityTable, next_id},
    models::role::{CreateRole, Role},
};
use sqlx::SqlitePool;
use tracing::info;

use super::entity_error::{EntityError, required_text};

#[derive(Clone)]
pub struct RoleService {
    pool: SqlitePool,
}

impl RoleService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Role>, EntityError> {
        Ok(Role::find_all(&self.pool).await?)
    }

    pub async fn create(&self, data: CreateRole) -> Result<Role, EntityError> {
        let name = required_text(data.name, "name")?;

        let mut tx = self.pool.begin().await?;
        let id = next_id(&mut *tx, EntityTable::Roles).await?;
        let role = Role::create(&mut *tx, id, &name).await?;
        tx.commit().await?;

        info!(role_id = role.id, name = %role.name, "Created role");
        Ok(role)
    }

    /// Removing a role also drops every grant of it.
    pub async fn delete(&self, id: i64) -> Result<(), EntityError> {
        Role::delete(&self.pool, id)
            .await?
            .ok_or_else(|| EntityError::not_found("role", id))?;
        info!(role_id = id, "Deleted role");
        Ok(())
    }
}
