//! Service for the tag catalogue attached to tasks.

use db::{
    id_allocator::{EntityTable, next_id},
    models::tag::{CreateTag, Tag},
};
use sqlx::SqlitePool;
use tracing::info;

use super::entity_error::{EntityError, required_text};

#[derive(Clone)]
pub struct TagService {
    pool: SqlitePool,
}

impl TagService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, EntityError> {
        Ok(Tag::find_all(&self.pool).await?)
    }

    pub async fn create(&self, data: CreateTag) -> Result<Tag, EntityError> {
        let name = required_text(data.name, "name")?;

        let mut tx = self.pool.begin().await?;
        let id = next_id(&mut *tx, EntityTable::Tags).await?;
        let tag = Tag::create(&mut *tx, id, &name).await?;
        tx.commit().await?;

        info!(tag_id = tag.id, name = %tag.name, "Created tag");
        Ok(tag)
    }

    pub async fn delete(&self, id: i64) -> Result<(), EntityError> {
        Tag::delete(&self.pool, id)
            .await?
            .ok_or_else(|| EntityError::not_found("tag", id))?;
        info!(tag_id = id, "Deleted tag");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    #[tokio::test]
    async fn test_duplicate_tag_name_is_storage_error() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TagService::new(db.pool.clone());

        service
            .create(CreateTag {
                name: Some("urgent".to_string()),
            })
            .await
            .unwrap();
        let duplicate = service
            .create(CreateTag {
                name: Some("urgent".to_string()),
            })
            .await;

        assert!(matches!(duplicate, Err(EntityError::Storage(_))));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }
}
