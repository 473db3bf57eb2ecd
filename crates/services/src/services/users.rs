//! Service for users, their role grants, and credential lookup.

use db::{
    id_allocator::{EntityTable, next_id},
    models::{
        role::Role,
        task::Task,
        user::{
            CreateUser, Credentials, UpdateUser, User, UserFilter, UserWithRoles, hash_secret,
        },
    },
    partial_update::{PartialUpdate, UnknownFieldPolicy, build_update, parse_fields},
};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::entity_error::{EntityError, required_text, supplied_text};

#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
    unknown_fields: UnknownFieldPolicy,
}

impl UserService {
    pub fn new(pool: SqlitePool, unknown_fields: UnknownFieldPolicy) -> Self {
        Self {
            pool,
            unknown_fields,
        }
    }

    pub async fn list(&self) -> Result<Vec<UserWithRoles>, EntityError> {
        let mut conn = self.pool.acquire().await?;
        let users = UserWithRoles::find(&mut conn, &UserFilter::All).await?;
        debug!(count = users.len(), "Listed users");
        Ok(users)
    }

    pub async fn get(&self, id: i64) -> Result<UserWithRoles, EntityError> {
        let mut conn = self.pool.acquire().await?;
        Self::find_one(&mut conn, id).await
    }

    pub async fn create(&self, data: CreateUser) -> Result<UserWithRoles, EntityError> {
        let document = required_text(data.document, "document")?;
        let name = required_text(data.name, "name")?;
        let secret = data
            .secret
            .filter(|s| !s.expose_secret().is_empty())
            .ok_or_else(|| EntityError::validation("secret is required"))?;
        let email = data
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        let role_ids = data.role_ids.unwrap_or_default();

        let mut tx = self.pool.begin().await?;
        let id = next_id(&mut *tx, EntityTable::Users).await?;
        for role_id in &role_ids {
            if !Role::exists(&mut *tx, *role_id).await? {
                return Err(EntityError::validation(format!("role {role_id} does not exist")));
            }
        }
        User::create(
            &mut *tx,
            id,
            &document,
            &name,
            email.as_deref(),
            &hash_secret(&secret),
        )
        .await?;
        for role_id in &role_ids {
            User::grant_role(&mut *tx, id, *role_id).await?;
        }
        let user = Self::find_one(&mut tx, id).await?;
        tx.commit().await?;

        info!(user_id = id, roles = role_ids.len(), "Created user");
        Ok(user)
    }

    pub async fn update(
        &self,
        id: i64,
        fields: &Map<String, Value>,
    ) -> Result<UserWithRoles, EntityError> {
        let mut changes: UpdateUser = parse_fields(fields, self.unknown_fields)?;
        changes.document = supplied_text(changes.document, "document")?;
        changes.name = supplied_text(changes.name, "name")?;
        changes.email = supplied_text(changes.email, "email")?;
        if changes
            .secret
            .as_ref()
            .is_some_and(|s| s.expose_secret().is_empty())
        {
            return Err(EntityError::validation("secret must not be blank"));
        }
        let mut query = build_update(UpdateUser::TABLE, id, changes.into_assignments())?;

        let mut conn = self.pool.acquire().await?;
        if !User::exists(&mut *conn, id).await? {
            return Err(EntityError::not_found("user", id));
        }
        query
            .build_query_as::<User>()
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| EntityError::not_found("user", id))?;

        info!(user_id = id, "Updated user");
        Self::find_one(&mut conn, id).await
    }

    /// Users that still own tasks are kept; their tasks must be removed or reassigned first.
    pub async fn delete(&self, id: i64) -> Result<(), EntityError> {
        let mut conn = self.pool.acquire().await?;
        if !User::exists(&mut *conn, id).await? {
            return Err(EntityError::not_found("user", id));
        }
        if Task::any_owned_by(&mut *conn, id).await? {
            return Err(EntityError::validation(format!("user {id} still owns tasks")));
        }
        User::delete(&mut *conn, id)
            .await?
            .ok_or_else(|| EntityError::not_found("user", id))?;
        info!(user_id = id, "Deleted user");
        Ok(())
    }

    pub async fn grant_role(&self, user_id: i64, role_id: i64) -> Result<UserWithRoles, EntityError> {
        let mut conn = self.pool.acquire().await?;
        Self::ensure_linkable(&mut conn, user_id, role_id).await?;
        if User::grant_role(&mut *conn, user_id, role_id).await? {
            info!(user_id, role_id, "Granted role");
        }
        Self::find_one(&mut conn, user_id).await
    }

    pub async fn revoke_role(&self, user_id: i64, role_id: i64) -> Result<UserWithRoles, EntityError> {
        let mut conn = self.pool.acquire().await?;
        Self::ensure_linkable(&mut conn, user_id, role_id).await?;
        if User::revoke_role(&mut *conn, user_id, role_id).await? {
            info!(user_id, role_id, "Revoked role");
        }
        Self::find_one(&mut conn, user_id).await
    }

    /// Resolves a document/secret pair to the user and their roles. A wrong
    /// document and a wrong secret produce the same error.
    pub async fn authenticate(&self, credentials: Credentials) -> Result<UserWithRoles, EntityError> {
        let filter = UserFilter::Credentials {
            document: credentials.document.trim().to_string(),
            secret_hash: hash_secret(&credentials.secret),
        };
        let mut conn = self.pool.acquire().await?;
        // `document` is unique, so at most one row can match.
        match UserWithRoles::find(&mut conn, &filter).await?.into_iter().next() {
            Some(user) => {
                info!(user_id = user.id, "User authenticated");
                Ok(user)
            }
            None => {
                warn!("Authentication failed");
                Err(EntityError::Authentication)
            }
        }
    }

    async fn ensure_linkable(
        conn: &mut SqliteConnection,
        user_id: i64,
        role_id: i64,
    ) -> Result<(), EntityError> {
        if !User::exists(&mut *conn, user_id).await? {
            return Err(EntityError::not_found("user", user_id));
        }
        if !Role::exists(&mut *conn, role_id).await? {
            return Err(EntityError::not_found("role", role_id));
        }
        Ok(())
    }

    async fn find_one(conn: &mut SqliteConnection, id: i64) -> Result<UserWithRoles, EntityError> {
        UserWithRoles::find(conn, &UserFilter::Key(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EntityError::not_found("user", id))
    }
}
