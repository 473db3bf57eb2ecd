use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqliteConnection};
use ts_rs::TS;

use crate::{
    id_allocator::EntityTable,
    partial_update::{Assignment, FieldValue, PartialUpdate, push_present},
    rollup::{self, ChildSummary, USER_ROLES},
};

const USER_COLUMNS: &str = "id, document, name, email, secret_hash, created_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: i64,
    pub document: String, // Login identifier, unique
    pub name: String,
    pub email: Option<String>,
    #[serde(skip)]
    #[ts(skip)]
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A user rolled up with the roles granted to them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UserWithRoles {
    #[serde(flatten)]
    #[ts(flatten)]
    pub user: User,
    pub roles: Vec<ChildSummary>,
}

impl std::ops::Deref for UserWithRoles {
    type Target = User;
    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateUser {
    pub document: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "optional_secret")]
    #[ts(type = "string | null")]
    pub secret: Option<SecretString>,
    pub role_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateUser {
    pub document: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "optional_secret")]
    #[ts(type = "string | null")]
    pub secret: Option<SecretString>,
}

impl PartialUpdate for UpdateUser {
    const TABLE: EntityTable = EntityTable::Users;
    const FIELDS: &'static [&'static str] = &["document", "name", "email", "secret"];

    fn into_assignments(self) -> Vec<Assignment> {
        let mut assignments = Vec::new();
        push_present(&mut assignments, "document", self.document, FieldValue::Text);
        push_present(&mut assignments, "name", self.name, FieldValue::Text);
        push_present(&mut assignments, "email", self.email, FieldValue::Text);
        push_present(
            &mut assignments,
            "secret_hash",
            self.secret.map(|s| hash_secret(&s)),
            FieldValue::Text,
        );
        assignments
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct Credentials {
    pub document: String,
    #[serde(deserialize_with = "secret")]
    #[ts(type = "string")]
    pub secret: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Key(i64),
    /// Both fields must match the same row.
    Credentials { document: String, secret_hash: String },
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Option::<String>::deserialize(deserializer).map(|s| s.map(SecretString::from))
}

/// Hex SHA-256 of a secret; only hashes are stored or compared.
pub fn hash_secret(secret: &SecretString) -> String {
    format!("{:x}", Sha256::digest(secret.expose_secret().as_bytes()))
}

impl User {
    pub async fn find<'e, E>(executor: E, filter: &UserFilter) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        qb.push(USER_COLUMNS);
        qb.push(" FROM users");
        match filter {
            UserFilter::All => {}
            UserFilter::Key(id) => {
                qb.push(" WHERE id = ");
                qb.push_bind(*id);
            }
            UserFilter::Credentials {
                document,
                secret_hash,
            } => {
                qb.push(" WHERE document = ");
                qb.push_bind(document.clone());
                qb.push(" AND secret_hash = ");
                qb.push_bind(secret_hash.clone());
            }
        }
        qb.push(" ORDER BY id ASC");
        qb.build_query_as::<User>().fetch_all(executor).await
    }

    pub async fn exists<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: i64,
        document: &str,
        name: &str,
        email: Option<&str>,
        secret_hash: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            r#"INSERT INTO users (id, document, name, email, secret_hash)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {USER_COLUMNS}"#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(document)
            .bind(name)
            .bind(email)
            .bind(secret_hash)
            .fetch_one(executor)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("DELETE FROM users WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Returns false when the role was already granted.
    pub async fn grant_role<'e, E>(executor: E, user_id: i64, role_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_role<'e, E>(executor: E, user_id: i64, role_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl UserWithRoles {
    pub async fn find(
        conn: &mut SqliteConnection,
        filter: &UserFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let users = User::find(&mut *conn, filter).await?;
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let roles = USER_ROLES.fetch(conn, &ids).await?;

        Ok(rollup::attach(users, |u| u.id, roles)
            .into_iter()
            .map(|(user, roles)| UserWithRoles { user, roles })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_secret_is_stable_hex() {
        let a = hash_secret(&SecretString::from("hunter2".to_string()));
        let b = hash_secret(&SecretString::from("hunter2".to_string()));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_secret(&SecretString::from("hunter3".to_string())));
    }

    #[test]
    fn test_serialized_user_omits_secret_hash() {
        let user = User {
            id: 1,
            document: "D1".to_string(),
            name: "Ana".to_string(),
            email: None,
            secret_hash: "abc".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("secret_hash").is_none());
        assert_eq!(json["document"], "D1");
    }

    #[test]
    fn test_secret_update_assigns_hash_column() {
        let update = UpdateUser {
            secret: Some(SecretString::from("new".to_string())),
            ..Default::default()
        };
        let assignments = update.into_assignments();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].0, "secret_hash");
        assert_eq!(
            assignments[0].1,
            FieldValue::Text(hash_secret(&SecretString::from("new".to_string())))
        );
    }
}
