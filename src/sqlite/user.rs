//! `SQLite` implementation of [`UserRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::repository::{CreateUser, UserRepository};
use crate::types::OrgUser;
use crate::InviteError;

/// `SQLite`-backed user repository.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: String,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<UserRecord> for OrgUser {
    fn from(row: UserRecord) -> Self {
        OrgUser {
            id: row.id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create(&self, data: CreateUser) -> Result<OrgUser, InviteError> {
        let row: UserRecord = sqlx::query_as(
            r"
            INSERT INTO users (id, name, email, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, email, created_at
            ",
        )
        .bind(&data.id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"create_user\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: &str) -> Result<Option<OrgUser>, InviteError> {
        let row: Option<UserRecord> =
            sqlx::query_as("SELECT id, name, email, created_at FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    log::error!(target: "anteroom", "msg=\"database error\", operation=\"find_user_by_id\", error=\"{e}\"");
                    InviteError::DatabaseError(e.to_string())
                })?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_email(&self, email: &str) -> Result<Option<OrgUser>, InviteError> {
        let row: Option<UserRecord> =
            sqlx::query_as("SELECT id, name, email, created_at FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    log::error!(target: "anteroom", "msg=\"database error\", operation=\"find_user_by_email\", error=\"{e}\"");
                    InviteError::DatabaseError(e.to_string())
                })?;

        Ok(row.map(Into::into))
    }
}
