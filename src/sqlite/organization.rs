//! `SQLite` implementation of [`OrganizationRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::repository::{CreateOrganization, OrganizationRepository};
use crate::types::Organization;
use crate::InviteError;

/// `SQLite`-backed organization repository.
#[derive(Clone)]
pub struct SqliteOrganizationRepository {
    pool: SqlitePool,
}

impl SqliteOrganizationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct OrganizationRecord {
    id: String,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRecord> for Organization {
    fn from(row: OrganizationRecord) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl OrganizationRepository for SqliteOrganizationRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create(&self, data: CreateOrganization) -> Result<Organization, InviteError> {
        let row: OrganizationRecord = sqlx::query_as(
            r"
            INSERT INTO organizations (id, name, slug, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, slug, created_at
            ",
        )
        .bind(&data.id)
        .bind(&data.name)
        .bind(&data.slug)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"create_organization\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>, InviteError> {
        let row: Option<OrganizationRecord> =
            sqlx::query_as("SELECT id, name, slug, created_at FROM organizations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    log::error!(target: "anteroom", "msg=\"database error\", operation=\"find_organization_by_id\", error=\"{e}\"");
                    InviteError::DatabaseError(e.to_string())
                })?;

        Ok(row.map(Into::into))
    }
}
