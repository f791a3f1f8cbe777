//! `SQLite` implementation of [`MembershipRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::repository::{CreateMembership, MembershipRepository};
use crate::types::Membership;
use crate::InviteError;

/// `SQLite`-backed membership repository.
///
/// The `UNIQUE(organization_id, user_id)` index is the authoritative
/// guard against duplicate memberships; a violation surfaces as
/// [`InviteError::AlreadyMember`] so concurrent accepts converge on one
/// row.
#[derive(Clone)]
pub struct SqliteMembershipRepository {
    pool: SqlitePool,
}

impl SqliteMembershipRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct MembershipRecord {
    id: String,
    organization_id: String,
    user_id: String,
    role_id: String,
    created_at: DateTime<Utc>,
}

impl From<MembershipRecord> for Membership {
    fn from(row: MembershipRecord) -> Self {
        Membership {
            id: row.id,
            organization_id: row.organization_id,
            user_id: row.user_id,
            role_id: row.role_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl MembershipRepository for SqliteMembershipRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create(&self, data: CreateMembership) -> Result<Membership, InviteError> {
        let row: MembershipRecord = sqlx::query_as(
            r"
            INSERT INTO memberships (id, organization_id, user_id, role_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, organization_id, user_id, role_id, created_at
            ",
        )
        .bind(&data.id)
        .bind(&data.organization_id)
        .bind(&data.user_id)
        .bind(&data.role_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                return InviteError::AlreadyMember;
            }
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"create_membership\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_org_and_user(
        &self,
        organization_id: &str,
        user_id: &str,
    ) -> Result<Option<Membership>, InviteError> {
        let row: Option<MembershipRecord> = sqlx::query_as(
            r"
            SELECT id, organization_id, user_id, role_id, created_at
            FROM memberships
            WHERE organization_id = ? AND user_id = ?
            ",
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"find_membership\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(Into::into))
    }
}
