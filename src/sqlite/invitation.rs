//! `SQLite` implementation of [`InvitationRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::repository::{CreateInvitation, InvitationRepository};
use crate::types::{Invitation, InvitationStatus};
use crate::InviteError;

const INVITATION_COLUMNS: &str =
    "id, organization_id, email, role_id, status, inviter_id, expires_at, created_at";

/// `SQLite`-backed invitation repository.
///
/// A partial unique index on `(organization_id, email) WHERE status =
/// 'pending'` backs the one-pending-invitation invariant; violations
/// surface as [`InviteError::DuplicateInvite`]. Status transitions are
/// conditional updates, so concurrent accept/reject on the same id have
/// exactly one winner.
#[derive(Clone)]
pub struct SqliteInvitationRepository {
    pool: SqlitePool,
}

impl SqliteInvitationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct InvitationRecord {
    id: String,
    organization_id: String,
    email: String,
    role_id: String,
    status: String,
    inviter_id: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvitationRecord> for Invitation {
    type Error = InviteError;

    fn try_from(row: InvitationRecord) -> Result<Self, Self::Error> {
        let status = InvitationStatus::from_str(&row.status).ok_or_else(|| {
            log::error!(
                target: "anteroom",
                "msg=\"invalid invitation status in database\", invitation_id={}, status=\"{}\"",
                row.id,
                row.status
            );
            InviteError::DatabaseError("invalid invitation status".into())
        })?;

        Ok(Invitation {
            id: row.id,
            organization_id: row.organization_id,
            email: row.email,
            role_id: row.role_id,
            status,
            inviter_id: row.inviter_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl InvitationRepository for SqliteInvitationRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create(&self, data: CreateInvitation) -> Result<Invitation, InviteError> {
        let row: InvitationRecord = sqlx::query_as(&format!(
            r"
            INSERT INTO invitations (id, organization_id, email, role_id, status, inviter_id, expires_at, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?, ?, ?)
            RETURNING {INVITATION_COLUMNS}
            ",
        ))
        .bind(&data.id)
        .bind(&data.organization_id)
        .bind(&data.email)
        .bind(&data.role_id)
        .bind(&data.inviter_id)
        .bind(data.expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                return InviteError::DuplicateInvite;
            }
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"create_invitation\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        row.try_into()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: &str) -> Result<Option<Invitation>, InviteError> {
        let row: Option<InvitationRecord> = sqlx::query_as(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"find_invitation_by_id\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_pending(
        &self,
        organization_id: &str,
        email: &str,
    ) -> Result<Option<Invitation>, InviteError> {
        let row: Option<InvitationRecord> = sqlx::query_as(&format!(
            r"
            SELECT {INVITATION_COLUMNS} FROM invitations
            WHERE organization_id = ? AND email = ? AND status = 'pending'
            LIMIT 1
            ",
        ))
        .bind(organization_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"find_pending_invitation\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn pending_by_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Invitation>, InviteError> {
        let rows: Vec<InvitationRecord> = sqlx::query_as(&format!(
            r"
            SELECT {INVITATION_COLUMNS} FROM invitations
            WHERE organization_id = ? AND status = 'pending'
            ORDER BY created_at DESC
            ",
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"pending_invitations_by_organization\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn pending_by_email(&self, email: &str) -> Result<Vec<Invitation>, InviteError> {
        let now = Utc::now();

        let rows: Vec<InvitationRecord> = sqlx::query_as(&format!(
            r"
            SELECT {INVITATION_COLUMNS} FROM invitations
            WHERE email = ? AND status = 'pending' AND expires_at > ?
            ORDER BY expires_at ASC
            ",
        ))
        .bind(email)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"pending_invitations_by_email\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn count_pending_by_email(&self, email: &str) -> Result<u64, InviteError> {
        let now = Utc::now();

        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM invitations
            WHERE email = ? AND status = 'pending' AND expires_at > ?
            ",
        )
        .bind(email)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"count_pending_invitations\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        #[allow(clippy::as_conversions)]
        Ok(count.max(0) as u64)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn transition_status(
        &self,
        id: &str,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> Result<bool, InviteError> {
        let result = sqlx::query("UPDATE invitations SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log::error!(target: "anteroom", "msg=\"database error\", operation=\"transition_invitation_status\", error=\"{e}\"");
                InviteError::DatabaseError(e.to_string())
            })?;

        Ok(result.rows_affected() == 1)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn refresh_expiry(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation, InviteError> {
        let row: InvitationRecord = sqlx::query_as(&format!(
            r"
            UPDATE invitations SET expires_at = ?
            WHERE id = ?
            RETURNING {INVITATION_COLUMNS}
            ",
        ))
        .bind(expires_at)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => InviteError::NotFound,
            _ => {
                log::error!(target: "anteroom", "msg=\"database error\", operation=\"refresh_invitation_expiry\", error=\"{e}\"");
                InviteError::DatabaseError(e.to_string())
            }
        })?;

        row.try_into()
    }
}
