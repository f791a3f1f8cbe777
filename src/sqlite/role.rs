//! `SQLite` implementation of [`RoleRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::ident::generate_id;
use crate::permissions::PermissionCode;
use crate::repository::{CreateRole, RoleRepository};
use crate::types::Role;
use crate::InviteError;

/// `SQLite`-backed role repository.
///
/// Permission bindings live in the `role_permissions` join table; the
/// closed set of permission codes is seeded into `permissions` by the
/// migrations.
#[derive(Clone)]
pub struct SqliteRoleRepository {
    pool: SqlitePool,
}

impl SqliteRoleRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct RoleRecord {
    id: String,
    organization_id: String,
    name: String,
}

impl From<RoleRecord> for Role {
    fn from(row: RoleRecord) -> Self {
        Role {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
        }
    }
}

#[async_trait]
impl RoleRepository for SqliteRoleRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create(&self, data: CreateRole) -> Result<Role, InviteError> {
        let row: RoleRecord = sqlx::query_as(
            r"
            INSERT INTO roles (id, organization_id, name)
            VALUES (?, ?, ?)
            RETURNING id, organization_id, name
            ",
        )
        .bind(&data.id)
        .bind(&data.organization_id)
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"create_role\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>, InviteError> {
        let row: Option<RoleRecord> =
            sqlx::query_as("SELECT id, organization_id, name FROM roles WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    log::error!(target: "anteroom", "msg=\"database error\", operation=\"find_role_by_id\", error=\"{e}\"");
                    InviteError::DatabaseError(e.to_string())
                })?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Role>, InviteError> {
        let rows: Vec<RoleRecord> = sqlx::query_as(
            "SELECT id, organization_id, name FROM roles WHERE organization_id = ? ORDER BY name",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"list_roles_by_organization\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn bind_permission(
        &self,
        role_id: &str,
        code: PermissionCode,
    ) -> Result<(), InviteError> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO role_permissions (id, role_id, permission_id)
            SELECT ?, ?, id FROM permissions WHERE code = ?
            ",
        )
        .bind(generate_id())
        .bind(role_id)
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"bind_permission\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn permission_codes(&self, role_id: &str) -> Result<Vec<PermissionCode>, InviteError> {
        let codes: Vec<String> = sqlx::query_scalar(
            r"
            SELECT p.code
            FROM role_permissions rp
            INNER JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ?
            ",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "anteroom", "msg=\"database error\", operation=\"permission_codes\", error=\"{e}\"");
            InviteError::DatabaseError(e.to_string())
        })?;

        // unknown codes in the table are ignored, consistent with the
        // fail-closed permission policy
        Ok(codes
            .iter()
            .filter_map(|c| PermissionCode::from_str(c))
            .collect())
    }
}
