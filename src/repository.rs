//! Repository traits for the membership store.
//!
//! Implement these traits to back the crate with your own database. The
//! bundled implementations are the in-memory mocks (`mocks` feature) and
//! the `SQLite` repositories (`sqlx_sqlite` feature).
//!
//! Two invariants are enforced at the storage layer rather than by
//! pre-checks alone, so they hold under concurrent callers:
//!
//! - at most one `pending` invitation per (organization, email);
//!   [`InvitationRepository::create`] fails with
//!   [`InviteError::DuplicateInvite`](crate::InviteError::DuplicateInvite)
//!   when violated.
//! - at most one membership per (organization, user);
//!   [`MembershipRepository::create`] fails with
//!   [`InviteError::AlreadyMember`](crate::InviteError::AlreadyMember)
//!   when violated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::permissions::PermissionCode;
use crate::types::{Invitation, InvitationStatus, Membership, OrgUser, Organization, Role};
use crate::InviteError;

#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CreateRole {
    pub id: String,
    pub organization_id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub role_id: String,
}

#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub role_id: String,
    pub inviter_id: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn create(&self, data: CreateOrganization) -> Result<Organization, InviteError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>, InviteError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, data: CreateUser) -> Result<OrgUser, InviteError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<OrgUser>, InviteError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<OrgUser>, InviteError>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, data: CreateRole) -> Result<Role, InviteError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>, InviteError>;
    async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Role>, InviteError>;
    /// Attach a permission code to a role. Re-binding an already-bound
    /// code is a no-op.
    async fn bind_permission(&self, role_id: &str, code: PermissionCode)
        -> Result<(), InviteError>;
    /// Every permission code bound to the role.
    async fn permission_codes(&self, role_id: &str) -> Result<Vec<PermissionCode>, InviteError>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Fails with `AlreadyMember` when the (organization, user) pair
    /// already holds a membership.
    async fn create(&self, data: CreateMembership) -> Result<Membership, InviteError>;
    async fn find_by_org_and_user(
        &self,
        organization_id: &str,
        user_id: &str,
    ) -> Result<Option<Membership>, InviteError>;
}

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Fails with `DuplicateInvite` when a pending invitation already
    /// exists for the (organization, email) pair.
    async fn create(&self, data: CreateInvitation) -> Result<Invitation, InviteError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Invitation>, InviteError>;
    /// The pending invitation for an (organization, email) pair, expired
    /// or not.
    async fn find_pending(
        &self,
        organization_id: &str,
        email: &str,
    ) -> Result<Option<Invitation>, InviteError>;
    /// All pending invitations in an organization, newest first.
    /// Expired-but-pending invitations are included.
    async fn pending_by_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Invitation>, InviteError>;
    /// Pending, unexpired invitations addressed to an email, soonest
    /// expiring first.
    async fn pending_by_email(&self, email: &str) -> Result<Vec<Invitation>, InviteError>;
    /// Number of pending, unexpired invitations addressed to an email.
    async fn count_pending_by_email(&self, email: &str) -> Result<u64, InviteError>;
    /// Conditionally move an invitation from one status to another.
    ///
    /// Returns `true` when the invitation was in `from` and is now in
    /// `to`, `false` otherwise. The status check and the write are a
    /// single compare-and-swap, so concurrent transitions on the same id
    /// produce exactly one winner.
    async fn transition_status(
        &self,
        id: &str,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> Result<bool, InviteError>;
    /// Replace the expiration timestamp, used by resend.
    async fn refresh_expiry(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation, InviteError>;
}
