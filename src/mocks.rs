//! In-memory repository implementations for testing.
//!
//! Mocks are cheaply cloneable; clones share the same underlying state, so
//! the same store can be handed to a [`PermissionChecker`](crate::PermissionChecker)
//! and an action at once. They enforce the same uniqueness invariants as
//! the `SQLite` schema: one pending invitation per (organization, email)
//! and one membership per (organization, user).

#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::repository::{
    CreateInvitation, CreateMembership, CreateOrganization, CreateRole, CreateUser,
    InvitationRepository, MembershipRepository, OrganizationRepository, RoleRepository,
    UserRepository,
};
use crate::types::{Invitation, InvitationStatus, Membership, OrgUser, Organization, Role};
use crate::{InviteError, PermissionCode};

fn poisoned() -> InviteError {
    InviteError::DatabaseError("lock poisoned".into())
}

#[derive(Clone, Default)]
pub struct MockOrganizationRepository {
    organizations: Arc<RwLock<HashMap<String, Organization>>>,
}

impl MockOrganizationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganizationRepository for MockOrganizationRepository {
    async fn create(&self, data: CreateOrganization) -> Result<Organization, InviteError> {
        let organization = Organization {
            id: data.id,
            name: data.name,
            slug: data.slug,
            created_at: Utc::now(),
        };

        let mut organizations = self.organizations.write().map_err(|_| poisoned())?;
        organizations.insert(organization.id.clone(), organization.clone());

        Ok(organization)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>, InviteError> {
        let organizations = self.organizations.read().map_err(|_| poisoned())?;
        Ok(organizations.get(id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users: Arc<RwLock<HashMap<String, OrgUser>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn create(&self, data: CreateUser) -> Result<OrgUser, InviteError> {
        let user = OrgUser {
            id: data.id,
            name: data.name,
            email: data.email,
            created_at: Utc::now(),
        };

        let mut users = self.users.write().map_err(|_| poisoned())?;
        users.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<OrgUser>, InviteError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<OrgUser>, InviteError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }
}

#[derive(Clone, Default)]
pub struct MockRoleRepository {
    roles: Arc<RwLock<HashMap<String, Role>>>,
    /// role id -> bound permission codes
    bindings: Arc<RwLock<HashMap<String, Vec<PermissionCode>>>>,
}

impl MockRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for MockRoleRepository {
    async fn create(&self, data: CreateRole) -> Result<Role, InviteError> {
        let role = Role {
            id: data.id,
            organization_id: data.organization_id,
            name: data.name,
        };

        let mut roles = self.roles.write().map_err(|_| poisoned())?;
        roles.insert(role.id.clone(), role.clone());

        Ok(role)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Role>, InviteError> {
        let roles = self.roles.read().map_err(|_| poisoned())?;
        Ok(roles.get(id).cloned())
    }

    async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Role>, InviteError> {
        let roles = self.roles.read().map_err(|_| poisoned())?;
        let mut matching: Vec<Role> = roles
            .values()
            .filter(|r| r.organization_id == organization_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matching)
    }

    async fn bind_permission(
        &self,
        role_id: &str,
        code: PermissionCode,
    ) -> Result<(), InviteError> {
        let mut bindings = self.bindings.write().map_err(|_| poisoned())?;
        let codes = bindings.entry(role_id.to_owned()).or_default();
        if !codes.contains(&code) {
            codes.push(code);
        }
        Ok(())
    }

    async fn permission_codes(&self, role_id: &str) -> Result<Vec<PermissionCode>, InviteError> {
        let bindings = self.bindings.read().map_err(|_| poisoned())?;
        Ok(bindings.get(role_id).cloned().unwrap_or_default())
    }
}

#[derive(Clone, Default)]
pub struct MockMembershipRepository {
    memberships: Arc<RwLock<HashMap<String, Membership>>>,
}

impl MockMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipRepository for MockMembershipRepository {
    async fn create(&self, data: CreateMembership) -> Result<Membership, InviteError> {
        let mut memberships = self.memberships.write().map_err(|_| poisoned())?;

        if memberships
            .values()
            .any(|m| m.organization_id == data.organization_id && m.user_id == data.user_id)
        {
            return Err(InviteError::AlreadyMember);
        }

        let membership = Membership {
            id: data.id,
            organization_id: data.organization_id,
            user_id: data.user_id,
            role_id: data.role_id,
            created_at: Utc::now(),
        };
        memberships.insert(membership.id.clone(), membership.clone());

        Ok(membership)
    }

    async fn find_by_org_and_user(
        &self,
        organization_id: &str,
        user_id: &str,
    ) -> Result<Option<Membership>, InviteError> {
        let memberships = self.memberships.read().map_err(|_| poisoned())?;
        Ok(memberships
            .values()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }
}

#[derive(Clone, Default)]
pub struct MockInvitationRepository {
    invitations: Arc<RwLock<HashMap<String, Invitation>>>,
}

impl MockInvitationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvitationRepository for MockInvitationRepository {
    async fn create(&self, data: CreateInvitation) -> Result<Invitation, InviteError> {
        let mut invitations = self.invitations.write().map_err(|_| poisoned())?;

        if invitations.values().any(|i| {
            i.organization_id == data.organization_id
                && i.email == data.email
                && i.status == InvitationStatus::Pending
        }) {
            return Err(InviteError::DuplicateInvite);
        }

        let invitation = Invitation {
            id: data.id,
            organization_id: data.organization_id,
            email: data.email,
            role_id: data.role_id,
            status: InvitationStatus::Pending,
            inviter_id: data.inviter_id,
            expires_at: data.expires_at,
            created_at: Utc::now(),
        };
        invitations.insert(invitation.id.clone(), invitation.clone());

        Ok(invitation)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Invitation>, InviteError> {
        let invitations = self.invitations.read().map_err(|_| poisoned())?;
        Ok(invitations.get(id).cloned())
    }

    async fn find_pending(
        &self,
        organization_id: &str,
        email: &str,
    ) -> Result<Option<Invitation>, InviteError> {
        let invitations = self.invitations.read().map_err(|_| poisoned())?;
        Ok(invitations
            .values()
            .find(|i| {
                i.organization_id == organization_id
                    && i.email == email
                    && i.status == InvitationStatus::Pending
            })
            .cloned())
    }

    async fn pending_by_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Invitation>, InviteError> {
        let invitations = self.invitations.read().map_err(|_| poisoned())?;
        let mut matching: Vec<Invitation> = invitations
            .values()
            .filter(|i| {
                i.organization_id == organization_id && i.status == InvitationStatus::Pending
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn pending_by_email(&self, email: &str) -> Result<Vec<Invitation>, InviteError> {
        let invitations = self.invitations.read().map_err(|_| poisoned())?;
        let now = Utc::now();
        let mut matching: Vec<Invitation> = invitations
            .values()
            .filter(|i| {
                i.email == email && i.status == InvitationStatus::Pending && i.expires_at > now
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        Ok(matching)
    }

    async fn count_pending_by_email(&self, email: &str) -> Result<u64, InviteError> {
        let matching = self.pending_by_email(email).await?;
        Ok(matching.len() as u64)
    }

    async fn transition_status(
        &self,
        id: &str,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> Result<bool, InviteError> {
        let mut invitations = self.invitations.write().map_err(|_| poisoned())?;
        match invitations.get_mut(id) {
            Some(invitation) if invitation.status == from => {
                invitation.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn refresh_expiry(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation, InviteError> {
        let mut invitations = self.invitations.write().map_err(|_| poisoned())?;
        let invitation = invitations.get_mut(id).ok_or(InviteError::NotFound)?;
        invitation.expires_at = expires_at;
        Ok(invitation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::generate_id;
    use chrono::Duration;

    fn invite_data(organization_id: &str, email: &str, expires_at: DateTime<Utc>) -> CreateInvitation {
        CreateInvitation {
            id: generate_id(),
            organization_id: organization_id.to_owned(),
            email: email.to_owned(),
            role_id: "role-1".to_owned(),
            inviter_id: "user-1".to_owned(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_duplicate_pending_invitation_rejected() {
        let repo = MockInvitationRepository::new();
        let expires = Utc::now() + Duration::days(7);

        repo.create(invite_data("org-1", "a@example.com", expires))
            .await
            .unwrap();
        let err = repo
            .create(invite_data("org-1", "a@example.com", expires))
            .await
            .unwrap_err();
        assert_eq!(err, InviteError::DuplicateInvite);

        // a different organization is fine
        repo.create(invite_data("org-2", "a@example.com", expires))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_terminal_invitation_frees_the_pair() {
        let repo = MockInvitationRepository::new();
        let expires = Utc::now() + Duration::days(7);

        let first = repo
            .create(invite_data("org-1", "a@example.com", expires))
            .await
            .unwrap();
        assert!(repo
            .transition_status(&first.id, InvitationStatus::Pending, InvitationStatus::Rejected)
            .await
            .unwrap());

        // rejected invitation no longer blocks a fresh one
        repo.create(invite_data("org-1", "a@example.com", expires))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transition_is_single_winner() {
        let repo = MockInvitationRepository::new();
        let invitation = repo
            .create(invite_data(
                "org-1",
                "a@example.com",
                Utc::now() + Duration::days(7),
            ))
            .await
            .unwrap();

        assert!(repo
            .transition_status(
                &invitation.id,
                InvitationStatus::Pending,
                InvitationStatus::Accepted
            )
            .await
            .unwrap());
        assert!(!repo
            .transition_status(
                &invitation.id,
                InvitationStatus::Pending,
                InvitationStatus::Accepted
            )
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_membership_rejected() {
        let repo = MockMembershipRepository::new();
        let data = CreateMembership {
            id: generate_id(),
            organization_id: "org-1".to_owned(),
            user_id: "user-1".to_owned(),
            role_id: "role-1".to_owned(),
        };

        repo.create(data.clone()).await.unwrap();
        let err = repo
            .create(CreateMembership {
                id: generate_id(),
                ..data
            })
            .await
            .unwrap_err();
        assert_eq!(err, InviteError::AlreadyMember);
    }

    #[tokio::test]
    async fn test_pending_by_email_hides_expired_and_sorts() {
        let repo = MockInvitationRepository::new();

        repo.create(invite_data(
            "org-1",
            "a@example.com",
            Utc::now() - Duration::hours(1),
        ))
        .await
        .unwrap();
        let later = repo
            .create(invite_data(
                "org-2",
                "a@example.com",
                Utc::now() + Duration::days(6),
            ))
            .await
            .unwrap();
        let sooner = repo
            .create(invite_data(
                "org-3",
                "a@example.com",
                Utc::now() + Duration::days(2),
            ))
            .await
            .unwrap();

        let pending = repo.pending_by_email("a@example.com").await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, sooner.id);
        assert_eq!(pending[1].id, later.id);

        assert_eq!(repo.count_pending_by_email("a@example.com").await.unwrap(), 2);

        // the admin view still sees the expired one
        let admin = repo.pending_by_organization("org-1").await.unwrap();
        assert_eq!(admin.len(), 1);
    }
}
