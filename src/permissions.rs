//! Permission codes and organization-scoped capability checks.
//!
//! A caller's capabilities are resolved by walking membership → role →
//! role-permission bindings. Resolution is fail-closed: any missing row
//! along the chain means the permission is not held.

use crate::repository::{MembershipRepository, RoleRepository};
use crate::InviteError;

/// A capability that can be bound to a role.
///
/// The set is closed: codes are organization-agnostic constants, and the
/// string forms below are what the store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionCode {
    InviteMembers,
    ManageMembers,
    ManageRoles,
    DeleteOrganization,
}

impl PermissionCode {
    /// Convert to string for database storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InviteMembers => "invite_members",
            Self::ManageMembers => "manage_members",
            Self::ManageRoles => "manage_roles",
            Self::DeleteOrganization => "delete_organization",
        }
    }

    /// Parse from database string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "invite_members" => Some(Self::InviteMembers),
            "manage_members" => Some(Self::ManageMembers),
            "manage_roles" => Some(Self::ManageRoles),
            "delete_organization" => Some(Self::DeleteOrganization),
            _ => None,
        }
    }
}

/// Resolves whether a user holds a capability within an organization.
///
/// Read-only; the checker never mutates the store. Roles are resolved by
/// id and verified to belong to the organization being checked, so a role
/// reference smuggled in from another organization never grants anything.
pub struct PermissionChecker<M, R>
where
    M: MembershipRepository,
    R: RoleRepository,
{
    memberships: M,
    roles: R,
}

impl<M, R> PermissionChecker<M, R>
where
    M: MembershipRepository,
    R: RoleRepository,
{
    pub fn new(memberships: M, roles: R) -> Self {
        Self { memberships, roles }
    }

    /// Check if a user holds a permission in an organization.
    ///
    /// Returns `Ok(false)` whenever any lookup step comes up empty:
    /// no membership, a dangling role reference, a role from another
    /// organization, or an unbound code. Absence of evidence is absence
    /// of permission.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "has_permission", skip(self), err)
    )]
    pub async fn has_permission(
        &self,
        user_id: &str,
        organization_id: &str,
        code: PermissionCode,
    ) -> Result<bool, InviteError> {
        let Some(membership) = self
            .memberships
            .find_by_org_and_user(organization_id, user_id)
            .await?
        else {
            return Ok(false);
        };

        let Some(role) = self.roles.find_by_id(&membership.role_id).await? else {
            return Ok(false);
        };

        if role.organization_id != organization_id {
            return Ok(false);
        }

        let codes = self.roles.permission_codes(&role.id).await?;
        Ok(codes.contains(&code))
    }

    /// Every permission code the user holds in the organization.
    ///
    /// Empty when the user has no membership or the role chain is broken.
    pub async fn user_permissions(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> Result<Vec<PermissionCode>, InviteError> {
        let Some(membership) = self
            .memberships
            .find_by_org_and_user(organization_id, user_id)
            .await?
        else {
            return Ok(Vec::new());
        };

        let Some(role) = self.roles.find_by_id(&membership.role_id).await? else {
            return Ok(Vec::new());
        };

        if role.organization_id != organization_id {
            return Ok(Vec::new());
        }

        self.roles.permission_codes(&role.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::generate_id;
    use crate::mocks::{MockMembershipRepository, MockRoleRepository};
    use crate::repository::{CreateMembership, CreateRole};

    async fn seed_role(
        roles: &MockRoleRepository,
        organization_id: &str,
        codes: &[PermissionCode],
    ) -> String {
        let role = roles
            .create(CreateRole {
                id: generate_id(),
                organization_id: organization_id.to_owned(),
                name: "admin".to_owned(),
            })
            .await
            .unwrap();
        for code in codes {
            roles.bind_permission(&role.id, *code).await.unwrap();
        }
        role.id
    }

    async fn seed_member(
        memberships: &MockMembershipRepository,
        organization_id: &str,
        user_id: &str,
        role_id: &str,
    ) {
        memberships
            .create(CreateMembership {
                id: generate_id(),
                organization_id: organization_id.to_owned(),
                user_id: user_id.to_owned(),
                role_id: role_id.to_owned(),
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_code_roundtrip() {
        for code in [
            PermissionCode::InviteMembers,
            PermissionCode::ManageMembers,
            PermissionCode::ManageRoles,
            PermissionCode::DeleteOrganization,
        ] {
            assert_eq!(PermissionCode::from_str(code.as_str()), Some(code));
        }
        assert!(PermissionCode::from_str("superuser").is_none());
    }

    #[tokio::test]
    async fn test_bound_permission_granted() {
        let memberships = MockMembershipRepository::new();
        let roles = MockRoleRepository::new();

        let role_id = seed_role(&roles, "org-1", &[PermissionCode::InviteMembers]).await;
        seed_member(&memberships, "org-1", "user-1", &role_id).await;

        let checker = PermissionChecker::new(memberships, roles);
        assert!(checker
            .has_permission("user-1", "org-1", PermissionCode::InviteMembers)
            .await
            .unwrap());
        assert!(!checker
            .has_permission("user-1", "org-1", PermissionCode::ManageMembers)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_no_membership_is_denied() {
        let memberships = MockMembershipRepository::new();
        let roles = MockRoleRepository::new();
        seed_role(&roles, "org-1", &[PermissionCode::InviteMembers]).await;

        let checker = PermissionChecker::new(memberships, roles);
        assert!(!checker
            .has_permission("stranger", "org-1", PermissionCode::InviteMembers)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_dangling_role_is_denied() {
        let memberships = MockMembershipRepository::new();
        let roles = MockRoleRepository::new();
        seed_member(&memberships, "org-1", "user-1", "deleted-role").await;

        let checker = PermissionChecker::new(memberships, roles);
        assert!(!checker
            .has_permission("user-1", "org-1", PermissionCode::InviteMembers)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_role_from_other_organization_is_denied() {
        let memberships = MockMembershipRepository::new();
        let roles = MockRoleRepository::new();

        // membership in org-1 pointing at a role that belongs to org-2
        let foreign_role = seed_role(&roles, "org-2", &[PermissionCode::InviteMembers]).await;
        seed_member(&memberships, "org-1", "user-1", &foreign_role).await;

        let checker = PermissionChecker::new(memberships, roles);
        assert!(!checker
            .has_permission("user-1", "org-1", PermissionCode::InviteMembers)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_user_permissions_lists_all_bound_codes() {
        let memberships = MockMembershipRepository::new();
        let roles = MockRoleRepository::new();

        let role_id = seed_role(
            &roles,
            "org-1",
            &[PermissionCode::InviteMembers, PermissionCode::ManageMembers],
        )
        .await;
        seed_member(&memberships, "org-1", "user-1", &role_id).await;

        let checker = PermissionChecker::new(memberships, roles);
        let codes = checker.user_permissions("user-1", "org-1").await.unwrap();
        assert_eq!(codes.len(), 2);
        assert!(codes.contains(&PermissionCode::InviteMembers));
        assert!(codes.contains(&PermissionCode::ManageMembers));

        let none = checker.user_permissions("stranger", "org-1").await.unwrap();
        assert!(none.is_empty());
    }
}
