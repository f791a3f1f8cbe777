use crate::permissions::{PermissionChecker, PermissionCode};
use crate::repository::{
    InvitationRepository, MembershipRepository, OrganizationRepository, RoleRepository,
    UserRepository,
};
use crate::types::{
    Invitation, InviteDetail, PendingInvite, Principal, RoleSummary, UserInvite,
};
use crate::InviteError;

/// Read operations over invitations and roles.
///
/// Listings join invitations with role and inviter names in the service
/// layer; an invitation whose role or inviter has since been deleted is
/// dropped from the listing, matching inner-join semantics.
pub struct InviteQueries<O, U, R, M, I>
where
    O: OrganizationRepository,
    U: UserRepository,
    R: RoleRepository,
    M: MembershipRepository,
    I: InvitationRepository,
{
    organizations: O,
    users: U,
    roles: R,
    invitations: I,
    checker: PermissionChecker<M, R>,
}

impl<O, U, R, M, I> InviteQueries<O, U, R, M, I>
where
    O: OrganizationRepository,
    U: UserRepository,
    R: RoleRepository,
    M: MembershipRepository,
    I: InvitationRepository,
{
    /// Creates a new `InviteQueries`.
    pub fn new(
        organizations: O,
        users: U,
        roles: R,
        invitations: I,
        checker: PermissionChecker<M, R>,
    ) -> Self {
        Self {
            organizations,
            users,
            roles,
            invitations,
            checker,
        }
    }

    /// Everything the acceptance page needs to render an invitation.
    ///
    /// Deliberately unauthenticated: the acceptance link itself is the
    /// credential, and the invitee has no session yet when they open it.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "get_invite", skip(self), err)
    )]
    pub async fn invite(&self, invite_id: &str) -> Result<InviteDetail, InviteError> {
        let invitation = self
            .invitations
            .find_by_id(invite_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        let organization = self
            .organizations
            .find_by_id(&invitation.organization_id)
            .await?
            .ok_or(InviteError::NotFound)?;
        let role = self
            .roles
            .find_by_id(&invitation.role_id)
            .await?
            .ok_or(InviteError::NotFound)?;
        let inviter = self
            .users
            .find_by_id(&invitation.inviter_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        Ok(InviteDetail {
            id: invitation.id,
            email: invitation.email,
            role_name: role.name,
            organization_name: organization.name,
            inviter_name: inviter.name,
            status: invitation.status,
            expires_at: invitation.expires_at,
        })
    }

    /// Roles that can be offered in an invitation.
    ///
    /// Requires the "invite members" permission, since this feeds the
    /// invite dialog.
    pub async fn organization_roles(
        &self,
        principal: &Principal,
        organization_id: &str,
    ) -> Result<Vec<RoleSummary>, InviteError> {
        if !self
            .checker
            .has_permission(
                &principal.user_id,
                organization_id,
                PermissionCode::InviteMembers,
            )
            .await?
        {
            return Err(InviteError::Unauthorized);
        }

        let roles = self.roles.list_by_organization(organization_id).await?;
        Ok(roles
            .into_iter()
            .map(|r| RoleSummary {
                id: r.id,
                name: r.name,
            })
            .collect())
    }

    /// Outstanding invitations in an organization, for the members admin
    /// page. Requires "manage members".
    ///
    /// Expired-but-pending invitations are included; the presentation
    /// layer marks them via `expires_at` rather than this view hiding
    /// them.
    pub async fn pending_invites(
        &self,
        principal: &Principal,
        organization_id: &str,
    ) -> Result<Vec<PendingInvite>, InviteError> {
        if !self
            .checker
            .has_permission(
                &principal.user_id,
                organization_id,
                PermissionCode::ManageMembers,
            )
            .await?
        {
            return Err(InviteError::Unauthorized);
        }

        let invitations = self
            .invitations
            .pending_by_organization(organization_id)
            .await?;

        let mut invites = Vec::with_capacity(invitations.len());
        for invitation in invitations {
            let Some((role_name, inviter_name)) = self.join_names(&invitation).await? else {
                continue;
            };
            invites.push(PendingInvite {
                id: invitation.id,
                email: invitation.email,
                role_name,
                inviter_name,
                expires_at: invitation.expires_at,
                created_at: invitation.created_at,
            });
        }

        Ok(invites)
    }

    /// The caller's invitation inbox: pending, unexpired invitations
    /// addressed to their email, soonest expiring first.
    pub async fn user_pending_invites(
        &self,
        principal: &Principal,
    ) -> Result<Vec<UserInvite>, InviteError> {
        let invitations = self.invitations.pending_by_email(&principal.email).await?;

        let mut invites = Vec::with_capacity(invitations.len());
        for invitation in invitations {
            let Some(organization) = self
                .organizations
                .find_by_id(&invitation.organization_id)
                .await?
            else {
                continue;
            };
            let Some((role_name, inviter_name)) = self.join_names(&invitation).await? else {
                continue;
            };
            invites.push(UserInvite {
                id: invitation.id,
                organization_name: organization.name,
                role_name,
                inviter_name,
                expires_at: invitation.expires_at,
            });
        }

        Ok(invites)
    }

    /// Number of invitations behind the inbox badge.
    pub async fn user_pending_invites_count(
        &self,
        principal: &Principal,
    ) -> Result<u64, InviteError> {
        self.invitations
            .count_pending_by_email(&principal.email)
            .await
    }

    async fn join_names(
        &self,
        invitation: &Invitation,
    ) -> Result<Option<(String, String)>, InviteError> {
        let role = self.roles.find_by_id(&invitation.role_id).await?;
        let inviter = self.users.find_by_id(&invitation.inviter_id).await?;
        match (role, inviter) {
            (Some(role), Some(inviter)) => Ok(Some((role.name, inviter.name))),
            _ => {
                log::debug!(
                    target: "anteroom",
                    "msg=\"invitation dropped from listing, dangling reference\", invitation_id={}",
                    invitation.id
                );
                Ok(None)
            }
        }
    }
}
