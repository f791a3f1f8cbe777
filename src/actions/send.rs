use chrono::{Duration, Utc};

use crate::config::InviteConfig;
use crate::ident::generate_id;
use crate::mailer::{InviteEmail, Mailer};
use crate::permissions::{PermissionChecker, PermissionCode};
use crate::repository::{
    CreateInvitation, InvitationRepository, MembershipRepository, OrganizationRepository,
    RoleRepository, UserRepository,
};
use crate::types::{Invitation, InvitationStatus, Principal};
use crate::InviteError;

/// Input data for sending an invitation.
#[derive(Debug, Clone)]
pub struct SendInviteInput {
    pub organization_id: String,
    pub email: String,
    pub role_id: String,
}

/// Action to invite an email address into an organization.
///
/// This action:
/// 1. Verifies the caller holds the "invite members" permission
/// 2. Validates the offered role belongs to the organization
/// 3. Rejects emails that already belong to a member
/// 4. Rejects duplicates of an outstanding pending invitation
/// 5. Creates the invitation record and emails the acceptance link
///
/// Mail dispatch is best-effort: a delivery failure is reported as
/// [`InviteError::MailFailed`] but the invitation row is kept.
pub struct SendInviteAction<O, U, R, M, I, X>
where
    O: OrganizationRepository,
    U: UserRepository,
    R: RoleRepository,
    M: MembershipRepository,
    I: InvitationRepository,
    X: Mailer,
{
    organizations: O,
    users: U,
    roles: R,
    memberships: M,
    invitations: I,
    mailer: X,
    checker: PermissionChecker<M, R>,
    config: InviteConfig,
}

impl<O, U, R, M, I, X> SendInviteAction<O, U, R, M, I, X>
where
    O: OrganizationRepository,
    U: UserRepository,
    R: RoleRepository,
    M: MembershipRepository,
    I: InvitationRepository,
    X: Mailer,
{
    /// Creates a new `SendInviteAction`.
    ///
    /// The checker is passed in separately so it can share repository
    /// handles with the action (repositories are cheaply cloneable).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        organizations: O,
        users: U,
        roles: R,
        memberships: M,
        invitations: I,
        mailer: X,
        checker: PermissionChecker<M, R>,
        config: InviteConfig,
    ) -> Self {
        Self {
            organizations,
            users,
            roles,
            memberships,
            invitations,
            mailer,
            checker,
            config,
        }
    }

    /// Creates an invitation and emails the acceptance link.
    ///
    /// # Returns
    ///
    /// - `Ok(invitation)` - Invitation created and notification delivered
    /// - `Err(InviteError::Unauthorized)` - Caller lacks "invite members"
    /// - `Err(InviteError::InvalidRole)` - Role missing or from another organization
    /// - `Err(InviteError::AlreadyMember)` - Email already belongs to a member
    /// - `Err(InviteError::DuplicateInvite)` - A pending invitation exists
    /// - `Err(InviteError::MailFailed)` - Row created but the email was not sent
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "send_invite", skip_all, err)
    )]
    pub async fn execute(
        &self,
        principal: &Principal,
        input: SendInviteInput,
    ) -> Result<Invitation, InviteError> {
        if !self
            .checker
            .has_permission(
                &principal.user_id,
                &input.organization_id,
                PermissionCode::InviteMembers,
            )
            .await?
        {
            return Err(InviteError::Unauthorized);
        }

        let organization = self
            .organizations
            .find_by_id(&input.organization_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        // the offered role must be scoped to this organization
        let role = self
            .roles
            .find_by_id(&input.role_id)
            .await?
            .filter(|r| r.organization_id == input.organization_id)
            .ok_or(InviteError::InvalidRole)?;

        if let Some(user) = self.users.find_by_email(&input.email).await? {
            if self
                .memberships
                .find_by_org_and_user(&input.organization_id, &user.id)
                .await?
                .is_some()
            {
                return Err(InviteError::AlreadyMember);
            }
        }

        if self
            .invitations
            .find_pending(&input.organization_id, &input.email)
            .await?
            .is_some()
        {
            return Err(InviteError::DuplicateInvite);
        }

        let expires_at = Utc::now() + Duration::days(self.config.expiry_days);
        let invitation = self
            .invitations
            .create(CreateInvitation {
                id: generate_id(),
                organization_id: input.organization_id,
                email: input.email,
                role_id: input.role_id,
                inviter_id: principal.user_id.clone(),
                expires_at,
            })
            .await?;

        log::info!(
            target: "anteroom",
            "msg=\"invitation created\", organization_id={}, invitation_id={}, email=\"{}\"",
            invitation.organization_id,
            invitation.id,
            invitation.email
        );

        self.deliver(&invitation, &organization.name, &principal.name, &role.name)
            .await?;

        Ok(invitation)
    }

    /// Re-sends an outstanding invitation with a fresh expiry window.
    ///
    /// The expiration is recomputed from now, not extended; no duplicate
    /// row is created.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "resend_invite", skip_all, err)
    )]
    pub async fn resend(
        &self,
        principal: &Principal,
        invite_id: &str,
    ) -> Result<Invitation, InviteError> {
        let invitation = self
            .invitations
            .find_by_id(invite_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        if !self
            .checker
            .has_permission(
                &principal.user_id,
                &invitation.organization_id,
                PermissionCode::InviteMembers,
            )
            .await?
        {
            return Err(InviteError::Unauthorized);
        }

        if invitation.status != InvitationStatus::Pending {
            return Err(InviteError::AlreadyUsed);
        }

        let organization = self
            .organizations
            .find_by_id(&invitation.organization_id)
            .await?
            .ok_or(InviteError::NotFound)?;
        let role = self
            .roles
            .find_by_id(&invitation.role_id)
            .await?
            .ok_or(InviteError::InvalidRole)?;

        let expires_at = Utc::now() + Duration::days(self.config.expiry_days);
        let invitation = self.invitations.refresh_expiry(invite_id, expires_at).await?;

        log::info!(
            target: "anteroom",
            "msg=\"invitation resent\", organization_id={}, invitation_id={}",
            invitation.organization_id,
            invitation.id
        );

        self.deliver(&invitation, &organization.name, &principal.name, &role.name)
            .await?;

        Ok(invitation)
    }

    async fn deliver(
        &self,
        invitation: &Invitation,
        organization_name: &str,
        inviter_name: &str,
        role_name: &str,
    ) -> Result<(), InviteError> {
        let email = InviteEmail {
            to: invitation.email.clone(),
            organization_name: organization_name.to_owned(),
            inviter_name: inviter_name.to_owned(),
            role_name: role_name.to_owned(),
            accept_url: self.config.accept_url(&invitation.id),
        };

        if let Err(e) = self.mailer.send_invite(&email).await {
            log::error!(
                target: "anteroom",
                "msg=\"invitation email failed\", invitation_id={}, error=\"{e}\"",
                invitation.id
            );
            return Err(InviteError::MailFailed(e.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MockMailer;
    use crate::mocks::{
        MockInvitationRepository, MockMembershipRepository, MockOrganizationRepository,
        MockRoleRepository, MockUserRepository,
    };
    use crate::repository::{CreateMembership, CreateOrganization, CreateRole, CreateUser};

    struct Fixture {
        organizations: MockOrganizationRepository,
        users: MockUserRepository,
        roles: MockRoleRepository,
        memberships: MockMembershipRepository,
        invitations: MockInvitationRepository,
        admin: Principal,
        member_role_id: String,
    }

    /// One organization, an admin (holding invite_members) and a plain
    /// member role with no bindings.
    async fn fixture() -> Fixture {
        let organizations = MockOrganizationRepository::new();
        let users = MockUserRepository::new();
        let roles = MockRoleRepository::new();
        let memberships = MockMembershipRepository::new();
        let invitations = MockInvitationRepository::new();

        organizations
            .create(CreateOrganization {
                id: "org-1".to_owned(),
                name: "Acme".to_owned(),
                slug: "acme".to_owned(),
            })
            .await
            .unwrap();

        let admin_role = roles
            .create(CreateRole {
                id: "role-admin".to_owned(),
                organization_id: "org-1".to_owned(),
                name: "Admin".to_owned(),
            })
            .await
            .unwrap();
        roles
            .bind_permission(&admin_role.id, PermissionCode::InviteMembers)
            .await
            .unwrap();
        roles
            .create(CreateRole {
                id: "role-member".to_owned(),
                organization_id: "org-1".to_owned(),
                name: "Member".to_owned(),
            })
            .await
            .unwrap();

        users
            .create(CreateUser {
                id: "user-alice".to_owned(),
                name: "Alice".to_owned(),
                email: "alice@example.com".to_owned(),
            })
            .await
            .unwrap();
        memberships
            .create(CreateMembership {
                id: generate_id(),
                organization_id: "org-1".to_owned(),
                user_id: "user-alice".to_owned(),
                role_id: admin_role.id,
            })
            .await
            .unwrap();

        Fixture {
            organizations,
            users,
            roles,
            memberships,
            invitations,
            admin: Principal {
                user_id: "user-alice".to_owned(),
                email: "alice@example.com".to_owned(),
                name: "Alice".to_owned(),
            },
            member_role_id: "role-member".to_owned(),
        }
    }

    fn action(
        f: &Fixture,
        mailer: MockMailer,
    ) -> SendInviteAction<
        MockOrganizationRepository,
        MockUserRepository,
        MockRoleRepository,
        MockMembershipRepository,
        MockInvitationRepository,
        MockMailer,
    > {
        SendInviteAction::new(
            f.organizations.clone(),
            f.users.clone(),
            f.roles.clone(),
            f.memberships.clone(),
            f.invitations.clone(),
            mailer,
            PermissionChecker::new(f.memberships.clone(), f.roles.clone()),
            InviteConfig::default(),
        )
    }

    fn input(f: &Fixture, email: &str) -> SendInviteInput {
        SendInviteInput {
            organization_id: "org-1".to_owned(),
            email: email.to_owned(),
            role_id: f.member_role_id.clone(),
        }
    }

    #[tokio::test]
    async fn test_send_success() {
        let f = fixture().await;
        let mailer = MockMailer::new();
        let action = action(&f, mailer.clone());

        let invitation = action
            .execute(&f.admin, input(&f, "bob@example.com"))
            .await
            .unwrap();

        assert_eq!(invitation.email, "bob@example.com");
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!(invitation.inviter_id, "user-alice");

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "bob@example.com");
        assert_eq!(sent[0].organization_name, "Acme");
        assert!(sent[0].accept_url.ends_with(&format!("/invites/{}", invitation.id)));
    }

    #[tokio::test]
    async fn test_send_requires_permission() {
        let f = fixture().await;
        let action = action(&f, MockMailer::new());

        let outsider = Principal {
            user_id: "user-mallory".to_owned(),
            email: "mallory@example.com".to_owned(),
            name: "Mallory".to_owned(),
        };

        let err = action
            .execute(&outsider, input(&f, "bob@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err, InviteError::Unauthorized);
    }

    #[tokio::test]
    async fn test_send_rejects_foreign_role() {
        let f = fixture().await;
        f.roles
            .create(CreateRole {
                id: "role-foreign".to_owned(),
                organization_id: "org-2".to_owned(),
                name: "Admin".to_owned(),
            })
            .await
            .unwrap();
        let action = action(&f, MockMailer::new());

        let err = action
            .execute(
                &f.admin,
                SendInviteInput {
                    organization_id: "org-1".to_owned(),
                    email: "bob@example.com".to_owned(),
                    role_id: "role-foreign".to_owned(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, InviteError::InvalidRole);

        // no row was created
        assert!(f
            .invitations
            .find_pending("org-1", "bob@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_send_rejects_existing_member() {
        let f = fixture().await;
        let action = action(&f, MockMailer::new());

        let err = action
            .execute(&f.admin, input(&f, "alice@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err, InviteError::AlreadyMember);
    }

    #[tokio::test]
    async fn test_send_rejects_duplicate_pending() {
        let f = fixture().await;
        let action = action(&f, MockMailer::new());

        action
            .execute(&f.admin, input(&f, "bob@example.com"))
            .await
            .unwrap();
        let err = action
            .execute(&f.admin, input(&f, "bob@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err, InviteError::DuplicateInvite);
    }

    #[tokio::test]
    async fn test_send_mail_failure_keeps_invitation() {
        let f = fixture().await;
        let action = action(&f, MockMailer::failing());

        let err = action
            .execute(&f.admin, input(&f, "bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, InviteError::MailFailed(_)));

        // the row survives the failed dispatch
        let pending = f
            .invitations
            .find_pending("org-1", "bob@example.com")
            .await
            .unwrap();
        assert!(pending.is_some());
    }

    #[tokio::test]
    async fn test_resend_refreshes_expiry_without_duplicating() {
        let f = fixture().await;
        let mailer = MockMailer::new();
        let action = action(&f, mailer.clone());

        let invitation = action
            .execute(&f.admin, input(&f, "bob@example.com"))
            .await
            .unwrap();

        // age the invitation artificially
        f.invitations
            .refresh_expiry(&invitation.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        let refreshed = action.resend(&f.admin, &invitation.id).await.unwrap();
        assert_eq!(refreshed.id, invitation.id);
        assert!(refreshed.expires_at > Utc::now() + Duration::days(6));

        let all = f.invitations.pending_by_organization("org-1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_resend_used_invitation_conflicts() {
        let f = fixture().await;
        let action = action(&f, MockMailer::new());

        let invitation = action
            .execute(&f.admin, input(&f, "bob@example.com"))
            .await
            .unwrap();
        f.invitations
            .transition_status(
                &invitation.id,
                InvitationStatus::Pending,
                InvitationStatus::Rejected,
            )
            .await
            .unwrap();

        let err = action.resend(&f.admin, &invitation.id).await.unwrap_err();
        assert_eq!(err, InviteError::AlreadyUsed);
    }
}
