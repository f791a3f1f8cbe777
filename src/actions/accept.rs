use crate::ident::generate_id;
use crate::repository::{
    CreateMembership, InvitationRepository, MembershipRepository, OrganizationRepository,
};
use crate::types::{AcceptedInvite, InvitationStatus, Principal};
use crate::InviteError;

/// Action to accept an invitation.
///
/// This action:
/// 1. Verifies the invitation is addressed to the caller's email
/// 2. Checks the invitation is still pending and unexpired
/// 3. Creates the membership carrying the invitation's role
/// 4. Marks the invitation as accepted
///
/// The invitation id arrives via the acceptance link; the email check
/// binds it to a specific identity rather than any link-holder.
///
/// Concurrent accepts converge on the membership store's uniqueness
/// guarantee: the loser of the race gets [`InviteError::AlreadyMember`]
/// and exactly one membership row exists afterwards.
pub struct AcceptInviteAction<O, M, I>
where
    O: OrganizationRepository,
    M: MembershipRepository,
    I: InvitationRepository,
{
    organizations: O,
    memberships: M,
    invitations: I,
}

impl<O, M, I> AcceptInviteAction<O, M, I>
where
    O: OrganizationRepository,
    M: MembershipRepository,
    I: InvitationRepository,
{
    /// Creates a new `AcceptInviteAction`.
    pub fn new(organizations: O, memberships: M, invitations: I) -> Self {
        Self {
            organizations,
            memberships,
            invitations,
        }
    }

    /// Accepts an invitation on behalf of the caller.
    ///
    /// # Returns
    ///
    /// - `Ok(accepted)` - Membership created; organization identity for redirect
    /// - `Err(InviteError::NotFound)` - Invitation or organization is gone
    /// - `Err(InviteError::EmailMismatch)` - Addressed to a different email
    /// - `Err(InviteError::AlreadyUsed)` - Invitation is not pending
    /// - `Err(InviteError::Expired)` - Past the expiration timestamp
    /// - `Err(InviteError::AlreadyMember)` - Caller already belongs to the organization
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "accept_invite", skip_all, err)
    )]
    pub async fn execute(
        &self,
        principal: &Principal,
        invite_id: &str,
    ) -> Result<AcceptedInvite, InviteError> {
        let invitation = self
            .invitations
            .find_by_id(invite_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        // case-sensitive: the invitation names an exact identity
        if invitation.email != principal.email {
            return Err(InviteError::EmailMismatch);
        }

        if invitation.status != InvitationStatus::Pending {
            return Err(InviteError::AlreadyUsed);
        }

        if invitation.is_expired() {
            return Err(InviteError::Expired);
        }

        let organization = self
            .organizations
            .find_by_id(&invitation.organization_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        if self
            .memberships
            .find_by_org_and_user(&invitation.organization_id, &principal.user_id)
            .await?
            .is_some()
        {
            return Err(InviteError::AlreadyMember);
        }

        // the membership always carries the invitation's stored role
        let membership = self
            .memberships
            .create(CreateMembership {
                id: generate_id(),
                organization_id: invitation.organization_id.clone(),
                user_id: principal.user_id.clone(),
                role_id: invitation.role_id.clone(),
            })
            .await?;

        // mark accepted; losing this CAS means a concurrent transition won,
        // but the membership above already exists, so log rather than fail
        let flipped = self
            .invitations
            .transition_status(
                &invitation.id,
                InvitationStatus::Pending,
                InvitationStatus::Accepted,
            )
            .await?;
        if !flipped {
            log::warn!(
                target: "anteroom",
                "msg=\"invitation no longer pending after membership insert\", invitation_id={}",
                invitation.id
            );
        }

        log::info!(
            target: "anteroom",
            "msg=\"invitation accepted\", organization_id={}, user_id={}, membership_id={}",
            membership.organization_id,
            membership.user_id,
            membership.id
        );

        Ok(AcceptedInvite {
            organization_id: organization.id,
            organization_name: organization.name,
            organization_slug: organization.slug,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::mocks::{
        MockInvitationRepository, MockMembershipRepository, MockOrganizationRepository,
    };
    use crate::repository::{CreateInvitation, CreateOrganization};

    fn bob() -> Principal {
        Principal {
            user_id: "user-bob".to_owned(),
            email: "bob@example.com".to_owned(),
            name: "Bob".to_owned(),
        }
    }

    async fn setup() -> (
        MockOrganizationRepository,
        MockMembershipRepository,
        MockInvitationRepository,
    ) {
        let organizations = MockOrganizationRepository::new();
        organizations
            .create(CreateOrganization {
                id: "org-1".to_owned(),
                name: "Acme".to_owned(),
                slug: "acme".to_owned(),
            })
            .await
            .unwrap();
        (
            organizations,
            MockMembershipRepository::new(),
            MockInvitationRepository::new(),
        )
    }

    async fn seed_invitation(
        invitations: &MockInvitationRepository,
        email: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> String {
        invitations
            .create(CreateInvitation {
                id: generate_id(),
                organization_id: "org-1".to_owned(),
                email: email.to_owned(),
                role_id: "role-member".to_owned(),
                inviter_id: "user-alice".to_owned(),
                expires_at,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_accept_success() {
        let (organizations, memberships, invitations) = setup().await;
        let invite_id = seed_invitation(
            &invitations,
            "bob@example.com",
            Utc::now() + Duration::days(6),
        )
        .await;

        let action =
            AcceptInviteAction::new(organizations, memberships.clone(), invitations.clone());
        let accepted = action.execute(&bob(), &invite_id).await.unwrap();

        assert_eq!(accepted.organization_id, "org-1");
        assert_eq!(accepted.organization_name, "Acme");
        assert_eq!(accepted.organization_slug, "acme");

        let membership = memberships
            .find_by_org_and_user("org-1", "user-bob")
            .await
            .unwrap()
            .expect("membership should exist");
        assert_eq!(membership.role_id, "role-member");

        let invitation = invitations.find_by_id(&invite_id).await.unwrap().unwrap();
        assert_eq!(invitation.status, InvitationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_accept_unknown_invitation() {
        let (organizations, memberships, invitations) = setup().await;
        let action = AcceptInviteAction::new(organizations, memberships, invitations);

        let err = action.execute(&bob(), "no-such-invite").await.unwrap_err();
        assert_eq!(err, InviteError::NotFound);
    }

    #[tokio::test]
    async fn test_accept_wrong_email() {
        let (organizations, memberships, invitations) = setup().await;
        let invite_id = seed_invitation(
            &invitations,
            "someone-else@example.com",
            Utc::now() + Duration::days(6),
        )
        .await;

        let action =
            AcceptInviteAction::new(organizations, memberships.clone(), invitations.clone());
        let err = action.execute(&bob(), &invite_id).await.unwrap_err();
        assert_eq!(err, InviteError::EmailMismatch);

        // no membership, invitation untouched
        assert!(memberships
            .find_by_org_and_user("org-1", "user-bob")
            .await
            .unwrap()
            .is_none());
        let invitation = invitations.find_by_id(&invite_id).await.unwrap().unwrap();
        assert_eq!(invitation.status, InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn test_accept_is_case_sensitive_on_email() {
        let (organizations, memberships, invitations) = setup().await;
        let invite_id = seed_invitation(
            &invitations,
            "Bob@Example.com",
            Utc::now() + Duration::days(6),
        )
        .await;

        let action = AcceptInviteAction::new(organizations, memberships, invitations);
        let err = action.execute(&bob(), &invite_id).await.unwrap_err();
        assert_eq!(err, InviteError::EmailMismatch);
    }

    #[tokio::test]
    async fn test_accept_expired() {
        let (organizations, memberships, invitations) = setup().await;
        let invite_id = seed_invitation(
            &invitations,
            "bob@example.com",
            Utc::now() - Duration::days(1),
        )
        .await;

        let action =
            AcceptInviteAction::new(organizations, memberships.clone(), invitations.clone());
        let err = action.execute(&bob(), &invite_id).await.unwrap_err();
        assert_eq!(err, InviteError::Expired);

        // still pending: expiry does not transition the record
        let invitation = invitations.find_by_id(&invite_id).await.unwrap().unwrap();
        assert_eq!(invitation.status, InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn test_accept_twice_conflicts() {
        let (organizations, memberships, invitations) = setup().await;
        let invite_id = seed_invitation(
            &invitations,
            "bob@example.com",
            Utc::now() + Duration::days(6),
        )
        .await;

        let action = AcceptInviteAction::new(organizations, memberships, invitations);
        action.execute(&bob(), &invite_id).await.unwrap();

        let err = action.execute(&bob(), &invite_id).await.unwrap_err();
        assert_eq!(err, InviteError::AlreadyUsed);
    }

    #[tokio::test]
    async fn test_accept_when_already_member() {
        let (organizations, memberships, invitations) = setup().await;
        memberships
            .create(CreateMembership {
                id: generate_id(),
                organization_id: "org-1".to_owned(),
                user_id: "user-bob".to_owned(),
                role_id: "role-member".to_owned(),
            })
            .await
            .unwrap();
        let invite_id = seed_invitation(
            &invitations,
            "bob@example.com",
            Utc::now() + Duration::days(6),
        )
        .await;

        let action = AcceptInviteAction::new(organizations, memberships, invitations);
        let err = action.execute(&bob(), &invite_id).await.unwrap_err();
        assert_eq!(err, InviteError::AlreadyMember);
    }
}
