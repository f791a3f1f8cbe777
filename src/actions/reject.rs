use crate::repository::InvitationRepository;
use crate::types::{InvitationStatus, Principal};
use crate::InviteError;

/// Action to reject an invitation.
///
/// Same identity and status checks as acceptance, with one deliberate
/// difference: expiration is not checked, so an invitee can clear an
/// expired invitation out of their inbox.
pub struct RejectInviteAction<I>
where
    I: InvitationRepository,
{
    invitations: I,
}

impl<I> RejectInviteAction<I>
where
    I: InvitationRepository,
{
    /// Creates a new `RejectInviteAction`.
    pub fn new(invitations: I) -> Self {
        Self { invitations }
    }

    /// Rejects an invitation on behalf of the caller.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Invitation is now rejected
    /// - `Err(InviteError::NotFound)` - Invitation does not exist
    /// - `Err(InviteError::EmailMismatch)` - Addressed to a different email
    /// - `Err(InviteError::AlreadyUsed)` - Invitation is not pending
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "reject_invite", skip_all, err)
    )]
    pub async fn execute(&self, principal: &Principal, invite_id: &str) -> Result<(), InviteError> {
        let invitation = self
            .invitations
            .find_by_id(invite_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        if invitation.email != principal.email {
            return Err(InviteError::EmailMismatch);
        }

        if invitation.status != InvitationStatus::Pending {
            return Err(InviteError::AlreadyUsed);
        }

        let flipped = self
            .invitations
            .transition_status(
                &invitation.id,
                InvitationStatus::Pending,
                InvitationStatus::Rejected,
            )
            .await?;
        if !flipped {
            // a concurrent accept or reject won the race
            return Err(InviteError::AlreadyUsed);
        }

        log::info!(
            target: "anteroom",
            "msg=\"invitation rejected\", organization_id={}, invitation_id={}",
            invitation.organization_id,
            invitation.id
        );

        Ok(())
    }
}
