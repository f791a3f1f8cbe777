//! Core types for organization membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant: the unit that owns projects, roles, and memberships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier.
    pub id: String,
    /// Human-readable organization name.
    pub name: String,
    /// URL-friendly unique identifier.
    pub slug: String,
    /// When the organization was created.
    pub created_at: DateTime<Utc>,
}

/// A user record as seen by this crate.
///
/// Accounts are owned by the authentication provider; this is the
/// read-side projection used for email lookups and display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgUser {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email address.
    pub email: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// A named role scoped to exactly one organization.
///
/// Capabilities are attached to roles through permission bindings; the
/// permission chain resolves roles by id, so two roles in the same
/// organization may share a name without ambiguity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier.
    pub id: String,
    /// The organization this role belongs to.
    pub organization_id: String,
    /// Human-readable role name.
    pub name: String,
}

/// Lifecycle state of an invitation.
///
/// `Pending` is the only state that permits a transition; `Accepted` and
/// `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    /// Convert to string for database storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Parse from database string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// A time-boxed offer of organizational membership addressed to an email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    /// Unique identifier; also the credential embedded in the acceptance link.
    pub id: String,
    /// The organization being invited to.
    pub organization_id: String,
    /// Email of the invitee.
    pub email: String,
    /// Role to assign when accepted.
    pub role_id: String,
    /// Current lifecycle state.
    pub status: InvitationStatus,
    /// User ID of who sent the invitation.
    pub inviter_id: String,
    /// When the invitation expires.
    pub expires_at: DateTime<Utc>,
    /// When the invitation was created.
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// Check if the invitation has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Check if the invitation can still be acted on.
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}

/// The durable grant of a user's participation in an organization.
///
/// At most one membership may exist per (organization, user) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Unique identifier.
    pub id: String,
    /// The organization this membership belongs to.
    pub organization_id: String,
    /// The user who is a member.
    pub user_id: String,
    /// The role held within the organization.
    pub role_id: String,
    /// When the user joined.
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity behind a request.
///
/// Resolved by the enclosing application's authentication provider and
/// passed explicitly into every operation that acts on a caller's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

/// Role id and name, as offered in the invite dialog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: String,
    pub name: String,
}

/// Everything the acceptance page needs to render an invitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteDetail {
    pub id: String,
    pub email: String,
    pub role_name: String,
    pub organization_name: String,
    pub inviter_name: String,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
}

/// An entry in the admin view of outstanding invitations.
///
/// Expired-but-pending invitations are included; the presentation layer
/// marks them using `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInvite {
    pub id: String,
    pub email: String,
    pub role_name: String,
    pub inviter_name: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An entry in a user's invitation inbox. Expired invitations are hidden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInvite {
    pub id: String,
    pub organization_name: String,
    pub role_name: String,
    pub inviter_name: String,
    pub expires_at: DateTime<Utc>,
}

/// Organization identity returned after a successful acceptance, for
/// redirect purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedInvite {
    pub organization_id: String,
    pub organization_name: String,
    pub organization_slug: String,
}
