//! Invitation-based organization membership.
//!
//! anteroom implements the membership core of a multi-tenant application:
//! time-boxed invitations addressed to an email, role-scoped permission
//! checks, and the membership records created when an invitation is
//! accepted. Storage and mail delivery are abstracted behind traits so the
//! crate can be wired to any backend; an `SQLite` implementation
//! (`sqlx_sqlite` feature), an SMTP mailer (`smtp` feature), and in-memory
//! mocks (`mocks` feature, on by default) are bundled.
//!
//! The lifecycle is a small state machine: an invitation is created
//! `pending` and transitions exactly once to `accepted` or `rejected`.
//! Acceptance materializes a membership carrying the invitation's role.
//! Every caller-facing operation takes an explicit [`Principal`] rather
//! than resolving identity from ambient state.

pub mod actions;
pub mod config;
pub mod ident;
pub mod mailer;
pub mod permissions;
pub mod repository;
pub mod types;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(feature = "sqlx_sqlite")]
pub mod sqlite;

pub use actions::{
    AcceptInviteAction, InviteQueries, RejectInviteAction, SendInviteAction, SendInviteInput,
};
pub use config::InviteConfig;
pub use mailer::{InviteEmail, Mailer, MailerError};
pub use permissions::{PermissionChecker, PermissionCode};
pub use repository::{
    CreateInvitation, CreateMembership, CreateOrganization, CreateRole, CreateUser,
    InvitationRepository, MembershipRepository, OrganizationRepository, RoleRepository,
    UserRepository,
};
pub use types::{
    AcceptedInvite, Invitation, InvitationStatus, InviteDetail, Membership, OrgUser, Organization,
    PendingInvite, Principal, Role, RoleSummary, UserInvite,
};

#[cfg(any(test, feature = "mocks"))]
pub use mailer::MockMailer;
#[cfg(any(test, feature = "mocks"))]
pub use mocks::{
    MockInvitationRepository, MockMembershipRepository, MockOrganizationRepository,
    MockRoleRepository, MockUserRepository,
};

use std::fmt;

/// Errors surfaced by invitation and permission operations.
///
/// `Display` renders the message shown to end users. `Unauthorized` is
/// intentionally generic so a caller probing ids cannot learn whether a
/// resource exists; conflict and validation variants carry a
/// human-readable reason. Lower-layer failures are wrapped in
/// `DatabaseError`/`MailFailed` so raw driver detail never crosses the
/// interface boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteError {
    Unauthorized,
    InvalidRole,
    NotFound,
    EmailMismatch,
    AlreadyUsed,
    Expired,
    AlreadyMember,
    DuplicateInvite,
    MailFailed(String),
    DatabaseError(String),
}

impl std::error::Error for InviteError {}

impl fmt::Display for InviteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InviteError::Unauthorized => write!(f, "Unauthorized"),
            InviteError::InvalidRole => write!(f, "Invalid role for this organization"),
            InviteError::NotFound => write!(f, "Invitation not found"),
            InviteError::EmailMismatch => {
                write!(f, "This invitation is for a different email address")
            }
            InviteError::AlreadyUsed => write!(f, "This invitation has already been used"),
            InviteError::Expired => write!(f, "This invitation has expired"),
            InviteError::AlreadyMember => {
                write!(f, "You are already a member of this organization")
            }
            InviteError::DuplicateInvite => {
                write!(f, "An invitation has already been sent to this email")
            }
            InviteError::MailFailed(_) => write!(f, "Failed to send invitation email"),
            InviteError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
        }
    }
}
