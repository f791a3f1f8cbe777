//! `SQLite` repository implementations backed by `sqlx`.
//!
//! The schema lives in `migrations_sqlite/` and is applied with
//! [`migrations::run`]. Uniqueness invariants (one pending invitation per
//! organization/email, one membership per organization/user) are enforced
//! by indexes, so they hold even when the service-level pre-checks race.

pub mod migrations;

mod invitation;
mod membership;
mod organization;
mod role;
mod user;

pub use invitation::SqliteInvitationRepository;
pub use membership::SqliteMembershipRepository;
pub use organization::SqliteOrganizationRepository;
pub use role::SqliteRoleRepository;
pub use user::SqliteUserRepository;
