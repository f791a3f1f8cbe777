mod accept;
mod queries;
mod reject;
mod send;

pub use accept::AcceptInviteAction;
pub use queries::InviteQueries;
pub use reject::RejectInviteAction;
pub use send::{SendInviteAction, SendInviteInput};
