//! Configuration for the invitation lifecycle.

/// Settings that govern invitation creation and delivery.
///
/// # Example
///
/// ```rust
/// use anteroom::InviteConfig;
///
/// let config = InviteConfig {
///     expiry_days: 14,
///     ..Default::default()
/// };
/// assert_eq!(config.expiry_days, 14);
/// ```
#[derive(Debug, Clone)]
pub struct InviteConfig {
    /// Number of days until an invitation expires. Default: 7.
    ///
    /// Resending an invitation recomputes the expiry from the resend
    /// time; it does not extend the original window.
    pub expiry_days: i64,

    /// Base URL the acceptance link is built from.
    ///
    /// The link sent to an invitee is `{accept_base_url}/invites/{id}`.
    pub accept_base_url: String,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            expiry_days: 7,
            accept_base_url: "http://localhost:3000".to_owned(),
        }
    }
}

impl InviteConfig {
    /// Builds the acceptance URL for an invitation id.
    pub fn accept_url(&self, invite_id: &str) -> String {
        format!(
            "{}/invites/{invite_id}",
            self.accept_base_url.trim_end_matches('/')
        )
    }
}
