//! Invitation email content.

use super::InviteEmail;

/// Rendered subject and body parts for an invitation email.
pub struct InviteEmailContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl InviteEmailContent {
    /// Render the invitation notification.
    pub fn new(email: &InviteEmail) -> Self {
        Self {
            subject: format!("You've been invited to join {}", email.organization_name),
            text: Self::text_template(email),
            html: Self::html_template(email),
        }
    }

    fn text_template(email: &InviteEmail) -> String {
        format!(
            r#"You've been invited to join {organization}

{inviter} has invited you to join their organization as a {role}.

Accept the invitation here:

{url}

This invitation will expire in 7 days.

If you didn't expect this invitation, you can safely ignore this email."#,
            organization = email.organization_name,
            inviter = email.inviter_name,
            role = email.role_name,
            url = email.accept_url,
        )
    }

    fn html_template(email: &InviteEmail) -> String {
        format!(
            r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>You've been invited to join {organization}</h2>
  <p>{inviter} has invited you to join their organization as a <strong>{role}</strong>.</p>
  <p>Click the link below to accept the invitation:</p>
  <a href="{url}" style="display: inline-block; padding: 12px 24px; background-color: #0070f3; color: white; text-decoration: none; border-radius: 6px; margin: 16px 0;">
    Accept Invitation
  </a>
  <p style="color: #666; font-size: 14px;">This invitation will expire in 7 days.</p>
  <p style="color: #666; font-size: 14px;">If you didn't expect this invitation, you can safely ignore this email.</p>
</div>"#,
            organization = email.organization_name,
            inviter = email.inviter_name,
            role = email.role_name,
            url = email.accept_url,
        )
    }
}
