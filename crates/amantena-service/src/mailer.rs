//! Invite mail delivery.
//!
//! Actual delivery mechanics (SMTP, a provider API) live behind the
//! [`InviteMailer`] trait outside this repository. The crate ships
//! [`LogMailer`], which writes the invite link to the log; useful in
//! development and as the default when no provider is wired up.

use tracing::info;

use amantena_core::Role;

/// Everything a mail template needs to render an invite.
#[derive(Debug, Clone)]
pub struct InviteMail {
    /// Recipient address (already normalized)
    pub to: String,

    /// Role the recipient will receive on registration
    pub role: Role,

    /// Display name of the admin who sent the invite
    pub inviter_name: String,

    /// Full registration link, token included
    pub register_url: String,
}

/// Dispatches invite mail.
///
/// Implementations report failure through `Err`; the invite services turn
/// that into `EmailDeliveryFailed` and compensate where required.
pub trait InviteMailer: Send + Sync {
    fn send_invite(
        &self,
        mail: &InviteMail,
    ) -> impl std::future::Future<Output = Result<(), String>> + Send;
}

/// Mailer that logs instead of sending.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl InviteMailer for LogMailer {
    async fn send_invite(&self, mail: &InviteMail) -> Result<(), String> {
        info!(
            to = %mail.to,
            role = %mail.role,
            url = %mail.register_url,
            "Invite mail (log-only delivery)"
        );
        Ok(())
    }
}
