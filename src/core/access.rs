// Access gate: admin identity and force-subscribe membership

use log::warn;

use crate::core::messenger::{ChatRef, Messenger};
use crate::core::settings::SettingsStore;
use crate::error::{AuthorizationError, SettingsError};

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(AuthorizationError),
}

pub struct AccessGate<'a> {
    admin_ids: &'a [i64],
    settings: &'a SettingsStore,
}

impl<'a> AccessGate<'a> {
    pub fn new(admin_ids: &'a [i64], settings: &'a SettingsStore) -> Self {
        Self {
            admin_ids,
            settings,
        }
    }

    /// Decides whether `user_id` may run an admin command or the link pipeline
    ///
    /// Admin commands only check the admin list. Everything else passes when
    /// no force-subscribe channel is configured, and otherwise requires the
    /// user to be a member of that channel.
    pub async fn authorize(
        &self,
        messenger: &dyn Messenger,
        user_id: i64,
        is_admin_command: bool,
    ) -> Result<Verdict, SettingsError> {
        if is_admin_command {
            return Ok(if self.admin_ids.contains(&user_id) {
                Verdict::Allow
            } else {
                Verdict::Deny(AuthorizationError::NotAdmin)
            });
        }

        let Some(channel) = self.settings.force_sub_channel()? else {
            return Ok(Verdict::Allow);
        };

        let Some(chat) = ChatRef::parse(&channel) else {
            warn!("Stored force-sub channel is invalid: {}", channel);
            return Ok(Verdict::Deny(AuthorizationError::MembershipUnverifiable {
                channel,
                reason: "invalid channel reference".to_string(),
            }));
        };

        match messenger.is_member(&chat, user_id).await {
            Ok(true) => Ok(Verdict::Allow),
            Ok(false) => Ok(Verdict::Deny(AuthorizationError::NotSubscribed { channel })),
            Err(e) => {
                warn!("Force-sub check failed for user {}: {}", user_id, e);
                Ok(Verdict::Deny(AuthorizationError::MembershipUnverifiable {
                    channel,
                    reason: e.to_string(),
                }))
            }
        }
    }
}
