//! Access module: who may open the wave wizard

use teloxide::prelude::*;
use teloxide::types::User;
use tracing::{info, warn};

use crate::config::AccessConfig;
use crate::localization::t_lang;

/// Why a `/waves` request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    NotPrivateChat,
    UnknownUser,
    NotAdministrator,
}

impl AccessDenied {
    pub fn message_key(self) -> &'static str {
        match self {
            AccessDenied::NotPrivateChat => "access-private-only",
            AccessDenied::UnknownUser => "access-unknown-user",
            AccessDenied::NotAdministrator => "access-denied",
        }
    }
}

/// Checks that need no gateway round trip
///
/// Returns `Ok(true)` when the user is allowlisted, `Ok(false)` when group
/// membership still has to be checked.
pub fn precheck(msg: &Message, access: &AccessConfig) -> Result<bool, AccessDenied> {
    if !msg.chat.is_private() {
        return Err(AccessDenied::NotPrivateChat);
    }
    let user = msg.from.as_ref().ok_or(AccessDenied::UnknownUser)?;
    Ok(access.allowed_user_ids.contains(&user.id))
}

/// Whether `user` administers or owns one of the configured groups
pub async fn is_group_admin(bot: &Bot, user: &User, access: &AccessConfig) -> bool {
    for chat_id in &access.admin_group_ids {
        match bot.get_chat_member(*chat_id, user.id).await {
            Ok(member) if member.is_privileged() => return true,
            Ok(_) => {}
            Err(e) => {
                warn!(user_id = %user.id, chat_id = %chat_id, error = %e, "Failed to check chat membership");
            }
        }
    }
    false
}

/// Full authorization gate; replies with the refusal reason when denied
pub async fn check_access(bot: &Bot, msg: &Message, access: &AccessConfig) -> ResponseResult<bool> {
    let language_code = msg.from.as_ref().and_then(|user| user.language_code.as_deref());

    let denied = match precheck(msg, access) {
        Ok(true) => return Ok(true),
        Ok(false) => match &msg.from {
            Some(user) if is_group_admin(bot, user, access).await => return Ok(true),
            _ => AccessDenied::NotAdministrator,
        },
        Err(denied) => denied,
    };

    info!(chat_id = %msg.chat.id, reason = ?denied, "Wave wizard access refused");
    bot.send_message(msg.chat.id, t_lang(denied.message_key(), language_code))
        .await?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusals_are_translated() {
        for denied in [
            AccessDenied::NotPrivateChat,
            AccessDenied::UnknownUser,
            AccessDenied::NotAdministrator,
        ] {
            let text = t_lang(denied.message_key(), Some("ru"));
            assert!(!text.starts_with("Missing translation"), "{denied:?}");
        }
    }
}
