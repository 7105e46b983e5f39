//! Message Handler module for processing bot commands

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use teloxide::utils::html::escape;
use tracing::{debug, error, info, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

use crate::errors::StorageError;

use super::access::check_access;
use super::dialogue_manager::WavesWizard;
use super::ui_builder::format_saved_summary;
use super::WavesState;

/// Commands understood by the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Wave planner commands:")]
pub enum Command {
    #[command(description = "open the wave planner")]
    Waves,
    #[command(description = "show the saved wave list")]
    WaveSummary,
    #[command(description = "show this help")]
    Help,
}

/// Entry point for bot commands; failures are logged, never propagated
pub async fn message_handler(bot: Bot, msg: Message, cmd: Command, state: WavesState) -> Result<()> {
    debug!(chat_id = %msg.chat.id, command = ?cmd, "Received command");

    let result = match cmd {
        Command::Waves => start_wizard(&bot, &msg, &state).await,
        Command::WaveSummary => send_summary(&bot, &msg, &state).await,
        Command::Help => send_help(&bot, &msg).await,
    };
    if let Err(e) = result {
        error!(chat_id = %msg.chat.id, command = ?cmd, error = %e, "Failed to handle command");
    }
    Ok(())
}

async fn send_help(bot: &Bot, msg: &Message) -> Result<()> {
    let language_code = msg.from.as_ref().and_then(|user| user.language_code.as_deref());
    bot.send_message(msg.chat.id, t_lang("help-text", language_code))
        .await?;
    Ok(())
}

/// `/waves`: replace any previous session and show the START menu
async fn start_wizard(bot: &Bot, msg: &Message, state: &WavesState) -> Result<()> {
    if !check_access(bot, msg, &state.access).await? {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let language_code = user.language_code.clone();

    let catalog = match state.catalog.load().await {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Failed to load wave catalog");
            bot.send_message(
                msg.chat.id,
                t_lang("notice-catalog-unavailable", language_code.as_deref()),
            )
            .await?;
            return Ok(());
        }
    };

    let (previous, menu) = {
        let mut sessions = state.sessions.lock().await;
        let (previous, session) = sessions.start(user.id, msg.chat.id);
        session.language_code = language_code.clone();
        let menu = WavesWizard::new(&catalog, &state.store).open(session)?;
        (previous, menu)
    };

    if let Some(previous) = previous {
        if let Some(old_message) = previous.message_id {
            if let Err(e) = bot.delete_message(previous.chat_id, old_message).await {
                debug!(user_id = %user.id, message_id = old_message.0, error = %e, "Failed to delete previous wizard menu");
            }
        }
    }

    let sent = bot
        .send_message(msg.chat.id, menu.text)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu.keyboard)
        .await?;

    state
        .sessions
        .lock()
        .await
        .get_or_create(user.id, msg.chat.id)
        .message_id = Some(sent.id);

    info!(user_id = %user.id, message_id = sent.id.0, "Wave wizard started");
    Ok(())
}

/// `/wavesummary`: HTML rendering of the saved configuration
async fn send_summary(bot: &Bot, msg: &Message, state: &WavesState) -> Result<()> {
    let language_code = msg.from.as_ref().and_then(|user| user.language_code.as_deref());

    let text = match state.store.read() {
        Ok(saved) => format_saved_summary(&saved, language_code),
        Err(StorageError::NotFound(_)) => t_lang("summary-missing", language_code),
        Err(e) => {
            warn!(chat_id = %msg.chat.id, error = %e, "Failed to read saved waves");
            t_args_lang("summary-error", &[("detail", &escape(&e.to_string()))], language_code)
        }
    };

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}
