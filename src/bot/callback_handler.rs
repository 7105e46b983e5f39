//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::{ApiError, RequestError};
use tracing::{debug, error};

// Import localization
use crate::localization::t_lang;

use super::dialogue_manager::{EventOutcome, Notice, WavesWizard};
use super::WavesState;

/// Handle callback queries from the wizard menu
///
/// Telegram API failures are logged here and never reach the dispatcher.
pub async fn callback_handler(bot: Bot, q: CallbackQuery, state: WavesState) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    if let Err(e) = handle_callback(&bot, &q, &state).await {
        error!(user_id = %q.from.id, error = %e, "Failed to handle wizard callback");
    }
    Ok(())
}

async fn handle_callback(bot: &Bot, q: &CallbackQuery, state: &WavesState) -> Result<()> {
    let data = q.data.as_deref().unwrap_or("");
    let Some(message) = &q.message else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    let catalog = match state.catalog.load().await {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(user_id = %q.from.id, error = %e, "Failed to load wave catalog");
            let notice = Notice::alert(t_lang(
                "notice-catalog-unavailable",
                q.from.language_code.as_deref(),
            ));
            answer(bot, q, Some(notice)).await?;
            return Ok(());
        }
    };

    let outcome = {
        let mut sessions = state.sessions.lock().await;
        WavesWizard::new(&catalog, &state.store).handle_event(&mut sessions, q.from.id, message_id, data)
    };

    match outcome {
        EventOutcome::Ignored => answer(bot, q, None).await?,
        EventOutcome::Rejected(notice) => answer(bot, q, Some(notice)).await?,
        EventOutcome::Redraw { menu, notice } => {
            match bot
                .edit_message_text(chat_id, message_id, menu.text)
                .parse_mode(ParseMode::Html)
                .reply_markup(menu.keyboard)
                .await
            {
                Ok(_) => {}
                Err(RequestError::Api(ApiError::MessageNotModified)) => {
                    debug!(user_id = %q.from.id, "Wizard menu unchanged");
                }
                Err(e) => {
                    error!(user_id = %q.from.id, error = %e, "Failed to edit wizard menu");
                }
            }
            answer(bot, q, notice).await?;
        }
        EventOutcome::Closed {
            chat_id,
            message_id: Some(message_id),
        } => {
            if let Err(e) = bot.delete_message(chat_id, message_id).await {
                debug!(user_id = %q.from.id, error = %e, "Failed to delete wizard menu");
            }
            answer(bot, q, None).await?;
        }
        EventOutcome::Closed { message_id: None, .. } => answer(bot, q, None).await?,
    }

    Ok(())
}

/// Answer the callback query to remove the loading state
async fn answer(bot: &Bot, q: &CallbackQuery, notice: Option<Notice>) -> Result<()> {
    let request = bot.answer_callback_query(q.id.clone());
    match notice {
        Some(notice) => {
            request.text(notice.text).show_alert(notice.alert).await?;
        }
        None => {
            request.await?;
        }
    }
    Ok(())
}
