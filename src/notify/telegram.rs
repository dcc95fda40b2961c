//! Telegram operator channel.
//!
//! `TelegramNotifier` pushes signal alerts with inline Yes/No buttons.
//! `run_dispatcher` listens for operator commands and button presses from
//! the configured chat and routes them to the engine.

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::{error, info, warn};

use super::command::{bot_commands, command_help, parse_command, CommandParseError};
use super::{Choice, Notifier};
use crate::config::AppConfig;
use crate::engine::SignalEngine;

/// Telegram connection settings.
#[derive(Debug)]
pub struct TelegramConfig {
    /// Bot API token obtained from BotFather.
    pub bot_token: SecretString,
    /// The operator's chat. Only this chat may issue commands.
    pub chat_id: i64,
}

impl TelegramConfig {
    /// Build from the named environment variables.
    ///
    /// Returns `None` if either variable is missing or the chat id is not
    /// a number.
    pub fn from_env(token_env: &str, chat_id_env: &str) -> Option<Self> {
        let bot_token = AppConfig::resolve_env(token_env).ok().filter(|t| !t.is_empty())?;
        let chat_id = AppConfig::resolve_env(chat_id_env).ok()?.trim().parse().ok()?;
        Some(Self {
            bot_token: SecretString::new(bot_token),
            chat_id,
        })
    }

    pub fn bot(&self) -> Bot {
        Bot::new(self.bot_token.expose_secret())
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Sends operator notifications to a single Telegram chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str, choices: Option<&[Choice]>) -> Result<()> {
        let mut request = self.bot.send_message(self.chat_id, text);
        if let Some(choices) = choices {
            request = request.reply_markup(keyboard(choices));
        }
        request.await.context("Failed to send Telegram message")?;
        Ok(())
    }
}

/// Lay choices out as a single row of inline buttons.
fn keyboard(choices: &[Choice]) -> InlineKeyboardMarkup {
    let row: Vec<InlineKeyboardButton> = choices
        .iter()
        .map(|c| InlineKeyboardButton::callback(c.label.clone(), c.token.clone()))
        .collect();
    InlineKeyboardMarkup::new(vec![row])
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Listen for commands and confirmation button presses until shutdown.
pub async fn run_dispatcher(bot: Bot, chat_id: i64, engine: Arc<SignalEngine>) {
    if let Err(e) = register_bot_commands(&bot).await {
        warn!(error = %e, "Failed to register bot commands with Telegram");
    }

    let allowed_chat = ChatId(chat_id);
    info!(chat_id, "Telegram listener started");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine, allowed_chat])
        .default_handler(|_| async {})
        .build()
        .dispatch()
        .await;

    warn!("Telegram listener stopped");
}

async fn on_message(
    bot: Bot,
    msg: Message,
    engine: Arc<SignalEngine>,
    allowed_chat: ChatId,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if let Some(response) = command_response(text, msg.chat.id, allowed_chat, &engine).await {
        if let Err(e) = bot.send_message(msg.chat.id, response).await {
            error!(error = %e, "Failed to send command response");
        }
    }
    Ok(())
}

async fn on_callback(
    bot: Bot,
    query: CallbackQuery,
    engine: Arc<SignalEngine>,
    allowed_chat: ChatId,
) -> ResponseResult<()> {
    // Stop the button spinner regardless of what happens next.
    bot.answer_callback_query(query.id.clone()).await?;

    let Some(message) = query.regular_message() else {
        return Ok(());
    };
    if !is_authorized_chat(message.chat.id, allowed_chat) {
        return Ok(());
    }
    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };

    let reply = engine.handle_choice(data).await;
    if let Err(e) = bot.edit_message_text(message.chat.id, message.id, reply).await {
        error!(error = %e, "Failed to edit confirmation message");
    }
    Ok(())
}

/// Reply for a chat message, or `None` if it should be ignored.
///
/// Ignores unauthorized chats and plain (non-command) text.
pub async fn command_response(
    text: &str,
    incoming_chat: ChatId,
    allowed_chat: ChatId,
    engine: &SignalEngine,
) -> Option<String> {
    if !is_authorized_chat(incoming_chat, allowed_chat) {
        return None;
    }

    match parse_command(text) {
        Ok(command) => Some(engine.execute(command).await),
        Err(CommandParseError::NotACommand) => None,
        Err(err) => Some(format!("Invalid command: {err}\n\n{}", command_help())),
    }
}

fn is_authorized_chat(incoming_chat: ChatId, allowed_chat: ChatId) -> bool {
    if incoming_chat == allowed_chat {
        return true;
    }
    warn!(chat_id = incoming_chat.0, "Ignoring Telegram update from unauthorized chat");
    false
}

async fn register_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands: Vec<BotCommand> = bot_commands()
        .into_iter()
        .map(|(cmd, desc)| BotCommand::new(cmd, desc))
        .collect();

    bot.set_my_commands(commands).await?;
    info!("Registered bot commands with Telegram");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
