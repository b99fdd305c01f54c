use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{debug, error, info};
use url::Url;

use crate::config::Config;
use crate::report;
use crate::speedtest::{SpeedtestError, SpeedtestResult, SpeedtestRunner};

const START_TEXT: &str =
    "Hello! I am your bot. Use /speedtest to check internet speed or /help to see all commands.";

const PLACEHOLDER_TEXT: &str = "<i>Initiating Speedtest...</i>";

const SERVER_UNAVAILABLE_TEXT: &str =
    "<b>ERROR:</b> <i>Can't connect to the server at the moment. Try again later!</i>";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available Commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Show this help")]
    Help,
    #[command(description = "Check internet speed")]
    Speedtest,
}

/// Shared application state
pub struct AppState {
    runner: SpeedtestRunner,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            runner: SpeedtestRunner::new(&config.speedtest),
        }
    }
}

/// Start the Telegram bot
pub async fn run(config: Config) -> Result<()> {
    let bot = Bot::new(&config.telegram.bot_token);
    let state = Arc::new(AppState::new(&config));

    info!("Starting Telegram bot...");

    // Commands dispatch by name; remaining plain text is echoed. Messages
    // that look like commands but parse as none of ours fall through to the
    // default handler and are ignored.
    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some_and(is_plain_text)).endpoint(echo),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("Ignoring update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("speedbot"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn is_plain_text(text: &str) -> bool {
    !text.starts_with('/')
}

fn sender_id(msg: &Message) -> u64 {
    msg.from.as_ref().map(|user| user.id.0).unwrap_or_default()
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => {
            info!("User {} used /start command", sender_id(&msg));
            bot.send_message(msg.chat.id, START_TEXT).await?;
        }
        Command::Help => {
            info!("User {} used /help command", sender_id(&msg));
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Speedtest => {
            info!("User {} used /speedtest command", sender_id(&msg));
            run_speedtest(&bot, &msg, &state).await?;
        }
    }
    Ok(())
}

/// Run one measurement and reply with the outcome.
///
/// The placeholder sent up front is deleted on success (replaced by the
/// photo) or edited in place on failure, so every invocation ends with
/// exactly one visible reply.
async fn run_speedtest(bot: &Bot, msg: &Message, state: &AppState) -> ResponseResult<()> {
    let placeholder = bot
        .send_message(msg.chat.id, PLACEHOLDER_TEXT)
        .parse_mode(ParseMode::Html)
        .await?;

    let outcome = state.runner.run().await.and_then(|result| {
        let share = Url::parse(&result.share).map_err(|e| {
            SpeedtestError::Failed(format!("unusable share link {:?}: {e}", result.share))
        })?;
        Ok((result, share))
    });

    match outcome {
        Ok((result, share)) => {
            send_report(bot, msg, &result, share).await?;
            bot.delete_message(msg.chat.id, placeholder.id).await?;
        }
        Err(SpeedtestError::ConfigRetrieval) => {
            bot.edit_message_text(msg.chat.id, placeholder.id, SERVER_UNAVAILABLE_TEXT)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Err(err) => {
            error!("Speedtest error: {}", err);
            let text = format!("<b>ERROR:</b> {}", html::escape(&err.to_string()));
            bot.edit_message_text(msg.chat.id, placeholder.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }

    Ok(())
}

async fn send_report(
    bot: &Bot,
    msg: &Message,
    result: &SpeedtestResult,
    share: Url,
) -> ResponseResult<()> {
    bot.send_photo(msg.chat.id, InputFile::url(share))
        .caption(report::build_report(result))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn echo(bot: Bot, msg: Message) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    info!("User {} sent a message: {}", sender_id(&msg), text);
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
