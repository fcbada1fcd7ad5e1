//! Error handling for Discord bot commands.

use log::error;
use log::warn;
use poise::CreateReply;
use poise::FrameworkError;

use crate::bot::Data;
use crate::bot::Error;
use crate::bot::error::BotError;
use crate::bot::log_command;
use crate::bot::reply::ReplyKind;
use crate::bot::reply::kind_embed;
use crate::error::AppError;
use crate::service::error::ServiceError;

/// Handles framework errors and sends appropriate responses to users.
pub struct ErrorHandler;

impl ErrorHandler {
    /// Handles a framework error by classifying and responding appropriately.
    pub async fn handle(error: FrameworkError<'_, Data, Error>) {
        match error {
            FrameworkError::Command { error, ctx, .. } => {
                log_command(ctx, true).await;
                let (kind, title, description) = Self::classify_error(&error, &ctx);
                Self::send_embed(&ctx, kind, title, &description).await;
            }
            FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                let usage = format!(
                    "Use `{}help {}` for usage information.",
                    ctx.prefix(),
                    ctx.command().qualified_name
                );
                let issue = match input {
                    Some(input) => format!("Could not parse `{input}`: {error}\n\n{usage}"),
                    None => format!("{error}\n\n{usage}"),
                };
                Self::send_embed(&ctx, ReplyKind::Warning, "Invalid Arguments", &issue).await;
            }
            FrameworkError::NotAnOwner { ctx, .. } => {
                Self::send_embed(
                    &ctx,
                    ReplyKind::Error,
                    "Permission Denied",
                    "Only the bot owner can use this command.",
                )
                .await;
            }
            FrameworkError::GuildOnly { ctx, .. } => {
                Self::send_embed(
                    &ctx,
                    ReplyKind::Error,
                    "Guild Only",
                    &BotError::GuildOnlyCommand.to_string(),
                )
                .await;
            }
            FrameworkError::UnknownCommand { .. } => {}
            error => {
                if let Err(e) = poise::builtins::on_error(error).await {
                    error!("Error while handling error: {}", e);
                }
            }
        }
    }

    /// Classifies an error and returns the reply kind, title and description.
    fn classify_error(
        error: &Error,
        ctx: &poise::Context<'_, Data, Error>,
    ) -> (ReplyKind, &'static str, String) {
        if let Some(bot_error) = error.downcast_ref::<BotError>() {
            match bot_error {
                BotError::Timeout | BotError::Cancelled => {
                    (ReplyKind::Error, "Stopped", bot_error.to_string())
                }
                _ => (ReplyKind::Error, "Action Failed", bot_error.to_string()),
            }
        } else if let Some(service_error) = error.downcast_ref::<ServiceError>() {
            match service_error {
                ServiceError::DatabaseError(_) | ServiceError::UnexpectedResult { .. } => {
                    Self::internal(error, ctx)
                }
                _ => (ReplyKind::Error, "Action Failed", service_error.to_string()),
            }
        } else {
            Self::internal(error, ctx)
        }
    }

    fn internal(
        error: &Error,
        ctx: &poise::Context<'_, Data, Error>,
    ) -> (ReplyKind, &'static str, String) {
        let ref_id = AppError::log_with_ref(error.as_ref());
        warn!(
            "Unexpected error in command `{}` (ref: {ref_id})",
            ctx.command().qualified_name
        );
        (
            ReplyKind::Error,
            "Internal Error",
            format!(
                "An unexpected error occurred. Please contact the bot developer.\nReference ID: `{ref_id}`"
            ),
        )
    }

    async fn send_embed(
        ctx: &poise::Context<'_, Data, Error>,
        kind: ReplyKind,
        title: &str,
        description: &str,
    ) {
        let reply = CreateReply::default().embed(kind_embed(kind, title, Some(description)));
        if let Err(e) = ctx.send(reply).await {
            error!("Failed to send error reply: {e}");
        }
    }
}
