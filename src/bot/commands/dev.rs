//! Owner tools: script eval, self update and error log.

pub mod console;

use log::info;
use poise::Command;
use tokio::process::Command as ProcessCommand;

use crate::bot::Data;
use crate::bot::checks;
use crate::bot::checks::Privilege;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::commands::dev::console::EvalOutcome;
use crate::bot::commands::dev::console::EvalScope;
use crate::bot::commands::dev::console::cleanup_code;
use crate::bot::reply;
use crate::model::BotLogModel;

pub struct DevCog;

impl DevCog {
    /// Evaluate a script
    ///
    /// `guild_id`, `channel_id`, `author_id` and `message_id` are in scope,
    /// and `__` holds the last result.
    #[poise::command(prefix_command, category = "Dev")]
    pub async fn eval(
        ctx: Context<'_>,
        #[description = "Script to run"]
        #[rest]
        body: String,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Owner).await?;

        let message_id = match ctx {
            poise::Context::Prefix(prefix_ctx) => prefix_ctx.msg.id.get(),
            poise::Context::Application(_) => 0,
        };
        let ids = EvalScope {
            guild_id: ctx.guild_id().map(|id| id.get()),
            channel_id: ctx.channel_id().get(),
            author_id: ctx.author().id.get(),
            message_id,
        };

        let code = cleanup_code(&body);
        match ctx.data().console.eval(code, ids).await? {
            EvalOutcome::Value { output, value } => {
                reply::codeblock(ctx, &format!("{output}{value}"), "rust").await?;
            }
            EvalOutcome::Unit { output } => {
                if output.is_empty() {
                    reply::ok(ctx).await?;
                } else {
                    reply::codeblock(ctx, &output, "rust").await?;
                }
            }
            EvalOutcome::Failed { output, error } => {
                reply::codeblock(ctx, &format!("{output}{error}"), "rust").await?;
            }
            EvalOutcome::Cancelled => {}
        }
        Ok(())
    }

    /// Cancel the running eval
    #[poise::command(prefix_command, category = "Dev")]
    pub async fn stopeval(ctx: Context<'_>) -> Result<(), Error> {
        checks::require(ctx, Privilege::Owner).await?;
        if ctx.data().console.stop() {
            reply::success(ctx, "Last eval cancelled", None).await?;
        } else {
            reply::error(ctx, "No ongoing eval task.", None).await?;
        }
        Ok(())
    }

    /// Git commands on the bot's checkout
    #[poise::command(prefix_command, subcommands("Self::pull"), category = "Dev")]
    pub async fn git(ctx: Context<'_>) -> Result<(), Error> {
        checks::require(ctx, Privilege::Owner).await?;
        reply::help(ctx, "Subcommands", Some("`pull`")).await?;
        Ok(())
    }

    /// Pull the latest changes
    #[poise::command(prefix_command, category = "Dev")]
    pub async fn pull(ctx: Context<'_>) -> Result<(), Error> {
        checks::require(ctx, Privilege::Owner).await?;
        ctx.defer_or_broadcast().await?;

        let output = ProcessCommand::new("git").arg("pull").output().await?;
        info!("git pull exited with {}", output.status);
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        reply::codeblock(ctx, &text, "").await?;
        Ok(())
    }

    /// Show the latest logged errors
    #[poise::command(prefix_command, aliases("exc"), category = "Dev")]
    pub async fn last_exception(
        ctx: Context<'_>,
        #[description = "How many errors to show"] count: Option<i64>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::CoOwner).await?;
        let count = count.unwrap_or(1).clamp(1, 20);
        let records = ctx.data().db.bot_logs.recent_by_level("ERROR", count).await?;
        if records.is_empty() {
            reply::info(ctx, "No errors logged.", None).await?;
            return Ok(());
        }
        reply::codeblock(ctx, &exception_report(&records), "").await?;
        Ok(())
    }
}

impl Cog for DevCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![
            Self::eval(),
            Self::stopeval(),
            Self::git(),
            Self::last_exception(),
        ]
    }
}

/// Header line, message or traceback, then a separator per record.
pub fn exception_report(records: &[BotLogModel]) -> String {
    let mut lines = Vec::new();
    for record in records {
        let mut details = Vec::new();
        if let Some(module) = record.module.as_deref().filter(|m| !m.is_empty()) {
            details.push(format!("Module: {module}"));
        }
        if let Some(func) = record.func_name.as_deref() {
            details.push(format!("Function: {func}"));
        }
        details.push(record.created.format("%Y-%m-%d %H:%M:%S").to_string());
        lines.push(details.join(" | "));
        lines.push(
            record
                .traceback
                .clone()
                .unwrap_or_else(|| record.message.clone()),
        );
        lines.push("-".repeat(40));
    }
    lines.join("\n")
}
