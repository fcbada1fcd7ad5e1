//! Prefix, guild settings, about and help.

use std::time::Duration;

use poise::Command;
use poise::serenity_prelude::CreateEmbed;
use sysinfo::System;
use sysinfo::get_current_pid;

use crate::bot::Data;
use crate::bot::checks;
use crate::bot::checks::Privilege;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::reply;
use crate::bot::reply::ReplyKind;

/// Cog of the commands every server needs.
pub struct CoreCog;

impl CoreCog {
    /// Show or change the command prefix of this server
    ///
    /// Pass `reset` to go back to the default prefix. Changing the prefix
    /// requires Admin.
    #[poise::command(prefix_command, guild_only, category = "Core")]
    pub async fn prefix(
        ctx: Context<'_>,
        #[description = "New prefix, or `reset`"] new_prefix: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = checks::guild_id(ctx)?.get();
        let settings = &ctx.data().services.settings;

        let Some(new_prefix) = new_prefix else {
            let current = settings.prefix_for(Some(guild_id));
            reply::info(ctx, &format!("Current prefix is `{current}`"), None).await?;
            return Ok(());
        };

        checks::require(ctx, Privilege::Admin).await?;
        if new_prefix.eq_ignore_ascii_case("reset") {
            settings.reset_prefix(guild_id).await?;
            let default = settings.default_prefix();
            reply::success(ctx, &format!("Prefix reset to `{default}`"), None).await?;
        } else {
            settings.set_prefix(guild_id, &new_prefix).await?;
            reply::success(ctx, &format!("Prefix set to `{new_prefix}`"), None).await?;
        }
        Ok(())
    }

    /// Show or change a server setting
    ///
    /// Without arguments lists every setting. With a key shows its value.
    /// With a key and a value sets it (Admin).
    #[poise::command(
        prefix_command,
        guild_only,
        subcommands("Self::delete"),
        category = "Core"
    )]
    pub async fn settings(
        ctx: Context<'_>,
        #[description = "Setting name"] key: Option<String>,
        #[description = "New value"]
        #[rest]
        value: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = checks::guild_id(ctx)?.get();
        let settings = &ctx.data().services.settings;

        let Some(key) = key else {
            let rows = settings.all_config(guild_id).await?;
            let listing = format_settings(&rows);
            reply::info(ctx, "Server Settings", Some(&listing)).await?;
            return Ok(());
        };

        match value {
            None => match settings.get_config(guild_id, &key).await? {
                Some(value) => {
                    reply::info(ctx, &key.to_lowercase(), Some(&format!("`{value}`"))).await?;
                }
                None => {
                    reply::warning(ctx, &format!("`{key}` is not set."), None).await?;
                }
            },
            Some(value) => {
                checks::require(ctx, Privilege::Admin).await?;
                settings.set_config(guild_id, &key, value.trim()).await?;
                reply::ok(ctx).await?;
            }
        }
        Ok(())
    }

    /// Remove a server setting
    #[poise::command(prefix_command, guild_only, category = "Core")]
    pub async fn delete(
        ctx: Context<'_>,
        #[description = "Setting name"] key: String,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let guild_id = checks::guild_id(ctx)?.get();
        if ctx
            .data()
            .services
            .settings
            .delete_config(guild_id, &key)
            .await?
        {
            reply::ok(ctx).await?;
        } else {
            reply::warning(ctx, &format!("`{key}` is not set."), None).await?;
        }
        Ok(())
    }

    /// Show information about the bot
    #[poise::command(prefix_command, category = "Core")]
    pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
        let uptime = ctx.data().start_time.elapsed();
        let guild_count = ctx.cache().guilds().len();
        let command_count = count_commands(&ctx.framework().options().commands);
        let memory_mb = process_memory_mb();

        let embed = CreateEmbed::new()
            .colour(ReplyKind::Info.colour())
            .title(format!("manibot v{}", env!("CARGO_PKG_VERSION")))
            .thumbnail(ctx.cache().current_user().face())
            .field("Uptime", format_uptime(uptime), true)
            .field("Servers", guild_count.to_string(), true)
            .field("Commands", command_count.to_string(), true)
            .field("Memory", format!("{memory_mb:.1} MB"), true);
        reply::embed(ctx, embed).await?;
        Ok(())
    }

    /// Show the list of commands, or help for one command
    #[poise::command(prefix_command, track_edits, category = "Core")]
    pub async fn help(
        ctx: Context<'_>,
        #[description = "Command to show help for"]
        #[rest]
        command: Option<String>,
    ) -> Result<(), Error> {
        let bottom = format!(
            "Type {}help <command> for more info on a command.",
            ctx.prefix()
        );
        let config = poise::builtins::HelpConfiguration {
            extra_text_at_bottom: &bottom,
            ..Default::default()
        };
        poise::builtins::help(ctx, command.as_deref(), config).await?;
        Ok(())
    }
}

impl Cog for CoreCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::prefix(), Self::settings(), Self::about(), Self::help()]
    }
}

fn format_settings(rows: &[(String, String)]) -> String {
    if rows.is_empty() {
        return "No settings configured.".to_string();
    }
    rows.iter()
        .map(|(key, value)| format!("**{key}**: `{value}`"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn count_commands<U, E>(commands: &[Command<U, E>]) -> usize {
    commands
        .iter()
        .map(|cmd| 1 + count_commands(&cmd.subcommands))
        .sum()
}

fn process_memory_mb() -> f64 {
    let mut system = System::new_all();
    system.refresh_all();

    if let Ok(pid) = get_current_pid()
        && let Some(process) = system.process(pid)
    {
        return process.memory() as f64 / (1024.0 * 1024.0);
    }
    0.0
}

fn format_uptime(duration: Duration) -> String {
    let days = duration.as_secs() / 86400;
    let hours = (duration.as_secs() % 86400) / 3600;
    let minutes = (duration.as_secs() % 3600) / 60;

    if days > 0 {
        format!("{days} days, {hours} hours, {minutes} minutes")
    } else if hours > 0 {
        format!("{hours} hours, {minutes} minutes")
    } else {
        format!("{minutes} minutes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0 minutes");
        assert_eq!(format_uptime(Duration::from_secs(3720)), "1 hours, 2 minutes");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86400 + 60)),
            "2 days, 0 hours, 1 minutes"
        );
    }

    #[test]
    fn test_format_settings() {
        assert_eq!(format_settings(&[]), "No settings configured.");
        let rows = vec![("mod_role".to_string(), "123".to_string())];
        assert_eq!(format_settings(&rows), "**mod_role**: `123`");
    }
}
