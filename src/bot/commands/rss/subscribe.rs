//! Role based subscriptions to release notifications.

use log::info;
use poise::serenity_prelude::GuildId;
use poise::serenity_prelude::Member;
use poise::serenity_prelude::RoleId;

use crate::bot::checks;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::prompt;
use crate::bot::reply;

/// Outcome of toggling a subscription role.
#[derive(Debug, PartialEq)]
enum Toggle {
    NoRole,
    Unchanged,
    Changed(String),
}

pub async fn run(ctx: Context<'_>, series: Option<String>, remove: bool) -> Result<(), Error> {
    let guild_id = checks::guild_id(ctx)?;
    let series = series
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if remove && series.as_deref() == Some("all") {
        return unsubscribe_all(ctx, guild_id).await;
    }
    match series {
        Some(term) => series_subscription(ctx, guild_id, &term, remove).await,
        None => global_subscription(ctx, guild_id, remove).await,
    }
}

async fn global_subscription(ctx: Context<'_>, guild_id: GuildId, remove: bool) -> Result<(), Error> {
    let member = guild_id.member(ctx.serenity_context(), ctx.author().id).await?;
    match toggle_global(ctx, guild_id, &member, remove).await? {
        Toggle::NoRole => {
            reply::error(
                ctx,
                "A notification role hasn't been setup for this guild.",
                None,
            )
            .await?;
        }
        Toggle::Unchanged => {
            let action = if remove { "unsubscribed" } else { "subscribed" };
            reply::warning(ctx, &format!("You are already {action}"), None).await?;
        }
        Toggle::Changed(_) if remove => {
            reply::success(ctx, "You are no longer subscribed", None).await?;
        }
        Toggle::Changed(role_name) => {
            reply::success(
                ctx,
                &format!("You are now subscribed with the role {role_name}"),
                None,
            )
            .await?;
        }
    }
    Ok(())
}

/// Adds or removes the guild's global notification role.
async fn toggle_global(
    ctx: Context<'_>,
    guild_id: GuildId,
    member: &Member,
    remove: bool,
) -> Result<Toggle, Error> {
    let settings = ctx.data().services.settings.feed_settings(guild_id.get()).await?;
    let Some(role_id) = settings.sub_role_id.map(|id| RoleId::new(id as u64)) else {
        return Ok(Toggle::NoRole);
    };
    let role_name = ctx
        .cache()
        .guild(guild_id)
        .and_then(|g| g.roles.get(&role_id).map(|r| r.name.clone()));
    let Some(role_name) = role_name else {
        return Ok(Toggle::NoRole);
    };

    if member.roles.contains(&role_id) != remove {
        return Ok(Toggle::Unchanged);
    }
    if remove {
        member.remove_role(ctx.http(), role_id).await?;
    } else {
        member.add_role(ctx.http(), role_id).await?;
    }
    Ok(Toggle::Changed(role_name))
}

async fn series_subscription(
    ctx: Context<'_>,
    guild_id: GuildId,
    term: &str,
    remove: bool,
) -> Result<(), Error> {
    let title = prompt::resolve_series(ctx, term).await?;
    let Some(role) = ctx.data().gateway.series_role(guild_id, &title, true).await? else {
        let owner = ctx.data().config.owner_id;
        reply::error(
            ctx,
            "Something went wrong!",
            Some(&format!("Let <@{owner}> know I broke.")),
        )
        .await?;
        return Ok(());
    };

    let member = guild_id.member(ctx.serenity_context(), ctx.author().id).await?;
    let subscribed = member.roles.contains(&role.id);
    match (remove, subscribed) {
        (true, false) => {
            reply::warning(ctx, &format!("You're not subscribed to {title}"), None).await?;
        }
        (true, true) => {
            member.remove_role(ctx.http(), role.id).await?;
            reply::success(ctx, &format!("You're now unsubscribed from {title}"), None).await?;
        }
        (false, true) => {
            reply::warning(ctx, &format!("You're already subscribed to {title}"), None).await?;
        }
        (false, false) => {
            member.add_role(ctx.http(), role.id).await?;
            reply::success(ctx, &format!("You're now subscribed to {title}"), None).await?;
        }
    }
    Ok(())
}

async fn unsubscribe_all(ctx: Context<'_>, guild_id: GuildId) -> Result<(), Error> {
    let member = guild_id.member(ctx.serenity_context(), ctx.author().id).await?;
    let global_removed = matches!(
        toggle_global(ctx, guild_id, &member, true).await?,
        Toggle::Changed(_)
    );

    let series_roles = subscribed_series(ctx, guild_id, &member).await?;
    let role_ids: Vec<RoleId> = series_roles.iter().map(|(id, _)| *id).collect();
    if !role_ids.is_empty() {
        member.remove_roles(ctx.http(), &role_ids).await?;
        info!("Removed {} series roles from {}", role_ids.len(), member.user.id);
    }

    match unsubscribe_summary(global_removed, role_ids.len()) {
        Some(summary) => reply::success(ctx, &summary, None).await?,
        None => reply::warning(ctx, "No subscriptions found", None).await?,
    };
    Ok(())
}

pub async fn list(ctx: Context<'_>, member: Option<Member>) -> Result<(), Error> {
    let guild_id = checks::guild_id(ctx)?;
    let member = match member {
        Some(member) => member,
        None => guild_id.member(ctx.serenity_context(), ctx.author().id).await?,
    };

    let settings = ctx.data().services.settings.feed_settings(guild_id.get()).await?;
    let global = settings.sub_role_id.and_then(|id| {
        let role_id = RoleId::new(id as u64);
        ctx.cache()
            .guild(guild_id)
            .and_then(|g| g.roles.get(&role_id).map(|r| r.name.clone()))
            .map(|name| (member.roles.contains(&role_id), name))
    });

    let series: Vec<String> = subscribed_series(ctx, guild_id, &member)
        .await?
        .into_iter()
        .map(|(_, line)| line)
        .collect();

    let text = subscriptions_text(global, &series);
    reply::embed(ctx, reply::plain_embed("Subscriptions", Some(&text))).await?;
    Ok(())
}

/// Series roles the member has, with a `shortname: title` line each.
async fn subscribed_series(
    ctx: Context<'_>,
    guild_id: GuildId,
    member: &Member,
) -> Result<Vec<(RoleId, String)>, Error> {
    let roles = guild_id.roles(ctx.http()).await?;
    let mut names: Vec<(String, String)> = ctx
        .data()
        .services
        .series
        .shortname_map()
        .await?
        .into_iter()
        .collect();
    names.sort();

    Ok(names
        .into_iter()
        .filter_map(|(shortname, title)| {
            let role = roles.values().find(|role| role.name == shortname)?;
            member
                .roles
                .contains(&role.id)
                .then(|| (role.id, format!("{shortname}: {title}")))
        })
        .collect())
}

fn unsubscribe_summary(global_removed: bool, series_removed: usize) -> Option<String> {
    match (global_removed, series_removed) {
        (false, 0) => None,
        (true, 0) => Some("Global subscription removed".to_string()),
        (true, n) => Some(format!("Global and {n} series subscriptions removed")),
        (false, n) => Some(format!("{n} series subscriptions removed")),
    }
}

/// `global` is whether the member has the global role, and its name.
fn subscriptions_text(global: Option<(bool, String)>, series: &[String]) -> String {
    let mut lines = Vec::new();
    if let Some((subscribed, name)) = global {
        let mark = if subscribed { "✅" } else { "❌" };
        lines.push(format!("**{mark} {name} Subscription**\n"));
    }
    if series.is_empty() {
        lines.push("No Series Subscriptions".to_string());
    } else {
        lines.push(format!("**Series Subscriptions ({})**", series.len()));
        lines.push(series.join("\n"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsubscribe_summary() {
        assert_eq!(unsubscribe_summary(false, 0), None);
        assert_eq!(
            unsubscribe_summary(true, 0).as_deref(),
            Some("Global subscription removed")
        );
        assert_eq!(
            unsubscribe_summary(true, 3).as_deref(),
            Some("Global and 3 series subscriptions removed")
        );
        assert_eq!(
            unsubscribe_summary(false, 2).as_deref(),
            Some("2 series subscriptions removed")
        );
    }

    #[test]
    fn test_subscriptions_text() {
        assert_eq!(subscriptions_text(None, &[]), "No Series Subscriptions");

        let text = subscriptions_text(
            Some((true, "Updates".to_string())),
            &["kd: Kingdom".to_string()],
        );
        assert_eq!(
            text,
            "**✅ Updates Subscription**\n\n**Series Subscriptions (1)**\nkd: Kingdom"
        );
    }
}
