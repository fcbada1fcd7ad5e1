//! osu! profile cards.

use chrono::Utc;
use poise::Command;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::CreateEmbedAuthor;

use crate::bot::Data;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::reply;
use crate::service::osu_service::OSU_ICON;
use crate::service::osu_service::signature_url;

pub struct OsuCog;

impl OsuCog {
    /// Show the linked osu! profile of a member
    #[poise::command(
        prefix_command,
        subcommands("Self::user", "Self::set", "Self::clear"),
        category = "Osu"
    )]
    pub async fn osu(
        ctx: Context<'_>,
        #[description = "Member, defaults to you"]
        #[rest]
        member: Option<serenity::Member>,
    ) -> Result<(), Error> {
        let (member_id, name) = match &member {
            Some(member) => (member.user.id, member.display_name().to_string()),
            None => (ctx.author().id, ctx.author().display_name().to_string()),
        };

        let Some(username) = ctx.data().services.osu.username(member_id.get()).await? else {
            reply::error(
                ctx,
                "You don't have a linked osu account.",
                Some(&format!("Set one with `{}osu set <username>`", ctx.prefix())),
            )
            .await?;
            return Ok(());
        };
        send_profile(ctx, &format!("Osu! Profile for {name}"), &username).await
    }

    /// Show the osu! profile of any username
    #[poise::command(prefix_command, category = "Osu")]
    pub async fn user(
        ctx: Context<'_>,
        #[description = "osu! username"]
        #[rest]
        username: String,
    ) -> Result<(), Error> {
        send_profile(ctx, "Osu! Profile", username.trim()).await
    }

    /// Link your osu! account
    #[poise::command(prefix_command, category = "Osu")]
    pub async fn set(
        ctx: Context<'_>,
        #[description = "osu! username"]
        #[rest]
        username: String,
    ) -> Result<(), Error> {
        let username = username.trim();
        ctx.data()
            .services
            .osu
            .link(ctx.author().id.get(), username)
            .await?;
        reply::success(
            ctx,
            &format!("The osu account {username} is now linked to you."),
            None,
        )
        .await?;
        Ok(())
    }

    /// Unlink your osu! account
    #[poise::command(prefix_command, category = "Osu")]
    pub async fn clear(ctx: Context<'_>) -> Result<(), Error> {
        ctx.data().services.osu.unlink(ctx.author().id.get()).await?;
        reply::success(ctx, "You are no longer linked to an osu account.", None).await?;
        Ok(())
    }
}

impl Cog for OsuCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::osu()]
    }
}

async fn send_profile(ctx: Context<'_>, title: &str, username: &str) -> Result<(), Error> {
    let nocache = Utc::now().timestamp_millis() as u64;
    let embed = reply::plain_embed("", None)
        .author(CreateEmbedAuthor::new(title).icon_url(OSU_ICON))
        .image(signature_url(username, nocache));
    reply::embed(ctx, embed).await?;
    Ok(())
}
