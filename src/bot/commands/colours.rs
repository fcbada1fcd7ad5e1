//! Personal colour roles.

use poise::Command;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::EditRole;
use poise::serenity_prelude::RoleId;

use crate::bot::Data;
use crate::bot::checks;
use crate::bot::checks::Privilege;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::bot::reply;

const PRESETS: [(&str, u32); 23] = [
    ("default", 0x000000),
    ("teal", 0x1abc9c),
    ("dark_teal", 0x11806a),
    ("green", 0x2ecc71),
    ("dark_green", 0x1f8b4c),
    ("blue", 0x3498db),
    ("dark_blue", 0x206694),
    ("purple", 0x9b59b6),
    ("dark_purple", 0x71368a),
    ("magenta", 0xe91e63),
    ("dark_magenta", 0xad1457),
    ("gold", 0xf1c40f),
    ("dark_gold", 0xc27c0e),
    ("orange", 0xe67e22),
    ("dark_orange", 0xa84300),
    ("red", 0xe74c3c),
    ("dark_red", 0x992d22),
    ("lighter_grey", 0x95a5a6),
    ("dark_grey", 0x607d8b),
    ("light_grey", 0x979c9f),
    ("darker_grey", 0x546e7a),
    ("blurple", 0x7289da),
    ("greyple", 0x99aab5),
];

/// Cog of the colour role commands.
pub struct ColoursCog;

impl ColoursCog {
    /// Change the colour of your colour role
    ///
    /// Accepts `0x<hex>`, `#<hex>` and `0x#<hex>`, or one of the preset
    /// names: default, teal, dark_teal, green, dark_green, blue, dark_blue,
    /// purple, dark_purple, magenta, dark_magenta, gold, dark_gold, orange,
    /// dark_orange, red, dark_red, lighter_grey, dark_grey, light_grey,
    /// darker_grey, blurple, greyple.
    #[poise::command(prefix_command, guild_only, category = "Colours")]
    pub async fn setcolour(
        ctx: Context<'_>,
        #[description = "New colour"] colour: Option<String>,
    ) -> Result<(), Error> {
        let guild_id = checks::guild_id(ctx)?;
        let role_id = ctx
            .data()
            .services
            .colour
            .role_of(guild_id.get(), ctx.author().id.get())
            .await?
            .map(RoleId::new)
            .ok_or_else(|| BotError::PermissionDenied("You don't have a colour role.".to_string()))?;

        let role = guild_id
            .roles(ctx.http())
            .await?
            .remove(&role_id)
            .ok_or_else(|| BotError::NotFound("Your colour role no longer exists.".to_string()))?;

        let Some(colour) = colour else {
            let current = role.colour.0;
            let embed = reply::plain_embed(&format_colour(current), None).colour(current);
            reply::embed(ctx, embed).await?;
            return Ok(());
        };

        let value = parse_colour(&colour).ok_or_else(|| BotError::InvalidCommandArgument {
            parameter: "colour".to_string(),
            reason: format!("`{colour}` is not a hex colour or preset name"),
        })?;
        guild_id
            .edit_role(ctx.http(), role_id, EditRole::new().colour(value))
            .await?;
        reply::success(
            ctx,
            &format!("{} role changed to colour: {}", role.name, format_colour(value)),
            None,
        )
        .await?;
        Ok(())
    }

    /// Manage the colour roles of this server
    #[poise::command(
        prefix_command,
        guild_only,
        subcommands("Self::assign", "Self::remove"),
        category = "Colours"
    )]
    pub async fn colourrole(ctx: Context<'_>) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let guild_id = checks::guild_id(ctx)?;
        let rows = ctx.data().services.colour.list(guild_id.get()).await?;
        let listing = if rows.is_empty() {
            "No colour roles assigned.".to_string()
        } else {
            rows.iter()
                .map(|(member, role)| format!("<@{member}>: <@&{role}>"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        reply::info(ctx, "Colour Roles", Some(&listing)).await?;
        Ok(())
    }

    /// Give a member a colour role they can recolour
    #[poise::command(prefix_command, guild_only, category = "Colours")]
    pub async fn assign(
        ctx: Context<'_>,
        #[description = "Member"] member: serenity::Member,
        #[description = "Role"] role: serenity::Role,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let guild_id = checks::guild_id(ctx)?;
        ctx.data()
            .services
            .colour
            .assign(guild_id.get(), member.user.id.get(), role.id.get())
            .await?;
        reply::ok(ctx).await
    }

    /// Take away a member's colour role
    #[poise::command(prefix_command, guild_only, category = "Colours")]
    pub async fn remove(
        ctx: Context<'_>,
        #[description = "Member"] member: serenity::Member,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let guild_id = checks::guild_id(ctx)?;
        if ctx
            .data()
            .services
            .colour
            .remove(guild_id.get(), member.user.id.get())
            .await?
        {
            reply::ok(ctx).await
        } else {
            reply::warning(ctx, "That member has no colour role.", None).await?;
            Ok(())
        }
    }
}

impl Cog for ColoursCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::setcolour(), Self::colourrole()]
    }
}

/// Parses `0x<hex>`, `#<hex>`, `0x#<hex>` or a preset name.
pub fn parse_colour(input: &str) -> Option<u32> {
    let input = input.trim();
    let lower = input.to_lowercase();
    if let Some((_, value)) = PRESETS.iter().find(|(name, _)| *name == lower) {
        return Some(*value);
    }

    let hex = lower
        .strip_prefix("0x#")
        .or_else(|| lower.strip_prefix("0x"))
        .or_else(|| lower.strip_prefix('#'))?;
    if hex.is_empty() || hex.len() > 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

pub fn format_colour(value: u32) -> String {
    format!("#{value:06x}")
}
