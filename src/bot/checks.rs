//! Privilege levels of command authors.

use std::fmt;

use poise::serenity_prelude::GuildId;
use poise::serenity_prelude::Permissions;
use poise::serenity_prelude::RoleId;
use poise::serenity_prelude::User;

use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::service::settings_service::ADMIN_ROLE_KEY;
use crate::service::settings_service::MOD_ROLE_KEY;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Privilege {
    User,
    Mod,
    Admin,
    GuildOwner,
    CoOwner,
    Owner,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Privilege::User => "Normal User",
            Privilege::Mod => "Mod",
            Privilege::Admin => "Admin",
            Privilege::GuildOwner => "Guild Owner",
            Privilege::CoOwner => "Bot Co-Owner",
            Privilege::Owner => "Bot Owner",
        };
        f.write_str(name)
    }
}

/// What is known about a user when resolving their privilege.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemberFacts {
    pub is_owner: bool,
    pub is_co_owner: bool,
    pub is_guild_owner: bool,
    pub permissions: Permissions,
    pub has_admin_role: bool,
    pub has_mod_role: bool,
}

pub fn resolve_privilege(facts: &MemberFacts) -> Privilege {
    let perms = facts.permissions;
    if facts.is_owner {
        Privilege::Owner
    } else if facts.is_co_owner {
        Privilege::CoOwner
    } else if facts.is_guild_owner {
        Privilege::GuildOwner
    } else if perms.contains(Permissions::ADMINISTRATOR)
        || perms.contains(Permissions::MANAGE_GUILD)
        || facts.has_admin_role
    {
        Privilege::Admin
    } else if perms.contains(Permissions::MANAGE_MESSAGES) || facts.has_mod_role {
        Privilege::Mod
    } else {
        Privilege::User
    }
}

/// Privilege of `user` in the invoking guild.
///
/// Outside of guilds only the owner levels apply.
pub async fn privilege_of(ctx: Context<'_>, user: &User) -> Result<Privilege, Error> {
    let config = &ctx.data().config;
    let user_id = user.id.get();
    let mut facts = MemberFacts {
        is_owner: user_id == config.owner_id,
        is_co_owner: config.is_co_owner(user_id),
        ..Default::default()
    };

    let Some(guild_id) = ctx.guild_id() else {
        return Ok(resolve_privilege(&facts));
    };

    let member = guild_id.member(ctx.serenity_context(), user.id).await?;
    {
        let guild = ctx.guild().ok_or(BotError::GuildOnlyCommand)?;
        facts.is_guild_owner = guild.owner_id == user.id;
        facts.permissions = guild.member_permissions(&member);
    }

    let settings = &ctx.data().services.settings;
    let has_role = |role: Option<u64>| role.is_some_and(|id| member.roles.contains(&RoleId::new(id)));
    facts.has_admin_role = has_role(settings.config_role(guild_id.get(), ADMIN_ROLE_KEY).await?);
    facts.has_mod_role = has_role(settings.config_role(guild_id.get(), MOD_ROLE_KEY).await?);

    Ok(resolve_privilege(&facts))
}

/// Guild of the invocation, failing in DMs.
pub fn guild_id(ctx: Context<'_>) -> Result<GuildId, BotError> {
    ctx.guild_id().ok_or(BotError::GuildOnlyCommand)
}

/// Fails with [`BotError::PermissionDenied`] below `level`.
pub async fn require(ctx: Context<'_>, level: Privilege) -> Result<(), Error> {
    let privilege = privilege_of(ctx, ctx.author()).await?;
    check_level(privilege, level)?;
    Ok(())
}

pub async fn has_privilege(ctx: Context<'_>, level: Privilege) -> Result<bool, Error> {
    Ok(privilege_of(ctx, ctx.author()).await? >= level)
}

fn check_level(actual: Privilege, required: Privilege) -> Result<(), BotError> {
    if actual >= required {
        return Ok(());
    }
    Err(BotError::PermissionDenied(format!(
        "You need to be at least `{required}` to perform this action."
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_member_is_user() {
        assert_eq!(resolve_privilege(&MemberFacts::default()), Privilege::User);
    }

    #[test]
    fn test_manage_messages_is_mod() {
        let facts = MemberFacts {
            permissions: Permissions::MANAGE_MESSAGES,
            ..Default::default()
        };
        assert_eq!(resolve_privilege(&facts), Privilege::Mod);

        let facts = MemberFacts {
            has_mod_role: true,
            ..Default::default()
        };
        assert_eq!(resolve_privilege(&facts), Privilege::Mod);
    }

    #[test]
    fn test_admin_sources() {
        for facts in [
            MemberFacts {
                permissions: Permissions::ADMINISTRATOR,
                ..Default::default()
            },
            MemberFacts {
                permissions: Permissions::MANAGE_GUILD,
                ..Default::default()
            },
            MemberFacts {
                has_admin_role: true,
                has_mod_role: true,
                ..Default::default()
            },
        ] {
            assert_eq!(resolve_privilege(&facts), Privilege::Admin);
        }
    }

    #[test]
    fn test_owner_levels_win() {
        let facts = MemberFacts {
            is_owner: true,
            is_co_owner: true,
            is_guild_owner: true,
            ..Default::default()
        };
        assert_eq!(resolve_privilege(&facts), Privilege::Owner);

        let facts = MemberFacts {
            is_co_owner: true,
            is_guild_owner: true,
            ..Default::default()
        };
        assert_eq!(resolve_privilege(&facts), Privilege::CoOwner);

        let facts = MemberFacts {
            is_guild_owner: true,
            permissions: Permissions::ADMINISTRATOR,
            ..Default::default()
        };
        assert_eq!(resolve_privilege(&facts), Privilege::GuildOwner);
    }

    #[test]
    fn test_check_level() {
        assert!(check_level(Privilege::Admin, Privilege::Mod).is_ok());
        assert!(check_level(Privilege::Mod, Privilege::Mod).is_ok());
        match check_level(Privilege::User, Privilege::Admin).unwrap_err() {
            BotError::PermissionDenied(msg) => assert!(msg.contains("Admin")),
            _ => panic!("Expected PermissionDenied error"),
        }
    }
}
