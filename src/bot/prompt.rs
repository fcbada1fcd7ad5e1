//! Interactive questions asked while a command runs.

use std::time::Duration;

use poise::CreateReply;
use poise::serenity_prelude::ButtonStyle;
use poise::serenity_prelude::ComponentInteractionCollector;
use poise::serenity_prelude::ComponentInteractionDataKind;
use poise::serenity_prelude::CreateActionRow;
use poise::serenity_prelude::CreateButton;
use poise::serenity_prelude::CreateEmbed;
use poise::serenity_prelude::CreateInteractionResponse;
use poise::serenity_prelude::CreateSelectMenu;
use poise::serenity_prelude::CreateSelectMenuKind;
use poise::serenity_prelude::CreateSelectMenuOption;
use poise::serenity_prelude::MessageCollector;

use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::bot::reply;
use crate::bot::reply::ReplyKind;

pub const PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Matches scoring below this are confirmed with the user first.
pub const CONFIRM_THRESHOLD: u8 = 80;

const CANCEL_VALUE: &str = "cancel";

/// Asks a yes/no question with buttons.
///
/// Times out with [`BotError::Timeout`].
pub async fn confirm(ctx: Context<'_>, embed: CreateEmbed) -> Result<bool, Error> {
    let yes_id = format!("{}-yes", ctx.id());
    let no_id = format!("{}-no", ctx.id());
    let buttons = CreateActionRow::Buttons(vec![
        CreateButton::new(&yes_id)
            .label("Yes")
            .style(ButtonStyle::Success),
        CreateButton::new(&no_id)
            .label("No")
            .style(ButtonStyle::Danger),
    ]);

    let handle = ctx
        .send(
            CreateReply::default()
                .embed(embed.clone())
                .components(vec![buttons]),
        )
        .await?;

    let prefix = format!("{}-", ctx.id());
    let interaction = ComponentInteractionCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(PROMPT_TIMEOUT)
        .filter(move |mci| mci.data.custom_id.starts_with(&prefix))
        .await;

    handle
        .edit(ctx, CreateReply::default().embed(embed).components(vec![]))
        .await?;

    let Some(interaction) = interaction else {
        return Err(BotError::Timeout.into());
    };
    interaction
        .create_response(ctx.http(), CreateInteractionResponse::Acknowledge)
        .await?;
    Ok(interaction.data.custom_id == yes_id)
}

/// Asks a question and returns the author's next message in the channel.
pub async fn ask_text(ctx: Context<'_>, question: &str) -> Result<String, Error> {
    let handle = reply::info(ctx, question, None).await?;

    let message = MessageCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(PROMPT_TIMEOUT)
        .await;

    handle.delete(ctx).await?;

    let message = message.ok_or(BotError::Timeout)?;
    Ok(message.content_safe(ctx.cache()).trim().to_string())
}

/// Lets the author pick one of `options` (`(label, value)`) from a menu.
///
/// Returns `None` when the author picks "Cancel".
pub async fn select(
    ctx: Context<'_>,
    embed: CreateEmbed,
    options: &[(String, String)],
) -> Result<Option<String>, Error> {
    let menu_id = format!("{}-select", ctx.id());
    let mut menu_options: Vec<CreateSelectMenuOption> = options
        .iter()
        .map(|(label, value)| CreateSelectMenuOption::new(label, value))
        .collect();
    menu_options.push(CreateSelectMenuOption::new("Cancel", CANCEL_VALUE));

    let menu = CreateSelectMenu::new(
        &menu_id,
        CreateSelectMenuKind::String {
            options: menu_options,
        },
    );

    let handle = ctx
        .send(
            CreateReply::default()
                .embed(embed)
                .components(vec![CreateActionRow::SelectMenu(menu)]),
        )
        .await?;

    let interaction = ComponentInteractionCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(PROMPT_TIMEOUT)
        .filter(move |mci| mci.data.custom_id == menu_id)
        .await;

    handle.delete(ctx).await?;

    let interaction = interaction.ok_or(BotError::Timeout)?;
    interaction
        .create_response(ctx.http(), CreateInteractionResponse::Acknowledge)
        .await?;

    let value = match &interaction.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => values.first().cloned(),
        _ => None,
    };
    Ok(value.filter(|v| v != CANCEL_VALUE))
}

/// Resolves user input to a series title, confirming low-confidence matches.
pub async fn resolve_series(ctx: Context<'_>, term: &str) -> Result<String, Error> {
    let found = ctx
        .data()
        .services
        .series
        .match_series(term)
        .await?
        .ok_or_else(|| BotError::NotFound("No match found.".to_string()))?;

    if found.score < CONFIRM_THRESHOLD {
        let question = reply::kind_embed(
            ReplyKind::Info,
            &format!("Did you mean '{}'?", found.title),
            None,
        );
        if !confirm(ctx, question).await? {
            return Err(BotError::Cancelled.into());
        }
    }
    Ok(found.title)
}
