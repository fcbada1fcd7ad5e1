//! Series catalogue commands.

use std::time::Duration;

use log::info;
use log::warn;
use poise::Command;
use poise::serenity_prelude::CreateEmbed;
use poise::serenity_prelude::EditRole;
use poise::serenity_prelude::MessageCollector;

use crate::bot::Data;
use crate::bot::checks;
use crate::bot::checks::Privilege;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::bot::prompt;
use crate::bot::reply;
use crate::bot::reply::ReplyKind;
use crate::feed::SeriesPage;
use crate::feed::series_poster_url;
use crate::model::SeriesModel;

pub mod edit;

use edit::EditField;

/// How long `series unlock` keeps a role mentionable.
const UNLOCK_TIMEOUT: Duration = Duration::from_secs(120);
const WRAP_WIDTH: usize = 30;
const RECENT_CHAPTERS: usize = 5;
/// Statuses for which the priority is not shown.
const NO_PRIORITY: [&str; 4] = ["complete", "completed", "dropped", "commission"];

/// Cog of the series catalogue commands.
pub struct SeriesCog;

impl SeriesCog {
    /// Show the details of a series
    #[poise::command(
        prefix_command,
        subcommands(
            "Self::genre",
            "Self::web",
            "Self::add",
            "Self::edit",
            "Self::lock_roles",
            "Self::unlock"
        ),
        category = "Series"
    )]
    pub async fn series(
        ctx: Context<'_>,
        #[description = "Series title or shortname"]
        #[rest]
        series: String,
    ) -> Result<(), Error> {
        let title = prompt::resolve_series(ctx, &series).await?;
        let Some(found) = ctx.data().services.series.get(&title).await? else {
            reply::error(ctx, "No match", None).await?;
            return Ok(());
        };
        send_series_info(ctx, &found).await
    }

    /// Search series by genre
    #[poise::command(prefix_command, category = "Series")]
    pub async fn genre(
        ctx: Context<'_>,
        #[description = "Genre to search for"]
        #[rest]
        genre: String,
    ) -> Result<(), Error> {
        let results = ctx.data().services.series.search_genre(&genre).await?;
        match results.as_slice() {
            [] => {
                reply::error(ctx, "No results found", None).await?;
            }
            [single] => send_series_info(ctx, single).await?,
            many => {
                let titles = many
                    .iter()
                    .map(|s| match &s.link {
                        Some(link) => format!("[{}]({link})", s.title),
                        None => s.title.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                let heading = format!(
                    "{} series found with the {} genre.",
                    many.len(),
                    edit::title_case(genre.trim())
                );
                reply::success(ctx, &heading, Some(&titles)).await?;
            }
        }
        Ok(())
    }

    /// Show the details listed on a series' web page
    #[poise::command(prefix_command, category = "Series")]
    pub async fn web(
        ctx: Context<'_>,
        #[description = "Series title or shortname"]
        #[rest]
        series: String,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let title = prompt::resolve_series(ctx, &series).await?;
        let data = ctx.data();
        let link = data
            .services
            .series
            .get(&title)
            .await?
            .and_then(|s| s.link)
            .ok_or_else(|| BotError::NotFound(format!("{title} has no link set.")))?;

        ctx.defer_or_broadcast().await?;
        let Some(page) = data.services.feed_source.series_page(&link).await? else {
            reply::error(ctx, "The series page could not be loaded.", None).await?;
            return Ok(());
        };

        let uploads_url = &data.services.feed_source.site().uploads_url;
        let embed = CreateEmbed::new()
            .colour(ReplyKind::Info.colour())
            .title(&title)
            .url(&link)
            .thumbnail(series_poster_url(uploads_url, &link))
            .fields(
                web_fields(&title, &page)
                    .into_iter()
                    .map(|(name, value)| (name, value, false)),
            );
        reply::embed(ctx, embed).await?;
        Ok(())
    }

    /// Add a series
    ///
    /// Missing details are asked for one by one.
    #[poise::command(prefix_command, category = "Series")]
    pub async fn add(
        ctx: Context<'_>,
        #[description = "Series page URL"] link: String,
        #[description = "Title"] title: Option<String>,
        #[description = "Scanlation status"] status: Option<String>,
        #[description = "Scanlation priority"] priority: Option<i32>,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        edit::add(ctx, link, title, status, priority).await
    }

    /// Edit a series interactively
    #[poise::command(
        prefix_command,
        subcommands(
            "Self::edit_link",
            "Self::edit_shortname",
            "Self::edit_latest",
            "Self::edit_title",
            "Self::edit_status",
            "Self::edit_type",
            "Self::edit_priority",
            "Self::edit_genres"
        ),
        category = "Series"
    )]
    pub async fn edit(
        ctx: Context<'_>,
        #[description = "Series title or shortname"]
        #[rest]
        series: String,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        edit::menu(ctx, &series).await
    }

    /// Change the page URL of a series
    #[poise::command(prefix_command, rename = "link", category = "Series")]
    pub async fn edit_link(ctx: Context<'_>, series: String, link: String) -> Result<(), Error> {
        edit::single(ctx, &series, EditField::Link, &link).await
    }

    /// Change the shortname of a series and rename its roles
    #[poise::command(prefix_command, rename = "shortname", category = "Series")]
    pub async fn edit_shortname(
        ctx: Context<'_>,
        series: String,
        shortname: String,
    ) -> Result<(), Error> {
        edit::single(ctx, &series, EditField::Shortname, &shortname).await
    }

    /// Change the latest chapter of a series
    #[poise::command(prefix_command, rename = "latest", category = "Series")]
    pub async fn edit_latest(ctx: Context<'_>, series: String, chapter: String) -> Result<(), Error> {
        edit::single(ctx, &series, EditField::Latest, &chapter).await
    }

    /// Change the title of a series
    #[poise::command(prefix_command, rename = "title", category = "Series")]
    pub async fn edit_title(
        ctx: Context<'_>,
        series: String,
        #[rest] new_title: String,
    ) -> Result<(), Error> {
        edit::single(ctx, &series, EditField::Title, &new_title).await
    }

    /// Change the scanlation status of a series
    #[poise::command(prefix_command, rename = "status", category = "Series")]
    pub async fn edit_status(
        ctx: Context<'_>,
        series: String,
        #[rest] status: String,
    ) -> Result<(), Error> {
        edit::single(ctx, &series, EditField::Status, &status).await
    }

    /// Change the type of a series
    #[poise::command(prefix_command, rename = "type", category = "Series")]
    pub async fn edit_type(
        ctx: Context<'_>,
        series: String,
        #[rest] series_type: String,
    ) -> Result<(), Error> {
        edit::single(ctx, &series, EditField::Type, &series_type).await
    }

    /// Change the scanlation priority of a series
    #[poise::command(prefix_command, rename = "priority", category = "Series")]
    pub async fn edit_priority(
        ctx: Context<'_>,
        series: String,
        #[rest] priority: String,
    ) -> Result<(), Error> {
        edit::single(ctx, &series, EditField::Priority, &priority).await
    }

    /// Replace the genres of a series (comma separated)
    #[poise::command(prefix_command, rename = "genres", category = "Series")]
    pub async fn edit_genres(
        ctx: Context<'_>,
        series: String,
        #[rest] genres: String,
    ) -> Result<(), Error> {
        edit::single(ctx, &series, EditField::Genres, &genres).await
    }

    /// Make every series role of this server unmentionable
    #[poise::command(prefix_command, guild_only, category = "Series")]
    pub async fn lock_roles(ctx: Context<'_>) -> Result<(), Error> {
        checks::require(ctx, Privilege::CoOwner).await?;
        let guild_id = checks::guild_id(ctx)?;
        let shortnames = ctx.data().services.series.shortname_map().await?;

        let roles = guild_id.roles(ctx.http()).await?;
        for role in roles.values().filter(|r| shortnames.contains_key(&r.name)) {
            if role.mentionable {
                guild_id
                    .edit_role(ctx.http(), role.id, EditRole::new().mentionable(false))
                    .await?;
            }
        }
        info!("Locked series roles in guild {guild_id}");
        reply::ok(ctx).await
    }

    /// Make a series role mentionable for one mention
    ///
    /// The role is locked again after the first mention or two minutes.
    #[poise::command(prefix_command, guild_only, category = "Series")]
    pub async fn unlock(
        ctx: Context<'_>,
        #[description = "Series title or shortname"]
        #[rest]
        series: String,
    ) -> Result<(), Error> {
        checks::require(ctx, Privilege::Admin).await?;
        let guild_id = checks::guild_id(ctx)?;
        let title = prompt::resolve_series(ctx, &series).await?;
        let Some(role) = ctx.data().gateway.series_role(guild_id, &title, true).await? else {
            reply::error(ctx, "There is no role for that series", None).await?;
            return Ok(());
        };

        guild_id
            .edit_role(ctx.http(), role.id, EditRole::new().mentionable(true))
            .await?;
        reply::success(
            ctx,
            &format!("Role {} unlocked,", role.name),
            Some(
                "The role will be mentionable for one use or until 2 minutes have passed.\n\
                 Please make the mention soon to prevent other users mentioning the role.",
            ),
        )
        .await?;

        let mention = format!("<@&{}>", role.id);
        let mentioned = MessageCollector::new(ctx.serenity_context())
            .guild_id(guild_id)
            .timeout(UNLOCK_TIMEOUT)
            .filter(move |m| m.content.contains(&mention))
            .await;

        if let Err(e) = guild_id
            .edit_role(ctx.http(), role.id, EditRole::new().mentionable(false))
            .await
        {
            warn!("Failed to lock role {} again: {e}", role.id);
            return Err(e.into());
        }
        let notice = match mentioned {
            Some(_) => "Role mention detected, role reset.",
            None => "Took too long, role reset.",
        };
        ctx.say(notice).await?;
        Ok(())
    }
}

impl Cog for SeriesCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::series()]
    }
}

async fn send_series_info(ctx: Context<'_>, series: &SeriesModel) -> Result<(), Error> {
    let uploads_url = &ctx.data().services.feed_source.site().uploads_url;
    let mut embed = reply::kind_embed(
        ReplyKind::Info,
        &format!("Series Info: {}", series.shortname),
        Some(&series_info_lines(series)),
    )
    .footer(reply::footer("Click the title to read it online!"));
    if let Some(link) = &series.link {
        embed = embed
            .url(link)
            .thumbnail(series_poster_url(uploads_url, link));
    }
    reply::embed(ctx, embed).await?;
    Ok(())
}

fn series_info_lines(series: &SeriesModel) -> String {
    let status = series.status.as_deref().unwrap_or("Unknown");
    let mut lines = vec![
        format!("**Title:** {}", series.title),
        format!("**Status:** {status}"),
    ];
    if !NO_PRIORITY.contains(&status.to_lowercase().as_str()) {
        let priority = series
            .priority
            .map(|p| p.to_string())
            .unwrap_or_else(|| "None".to_string());
        lines.push(format!("**Priority:** {priority}"));
    }
    if let Some(latest) = series.latest_chapter.as_deref().filter(|l| !l.is_empty()) {
        let mut line = match &series.link {
            Some(link) => format!(
                "**Latest:** [Chapter {latest}]({}/{latest})",
                link.trim_end_matches('/')
            ),
            None => format!("**Latest:** Chapter {latest}"),
        };
        if let Some(updated) = series.updated {
            line.push_str(&format!(" on {}", updated.format("%Y-%m-%d")));
        }
        lines.push(line);
    }
    lines.push(" ".to_string());
    if let Some(series_type) = &series.series_type {
        lines.push(format!("**Type:** {series_type}"));
    }
    if !series.genres.is_empty() {
        lines.push("**Genres:**".to_string());
        lines.extend(wrap_words(&series.genres.join(", "), WRAP_WIDTH));
    }
    lines.join("\n")
}

/// Embed fields of a scraped series page.
fn web_fields(series_title: &str, page: &SeriesPage) -> Vec<(String, String)> {
    let mut fields = vec![("Title".to_string(), page.title.clone())];
    fields.extend(page.fields.iter().cloned());
    fields.push((
        "Categories".to_string(),
        wrap_words(&page.categories.join(", "), WRAP_WIDTH).join("\n"),
    ));
    fields.push((
        "Tags".to_string(),
        wrap_words(&page.tags.join(", "), WRAP_WIDTH).join("\n"),
    ));
    let chapters = page
        .chapters
        .iter()
        .take(RECENT_CHAPTERS)
        .map(|(name, url)| format!("[{}]({url})", name.replace(series_title, "Chapter")))
        .collect::<Vec<_>>()
        .join("\n");
    fields.push(("Recent Chapters".to_string(), chapters));

    fields
        .into_iter()
        .map(|(name, value)| {
            let value = if value.trim().is_empty() {
                "\u{200b}".to_string()
            } else {
                value
            };
            (name, value)
        })
        .collect()
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
