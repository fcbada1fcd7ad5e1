//! Adding and editing series, interactively or one field at a time.

use log::info;
use log::warn;
use poise::serenity_prelude::EditRole;

use crate::bot::checks;
use crate::bot::checks::Privilege;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::commands::series::wrap_words;
use crate::bot::error::BotError;
use crate::bot::prompt;
use crate::bot::reply;
use crate::bot::reply::ReplyKind;
use crate::feed::series_poster_url;
use crate::model::SeriesChange;
use crate::model::SeriesModel;

const SERIES_TYPES: [&str; 4] = ["Manga", "Manhua", "Manhwa", "Other"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditField {
    Link,
    Title,
    Shortname,
    Latest,
    Status,
    Priority,
    Genres,
    Type,
}

impl EditField {
    /// Fields offered by the interactive menu, in menu order.
    pub const MENU: [EditField; 7] = [
        EditField::Link,
        EditField::Title,
        EditField::Shortname,
        EditField::Status,
        EditField::Priority,
        EditField::Genres,
        EditField::Type,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EditField::Link => "link",
            EditField::Title => "title",
            EditField::Shortname => "shortname",
            EditField::Latest => "latest",
            EditField::Status => "status",
            EditField::Priority => "priority",
            EditField::Genres => "genres",
            EditField::Type => "type",
        }
    }

    pub fn label(self) -> String {
        title_case(self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::MENU
            .into_iter()
            .chain([EditField::Latest])
            .find(|field| field.name() == name)
    }

    /// Column update for `value`. An empty value clears optional columns.
    pub fn change(self, value: &str) -> Result<SeriesChange, BotError> {
        let value = value.trim();
        let optional = || Some(Some(value.to_string()).filter(|v| !v.is_empty()));
        let mut change = SeriesChange::default();
        match self {
            EditField::Link => change.link = optional(),
            EditField::Latest => change.latest_chapter = optional(),
            EditField::Status => change.status = optional(),
            EditField::Type => change.series_type = optional(),
            EditField::Title | EditField::Shortname if value.is_empty() => {
                return Err(BotError::InvalidCommandArgument {
                    parameter: self.name().to_string(),
                    reason: "cannot be empty".to_string(),
                });
            }
            EditField::Title => change.title = Some(value.to_string()),
            EditField::Shortname => change.shortname = Some(value.to_string()),
            EditField::Priority => change.priority = Some(parse_priority(value)?),
            EditField::Genres => change.genres = Some(parse_genres(value)),
        }
        Ok(change)
    }

    /// How the new value is shown before confirming.
    fn preview(self, value: &str) -> String {
        match self {
            EditField::Genres => parse_genres(value).join("\n"),
            _ => value.trim().to_string(),
        }
    }
}

pub async fn add(
    ctx: Context<'_>,
    link: String,
    title: Option<String>,
    status: Option<String>,
    priority: Option<i32>,
) -> Result<(), Error> {
    let link = link
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string();
    let series = &ctx.data().services.series;

    let title = match title {
        Some(title) => title,
        None => prompt::ask_text(ctx, "What's the name of the series?").await?,
    };
    if series.get(&title).await?.is_some() {
        reply::error(ctx, "Series already exists", None).await?;
        return Ok(());
    }

    let status = match status {
        Some(status) => status,
        None => prompt::ask_text(ctx, &format!("What's the scanlation status of {title}?")).await?,
    };
    let priority = match priority {
        Some(priority) => priority,
        None => {
            let answer =
                prompt::ask_text(ctx, &format!("What's the scanlation priority of {title}?"))
                    .await?;
            parse_priority(&answer)?.unwrap_or_default()
        }
    };
    let shortname = prompt::ask_text(ctx, &format!("What's the short name for {title}?")).await?;

    let uploads_url = &ctx.data().services.feed_source.site().uploads_url;
    let summary = reply::plain_embed(
        "Thanks! Does this look right?",
        Some(&format!(
            "**{title}**\n[Series Link]({link})\nShortname: {shortname}\nStatus: {status}\nPriority: {priority}"
        )),
    )
    .thumbnail(series_poster_url(uploads_url, &link));
    if !prompt::confirm(ctx, summary).await? {
        reply::error(ctx, "Cancelled", None).await?;
        return Ok(());
    }

    let mut model = SeriesModel::new(shortname, title.clone());
    model.link = Some(link);
    model.status = Some(status);
    model.priority = Some(priority);
    series.add(&model).await?;

    reply::success(
        ctx,
        &format!("Added {title}"),
        Some(&format!(
            "Consider adding extra details with:```{}series edit <series>```",
            ctx.prefix()
        )),
    )
    .await?;
    Ok(())
}

/// Menu that edits fields of one series until the author is done.
pub async fn menu(ctx: Context<'_>, term: &str) -> Result<(), Error> {
    let mut title = prompt::resolve_series(ctx, term).await?;
    let options: Vec<(String, String)> = EditField::MENU
        .iter()
        .map(|f| (f.label(), f.name().to_string()))
        .collect();

    loop {
        let question = reply::kind_embed(
            ReplyKind::Info,
            "What do you want to edit?",
            Some(&format!("**Editing {title}**")),
        );
        let Some(field) = prompt::select(ctx, question, &options)
            .await?
            .and_then(|name| EditField::from_name(&name))
        else {
            reply::error(ctx, "Edit cancelled", None).await?;
            return Ok(());
        };

        let Some(value) = ask_value(ctx, field).await? else {
            reply::error(ctx, "Edit cancelled", None).await?;
            continue;
        };

        let check = reply::kind_embed(
            ReplyKind::Info,
            &format!("Is this {} update correct?", field.label()),
            Some(&field.preview(&value)),
        );
        if prompt::confirm(ctx, check).await? {
            title = apply(ctx, &title, field, &value).await?;
            reply::success(ctx, &format!("{} updated for {title}", field.label()), None).await?;
        } else {
            reply::error(ctx, "Update Cancelled.", None).await?;
        }

        let again = reply::kind_embed(ReplyKind::Info, "Do you want to edit something else?", None);
        if !prompt::confirm(ctx, again).await? {
            return Ok(());
        }
    }
}

/// `None` when the author cancels the type menu.
async fn ask_value(ctx: Context<'_>, field: EditField) -> Result<Option<String>, Error> {
    if field != EditField::Type {
        let value = prompt::ask_text(ctx, &format!("What's the new {}?", field.name())).await?;
        return Ok(Some(value));
    }

    let options: Vec<(String, String)> = SERIES_TYPES
        .iter()
        .map(|t| (t.to_string(), t.to_string()))
        .collect();
    let question = reply::kind_embed(ReplyKind::Info, "What's the new type?", None);
    match prompt::select(ctx, question, &options).await? {
        Some(t) if t == "Other" => Ok(Some(prompt::ask_text(ctx, "What's the type name?").await?)),
        other => Ok(other),
    }
}

/// Edits one field from a subcommand.
pub async fn single(ctx: Context<'_>, term: &str, field: EditField, value: &str) -> Result<(), Error> {
    checks::require(ctx, Privilege::Admin).await?;
    let title = prompt::resolve_series(ctx, term).await?;
    let new_title = apply(ctx, &title, field, value).await?;

    let value = value.trim();
    match field {
        EditField::Link => reply::success(ctx, &format!("{title} link changed to:"), Some(value)).await?,
        EditField::Shortname => {
            reply::success(ctx, &format!("{title} shortname changed to {value}"), None).await?
        }
        EditField::Latest => {
            reply::success(ctx, &format!("{title} latest chapter changed to {value}"), None)
                .await?
        }
        EditField::Title => reply::success(ctx, &format!("Title Updated: {new_title}."), None).await?,
        EditField::Genres => {
            let genres = wrap_words(&parse_genres(value).join(", "), 30).join("\n");
            reply::success(ctx, &format!("Genres updated for {title}"), Some(&genres)).await?
        }
        _ => {
            reply::success(ctx, &format!("{title} {} changed to {value}", field.name()), None)
                .await?
        }
    };
    Ok(())
}

/// Writes the change and returns the series' title after it.
async fn apply(ctx: Context<'_>, title: &str, field: EditField, value: &str) -> Result<String, Error> {
    let change = field.change(value)?;
    let series = &ctx.data().services.series;

    let old_shortname = match field {
        EditField::Shortname => series.get(title).await?.map(|s| s.shortname),
        _ => None,
    };
    series.edit_by_title(title, &change).await?;
    info!("Edited {} of {title}", field.name());

    if let (Some(old), Some(new)) = (old_shortname, &change.shortname) {
        rename_roles(ctx, &old, new).await;
    }
    Ok(change.title.unwrap_or_else(|| title.to_string()))
}

/// Renames the series role in every guild the bot is in.
async fn rename_roles(ctx: Context<'_>, old: &str, new: &str) {
    for guild_id in ctx.cache().guilds() {
        let roles = match guild_id.roles(ctx.http()).await {
            Ok(roles) => roles,
            Err(e) => {
                warn!("Failed to fetch roles of guild {guild_id}: {e}");
                continue;
            }
        };
        let Some(role) = roles.values().find(|r| r.name == old) else {
            continue;
        };
        if let Err(e) = guild_id
            .edit_role(ctx.http(), role.id, EditRole::new().name(new))
            .await
        {
            warn!("Failed to rename role {} in guild {guild_id}: {e}", role.id);
        }
    }
}

fn parse_priority(value: &str) -> Result<Option<i32>, BotError> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| BotError::InvalidCommandArgument {
            parameter: "priority".to_string(),
            reason: format!("`{value}` is not a number"),
        })
}

/// Comma separated genres, trimmed and title cased.
pub fn parse_genres(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(title_case)
        .collect()
}

/// Upper-cases the first letter of every word and lower-cases the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("slice of LIFE"), "Slice Of Life");
        assert_eq!(title_case("sci-fi"), "Sci-Fi");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_parse_genres() {
        assert_eq!(
            parse_genres(" action,  martial arts ,,drama"),
            vec!["Action", "Martial Arts", "Drama"]
        );
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in EditField::MENU {
            assert_eq!(EditField::from_name(field.name()), Some(field));
        }
        assert_eq!(EditField::from_name("latest"), Some(EditField::Latest));
        assert_eq!(EditField::from_name("cover"), None);
        assert_eq!(EditField::Shortname.label(), "Shortname");
    }

    #[test]
    fn test_change_for_fields() {
        let change = EditField::Priority.change("3").unwrap();
        assert_eq!(change.priority, Some(Some(3)));

        let change = EditField::Link.change("  ").unwrap();
        assert_eq!(change.link, Some(None));

        let change = EditField::Genres.change("action, comedy").unwrap();
        assert_eq!(
            change.genres,
            Some(vec!["Action".to_string(), "Comedy".to_string()])
        );

        assert!(EditField::Priority.change("high").is_err());
        assert!(EditField::Shortname.change(" ").is_err());
    }
}
