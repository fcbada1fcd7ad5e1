//! Notification embed of a feed entry.

use chrono::DateTime;
use chrono::Utc;
use minijinja::Environment;
use minijinja::context;
use poise::serenity_prelude::CreateEmbed;
use poise::serenity_prelude::CreateEmbedAuthor;
use poise::serenity_prelude::CreateEmbedFooter;
use poise::serenity_prelude::Timestamp;

use crate::feed::FeedEntry;
use crate::feed::SiteInfo;

pub const ENTRY_COLOUR: u32 = 2272250;
const SUMMARY_MAX_CHARS: usize = 1500;
const ZERO_WIDTH_SPACE: &str = "\u{200b}";

const DESCRIPTION_TEMPLATE: &str =
    "{{ summary }}\n\n📖 [Read it at {{ site }}!]({{ url }})";

/// Plain data of an entry notification, converted to a serenity embed on send.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryEmbed {
    pub author_name: String,
    pub author_url: String,
    pub description: String,
    pub thumbnail_url: String,
    pub colour: u32,
    pub timestamp: DateTime<Utc>,
    pub footer: String,
}

impl EntryEmbed {
    pub fn to_create_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .author(CreateEmbedAuthor::new(&self.author_name).url(&self.author_url))
            .description(&self.description)
            .thumbnail(&self.thumbnail_url)
            .colour(self.colour)
            .footer(CreateEmbedFooter::new(&self.footer));
        if let Ok(ts) = Timestamp::from_unix_timestamp(self.timestamp.timestamp()) {
            embed = embed.timestamp(ts);
        }
        embed
    }
}

pub struct EntryMessageBuilder {
    env: Environment<'static>,
}

impl EntryMessageBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Markdown, not HTML.
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        Self { env }
    }

    pub fn build(&self, entry: &FeedEntry, site: &SiteInfo) -> EntryEmbed {
        EntryEmbed {
            author_name: html_to_text(&entry.title),
            author_url: entry.item_id.clone(),
            description: self.description(entry, site),
            thumbnail_url: entry.poster_url(&site.uploads_url),
            colour: ENTRY_COLOUR,
            timestamp: entry.updated,
            footer: "Updated".to_string(),
        }
    }

    fn description(&self, entry: &FeedEntry, site: &SiteInfo) -> String {
        let summary = entry
            .summary
            .as_deref()
            .map(html_to_text)
            .filter(|s| !s.is_empty())
            .map(|s| format!("*{}*", truncate(&s, SUMMARY_MAX_CHARS)))
            .unwrap_or_else(|| ZERO_WIDTH_SPACE.to_string());

        self.env
            .render_str(
                DESCRIPTION_TEMPLATE,
                context! { summary => summary, site => site.name, url => entry.item_id },
            )
            .unwrap_or_else(|_| format!("{summary}\n\n📖 [Read it at {}!]({})", site.name, entry.item_id))
    }
}

/// Converts feed HTML to Discord markdown, collapsing blank lines.
pub fn html_to_text(html: &str) -> String {
    html2md::parse_html(html)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteInfo {
        SiteInfo {
            name: "Hatigarm Scans".to_string(),
            feed_url: "https://www.hatigarmscans.net/feed".to_string(),
            uploads_url: "http://hatigarmscans.net/uploads".to_string(),
            avatar_url: "https://i.imgur.com/HZ27mE7.png".to_string(),
        }
    }

    fn entry(summary: Option<&str>) -> FeedEntry {
        FeedEntry {
            item_id: "http://hatigarmscans.net/manga/kingdom/595".to_string(),
            title: "Kingdom #595".to_string(),
            link: "http://hatigarmscans.net/manga/kingdom/595".to_string(),
            author: None,
            summary: summary.map(String::from),
            content: None,
            updated: Utc::now(),
        }
    }

    #[test]
    fn test_build_with_summary() {
        let embed = EntryMessageBuilder::new().build(&entry(Some("<p>War &amp; peace</p>")), &site());
        assert_eq!(embed.author_name, "Kingdom #595");
        assert_eq!(
            embed.description,
            "*War & peace*\n\n📖 [Read it at Hatigarm Scans!](http://hatigarmscans.net/manga/kingdom/595)"
        );
        assert_eq!(
            embed.thumbnail_url,
            "http://hatigarmscans.net/uploads/manga/kingdom/cover/cover_250x350.jpg"
        );
        assert_eq!(embed.colour, ENTRY_COLOUR);
        assert_eq!(embed.footer, "Updated");
    }

    #[test]
    fn test_build_without_summary() {
        let embed = EntryMessageBuilder::new().build(&entry(None), &site());
        assert!(embed.description.starts_with(ZERO_WIDTH_SPACE));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("ééééé", 3), "éé…");
        assert_eq!(truncate("short", 10), "short");
    }
}
