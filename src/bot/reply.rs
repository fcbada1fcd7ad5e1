//! Embed replies shared by every cog.

use poise::CreateReply;
use poise::ReplyHandle;
use poise::serenity_prelude::CreateEmbed;
use poise::serenity_prelude::CreateEmbedFooter;
use poise::serenity_prelude::ReactionType;

use crate::bot::commands::Context;
use crate::bot::commands::Error;

/// Embed description limit enforced by Discord.
pub const DESCRIPTION_LIMIT: usize = 4096;
const CODEBLOCK_LIMIT: usize = 1900;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyKind {
    Info,
    Success,
    Warning,
    Error,
    Help,
}

impl ReplyKind {
    pub fn colour(self) -> u32 {
        match self {
            ReplyKind::Info => 0x3498db,
            ReplyKind::Success => 0x2ecc71,
            ReplyKind::Warning => 0xf1c40f,
            ReplyKind::Error => 0xe74c3c,
            ReplyKind::Help => 0x7289da,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ReplyKind::Info => "ℹ️",
            ReplyKind::Success => "✅",
            ReplyKind::Warning => "⚠️",
            ReplyKind::Error => "❌",
            ReplyKind::Help => "❔",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "info" => Some(ReplyKind::Info),
            "success" => Some(ReplyKind::Success),
            "warning" => Some(ReplyKind::Warning),
            "error" => Some(ReplyKind::Error),
            "help" => Some(ReplyKind::Help),
            _ => None,
        }
    }
}

/// Embed with the kind's colour and icon in front of the title.
pub fn kind_embed(kind: ReplyKind, title: &str, content: Option<&str>) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .colour(kind.colour())
        .title(format!("{} {}", kind.icon(), title));
    if let Some(content) = content.filter(|c| !c.is_empty()) {
        embed = embed.description(truncate(content, DESCRIPTION_LIMIT));
    }
    embed
}

pub async fn send_kind<'a>(
    ctx: Context<'a>,
    kind: ReplyKind,
    title: &str,
    content: Option<&str>,
) -> Result<ReplyHandle<'a>, Error> {
    Ok(ctx
        .send(CreateReply::default().embed(kind_embed(kind, title, content)))
        .await?)
}

pub async fn info<'a>(ctx: Context<'a>, title: &str, content: Option<&str>) -> Result<ReplyHandle<'a>, Error> {
    send_kind(ctx, ReplyKind::Info, title, content).await
}

pub async fn success<'a>(ctx: Context<'a>, title: &str, content: Option<&str>) -> Result<ReplyHandle<'a>, Error> {
    send_kind(ctx, ReplyKind::Success, title, content).await
}

pub async fn warning<'a>(ctx: Context<'a>, title: &str, content: Option<&str>) -> Result<ReplyHandle<'a>, Error> {
    send_kind(ctx, ReplyKind::Warning, title, content).await
}

pub async fn error<'a>(ctx: Context<'a>, title: &str, content: Option<&str>) -> Result<ReplyHandle<'a>, Error> {
    send_kind(ctx, ReplyKind::Error, title, content).await
}

pub async fn help<'a>(ctx: Context<'a>, title: &str, content: Option<&str>) -> Result<ReplyHandle<'a>, Error> {
    send_kind(ctx, ReplyKind::Help, title, content).await
}

/// Plain embed in the default info colour.
pub fn plain_embed(title: &str, content: Option<&str>) -> CreateEmbed {
    let mut embed = CreateEmbed::new().colour(ReplyKind::Info.colour()).title(title);
    if let Some(content) = content.filter(|c| !c.is_empty()) {
        embed = embed.description(truncate(content, DESCRIPTION_LIMIT));
    }
    embed
}

pub async fn embed<'a>(ctx: Context<'a>, embed: CreateEmbed) -> Result<ReplyHandle<'a>, Error> {
    Ok(ctx.send(CreateReply::default().embed(embed)).await?)
}

/// Reacts with ✅ to prefix invocations, replies otherwise.
pub async fn ok(ctx: Context<'_>) -> Result<(), Error> {
    match ctx {
        poise::Context::Prefix(prefix_ctx) => {
            prefix_ctx
                .msg
                .react(ctx.http(), ReactionType::Unicode("✅".to_string()))
                .await?;
        }
        poise::Context::Application(_) => {
            ctx.say("✅").await?;
        }
    }
    Ok(())
}

pub async fn codeblock<'a>(ctx: Context<'a>, text: &str, lang: &str) -> Result<ReplyHandle<'a>, Error> {
    Ok(ctx.say(codeblock_text(text, lang)).await?)
}

/// Wraps `text` in a fenced block, keeping the message under Discord's limit.
pub fn codeblock_text(text: &str, lang: &str) -> String {
    let text = text.replace("```", "`\u{200b}``");
    let text = if text.trim().is_empty() { "\u{200b}".to_string() } else { text };
    format!("```{lang}\n{}\n```", truncate(&text, CODEBLOCK_LIMIT))
}

pub fn footer(text: &str) -> CreateEmbedFooter {
    CreateEmbedFooter::new(text)
}

/// Cuts `text` to at most `max` chars, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codeblock_text() {
        assert_eq!(codeblock_text("hello", "py"), "```py\nhello\n```");
        assert_eq!(codeblock_text("", ""), "```\n\u{200b}\n```");
        assert!(!codeblock_text("a ``` b", "").contains("a ``` b"));
    }

    #[test]
    fn test_codeblock_text_is_bounded() {
        let long = "x".repeat(5000);
        assert!(codeblock_text(&long, "").chars().count() < 2000);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(ReplyKind::from_name("Warning"), Some(ReplyKind::Warning));
        assert_eq!(ReplyKind::from_name("nope"), None);
    }
}
