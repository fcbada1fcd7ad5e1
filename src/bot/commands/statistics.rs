//! Message activity charts.

pub mod chart;

use std::collections::HashMap;

use log::debug;
use poise::Command;
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::CreateAttachment;

use crate::bot::Data;
use crate::bot::checks;
use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::reply;
use crate::model::MemberMessageCount;
use crate::model::MessageStatsOptBuilder;

const LEADERBOARD_SIZE: usize = 10;

pub struct StatisticsCog;

impl StatisticsCog {
    /// Show when a member has been sending messages
    #[poise::command(prefix_command, guild_only, category = "Statistics")]
    pub async fn msgcount(
        ctx: Context<'_>,
        #[description = "Member to show, defaults to you"] member: Option<serenity::Member>,
    ) -> Result<(), Error> {
        let guild_id = checks::guild_id(ctx)?;
        let member = match member {
            Some(member) => member,
            None => guild_id.member(ctx.serenity_context(), ctx.author().id).await?,
        };

        let opt = MessageStatsOptBuilder::default()
            .guild_id(guild_id.get() as i64)
            .author_id(Some(member.user.id.get() as i64))
            .build()?;
        let times = ctx.data().services.activity.message_times(&opt).await?;
        if times.is_empty() {
            reply::error(
                ctx,
                &format!("I haven't seen {} before.", member.display_name()),
                None,
            )
            .await?;
            return Ok(());
        }

        ctx.defer_or_broadcast().await?;
        debug!("Plotting {} messages of {}", times.len(), member.user.id);
        let png = tokio::task::spawn_blocking(move || chart::message_histogram(&times)).await??;

        let guild_name = guild_name(ctx);
        let filename = format!("msgcount-{}.png", member.user.id);
        send_chart(
            ctx,
            &format!("Message Stats - {} in {guild_name}", member.display_name()),
            png,
            filename,
        )
        .await
    }

    /// Show the members with the most messages
    #[poise::command(prefix_command, guild_only, category = "Statistics")]
    pub async fn mostactive(ctx: Context<'_>) -> Result<(), Error> {
        let guild_id = checks::guild_id(ctx)?;
        let counts = ctx.data().services.activity.message_counts(guild_id.get()).await?;
        if counts.is_empty() {
            reply::error(ctx, "No data found.", None).await?;
            return Ok(());
        }

        let names: HashMap<i64, String> = {
            let guild = ctx.cache().guild(guild_id);
            guild
                .map(|g| {
                    g.members
                        .iter()
                        .map(|(id, m)| (id.get() as i64, m.display_name().to_string()))
                        .collect()
                })
                .unwrap_or_default()
        };
        let rows = leaderboard_rows(&counts, ctx.author().id.get() as i64, |id| {
            names.get(&id).cloned().unwrap_or_else(|| id.to_string())
        });

        ctx.defer_or_broadcast().await?;
        let png = tokio::task::spawn_blocking(move || chart::activity_bars(&rows)).await??;

        let guild_name = guild_name(ctx);
        let filename = format!("mostactive-{guild_id}.png");
        send_chart(
            ctx,
            &format!("Message Activity Per Member - {guild_name}"),
            png,
            filename,
        )
        .await
    }
}

impl Cog for StatisticsCog {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        vec![Self::msgcount(), Self::mostactive()]
    }
}

fn guild_name(ctx: Context<'_>) -> String {
    ctx.guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "this server".to_string())
}

async fn send_chart(ctx: Context<'_>, title: &str, png: Vec<u8>, filename: String) -> Result<(), Error> {
    let embed = reply::plain_embed(title, None).image(format!("attachment://{filename}"));
    ctx.send(
        CreateReply::default()
            .attachment(CreateAttachment::bytes(png, filename))
            .embed(embed),
    )
    .await?;
    Ok(())
}

/// One plus the number of members with strictly more messages.
pub fn rank_of(counts: &[MemberMessageCount], author_id: i64) -> Option<(usize, i64)> {
    let own = counts.iter().find(|c| c.author_id == author_id)?.count;
    let above = counts.iter().filter(|c| c.count > own).count();
    Some((above + 1, own))
}

/// Top members by count, followed by the author's own rank when they are
/// not already listed.
pub fn leaderboard_rows<F>(counts: &[MemberMessageCount], author_id: i64, name_of: F) -> Vec<(String, i64)>
where
    F: Fn(i64) -> String,
{
    let top = &counts[..counts.len().min(LEADERBOARD_SIZE)];
    let mut rows: Vec<(String, i64)> = top.iter().map(|c| (name_of(c.author_id), c.count)).collect();

    if top.iter().any(|c| c.author_id == author_id) {
        return rows;
    }
    if let Some((rank, count)) = rank_of(counts, author_id) {
        rows.push(("...".to_string(), 0));
        rows.push((format!("#{rank} - {}", name_of(author_id)), count));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(values: &[(i64, i64)]) -> Vec<MemberMessageCount> {
        values
            .iter()
            .map(|(author_id, count)| MemberMessageCount {
                author_id: *author_id,
                count: *count,
            })
            .collect()
    }

    #[test]
    fn test_rank_of_ties_share_rank() {
        let counts = counts(&[(1, 50), (2, 30), (3, 30), (4, 10)]);
        assert_eq!(rank_of(&counts, 1), Some((1, 50)));
        assert_eq!(rank_of(&counts, 3), Some((2, 30)));
        assert_eq!(rank_of(&counts, 4), Some((4, 10)));
        assert_eq!(rank_of(&counts, 9), None);
    }

    #[test]
    fn test_leaderboard_appends_author_outside_top() {
        let values: Vec<(i64, i64)> = (1..=12).map(|id| (id, 100 - id)).collect();
        let rows = leaderboard_rows(&counts(&values), 12, |id| format!("m{id}"));

        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0], ("m1".to_string(), 99));
        assert_eq!(rows[10], ("...".to_string(), 0));
        assert_eq!(rows[11], ("#12 - m12".to_string(), 88));
    }

    #[test]
    fn test_leaderboard_author_in_top() {
        let rows = leaderboard_rows(&counts(&[(1, 5), (2, 3)]), 2, |id| format!("m{id}"));
        assert_eq!(rows, vec![("m1".to_string(), 5), ("m2".to_string(), 3)]);
    }
}
