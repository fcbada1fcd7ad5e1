use poise::Command;

use crate::bot::Data;

pub mod colours;
pub mod core;
pub mod dev;
pub mod osu;
pub mod rss;
pub mod series;
pub mod statistics;
pub mod utilities;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub use colours::ColoursCog;
pub use self::core::CoreCog;
pub use dev::DevCog;
pub use osu::OsuCog;
pub use rss::RssCog;
pub use series::SeriesCog;
pub use statistics::StatisticsCog;
pub use utilities::UtilitiesCog;

pub trait Cog {
    fn commands(&self) -> Vec<Command<Data, Error>>;
}

pub struct Cogs;

impl Cog for Cogs {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        CoreCog
            .commands()
            .into_iter()
            .chain(RssCog.commands())
            .chain(SeriesCog.commands())
            .chain(UtilitiesCog.commands())
            .chain(ColoursCog.commands())
            .chain(StatisticsCog.commands())
            .chain(OsuCog.commands())
            .chain(DevCog.commands())
            .collect()
    }
}
