pub mod discord_gateway;
pub mod entry_message_builder;
pub mod series_update_subscriber;
pub mod webhook_subscriber;

use anyhow::Result;

#[async_trait::async_trait]
pub trait Subscriber<E> {
    async fn callback(&self, event: E) -> Result<()>;
}
