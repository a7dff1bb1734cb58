use async_trait::async_trait;

use crate::channel::{ChannelData, ReadWindow};
use crate::error::Result;

/// Reads messages from a channel.
#[async_trait]
pub trait ChannelReader: Send + Sync {
    /// Returns the messages of `channel_address` inside `window`, newest first.
    async fn read(&self, channel_address: &str, window: ReadWindow) -> Result<Vec<ChannelData>>;
}
