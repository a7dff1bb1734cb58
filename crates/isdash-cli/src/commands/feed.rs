use anyhow::Result;
use isdash_application::ChannelFeedReader;
use isdash_core::auth::AuthState;
use isdash_core::notification::NotificationSink;
use isdash_infrastructure::ChannelDirectory;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::context::Context;

/// Polls `address` for `seconds`, printing each new message as a JSON line.
pub async fn run(address: &str, seconds: u64) -> Result<()> {
    let ctx = Context::load().await?;
    let reader = ChannelFeedReader::new(
        Arc::new(ChannelDirectory::new(ctx.client.clone())),
        ctx.auth.clone() as Arc<dyn AuthState>,
        Some(Arc::new(ctx.notifications.clone()) as Arc<dyn NotificationSink>),
        &ctx.config.feed,
    );

    let seen = Mutex::new(Vec::<String>::new());
    let _printer = reader.on_messages_changed(move |messages| {
        let mut seen = seen.lock().unwrap_or_else(|e| e.into_inner());
        // Oldest first, so output reads chronologically.
        for message in messages.iter().rev() {
            if seen.contains(&message.link) {
                continue;
            }
            seen.push(message.link.clone());
            match serde_json::to_string(message) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "cannot print message"),
            }
        }
    });

    reader.start_reading(address).await?;
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    reader.stop_reading();
    Ok(())
}
