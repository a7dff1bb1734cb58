//! Integration Services HTTP client.

mod channel_directory;
mod client;
mod identity_directory;

pub use channel_directory::ChannelDirectory;
pub use client::IsApiClient;
pub use identity_directory::IdentityDirectory;
