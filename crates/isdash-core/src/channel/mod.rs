//! Channel domain: channel metadata, channel messages and the reader seam
//! used by the live feed.

pub mod model;
pub mod service;

pub use model::{ChannelData, ChannelInfo, ChannelLog, ChannelTopic, ReadWindow, SubscriptionState};
pub use service::ChannelReader;
