//! Application layer for isdash.
//!
//! Stateful use cases over the core traits: the incremental search
//! controller, the live channel feed, notifications and the session.

pub mod channel_feed;
pub mod notification_center;
pub mod observable;
pub mod search;
pub mod session_usecase;

pub use channel_feed::ChannelFeedReader;
pub use notification_center::NotificationCenter;
pub use observable::{Observable, Subscription};
pub use search::{IncrementalSearchController, SearchControllerBuilder, SearchHandle, SearchState};
pub use session_usecase::{DashboardSession, SessionScoped};
