pub mod auth;
pub mod channel;
pub mod config;
pub mod error;
pub mod identity;
pub mod notification;
pub mod search;

// Re-export common error type
pub use error::{IsdashError, Result};
