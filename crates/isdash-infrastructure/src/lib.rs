pub mod auth_store;
pub mod config_service;
pub mod is_client;
pub mod paths;

pub use crate::auth_store::FileAuthStore;
pub use crate::config_service::ConfigService;
pub use crate::is_client::{ChannelDirectory, IdentityDirectory, IsApiClient};
pub use crate::paths::IsdashPaths;
