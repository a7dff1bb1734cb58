//! Incremental search over paginated directories.

mod controller;
mod state;

#[cfg(test)]
mod controller_test;

pub use controller::{IncrementalSearchController, SearchControllerBuilder, SearchHandle};
pub use state::SearchState;
