//! Identity domain models.

pub mod model;

pub use model::{Identity, UserRole, UserType};
