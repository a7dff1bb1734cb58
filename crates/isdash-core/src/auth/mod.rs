//! Authentication state: the stored session, JWT inspection, and the
//! read-only signal search and feed components gate on.

pub mod model;
pub mod service;

pub use model::{is_jwt_expired, AuthenticationData, JwtClaims, JwtUser};
pub use service::{AuthRepository, AuthState, StaticAuthState};
