//! Session authentication and request throttling

pub mod rate_limit;
pub mod session;

pub use rate_limit::{RateLimiter, RateLimits};
pub use session::{AccountIdentity, session_auth_middleware};
