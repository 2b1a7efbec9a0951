pub mod login_guard;
pub mod rate_limiter;

pub use login_guard::{LoginAttempts, LoginGuard};
pub use rate_limiter::{EndpointClass, RateDecision, RateLimiter};
