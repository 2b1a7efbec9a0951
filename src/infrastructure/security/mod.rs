pub mod patterns;
pub mod threat;

pub use patterns::{RequestVerdict, inspect_request};
pub use threat::{threat_level, threat_score};
