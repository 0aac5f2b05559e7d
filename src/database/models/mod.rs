pub mod activity;
pub mod finished_match;
pub mod join_request;
pub(crate) mod macros;
pub mod match_request;
pub mod team;

// Re-export all models for easy importing
pub use activity::*;
pub use finished_match::*;
pub use join_request::*;
pub use match_request::*;
pub use team::*;
