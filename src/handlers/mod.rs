pub mod join_requests;
pub mod matches;
pub mod shared;
pub mod teams;
