pub mod activity;
pub mod finished_match;
pub mod join_request;
pub mod match_request;
pub mod team;
