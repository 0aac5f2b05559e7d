use std::sync::Arc;

use sqlx::SqlitePool;

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::AppError;
use services::{
    JoinRequestService, ListingService, MatchRequestService, MembershipService,
    NotificationSink, OutcomeService,
};

pub struct AppState {
    pub membership: MembershipService,
    pub join_requests: JoinRequestService,
    pub match_requests: MatchRequestService,
    pub outcome: OutcomeService,
    pub listing: ListingService,
}

impl AppState {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            membership: MembershipService::new(pool.clone(), notifier.clone()),
            join_requests: JoinRequestService::new(pool.clone(), notifier.clone()),
            match_requests: MatchRequestService::new(pool.clone(), notifier.clone()),
            outcome: OutcomeService::new(pool.clone(), notifier),
            listing: ListingService::new(pool),
        }
    }
}
