pub mod join_requests;
pub mod listing;
pub mod match_requests;
pub mod membership;
pub mod notifier;
pub mod outcome;
pub mod roles;

pub use join_requests::JoinRequestService;
pub use listing::ListingService;
pub use match_requests::MatchRequestService;
pub use membership::MembershipService;
pub use notifier::{ActivityNotifier, NotificationSink};
pub use outcome::OutcomeService;
