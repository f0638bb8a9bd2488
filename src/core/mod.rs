// Core algorithm exports
pub mod broadcast;
pub mod claim;
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod ranker;
pub mod scoring;

pub use broadcast::{BroadcastError, BroadcastSummary, OfferBroadcaster, RankedBooking};
pub use claim::{calculate_earnings, ClaimCoordinator, ClaimError, ClaimOutcome, JobDetails};
pub use distance::{calculate_bounding_box, estimate_travel, haversine_distance, is_within_bounding_box};
pub use filters::{EligibilityExplanation, EligibilityFilter, EligibilityReport, EligibilityStage, Exclusion};
pub use matcher::{MatchResult, Matcher};
pub use ranker::{rank_candidates, BROADCAST_LIMIT};
pub use scoring::{ScoreExplanation, ScoringEngine, ScoringError};
