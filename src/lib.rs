//! Maid Match - matching, ranking and claim engine for the cleaning marketplace
//!
//! Given a booking, the engine finds which cleaners can take it, ranks them
//! by a seven-factor score, offers it to the best of them and guarantees that
//! exactly one cleaner wins when several accept at once.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    ClaimCoordinator, ClaimError, Matcher, OfferBroadcaster,
    distance::{haversine_distance, calculate_bounding_box},
};
pub use models::{Booking, Cleaner, House, MatchTier, RankedCandidate, ScoringWeights};
pub use services::{MemoryStore, PostgresStore, Repositories};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    #[test]
    fn test_library_exports() {
        let bbox = calculate_bounding_box(GeoPoint::new(40.7128, -74.0060), 10.0);
        assert!(bbox.min_lat < 40.7128);
        assert_eq!(haversine_distance(40.7128, -74.0060, 40.7128, -74.0060), 0.0);
    }
}
