// Model exports
pub mod availability;
pub mod domain;
pub mod requests;
pub mod responses;

pub use availability::{Availability, DayAvailability};
pub use domain::{
    Address, AccountStatus, AppSettings, Booking, BookingStatus, BoundingBox, Cleaner, CleanerStats,
    DateOption, FunnelStats, GeoPoint, House, Job, JobStatus, JobSummary, MatchScore, MatchTier, Notification,
    NotificationKind, Onboarding, PricingBreakdown, RankedCandidate, ScoreBreakdown, ScoringWeights,
    TierThresholds, TimeSlot, TravelEstimate, VerificationStatus,
};
pub use requests::{AcceptRequest, CandidatesQuery, ExplainQuery};
pub use responses::{AcceptResponse, CandidatesResponse, ErrorResponse, HealthResponse};
