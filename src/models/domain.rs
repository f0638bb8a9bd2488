use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::availability::Availability;

/// Divisor used to back out pre-tax subtotal when a booking only carries a total
pub const SALES_TAX_DIVISOR: f64 = 1.0825;

/// Geographic point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Part of the day a booking is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    /// Morning 06-12, afternoon 12-17, everything else evening
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeSlot::Morning,
            12..=16 => TimeSlot::Afternoon,
            _ => TimeSlot::Evening,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "morning" => Some(TimeSlot::Morning),
            "afternoon" => Some(TimeSlot::Afternoon),
            "evening" => Some(TimeSlot::Evening),
            _ => None,
        }
    }

    /// Hour a slot is assumed to start at when no explicit time was given
    pub fn nominal_hour(self) -> u32 {
        match self {
            TimeSlot::Morning => 9,
            TimeSlot::Afternoon => 13,
            TimeSlot::Evening => 18,
        }
    }
}

/// One of the dates a customer offered for the booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateOption {
    pub date: NaiveDate,
    #[serde(default)]
    pub time_slot: Option<TimeSlot>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    /// 1 is the customer's first choice
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 { 1 }

impl DateOption {
    /// Explicit slot, else derived from the time of day
    pub fn slot(&self) -> Option<TimeSlot> {
        self.time_slot
            .or_else(|| self.time.map(|t| TimeSlot::from_hour(t.hour())))
    }

    /// Start instant of the option, treating the stored wall clock as UTC
    pub fn starts_at(&self) -> DateTime<Utc> {
        let time = self.time.unwrap_or_else(|| {
            let hour = self.slot().map(TimeSlot::nominal_hour).unwrap_or(9);
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
        });
        Utc.from_utc_datetime(&self.date.and_time(time))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    #[serde(alias = "booking-placed", alias = "booking_placed")]
    Placed,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Placed => "placed",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "placed" | "booking-placed" | "booking_placed" => Some(BookingStatus::Placed),
            "confirmed" => Some(BookingStatus::Confirmed),
            "in_progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub taxes: Option<f64>,
}

impl PricingBreakdown {
    /// Pre-tax amount cleaner earnings are computed from.
    ///
    /// Subtotal when present, else total minus taxes, else the total with
    /// the default sales tax backed out.
    pub fn earnings_base(&self) -> f64 {
        match (self.subtotal, self.taxes) {
            (Some(subtotal), _) if subtotal > 0.0 => subtotal,
            (_, Some(taxes)) => self.total - taxes,
            _ => self.total / SALES_TAX_DIVISOR,
        }
    }
}

/// A customer's service request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub house_id: String,
    pub service_type: String,
    #[serde(default)]
    pub date_options: Vec<DateOption>,
    #[serde(rename = "pricingBreakdown", default)]
    pub pricing: PricingBreakdown,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub cleaner_id: Option<String>,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Date options ordered by customer priority (stable for equal priorities)
    pub fn options_by_priority(&self) -> Vec<&DateOption> {
        let mut options: Vec<&DateOption> = self.date_options.iter().collect();
        options.sort_by_key(|o| o.priority);
        options
    }

    pub fn primary_option(&self) -> Option<&DateOption> {
        self.options_by_priority().into_iter().next()
    }

    pub fn is_claimed(&self) -> bool {
        self.cleaner_id.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct House {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub sqft: Option<u32>,
    #[serde(default)]
    pub has_pets: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    Inactive,
}

/// Onboarding checklist, every step is required before a cleaner gets work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Onboarding {
    #[serde(default)]
    pub profile: bool,
    #[serde(default)]
    pub photo: bool,
    #[serde(default)]
    pub location: bool,
    #[serde(default)]
    pub availability: bool,
    #[serde(default)]
    pub background_check: bool,
    #[serde(default)]
    pub bank: bool,
}

impl Onboarding {
    pub fn complete() -> Self {
        Self {
            profile: true,
            photo: true,
            location: true,
            availability: true,
            background_check: true,
            bank: true,
        }
    }

    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("profile", self.profile),
            ("photo", self.photo),
            ("location", self.location),
            ("availability", self.availability),
            ("background_check", self.background_check),
            ("bank", self.bank),
        ]
        .into_iter()
        .filter(|(_, done)| !done)
        .map(|(step, _)| step)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanerStats {
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub acceptance_rate: Option<f64>,
    #[serde(default)]
    pub reliability_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// Jobs that still occupy the cleaner's calendar
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Scheduled | JobStatus::Confirmed | JobStatus::InProgress)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Scheduled => "scheduled",
            JobStatus::Confirmed => "confirmed",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

}

/// A job on a cleaner's calendar, as seen by the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub booking_id: String,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub time_slot: Option<TimeSlot>,
    pub status: JobStatus,
    /// Location of the house the job is (or was) at
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub customer_rating: Option<f64>,
}

/// Service provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cleaner {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub account_status: AccountStatus,
    #[serde(default)]
    pub onboarding: Onboarding,
    #[serde(default)]
    pub base_location: Option<GeoPoint>,
    #[serde(default)]
    pub service_radius_miles: Option<f64>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub service_types: BTreeSet<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub stats: CleanerStats,
    #[serde(default)]
    pub last_active_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub upcoming_job_count: u32,
    /// Hydrated by the repository from the jobs table
    #[serde(default)]
    pub jobs: Vec<JobSummary>,
}

impl Cleaner {
    pub fn active_jobs(&self) -> impl Iterator<Item = &JobSummary> {
        self.jobs.iter().filter(|j| j.status.is_active())
    }

    /// Active jobs on `date`, not counting the booking being matched
    pub fn active_jobs_on(&self, date: NaiveDate, excluding_booking: &str) -> usize {
        self.active_jobs()
            .filter(|j| j.scheduled_date == date && j.booking_id != excluding_booking)
            .count()
    }

    pub fn finished_jobs(&self) -> impl Iterator<Item = &JobSummary> {
        self.jobs.iter().filter(|j| j.status.is_finished())
    }
}

/// Job created at the instant a cleaner wins a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub booking_id: String,
    pub customer_id: String,
    pub cleaner_id: String,
    pub house_id: String,
    pub status: JobStatus,
    pub scheduled_date: NaiveDate,
    pub time_slot: Option<TimeSlot>,
    pub earnings: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    JobOffer,
    BookingAccepted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::JobOffer => "job_offer",
            NotificationKind::BookingAccepted => "booking_accepted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "job_offer" => Some(NotificationKind::JobOffer),
            "booking_accepted" => Some(NotificationKind::BookingAccepted),
            _ => None,
        }
    }
}

/// Match tier shown to cleaners on an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    #[serde(rename = "Premier")]
    Premier,
    #[serde(rename = "Highly Recommended")]
    HighlyRecommended,
    #[serde(rename = "Strong Match")]
    StrongMatch,
}

impl MatchTier {
    pub fn label(&self) -> &'static str {
        match self {
            MatchTier::Premier => "Premier",
            MatchTier::HighlyRecommended => "Highly Recommended",
            MatchTier::StrongMatch => "Strong Match",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Premier" => Some(MatchTier::Premier),
            "Highly Recommended" => Some(MatchTier::HighlyRecommended),
            "Strong Match" => Some(MatchTier::StrongMatch),
            _ => None,
        }
    }
}

/// Notification record. Job offers are one of these with `kind = JobOffer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Booking id
    pub related_id: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub match_tier: Option<MatchTier>,
    #[serde(default)]
    pub earnings_estimate: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Marketplace settings owned by the admin side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default = "default_earnings_rate")]
    pub cleaner_earnings_rate: f64,
    #[serde(default = "default_service_radius")]
    pub default_service_radius_miles: f64,
}

fn default_earnings_rate() -> f64 { 0.90 }
fn default_service_radius() -> f64 { 15.0 }

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            cleaner_earnings_rate: default_earnings_rate(),
            default_service_radius_miles: default_service_radius(),
        }
    }
}

/// Driving estimate derived from straight-line distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelEstimate {
    pub air_miles: f64,
    pub road_miles: f64,
    pub travel_minutes: f64,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Maximum points each scoring factor can contribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub distance: f64,
    pub acceptance: f64,
    pub rating: f64,
    pub availability: f64,
    pub area_performance: f64,
    pub engagement: f64,
    pub scheduling: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            distance: 25.0,
            acceptance: 20.0,
            rating: 20.0,
            availability: 15.0,
            area_performance: 10.0,
            engagement: 5.0,
            scheduling: 5.0,
        }
    }
}

/// Score thresholds for offer tiers (strictly greater than)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub premier: f64,
    pub highly_recommended: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            premier: 100.0,
            highly_recommended: 75.0,
        }
    }
}

impl TierThresholds {
    pub fn tier_for(&self, score: f64) -> MatchTier {
        if score > self.premier {
            MatchTier::Premier
        } else if score > self.highly_recommended {
            MatchTier::HighlyRecommended
        } else {
            MatchTier::StrongMatch
        }
    }
}

/// Per-factor points of a match score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub distance: f64,
    pub acceptance: f64,
    pub rating: f64,
    pub availability: f64,
    pub area_performance: f64,
    pub engagement: f64,
    pub scheduling: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.distance
            + self.acceptance
            + self.rating
            + self.availability
            + self.area_performance
            + self.engagement
            + self.scheduling
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub total: f64,
    pub breakdown: ScoreBreakdown,
}

/// Ranked, scored candidate for a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub rank: usize,
    pub cleaner_id: String,
    pub user_id: String,
    pub distance_miles: f64,
    pub travel: TravelEstimate,
    pub score: MatchScore,
    pub match_tier: MatchTier,
}

/// How many cleaners survived each eligibility stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStats {
    pub total: usize,
    pub verified: usize,
    pub active: usize,
    pub onboarded: usize,
    pub in_range: usize,
    pub available: usize,
    pub capable: usize,
    pub conflict_free: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_slot_from_hour() {
        assert_eq!(TimeSlot::from_hour(6), TimeSlot::Morning);
        assert_eq!(TimeSlot::from_hour(11), TimeSlot::Morning);
        assert_eq!(TimeSlot::from_hour(12), TimeSlot::Afternoon);
        assert_eq!(TimeSlot::from_hour(16), TimeSlot::Afternoon);
        assert_eq!(TimeSlot::from_hour(17), TimeSlot::Evening);
        assert_eq!(TimeSlot::from_hour(3), TimeSlot::Evening);
    }

    #[test]
    fn test_earnings_base_fallbacks() {
        let with_subtotal = PricingBreakdown { subtotal: Some(100.0), total: 108.25, taxes: Some(8.25) };
        let with_taxes = PricingBreakdown { subtotal: None, total: 120.0, taxes: Some(20.0) };
        let total_only = PricingBreakdown { subtotal: None, total: 108.25, taxes: None };

        assert_eq!(with_subtotal.earnings_base(), 100.0);
        assert_eq!(with_taxes.earnings_base(), 100.0);
        assert!((total_only.earnings_base() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_tier_thresholds() {
        let tiers = TierThresholds::default();
        assert_eq!(tiers.tier_for(101.0), MatchTier::Premier);
        assert_eq!(tiers.tier_for(100.0), MatchTier::HighlyRecommended);
        assert_eq!(tiers.tier_for(75.5), MatchTier::HighlyRecommended);
        assert_eq!(tiers.tier_for(75.0), MatchTier::StrongMatch);
    }

    #[test]
    fn test_booking_status_wire_names() {
        let status: BookingStatus = serde_json::from_str("\"booking-placed\"").unwrap();
        assert_eq!(status, BookingStatus::Placed);
        assert_eq!(BookingStatus::parse(BookingStatus::InProgress.as_str()), Some(BookingStatus::InProgress));
    }

    #[test]
    fn test_onboarding_missing_steps() {
        let mut onboarding = Onboarding::complete();
        assert!(onboarding.is_complete());

        onboarding.bank = false;
        assert_eq!(onboarding.missing(), vec!["bank"]);
    }
}
