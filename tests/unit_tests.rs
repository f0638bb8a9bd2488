// Unit tests for Maid Match

use chrono::{Duration, NaiveDate, TimeZone, Utc, Weekday};
use maid_match::core::{
    calculate_earnings,
    distance::{calculate_bounding_box, estimate_travel, haversine_distance, is_within_bounding_box},
    filters::{EligibilityFilter, EligibilityStage},
    scoring::{calculate_distance_score, confidence_adjusted_rating, ScoringEngine},
};
use maid_match::models::{
    AccountStatus, Availability, Booking, BookingStatus, Cleaner, CleanerStats, DateOption,
    DayAvailability, GeoPoint, House, MatchTier, Onboarding, PricingBreakdown, ScoringWeights,
    TierThresholds, TimeSlot, VerificationStatus,
};

const AUSTIN: GeoPoint = GeoPoint { lat: 30.2672, lng: -97.7431 };

fn house() -> House {
    House {
        id: "house_1".to_string(),
        owner_id: "customer_1".to_string(),
        location: Some(AUSTIN),
        address: Default::default(),
        sqft: Some(1800),
        has_pets: false,
    }
}

fn booking_on(date: NaiveDate, slot: Option<TimeSlot>) -> Booking {
    Booking {
        id: "booking_1".to_string(),
        customer_id: "customer_1".to_string(),
        house_id: "house_1".to_string(),
        service_type: "standard".to_string(),
        date_options: vec![DateOption { date, time_slot: slot, time: None, priority: 1 }],
        pricing: PricingBreakdown { subtotal: Some(150.0), total: 162.38, taxes: Some(12.38) },
        status: BookingStatus::Placed,
        cleaner_id: None,
        version: 0,
        created_at: None,
        updated_at: None,
    }
}

fn cleaner() -> Cleaner {
    Cleaner {
        id: "cleaner_1".to_string(),
        user_id: "user_1".to_string(),
        verification_status: VerificationStatus::Approved,
        account_status: AccountStatus::Active,
        onboarding: Onboarding::complete(),
        base_location: Some(AUSTIN),
        service_radius_miles: Some(15.0),
        availability: Availability::all_day(),
        service_types: ["standard".to_string()].into_iter().collect(),
        specialties: vec![],
        stats: CleanerStats { rating: 5.0, total_reviews: 50, acceptance_rate: None, reliability_score: None },
        last_active_at: None,
        upcoming_job_count: 0,
        jobs: vec![],
    }
}

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(40.7128, -74.0060, 40.7128, -74.0060);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_distance_austin_to_round_rock() {
    // Downtown Austin to Round Rock is roughly 17 miles as the crow flies
    let distance = haversine_distance(30.2672, -97.7431, 30.5083, -97.6789);
    assert!(distance > 15.0 && distance < 19.0, "got {}", distance);
}

#[test]
fn test_travel_estimate_scales_air_distance() {
    let travel = estimate_travel(AUSTIN, GeoPoint::new(30.5083, -97.6789));
    assert!((travel.road_miles - travel.air_miles * 1.3).abs() < 1e-9);
    assert!((travel.travel_minutes - travel.road_miles * 2.2).abs() < 1e-9);
}

#[test]
fn test_point_within_bbox() {
    let bbox = calculate_bounding_box(AUSTIN, 10.0);

    assert!(is_within_bounding_box(AUSTIN, &bbox));
    assert!(is_within_bounding_box(GeoPoint::new(30.30, -97.70), &bbox));
    assert!(!is_within_bounding_box(GeoPoint::new(32.7767, -96.7970), &bbox));
    assert!(!is_within_bounding_box(GeoPoint::new(bbox.max_lat + 0.01, AUSTIN.lng), &bbox));
}

#[test]
fn test_availability_accepts_slot_map() {
    let availability: Availability = serde_json::from_value(serde_json::json!({
        "sunday": { "morning": true },
        "monday": { "afternoon": true, "evening": true }
    }))
    .unwrap();

    assert!(availability.day(Weekday::Sun).covers(Some(TimeSlot::Morning)));
    assert!(!availability.day(Weekday::Sun).covers(Some(TimeSlot::Evening)));
    assert!(availability.day(Weekday::Mon).covers(None));
    assert!(!availability.day(Weekday::Tue).covers(None));
}

#[test]
fn test_availability_accepts_window_shapes() {
    let window: Availability = serde_json::from_value(serde_json::json!(["08:00", "18:00"])).unwrap();
    assert_eq!(window, Availability::all_day());

    let per_day: Availability = serde_json::from_value(serde_json::json!({
        "saturday": ["09:00", "17:00"]
    }))
    .unwrap();
    assert_eq!(per_day.day(Weekday::Sat), DayAvailability::AllDay);
    assert!(!per_day.day(Weekday::Fri).covers(None));

    let broken = serde_json::from_value::<Availability>(serde_json::json!(["08:00"]));
    assert!(broken.is_err());
}

#[test]
fn test_sunday_morning_eligibility() {
    // 2025-06-01 is a Sunday
    let sunday = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let booking = booking_on(sunday, Some(TimeSlot::Morning));
    let filter = EligibilityFilter::new(15.0, 5);

    let mut morning = cleaner();
    morning.availability = Availability::default().with_day(
        Weekday::Sun,
        DayAvailability::Slots { morning: true, afternoon: false, evening: false },
    );
    assert!(filter.explain(&morning, &booking, &house()).eligible);

    let mut afternoon = cleaner();
    afternoon.availability = Availability::default().with_day(
        Weekday::Sun,
        DayAvailability::Slots { morning: false, afternoon: true, evening: false },
    );
    let explanation = filter.explain(&afternoon, &booking, &house());
    assert!(!explanation.eligible);
    assert_eq!(explanation.reasons[0].stage, EligibilityStage::Availability);
}

#[test]
fn test_eligibility_never_exceeds_radius() {
    let booking = booking_on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(), None);
    let filter = EligibilityFilter::new(15.0, 5);

    let pool: Vec<Cleaner> = (0..40)
        .map(|i| {
            let mut c = cleaner();
            c.id = format!("c{:02}", i);
            c.service_radius_miles = Some((i % 4) as f64 * 5.0 + 5.0);
            c.base_location = Some(GeoPoint::new(AUSTIN.lat + i as f64 * 0.6 / 69.09, AUSTIN.lng));
            c
        })
        .collect();

    let report = filter.find_eligible(&booking, &house(), pool);
    assert!(!report.candidates.is_empty());
    for candidate in &report.candidates {
        let radius = candidate.cleaner.service_radius_miles.unwrap();
        assert!(candidate.distance_miles <= radius, "{} at {} > {}", candidate.cleaner.id, candidate.distance_miles, radius);
    }
}

#[test]
fn test_perfect_fit_scores() {
    let now = Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap();
    let booking = booking_on(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), Some(TimeSlot::Morning));
    let mut perfect = cleaner();
    perfect.last_active_at = Some(now - Duration::minutes(1));

    let engine = ScoringEngine::new(ScoringWeights::default(), TierThresholds::default(), 15.0);
    let score = engine.score(&perfect, &booking, &house(), now).unwrap();

    assert_eq!(score.breakdown.distance, 25.0);
    assert_eq!(score.breakdown.rating, 20.0);
    assert_eq!(score.breakdown.engagement, 5.0);
    assert!((score.total - score.breakdown.total()).abs() < 1e-9);
}

#[test]
fn test_distance_score_never_negative() {
    for distance in [0.0, 7.5, 15.0, 30.0, 999.0] {
        assert!(calculate_distance_score(distance, 15.0) >= 0.0);
    }
}

#[test]
fn test_confidence_adjustment_pulls_toward_neutral() {
    let new_cleaner = confidence_adjusted_rating(5.0, 1);
    let established = confidence_adjusted_rating(5.0, 50);

    assert!(new_cleaner < established);
    assert!(new_cleaner > 2.5);
    assert_eq!(confidence_adjusted_rating(1.0, 0), 2.5);
}

#[test]
fn test_tier_boundaries_are_strict() {
    let tiers = TierThresholds::default();
    assert_eq!(tiers.tier_for(100.5), MatchTier::Premier);
    assert_eq!(tiers.tier_for(100.0), MatchTier::HighlyRecommended);
    assert_eq!(tiers.tier_for(75.0), MatchTier::StrongMatch);
}

#[test]
fn test_earnings_from_pricing() {
    let pricing = PricingBreakdown { subtotal: Some(150.0), total: 162.38, taxes: Some(12.38) };
    assert_eq!(calculate_earnings(&pricing, 0.90), 135.0);
}
