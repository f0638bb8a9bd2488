use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::core::distance::{distance_between, haversine_distance};
use crate::models::{
    Booking, Cleaner, House, JobStatus, MatchScore, MatchTier, ScoreBreakdown, ScoringWeights,
    TierThresholds,
};

/// Rating a cleaner with no reviews is assumed to have
pub const NEUTRAL_RATING: f64 = 2.5;

/// Below this many reviews the rating is shrunk toward neutral
pub const MIN_CONFIDENT_REVIEWS: u32 = 5;

/// Jobs within this distance of the house count as local history
pub const LOCAL_HISTORY_RADIUS_MILES: f64 = 5.0;

/// Guards the earnings-per-mile ratio against a zero distance
const MIN_RATE_DISTANCE_MILES: f64 = 0.1;

/// Raw points the availability factor can reach before weighting
const AVAILABILITY_MAX_POINTS: f64 = 15.0;

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("Non-finite score {total} for cleaner {cleaner_id}")]
    NonFinite { cleaner_id: String, total: f64 },
}

/// Intermediate values a score was computed from, for audit/debugging
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInputs {
    pub distance_miles: f64,
    pub radius_miles: f64,
    pub hours_until_job: Option<f64>,
    pub acceptance_probability: f64,
    pub adjusted_rating: f64,
    pub matched_options: usize,
    pub local_jobs: usize,
    pub same_day_jobs: usize,
    pub minutes_since_active: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreExplanation {
    pub cleaner_id: String,
    pub booking_id: String,
    pub score: MatchScore,
    pub match_tier: MatchTier,
    pub inputs: ScoreInputs,
}

/// Seven-factor match score for a cleaner against a booking.
///
/// Pure: the clock is passed in, and nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: ScoringWeights,
    tiers: TierThresholds,
    default_radius_miles: f64,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights, tiers: TierThresholds, default_radius_miles: f64) -> Self {
        Self {
            weights,
            tiers,
            default_radius_miles,
        }
    }

    pub fn with_default_radius(&self, default_radius_miles: f64) -> Self {
        Self {
            default_radius_miles,
            ..self.clone()
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn tier_for(&self, total: f64) -> MatchTier {
        self.tiers.tier_for(total)
    }

    pub fn score(
        &self,
        cleaner: &Cleaner,
        booking: &Booking,
        house: &House,
        now: DateTime<Utc>,
    ) -> Result<MatchScore, ScoringError> {
        self.evaluate(cleaner, booking, house, now).map(|(score, _)| score)
    }

    /// Same computation as [`score`](Self::score), with the inputs exposed
    pub fn explain(
        &self,
        cleaner: &Cleaner,
        booking: &Booking,
        house: &House,
        now: DateTime<Utc>,
    ) -> Result<ScoreExplanation, ScoringError> {
        let (score, inputs) = self.evaluate(cleaner, booking, house, now)?;
        Ok(ScoreExplanation {
            cleaner_id: cleaner.id.clone(),
            booking_id: booking.id.clone(),
            match_tier: self.tier_for(score.total),
            score,
            inputs,
        })
    }

    fn evaluate(
        &self,
        cleaner: &Cleaner,
        booking: &Booking,
        house: &House,
        now: DateTime<Utc>,
    ) -> Result<(MatchScore, ScoreInputs), ScoringError> {
        let w = &self.weights;

        let distance_miles = distance_between(cleaner.base_location, house.location);
        let radius_miles = cleaner.service_radius_miles.unwrap_or(self.default_radius_miles);

        let hours_until_job = booking
            .primary_option()
            .map(|option| (option.starts_at() - now).num_minutes() as f64 / 60.0);

        let acceptance_probability = calculate_acceptance_probability(&AcceptanceSignals {
            distance_miles,
            pricing_total: booking.pricing.total,
            hours_until_job,
            acceptance_rate: cleaner.stats.acceptance_rate,
            specialty_match: has_specialty_overlap(&cleaner.specialties, &booking.service_type),
            upcoming_job_count: cleaner.upcoming_job_count,
        });

        let adjusted_rating =
            confidence_adjusted_rating(cleaner.stats.rating, cleaner.stats.total_reviews);

        let (availability_points, matched_options) = calculate_availability_points(cleaner, booking);

        let local = local_history(cleaner, house);
        let area_score = calculate_area_score(&local, cleaner);

        let minutes_since_active = cleaner
            .last_active_at
            .map(|at| (now - at).num_minutes());

        let same_day_jobs = booking
            .primary_option()
            .map(|option| cleaner.active_jobs_on(option.date, &booking.id))
            .unwrap_or(0);

        let breakdown = ScoreBreakdown {
            distance: calculate_distance_score(distance_miles, radius_miles) * w.distance,
            acceptance: acceptance_probability * w.acceptance,
            rating: (adjusted_rating / 5.0) * w.rating,
            availability: (availability_points.min(AVAILABILITY_MAX_POINTS) / AVAILABILITY_MAX_POINTS)
                * w.availability,
            area_performance: area_score * w.area_performance,
            engagement: calculate_engagement_score(minutes_since_active) * w.engagement,
            scheduling: calculate_scheduling_score(same_day_jobs) * w.scheduling,
        };

        let total = breakdown.total();
        if !total.is_finite() {
            return Err(ScoringError::NonFinite {
                cleaner_id: cleaner.id.clone(),
                total,
            });
        }

        let inputs = ScoreInputs {
            distance_miles,
            radius_miles,
            hours_until_job,
            acceptance_probability,
            adjusted_rating,
            matched_options,
            local_jobs: local.jobs,
            same_day_jobs,
            minutes_since_active,
        };

        Ok((MatchScore { total, breakdown }, inputs))
    }
}

/// Distance factor (0-1), linear falloff to zero at the service radius
#[inline]
pub fn calculate_distance_score(distance_miles: f64, radius_miles: f64) -> f64 {
    if radius_miles <= 0.0 {
        return 0.0;
    }
    (1.0 - distance_miles / radius_miles).max(0.0)
}

/// What the acceptance model looks at
#[derive(Debug, Clone, Copy)]
pub struct AcceptanceSignals {
    pub distance_miles: f64,
    pub pricing_total: f64,
    pub hours_until_job: Option<f64>,
    pub acceptance_rate: Option<f64>,
    pub specialty_match: bool,
    pub upcoming_job_count: u32,
}

/// Heuristic probability (0-1) that the cleaner says yes to the offer
pub fn calculate_acceptance_probability(signals: &AcceptanceSignals) -> f64 {
    let mut p: f64 = 0.5;

    if signals.distance_miles < 5.0 {
        p += 0.2;
    } else if signals.distance_miles > 15.0 {
        p -= 0.15;
    }

    let earnings_per_mile = signals.pricing_total / signals.distance_miles.max(MIN_RATE_DISTANCE_MILES);
    if earnings_per_mile > 30.0 {
        p += 0.15;
    } else if earnings_per_mile < 15.0 {
        p -= 0.1;
    }

    if let Some(hours) = signals.hours_until_job {
        if hours > 48.0 {
            p += 0.1;
        } else if hours < 6.0 {
            p -= 0.1;
        }
    }

    if let Some(rate) = signals.acceptance_rate {
        if rate > 0.8 {
            p += 0.1;
        } else if rate < 0.5 {
            p -= 0.15;
        }
    }

    if signals.specialty_match {
        p += 0.15;
    }

    if signals.upcoming_job_count < 2 {
        p += 0.1;
    } else if signals.upcoming_job_count > 5 {
        p -= 0.2;
    }

    p.clamp(0.0, 1.0)
}

fn keywords(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Whether any specialty keyword also appears in the service type
pub fn has_specialty_overlap(specialties: &[String], service_type: &str) -> bool {
    let wanted: HashSet<String> = keywords(service_type).collect();
    specialties
        .iter()
        .flat_map(|s| keywords(s))
        .any(|word| wanted.contains(&word))
}

/// Rating shrunk toward neutral when backed by fewer than five reviews
#[inline]
pub fn confidence_adjusted_rating(rating: f64, total_reviews: u32) -> f64 {
    if total_reviews >= MIN_CONFIDENT_REVIEWS {
        return rating;
    }
    let confidence = total_reviews as f64 / MIN_CONFIDENT_REVIEWS as f64;
    NEUTRAL_RATING + (rating - NEUTRAL_RATING) * confidence
}

/// Raw availability points and how many date options matched.
///
/// +5 for the first choice, +3 for the second, +2 for each further one,
/// +5 more when every option is covered.
pub fn calculate_availability_points(cleaner: &Cleaner, booking: &Booking) -> (f64, usize) {
    let options = booking.options_by_priority();
    let mut points: f64 = 0.0;
    let mut matched = 0;

    for (index, option) in options.iter().enumerate() {
        if !cleaner.availability.is_available(option.date, option.slot()) {
            continue;
        }
        matched += 1;
        points += match index {
            0 => 5.0,
            1 => 3.0,
            _ => 2.0,
        };
    }

    if !options.is_empty() && matched == options.len() {
        points += 5.0;
    }

    (points.min(AVAILABILITY_MAX_POINTS), matched)
}

/// Finished jobs near the house
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalHistory {
    pub jobs: usize,
    pub completed: usize,
    pub average_rating: Option<f64>,
}

pub fn local_history(cleaner: &Cleaner, house: &House) -> LocalHistory {
    let Some(center) = house.location else {
        return LocalHistory::default();
    };

    let mut history = LocalHistory::default();
    let mut rating_sum = 0.0;
    let mut rated = 0usize;

    for job in cleaner.finished_jobs() {
        let Some(location) = job.location else { continue };
        if haversine_distance(center.lat, center.lng, location.lat, location.lng) > LOCAL_HISTORY_RADIUS_MILES {
            continue;
        }
        history.jobs += 1;
        if job.status == JobStatus::Completed {
            history.completed += 1;
            if let Some(rating) = job.customer_rating {
                rating_sum += rating;
                rated += 1;
            }
        }
    }

    if rated > 0 {
        history.average_rating = Some(rating_sum / rated as f64);
    }
    history
}

/// Area performance factor (0-1).
///
/// Six tenths from local rating, four tenths from local completion rate.
/// No local history at all is scored as exactly half.
pub fn calculate_area_score(local: &LocalHistory, cleaner: &Cleaner) -> f64 {
    if local.jobs == 0 {
        return 0.5;
    }

    let rating = local.average_rating.unwrap_or(if cleaner.stats.total_reviews > 0 {
        cleaner.stats.rating
    } else {
        NEUTRAL_RATING
    });
    let completion_rate = local.completed as f64 / local.jobs as f64;

    (6.0 * (rating / 5.0) + 4.0 * completion_rate) / 10.0
}

/// Engagement factor (0-1) from how recently the cleaner was in the app
#[inline]
pub fn calculate_engagement_score(minutes_since_active: Option<i64>) -> f64 {
    match minutes_since_active {
        Some(m) if m < 5 => 1.0,
        Some(m) if m < 30 => 0.6,
        Some(m) if m < 60 => 0.2,
        _ => 0.0,
    }
}

/// Scheduling complementarity (0-1).
///
/// Neutral 3 of 5; one or two other jobs that day route well, three or more
/// risk overload.
#[inline]
pub fn calculate_scheduling_score(same_day_jobs: usize) -> f64 {
    let points = match same_day_jobs {
        0 => 3.0,
        1 => 4.0,
        2 => 5.0,
        _ => 1.0,
    };
    points / 5.0
}
