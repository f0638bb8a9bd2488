use chrono::{DateTime, Utc};

use crate::core::{
    filters::{EligibilityExplanation, EligibilityFilter, DEFAULT_LOW_SUPPLY_THRESHOLD},
    ranker::{rank_candidates, ScoredCandidate},
    scoring::{ScoreExplanation, ScoringEngine, ScoringError},
};
use crate::models::{
    Booking, Cleaner, FunnelStats, House, RankedCandidate, ScoringWeights, TierThresholds,
};

/// Result of the matching process
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub candidates: Vec<RankedCandidate>,
    pub total_eligible: usize,
    pub funnel: FunnelStats,
    pub low_supply: bool,
    /// Eligible cleaners dropped because their score could not be computed
    pub skipped: usize,
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Hard-constraint eligibility filter (seven checks)
/// 2. Seven-factor scoring of every eligible cleaner
/// 3. Ranking and top-K selection
///
/// Every stage is a pure function of its inputs; repositories are loaded by
/// the caller.
#[derive(Debug, Clone)]
pub struct Matcher {
    filter: EligibilityFilter,
    engine: ScoringEngine,
}

impl Matcher {
    pub fn new(filter: EligibilityFilter, engine: ScoringEngine) -> Self {
        Self { filter, engine }
    }

    pub fn with_default_weights() -> Self {
        let radius = crate::models::AppSettings::default().default_service_radius_miles;
        Self {
            filter: EligibilityFilter::new(radius, DEFAULT_LOW_SUPPLY_THRESHOLD),
            engine: ScoringEngine::new(ScoringWeights::default(), TierThresholds::default(), radius),
        }
    }

    pub fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Same matcher with a different fallback service radius.
    ///
    /// The marketplace default lives in app settings, so callers rebind it per request.
    pub fn with_default_radius(&self, radius_miles: f64) -> Self {
        Self {
            filter: self.filter.with_default_radius(radius_miles),
            engine: self.engine.with_default_radius(radius_miles),
        }
    }

    /// Same matcher searching 5 miles further out
    pub fn expand_radius(&self) -> Self {
        Self {
            filter: self.filter.expand_radius(),
            engine: self.engine.clone(),
        }
    }

    /// Find, score and rank the cleaners who can take a booking
    ///
    /// # Arguments
    /// * `booking` - The booking being matched
    /// * `house` - Where the job is
    /// * `pool` - All candidate cleaners
    /// * `limit` - Maximum number of candidates to return (`None` for all)
    /// * `now` - Clock used for time-sensitive factors
    pub fn find_matches(
        &self,
        booking: &Booking,
        house: &House,
        pool: Vec<Cleaner>,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> MatchResult {
        let report = self.filter.find_eligible(booking, house, pool);
        let total_eligible = report.candidates.len();

        let scored: Vec<ScoredCandidate> = report
            .candidates
            .into_iter()
            .filter_map(|candidate| {
                match self.engine.score(&candidate.cleaner, booking, house, now) {
                    Ok(score) => Some(ScoredCandidate { candidate, score }),
                    Err(e) => {
                        tracing::warn!("Skipping cleaner for booking {}: {}", booking.id, e);
                        None
                    }
                }
            })
            .collect();

        let skipped = total_eligible - scored.len();
        let candidates = rank_candidates(scored, limit, |total| self.engine.tier_for(total));

        tracing::debug!(
            "Ranked {} of {} eligible cleaners for booking {}",
            candidates.len(),
            total_eligible,
            booking.id
        );

        MatchResult {
            candidates,
            total_eligible,
            funnel: report.funnel,
            low_supply: report.low_supply,
            skipped,
        }
    }

    pub fn explain_eligibility(
        &self,
        cleaner: &Cleaner,
        booking: &Booking,
        house: &House,
    ) -> EligibilityExplanation {
        self.filter.explain(cleaner, booking, house)
    }

    pub fn explain_score(
        &self,
        cleaner: &Cleaner,
        booking: &Booking,
        house: &House,
        now: DateTime<Utc>,
    ) -> Result<ScoreExplanation, ScoringError> {
        self.engine.explain(cleaner, booking, house, now)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}
