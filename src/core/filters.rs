use serde::{Deserialize, Serialize};

use crate::core::distance::{distance_between, travel_from_air_miles, MISSING_LOCATION_MILES};
use crate::models::{
    AccountStatus, Booking, Cleaner, FunnelStats, House, TravelEstimate, VerificationStatus,
};

/// How far `expand_radius` widens the search each time
pub const RADIUS_STEP_MILES: f64 = 5.0;

/// Fewer eligible cleaners than this is logged as a supply shortage
pub const DEFAULT_LOW_SUPPLY_THRESHOLD: usize = 5;

/// The seven hard constraints, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStage {
    Verification,
    AccountStatus,
    Onboarding,
    Geography,
    Availability,
    Capability,
    Conflict,
}

impl EligibilityStage {
    pub const ALL: [EligibilityStage; 7] = [
        EligibilityStage::Verification,
        EligibilityStage::AccountStatus,
        EligibilityStage::Onboarding,
        EligibilityStage::Geography,
        EligibilityStage::Availability,
        EligibilityStage::Capability,
        EligibilityStage::Conflict,
    ];

    fn position(&self) -> usize {
        *self as usize
    }
}

/// Why a cleaner cannot take a booking. Not an error, just an exclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub stage: EligibilityStage,
    pub reason: String,
}

impl Exclusion {
    fn new(stage: EligibilityStage, reason: impl Into<String>) -> Self {
        Self { stage, reason: reason.into() }
    }
}

/// Outcome of running every check for one cleaner
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub distance_miles: f64,
    pub radius_miles: f64,
    /// Failed checks in pipeline order; empty means eligible
    pub exclusions: Vec<Exclusion>,
}

impl Evaluation {
    pub fn is_eligible(&self) -> bool {
        self.exclusions.is_empty()
    }

    pub fn first_failure(&self) -> Option<EligibilityStage> {
        self.exclusions.first().map(|e| e.stage)
    }
}

/// Cleaner that passed every hard constraint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibleCandidate {
    pub cleaner: Cleaner,
    pub distance_miles: f64,
    pub travel: TravelEstimate,
}

/// Result of filtering a whole pool
#[derive(Debug, Clone)]
pub struct EligibilityReport {
    pub candidates: Vec<EligibleCandidate>,
    pub funnel: FunnelStats,
    pub low_supply: bool,
}

/// Debug view of a single cleaner's eligibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityExplanation {
    pub cleaner_id: String,
    pub booking_id: String,
    pub eligible: bool,
    pub distance_miles: f64,
    pub radius_miles: f64,
    pub reasons: Vec<Exclusion>,
}

#[inline]
pub fn check_verification(cleaner: &Cleaner) -> Result<(), Exclusion> {
    if cleaner.verification_status == VerificationStatus::Approved {
        Ok(())
    } else {
        Err(Exclusion::new(
            EligibilityStage::Verification,
            format!("verification status is {:?}, not approved", cleaner.verification_status),
        ))
    }
}

#[inline]
pub fn check_account_status(cleaner: &Cleaner) -> Result<(), Exclusion> {
    if cleaner.account_status == AccountStatus::Active {
        Ok(())
    } else {
        Err(Exclusion::new(
            EligibilityStage::AccountStatus,
            format!("account status is {:?}, not active", cleaner.account_status),
        ))
    }
}

#[inline]
pub fn check_onboarding(cleaner: &Cleaner) -> Result<(), Exclusion> {
    let missing = cleaner.onboarding.missing();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Exclusion::new(
            EligibilityStage::Onboarding,
            format!("onboarding incomplete: {}", missing.join(", ")),
        ))
    }
}

/// Returns the computed distance alongside the verdict so callers can annotate
/// candidates without recomputing it.
#[inline]
pub fn check_geography(cleaner: &Cleaner, house: &House, radius_miles: f64) -> (f64, Result<(), Exclusion>) {
    let distance = distance_between(cleaner.base_location, house.location);

    if distance >= MISSING_LOCATION_MILES {
        let side = if cleaner.base_location.is_none() { "cleaner" } else { "house" };
        return (
            distance,
            Err(Exclusion::new(
                EligibilityStage::Geography,
                format!("{} has no coordinates", side),
            )),
        );
    }

    if distance <= radius_miles {
        (distance, Ok(()))
    } else {
        (
            distance,
            Err(Exclusion::new(
                EligibilityStage::Geography,
                format!("{:.1} mi away, outside {:.1} mi service radius", distance, radius_miles),
            )),
        )
    }
}

#[inline]
pub fn check_availability(cleaner: &Cleaner, booking: &Booking) -> Result<(), Exclusion> {
    if booking.date_options.is_empty() {
        return Err(Exclusion::new(EligibilityStage::Availability, "booking has no date options"));
    }

    let available = booking
        .date_options
        .iter()
        .any(|option| cleaner.availability.is_available(option.date, option.slot()));

    if available {
        Ok(())
    } else {
        Err(Exclusion::new(
            EligibilityStage::Availability,
            "not available on any requested date and slot",
        ))
    }
}

#[inline]
pub fn check_capability(cleaner: &Cleaner, booking: &Booking) -> Result<(), Exclusion> {
    if cleaner.service_types.contains(&booking.service_type) {
        Ok(())
    } else {
        Err(Exclusion::new(
            EligibilityStage::Capability,
            format!("does not offer {}", booking.service_type),
        ))
    }
}

#[inline]
pub fn check_conflicts(cleaner: &Cleaner, booking: &Booking) -> Result<(), Exclusion> {
    let clash = booking.date_options.iter().find_map(|option| {
        cleaner
            .active_jobs()
            .find(|job| job.scheduled_date == option.date)
            .map(|job| (option.date, job.booking_id.as_str()))
    });

    match clash {
        None => Ok(()),
        Some((date, other)) => Err(Exclusion::new(
            EligibilityStage::Conflict,
            format!("already booked on {} (booking {})", date, other),
        )),
    }
}

/// Hard-constraint pipeline that narrows the cleaner pool for a booking
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    default_radius_miles: f64,
    radius_expansion_miles: f64,
    radius_step_miles: f64,
    low_supply_threshold: usize,
}

impl EligibilityFilter {
    pub fn new(default_radius_miles: f64, low_supply_threshold: usize) -> Self {
        Self {
            default_radius_miles,
            radius_expansion_miles: 0.0,
            radius_step_miles: RADIUS_STEP_MILES,
            low_supply_threshold,
        }
    }

    /// Same filter with a different fallback radius for cleaners that never set one
    pub fn with_default_radius(&self, default_radius_miles: f64) -> Self {
        Self {
            default_radius_miles,
            ..self.clone()
        }
    }

    /// How far each `expand_radius` call widens the search (5 miles unless configured)
    pub fn with_radius_step(mut self, miles: f64) -> Self {
        self.radius_step_miles = miles;
        self
    }

    /// A filter whose radii are all widened by one more step.
    ///
    /// There is no cap; callers decide how many times to retry.
    pub fn expand_radius(&self) -> Self {
        Self {
            radius_expansion_miles: self.radius_expansion_miles + self.radius_step_miles,
            ..self.clone()
        }
    }

    pub fn radius_expansion_miles(&self) -> f64 {
        self.radius_expansion_miles
    }

    pub fn effective_radius(&self, cleaner: &Cleaner) -> f64 {
        cleaner.service_radius_miles.unwrap_or(self.default_radius_miles) + self.radius_expansion_miles
    }

    /// Run all seven checks for one cleaner.
    ///
    /// Both the bulk path and `explain` go through here, so they can't disagree.
    pub fn evaluate(&self, cleaner: &Cleaner, booking: &Booking, house: &House) -> Evaluation {
        let radius_miles = self.effective_radius(cleaner);
        let (distance_miles, geography) = check_geography(cleaner, house, radius_miles);

        let exclusions = [
            check_verification(cleaner),
            check_account_status(cleaner),
            check_onboarding(cleaner),
            geography,
            check_availability(cleaner, booking),
            check_capability(cleaner, booking),
            check_conflicts(cleaner, booking),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        Evaluation {
            distance_miles,
            radius_miles,
            exclusions,
        }
    }

    /// Filter a cleaner pool down to the ones that can take the booking
    pub fn find_eligible<I>(&self, booking: &Booking, house: &House, pool: I) -> EligibilityReport
    where
        I: IntoIterator<Item = Cleaner>,
    {
        let mut funnel = FunnelStats::default();
        let mut candidates = Vec::new();

        for cleaner in pool {
            funnel.total += 1;
            let evaluation = self.evaluate(&cleaner, booking, house);

            let survived = evaluation
                .first_failure()
                .map(|stage| stage.position())
                .unwrap_or(EligibilityStage::ALL.len());
            record_funnel(&mut funnel, survived);

            if let Some(exclusion) = evaluation.exclusions.first() {
                tracing::debug!(
                    "Cleaner {} excluded from booking {} at {:?}: {}",
                    cleaner.id,
                    booking.id,
                    exclusion.stage,
                    exclusion.reason
                );
                continue;
            }

            candidates.push(EligibleCandidate {
                distance_miles: evaluation.distance_miles,
                travel: travel_from_air_miles(evaluation.distance_miles),
                cleaner,
            });
        }

        let low_supply = candidates.len() < self.low_supply_threshold;
        if low_supply {
            tracing::warn!(
                "Low supply for booking {}: {} eligible of {} cleaners, expand radius by {} mi",
                booking.id,
                candidates.len(),
                funnel.total,
                self.radius_step_miles
            );
        }

        tracing::info!("Eligibility funnel for booking {}: {:?}", booking.id, funnel);

        EligibilityReport {
            candidates,
            funnel,
            low_supply,
        }
    }

    /// Replay the checks for one cleaner and report every failing reason
    pub fn explain(&self, cleaner: &Cleaner, booking: &Booking, house: &House) -> EligibilityExplanation {
        let evaluation = self.evaluate(cleaner, booking, house);
        EligibilityExplanation {
            cleaner_id: cleaner.id.clone(),
            booking_id: booking.id.clone(),
            eligible: evaluation.is_eligible(),
            distance_miles: evaluation.distance_miles,
            radius_miles: evaluation.radius_miles,
            reasons: evaluation.exclusions,
        }
    }
}

/// Count a cleaner at every stage it got past
fn record_funnel(funnel: &mut FunnelStats, survived: usize) {
    let counters = [
        &mut funnel.verified,
        &mut funnel.active,
        &mut funnel.onboarded,
        &mut funnel.in_range,
        &mut funnel.available,
        &mut funnel.capable,
        &mut funnel.conflict_free,
    ];
    for counter in counters.into_iter().take(survived) {
        *counter += 1;
    }
}
