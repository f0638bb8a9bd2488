use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::core::claim::calculate_earnings;
use crate::core::distance::calculate_bounding_box;
use crate::core::matcher::{MatchResult, Matcher};
use crate::core::ranker::BROADCAST_LIMIT;
use crate::models::{
    Booking, BookingStatus, FunnelStats, House, Notification, NotificationKind, RankedCandidate,
};
use crate::services::{Repositories, RepositoryError, SettingsCache};

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Booking {0} has already been taken")]
    AlreadyTaken(String),

    #[error("Booking {booking_id} is {} and cannot be offered", .status.as_str())]
    NotClaimable { booking_id: String, status: BookingStatus },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What a broadcast did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastSummary {
    pub booking_id: String,
    pub offers_created: usize,
    /// Offers from earlier broadcasts of the same booking that were withdrawn
    pub offers_superseded: u64,
    pub total_eligible: usize,
    pub low_supply: bool,
    pub funnel: FunnelStats,
    pub offers: Vec<RankedCandidate>,
}

/// Booking, house and ranking loaded fresh for one request
#[derive(Debug, Clone)]
pub struct RankedBooking {
    pub booking: Booking,
    pub house: House,
    pub result: MatchResult,
}

/// Sends a booking to its best-matched cleaners
///
/// Every call recomputes eligibility and scores from the current pool; no
/// earlier ranking is reused.
#[derive(Clone)]
pub struct OfferBroadcaster {
    repos: Repositories,
    matcher: Matcher,
    settings: Arc<SettingsCache>,
    limit: usize,
    /// Narrow the pool to a box around the house before filtering
    prefilter_miles: Option<f64>,
}

impl OfferBroadcaster {
    pub fn new(repos: Repositories, matcher: Matcher, settings: Arc<SettingsCache>) -> Self {
        Self {
            repos,
            matcher,
            settings,
            limit: BROADCAST_LIMIT,
            prefilter_miles: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_prefilter(mut self, miles: Option<f64>) -> Self {
        self.prefilter_miles = miles;
        self
    }

    /// Load everything a ranking needs and run the matcher
    ///
    /// `limit` of `None` returns every eligible cleaner.
    pub async fn rank(&self, booking_id: &str, limit: Option<usize>) -> Result<RankedBooking, BroadcastError> {
        let booking = self
            .repos
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BroadcastError::NotFound(format!("booking {}", booking_id)))?;

        let house = self
            .repos
            .houses
            .get_house(&booking.house_id)
            .await?
            .ok_or_else(|| BroadcastError::NotFound(format!("house {}", booking.house_id)))?;

        let area = match (self.prefilter_miles, house.location) {
            (Some(miles), Some(center)) => Some(calculate_bounding_box(center, miles)),
            _ => None,
        };
        let pool = self.repos.cleaners.list_cleaners(area).await?;

        tracing::debug!("Loaded pool of {} cleaners for booking {}", pool.len(), booking.id);

        let settings = self.settings.get().await;
        let matcher = self
            .matcher
            .with_default_radius(settings.default_service_radius_miles);
        let result = matcher.find_matches(&booking, &house, pool, limit, Utc::now());

        Ok(RankedBooking {
            booking,
            house,
            result,
        })
    }

    /// Rank the booking and offer it to the top candidates
    ///
    /// Offers left over from an earlier broadcast of the same booking are
    /// withdrawn first, so each cleaner holds at most one offer per booking.
    pub async fn broadcast(&self, booking_id: &str) -> Result<BroadcastSummary, BroadcastError> {
        let ranked = self.rank(booking_id, Some(self.limit)).await?;
        let booking = ranked.booking;

        if booking.is_claimed() {
            return Err(BroadcastError::AlreadyTaken(booking.id));
        }

        if booking.status != BookingStatus::Placed {
            return Err(BroadcastError::NotClaimable {
                booking_id: booking.id,
                status: booking.status,
            });
        }

        let offers_superseded = self
            .repos
            .notifications
            .delete_for_booking(&booking.id, NotificationKind::JobOffer)
            .await?;

        let settings = self.settings.get().await;
        let earnings = calculate_earnings(&booking.pricing, settings.cleaner_earnings_rate);
        let primary_date = booking
            .primary_option()
            .map(|option| option.date.to_string())
            .unwrap_or_else(|| "a flexible date".to_string());

        let mut offers_created = 0;
        for candidate in &ranked.result.candidates {
            let offer = Notification {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: candidate.user_id.clone(),
                kind: NotificationKind::JobOffer,
                title: format!("New {} job", candidate.match_tier.label()),
                message: format!(
                    "{} clean on {}, {:.1} mi away, estimated earnings ${:.2}",
                    booking.service_type, primary_date, candidate.distance_miles, earnings
                ),
                related_id: booking.id.clone(),
                score: Some(candidate.score.total),
                match_tier: Some(candidate.match_tier),
                earnings_estimate: Some(earnings),
                created_at: Utc::now(),
            };

            match self.repos.notifications.create_notification(&offer).await {
                Ok(()) => offers_created += 1,
                Err(e) => {
                    tracing::warn!(
                        "Failed to send offer for booking {} to cleaner {}: {}",
                        booking.id,
                        candidate.cleaner_id,
                        e
                    );
                }
            }
        }

        self.withdraw_if_claimed(&booking.id).await?;

        tracing::info!(
            "Broadcast booking {} to {} cleaners ({} eligible, {} superseded)",
            booking.id,
            offers_created,
            ranked.result.total_eligible,
            offers_superseded
        );

        Ok(BroadcastSummary {
            booking_id: booking.id,
            offers_created,
            offers_superseded,
            total_eligible: ranked.result.total_eligible,
            low_supply: ranked.result.low_supply,
            funnel: ranked.result.funnel,
            offers: ranked.result.candidates,
        })
    }

    /// Re-read the booking after offers went out and withdraw them if a
    /// claim committed in the meantime
    async fn withdraw_if_claimed(&self, booking_id: &str) -> Result<(), BroadcastError> {
        let current = self
            .repos
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BroadcastError::NotFound(format!("booking {}", booking_id)))?;

        if !current.is_claimed() && current.status == BookingStatus::Placed {
            return Ok(());
        }

        let withdrawn = self
            .repos
            .notifications
            .delete_for_booking(booking_id, NotificationKind::JobOffer)
            .await?;

        tracing::warn!(
            "Booking {} was claimed during broadcast, withdrew {} offers",
            booking_id,
            withdrawn
        );

        Err(BroadcastError::AlreadyTaken(current.id))
    }
}
