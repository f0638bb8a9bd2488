use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    Booking, BookingStatus, Cleaner, Job, JobStatus, Notification, NotificationKind,
    PricingBreakdown, TimeSlot,
};
use crate::services::{CasOutcome, ClaimState, Repositories, RepositoryError, SettingsCache};

/// Reasons an accept can fail
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The booking already had a cleaner when it was read
    #[error("Booking {0} has already been taken")]
    AlreadyTaken(String),

    /// Another cleaner won the compare-and-swap
    #[error("Booking {0} was claimed by another cleaner")]
    AlreadyClaimed(String),

    #[error("Cleaner {cleaner_id} already has a job on {date}")]
    SchedulingConflict { cleaner_id: String, date: NaiveDate },

    #[error("Booking {booking_id} is {} and cannot be claimed", .status.as_str())]
    NotClaimable { booking_id: String, status: BookingStatus },

    #[error("Booking {0} has no date to schedule the job on")]
    MissingSchedule(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// When the accepted job will happen, as chosen by the cleaner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    pub scheduled_date: Option<NaiveDate>,
    pub time_slot: Option<TimeSlot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub job: Job,
    pub offers_purged: u64,
    pub customer_notified: bool,
}

/// Cleaner earnings for a booking, rounded to cents
#[inline]
pub fn calculate_earnings(pricing: &PricingBreakdown, earnings_rate: f64) -> f64 {
    (pricing.earnings_base() * earnings_rate * 100.0).round() / 100.0
}

/// Date and slot the job goes on: explicit details win, else the customer's first choice
fn resolve_schedule(booking: &Booking, details: JobDetails) -> Option<(NaiveDate, Option<TimeSlot>)> {
    match details.scheduled_date {
        Some(date) => Some((date, details.time_slot)),
        None => booking
            .primary_option()
            .map(|option| (option.date, details.time_slot.or_else(|| option.slot()))),
    }
}

/// Whether the cleaner already has active work in the same date and slot.
/// An unknown slot on either side counts as the whole day.
fn has_conflict(cleaner: &Cleaner, booking_id: &str, date: NaiveDate, slot: Option<TimeSlot>) -> bool {
    cleaner.active_jobs().any(|job| {
        job.booking_id != booking_id
            && job.scheduled_date == date
            && match (job.time_slot, slot) {
                (Some(existing), Some(wanted)) => existing == wanted,
                _ => true,
            }
    })
}

/// Resolves concurrent accepts so each booking gets exactly one cleaner
///
/// The only write to a booking's cleaner is the repository compare-and-swap;
/// everything that follows a successful swap is bookkeeping that never
/// undoes the claim.
#[derive(Clone)]
pub struct ClaimCoordinator {
    repos: Repositories,
    settings: Arc<SettingsCache>,
}

impl ClaimCoordinator {
    pub fn new(repos: Repositories, settings: Arc<SettingsCache>) -> Self {
        Self { repos, settings }
    }

    /// Try to claim `booking_id` for `cleaner_id`
    ///
    /// # Errors
    /// * `NotFound` - booking or cleaner does not exist
    /// * `AlreadyTaken` - the booking already had a cleaner when read
    /// * `NotClaimable` - the booking is no longer open (e.g. cancelled)
    /// * `SchedulingConflict` - the cleaner is busy at that date and slot
    /// * `AlreadyClaimed` - another accept committed first
    pub async fn accept(
        &self,
        booking_id: &str,
        cleaner_id: &str,
        details: JobDetails,
    ) -> Result<ClaimOutcome, ClaimError> {
        let booking = self
            .repos
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ClaimError::NotFound(format!("booking {}", booking_id)))?;

        if booking.is_claimed() {
            return Err(ClaimError::AlreadyTaken(booking.id));
        }

        if booking.status != BookingStatus::Placed {
            return Err(ClaimError::NotClaimable {
                booking_id: booking.id,
                status: booking.status,
            });
        }

        let cleaner = self
            .repos
            .cleaners
            .get_cleaner(cleaner_id)
            .await?
            .ok_or_else(|| ClaimError::NotFound(format!("cleaner {}", cleaner_id)))?;

        let (scheduled_date, time_slot) = resolve_schedule(&booking, details)
            .ok_or_else(|| ClaimError::MissingSchedule(booking.id.clone()))?;

        if has_conflict(&cleaner, &booking.id, scheduled_date, time_slot) {
            return Err(ClaimError::SchedulingConflict {
                cleaner_id: cleaner.id,
                date: scheduled_date,
            });
        }

        let outcome = self
            .repos
            .bookings
            .compare_and_swap(
                &booking.id,
                booking.version,
                &ClaimState::unclaimed(),
                &ClaimState::confirmed_by(&cleaner.id),
            )
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => ClaimError::NotFound(format!("booking {}", booking.id)),
                other => ClaimError::Repository(other),
            })?;

        let version = match outcome {
            CasOutcome::Swapped { version } => version,
            CasOutcome::Conflict => {
                tracing::info!("Cleaner {} lost the race for booking {}", cleaner.id, booking.id);
                return Err(ClaimError::AlreadyClaimed(booking.id));
            }
        };

        tracing::info!(
            "Cleaner {} claimed booking {} (version {})",
            cleaner.id,
            booking.id,
            version
        );

        let settings = self.settings.get().await;
        let job = Job {
            id: uuid::Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            customer_id: booking.customer_id.clone(),
            cleaner_id: cleaner.id.clone(),
            house_id: booking.house_id.clone(),
            status: JobStatus::Scheduled,
            scheduled_date,
            time_slot,
            earnings: calculate_earnings(&booking.pricing, settings.cleaner_earnings_rate),
            created_at: Utc::now(),
        };

        if let Err(e) = self.repos.jobs.create_job(&job).await {
            tracing::error!(
                "Booking {} is claimed by {} but the job record failed: {}",
                booking.id,
                cleaner.id,
                e
            );
            return Err(e.into());
        }

        let customer_notified = self.notify_customer(&booking, &job).await;
        let offers_purged = self.purge_offers(&booking.id).await;

        Ok(ClaimOutcome {
            job,
            offers_purged,
            customer_notified,
        })
    }

    async fn notify_customer(&self, booking: &Booking, job: &Job) -> bool {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: booking.customer_id.clone(),
            kind: NotificationKind::BookingAccepted,
            title: "Booking confirmed".to_string(),
            message: format!(
                "A cleaner accepted your {} booking for {}",
                booking.service_type, job.scheduled_date
            ),
            related_id: booking.id.clone(),
            score: None,
            match_tier: None,
            earnings_estimate: None,
            created_at: Utc::now(),
        };

        match self.repos.notifications.create_notification(&notification).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to notify customer of booking {}: {}", booking.id, e);
                false
            }
        }
    }

    /// Withdraw every outstanding offer for the booking
    async fn purge_offers(&self, booking_id: &str) -> u64 {
        match self
            .repos
            .notifications
            .delete_for_booking(booking_id, NotificationKind::JobOffer)
            .await
        {
            Ok(purged) => purged,
            Err(e) => {
                tracing::warn!("Failed to purge offers for booking {}: {}", booking_id, e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateOption, JobSummary};

    fn pricing(subtotal: Option<f64>, total: f64, taxes: Option<f64>) -> PricingBreakdown {
        PricingBreakdown { subtotal, total, taxes }
    }

    #[test]
    fn test_earnings_prefers_subtotal() {
        assert_eq!(calculate_earnings(&pricing(Some(100.0), 108.25, Some(8.25)), 0.9), 90.0);
    }

    #[test]
    fn test_earnings_falls_back_to_total_minus_taxes() {
        assert_eq!(calculate_earnings(&pricing(None, 110.0, Some(10.0)), 0.9), 90.0);
    }

    #[test]
    fn test_earnings_backs_out_sales_tax() {
        assert_eq!(calculate_earnings(&pricing(None, 108.25, None), 0.9), 90.0);
    }

    #[test]
    fn test_earnings_rounds_to_cents() {
        assert_eq!(calculate_earnings(&pricing(Some(33.33), 0.0, None), 0.9), 30.0);
        assert_eq!(calculate_earnings(&pricing(Some(10.01), 0.0, None), 0.85), 8.51);
    }

    fn summary(booking_id: &str, date: NaiveDate, slot: Option<TimeSlot>, status: JobStatus) -> JobSummary {
        JobSummary {
            booking_id: booking_id.to_string(),
            scheduled_date: date,
            time_slot: slot,
            status,
            location: None,
            customer_rating: None,
        }
    }

    fn cleaner_with(jobs: Vec<JobSummary>) -> Cleaner {
        let mut cleaner: Cleaner = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "userId": "u1"
        }))
        .unwrap();
        cleaner.jobs = jobs;
        cleaner
    }

    #[test]
    fn test_conflict_requires_same_slot() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let cleaner = cleaner_with(vec![summary("other", date, Some(TimeSlot::Morning), JobStatus::Scheduled)]);

        assert!(has_conflict(&cleaner, "b1", date, Some(TimeSlot::Morning)));
        assert!(!has_conflict(&cleaner, "b1", date, Some(TimeSlot::Afternoon)));
        assert!(has_conflict(&cleaner, "b1", date, None));
        assert!(!has_conflict(&cleaner, "b1", date.succ_opt().unwrap(), Some(TimeSlot::Morning)));
    }

    #[test]
    fn test_finished_jobs_never_conflict() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let cleaner = cleaner_with(vec![summary("other", date, Some(TimeSlot::Morning), JobStatus::Completed)]);

        assert!(!has_conflict(&cleaner, "b1", date, Some(TimeSlot::Morning)));
    }

    #[test]
    fn test_resolve_schedule_defaults_to_first_choice() {
        let booking: Booking = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "customerId": "cust",
            "houseId": "h1",
            "serviceType": "standard",
            "dateOptions": [
                { "date": "2025-06-03", "timeSlot": "evening", "priority": 2 },
                { "date": "2025-06-01", "time": "13:30:00", "priority": 1 }
            ]
        }))
        .unwrap();

        let (date, slot) = resolve_schedule(&booking, JobDetails::default()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(slot, Some(TimeSlot::Afternoon));

        let explicit = JobDetails {
            scheduled_date: Some(NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()),
            time_slot: Some(TimeSlot::Evening),
        };
        assert_eq!(
            resolve_schedule(&booking, explicit),
            Some((NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(), Some(TimeSlot::Evening)))
        );

        let empty = Booking { date_options: Vec::<DateOption>::new(), ..booking };
        assert!(resolve_schedule(&empty, JobDetails::default()).is_none());
    }
}
