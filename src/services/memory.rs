use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::RwLock;

use super::repository::{
    BookingRepository, CasOutcome, ClaimState, CleanerRepository, HouseRepository, JobRepository,
    NotificationRepository, RepositoryError, SettingsRepository,
};
use crate::core::distance::is_within_bounding_box;
use crate::models::{
    AppSettings, Booking, BoundingBox, Cleaner, House, Job, JobSummary, Notification,
    NotificationKind,
};

/// In-process store backed by concurrent maps
///
/// Used for local development and tests. Each booking lives in its own map
/// shard entry, and compare-and-swap holds that entry's write guard for the
/// whole check-then-write, so concurrent claims on one booking serialize.
#[derive(Default)]
pub struct MemoryStore {
    bookings: DashMap<String, Booking>,
    houses: DashMap<String, House>,
    cleaners: DashMap<String, Cleaner>,
    /// Keyed by booking id, at most one job per booking
    jobs: DashMap<String, Job>,
    notifications: DashMap<String, Notification>,
    settings: RwLock<AppSettings>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.bookings.insert(booking.id.clone(), booking);
    }

    pub fn insert_house(&self, house: House) {
        self.houses.insert(house.id.clone(), house);
    }

    pub fn insert_cleaner(&self, cleaner: Cleaner) {
        self.cleaners.insert(cleaner.id.clone(), cleaner);
    }

    pub fn set_settings(&self, settings: AppSettings) {
        if let Ok(mut current) = self.settings.write() {
            *current = settings;
        }
    }

    /// Snapshot of a booking as stored
    pub fn booking(&self, id: &str) -> Option<Booking> {
        self.bookings.get(id).map(|b| b.clone())
    }

    pub fn jobs_for_booking(&self, booking_id: &str) -> Vec<Job> {
        self.jobs
            .get(booking_id)
            .map(|job| vec![job.clone()])
            .unwrap_or_default()
    }

    /// Every stored notification, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        let mut all: Vec<Notification> = self.notifications.iter().map(|n| n.clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Cleaner with the jobs created through this store merged onto their calendar
    fn hydrate(&self, mut cleaner: Cleaner) -> Cleaner {
        for job in self.jobs.iter().filter(|j| j.cleaner_id == cleaner.id) {
            if cleaner.jobs.iter().any(|existing| existing.booking_id == job.booking_id) {
                continue;
            }
            let location = self.houses.get(&job.house_id).and_then(|h| h.location);
            cleaner.jobs.push(JobSummary {
                booking_id: job.booking_id.clone(),
                scheduled_date: job.scheduled_date,
                time_slot: job.time_slot,
                status: job.status,
                location,
                customer_rating: None,
            });
        }
        cleaner
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn get_booking(&self, id: &str) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.booking(id))
    }

    async fn compare_and_swap(
        &self,
        id: &str,
        expected_version: i64,
        expected: &ClaimState,
        new: &ClaimState,
    ) -> Result<CasOutcome, RepositoryError> {
        let mut entry = self
            .bookings
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("booking {}", id)))?;
        let booking = entry.value_mut();

        if booking.version != expected_version
            || booking.cleaner_id != expected.cleaner_id
            || booking.status != expected.status
        {
            return Ok(CasOutcome::Conflict);
        }

        booking.cleaner_id = new.cleaner_id.clone();
        booking.status = new.status;
        booking.version += 1;
        booking.updated_at = Some(Utc::now());

        Ok(CasOutcome::Swapped { version: booking.version })
    }
}

#[async_trait]
impl HouseRepository for MemoryStore {
    async fn get_house(&self, id: &str) -> Result<Option<House>, RepositoryError> {
        Ok(self.houses.get(id).map(|h| h.clone()))
    }
}

#[async_trait]
impl CleanerRepository for MemoryStore {
    async fn list_cleaners(&self, area: Option<BoundingBox>) -> Result<Vec<Cleaner>, RepositoryError> {
        let mut cleaners: Vec<Cleaner> = self
            .cleaners
            .iter()
            .filter(|c| match (&area, c.base_location) {
                (None, _) => true,
                (Some(bbox), Some(point)) => is_within_bounding_box(point, bbox),
                (Some(_), None) => false,
            })
            .map(|c| c.clone())
            .collect();
        cleaners.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(cleaners.into_iter().map(|c| self.hydrate(c)).collect())
    }

    async fn get_cleaner(&self, id: &str) -> Result<Option<Cleaner>, RepositoryError> {
        let cleaner = self.cleaners.get(id).map(|c| c.clone());
        Ok(cleaner.map(|c| self.hydrate(c)))
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn create_job(&self, job: &Job) -> Result<(), RepositoryError> {
        use dashmap::mapref::entry::Entry;

        match self.jobs.entry(job.booking_id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Corrupt(format!(
                "booking {} already has a job",
                job.booking_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create_notification(&self, notification: &Notification) -> Result<(), RepositoryError> {
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn delete_for_booking(
        &self,
        booking_id: &str,
        kind: NotificationKind,
    ) -> Result<u64, RepositoryError> {
        let mut removed = 0u64;
        self.notifications.retain(|_, n| {
            let matches = n.related_id == booking_id && n.kind == kind;
            if matches {
                removed += 1;
            }
            !matches
        });
        Ok(removed)
    }

    async fn list_for_booking(
        &self,
        booking_id: &str,
        kind: NotificationKind,
    ) -> Result<Vec<Notification>, RepositoryError> {
        Ok(self
            .notifications()
            .into_iter()
            .filter(|n| n.related_id == booking_id && n.kind == kind)
            .collect())
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn get_settings(&self) -> Result<AppSettings, RepositoryError> {
        self.settings
            .read()
            .map(|s| *s)
            .map_err(|_| RepositoryError::Unavailable("settings lock poisoned".to_string()))
    }
}
