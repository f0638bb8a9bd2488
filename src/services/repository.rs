use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    AppSettings, Booking, BookingStatus, BoundingBox, Cleaner, House, Job, Notification,
    NotificationKind,
};

/// Errors that can occur in any backing store
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// The part of a booking the claim protocol reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimState {
    pub cleaner_id: Option<String>,
    pub status: BookingStatus,
}

impl ClaimState {
    pub fn unclaimed() -> Self {
        Self {
            cleaner_id: None,
            status: BookingStatus::Placed,
        }
    }

    pub fn confirmed_by(cleaner_id: &str) -> Self {
        Self {
            cleaner_id: Some(cleaner_id.to_string()),
            status: BookingStatus::Confirmed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// Write committed; the booking is now at `version`
    Swapped { version: i64 },
    /// The stored record no longer matched the expected prior state
    Conflict,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, id: &str) -> Result<Option<Booking>, RepositoryError>;

    /// Atomically replace the booking's claim state.
    ///
    /// Commits `new` and bumps the version only if the stored record is still
    /// at `expected_version` with claim state `expected`. This is the only
    /// write path for `cleaner_id`.
    async fn compare_and_swap(
        &self,
        id: &str,
        expected_version: i64,
        expected: &ClaimState,
        new: &ClaimState,
    ) -> Result<CasOutcome, RepositoryError>;
}

#[async_trait]
pub trait HouseRepository: Send + Sync {
    async fn get_house(&self, id: &str) -> Result<Option<House>, RepositoryError>;
}

#[async_trait]
pub trait CleanerRepository: Send + Sync {
    /// Cleaners with their job summaries, optionally narrowed to a bounding box
    async fn list_cleaners(&self, area: Option<BoundingBox>) -> Result<Vec<Cleaner>, RepositoryError>;

    async fn get_cleaner(&self, id: &str) -> Result<Option<Cleaner>, RepositoryError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create_job(&self, job: &Job) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(&self, notification: &Notification) -> Result<(), RepositoryError>;

    /// Remove every notification of `kind` for a booking; returns how many went
    async fn delete_for_booking(
        &self,
        booking_id: &str,
        kind: NotificationKind,
    ) -> Result<u64, RepositoryError>;

    async fn list_for_booking(
        &self,
        booking_id: &str,
        kind: NotificationKind,
    ) -> Result<Vec<Notification>, RepositoryError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_settings(&self) -> Result<AppSettings, RepositoryError>;
}

/// Every collaborator the engine needs, injected at construction
#[derive(Clone)]
pub struct Repositories {
    pub bookings: Arc<dyn BookingRepository>,
    pub houses: Arc<dyn HouseRepository>,
    pub cleaners: Arc<dyn CleanerRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Repositories {
    /// Use one store for every repository
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: BookingRepository
            + HouseRepository
            + CleanerRepository
            + JobRepository
            + NotificationRepository
            + SettingsRepository
            + 'static,
    {
        Self {
            bookings: store.clone(),
            houses: store.clone(),
            cleaners: store.clone(),
            jobs: store.clone(),
            notifications: store.clone(),
            settings: store,
        }
    }
}
