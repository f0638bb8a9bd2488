// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use cache::{CacheKey, SettingsCache};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use repository::{
    BookingRepository, CasOutcome, ClaimState, CleanerRepository, HouseRepository, JobRepository,
    NotificationRepository, Repositories, RepositoryError, SettingsRepository,
};
