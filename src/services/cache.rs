use std::sync::Arc;
use std::time::Duration;

use super::repository::SettingsRepository;
use crate::models::AppSettings;

/// Read-through cache for marketplace settings
///
/// Settings change rarely but are read on every broadcast and claim, so the
/// last value loaded is kept for `ttl_secs`. When the store cannot be read
/// the configured fallback is served instead of failing the request.
pub struct SettingsCache {
    repository: Arc<dyn SettingsRepository>,
    cache: moka::future::Cache<String, AppSettings>,
    fallback: AppSettings,
}

impl SettingsCache {
    pub fn new(repository: Arc<dyn SettingsRepository>, ttl_secs: u64, fallback: AppSettings) -> Self {
        let cache = moka::future::CacheBuilder::new(1)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            repository,
            cache,
            fallback,
        }
    }

    /// Current settings (cached, then store, then fallback)
    pub async fn get(&self) -> AppSettings {
        let key = CacheKey::settings();

        if let Some(settings) = self.cache.get(&key).await {
            tracing::trace!("Cache hit: {}", key);
            return settings;
        }

        match self.repository.get_settings().await {
            Ok(settings) => {
                self.cache.insert(key, settings).await;
                settings
            }
            Err(e) => {
                tracing::warn!("Failed to load app settings, using defaults: {}", e);
                self.fallback
            }
        }
    }

    /// Drop the cached value so the next read goes to the store
    pub async fn invalidate(&self) {
        self.cache.invalidate(&CacheKey::settings()).await;
        tracing::debug!("Invalidated cached app settings");
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    pub fn settings() -> String {
        "settings:app".to_string()
    }
}
