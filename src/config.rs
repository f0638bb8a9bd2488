use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::models::{AppSettings, ScoringWeights, TierThresholds};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub earnings: EarningsSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// `memory` runs against the in-process store instead of PostgreSQL
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

impl DatabaseSettings {
    pub fn is_memory(&self) -> bool {
        self.url == "memory"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_settings_ttl")]
    pub settings_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            settings_ttl_secs: default_settings_ttl(),
        }
    }
}

fn default_settings_ttl() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_broadcast_limit")]
    pub broadcast_limit: usize,
    #[serde(default = "default_low_supply_threshold")]
    pub low_supply_threshold: usize,
    #[serde(default = "default_radius_expansion")]
    pub radius_expansion_miles: f64,
    #[serde(default = "default_service_radius")]
    pub default_service_radius_miles: f64,
    /// Bounding-box prefilter applied to the pool query; unset loads every cleaner
    #[serde(default)]
    pub pool_prefilter_miles: Option<f64>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            broadcast_limit: default_broadcast_limit(),
            low_supply_threshold: default_low_supply_threshold(),
            radius_expansion_miles: default_radius_expansion(),
            default_service_radius_miles: default_service_radius(),
            pool_prefilter_miles: None,
        }
    }
}

fn default_broadcast_limit() -> usize { 15 }
fn default_low_supply_threshold() -> usize { 5 }
fn default_radius_expansion() -> f64 { 5.0 }
fn default_service_radius() -> f64 { 15.0 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub tiers: TiersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_distance_weight")]
    pub distance: f64,
    #[serde(default = "default_acceptance_weight")]
    pub acceptance: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_availability_weight")]
    pub availability: f64,
    #[serde(default = "default_area_weight")]
    pub area_performance: f64,
    #[serde(default = "default_engagement_weight")]
    pub engagement: f64,
    #[serde(default = "default_scheduling_weight")]
    pub scheduling: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            distance: default_distance_weight(),
            acceptance: default_acceptance_weight(),
            rating: default_rating_weight(),
            availability: default_availability_weight(),
            area_performance: default_area_weight(),
            engagement: default_engagement_weight(),
            scheduling: default_scheduling_weight(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(value: &WeightsConfig) -> Self {
        ScoringWeights {
            distance: value.distance,
            acceptance: value.acceptance,
            rating: value.rating,
            availability: value.availability,
            area_performance: value.area_performance,
            engagement: value.engagement,
            scheduling: value.scheduling,
        }
    }
}

fn default_distance_weight() -> f64 { 25.0 }
fn default_acceptance_weight() -> f64 { 20.0 }
fn default_rating_weight() -> f64 { 20.0 }
fn default_availability_weight() -> f64 { 15.0 }
fn default_area_weight() -> f64 { 10.0 }
fn default_engagement_weight() -> f64 { 5.0 }
fn default_scheduling_weight() -> f64 { 5.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct TiersConfig {
    #[serde(default = "default_premier_threshold")]
    pub premier: f64,
    #[serde(default = "default_highly_recommended_threshold")]
    pub highly_recommended: f64,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            premier: default_premier_threshold(),
            highly_recommended: default_highly_recommended_threshold(),
        }
    }
}

impl From<&TiersConfig> for TierThresholds {
    fn from(value: &TiersConfig) -> Self {
        TierThresholds {
            premier: value.premier,
            highly_recommended: value.highly_recommended,
        }
    }
}

fn default_premier_threshold() -> f64 { 100.0 }
fn default_highly_recommended_threshold() -> f64 { 75.0 }

/// Fallbacks used when the settings table cannot be read
#[derive(Debug, Clone, Deserialize)]
pub struct EarningsSettings {
    #[serde(default = "default_earnings_rate")]
    pub cleaner_earnings_rate: f64,
}

impl Default for EarningsSettings {
    fn default() -> Self {
        Self {
            cleaner_earnings_rate: default_earnings_rate(),
        }
    }
}

fn default_earnings_rate() -> f64 { 0.90 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with MAID_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., MAID__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("MAID")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_database_url(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("MAID")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Settings served when the settings table is unreachable
    pub fn fallback_app_settings(&self) -> AppSettings {
        AppSettings {
            cleaner_earnings_rate: self.earnings.cleaner_earnings_rate,
            default_service_radius_miles: self.matching.default_service_radius_miles,
        }
    }
}

/// `DATABASE_URL` wins over any configured database url
fn apply_database_url(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => Config::builder()
            .add_source(settings)
            .set_override("database.url", url)?
            .build(),
        Err(_) => Ok(settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = ScoringWeights::from(&WeightsConfig::default());
        assert_eq!(weights, ScoringWeights::default());
    }

    #[test]
    fn test_default_tiers() {
        let tiers = TierThresholds::from(&TiersConfig::default());
        assert_eq!(tiers.premier, 100.0);
        assert_eq!(tiers.highly_recommended, 75.0);
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_load_from_file_fills_defaults() {
        let path = std::env::temp_dir().join(format!("maid-match-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 8080

[database]
url = "memory"

[matching]
low_supply_threshold = 3
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(settings.database.is_memory());
        assert_eq!(settings.matching.low_supply_threshold, 3);
        assert_eq!(settings.matching.broadcast_limit, 15);
        assert_eq!(settings.cache.settings_ttl_secs, 60);
        assert_eq!(settings.fallback_app_settings(), AppSettings::default());
    }
}
