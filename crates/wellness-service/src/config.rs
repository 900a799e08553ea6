//! Service layer configuration.

use std::time::Duration;

use telemetry_synth::MAX_HISTORY_DAYS;
use vitals_core::config::{env_lookup, parse_var, positive_var, string_var};
use vitals_core::ConfigError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:vitals.db?mode=rwc";
pub const DEFAULT_CHAT_TTL_SECS: u64 = 45;
pub const DEFAULT_NUTRITION_TTL_SECS: u64 = 15 * 60;
pub const DEFAULT_RECIPE_TTL_SECS: u64 = 10 * 60;
pub const DEFAULT_TELEMETRY_TTL_SECS: u64 = 2 * 60;
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 500;
pub const DEFAULT_BATCH_CHUNK_SIZE: u64 = 100;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_HISTORY_DAYS: u64 = 7;

/// Chat replies may be cached for 30 to 60 seconds.
const CHAT_TTL_RANGE: (u64, u64) = (30, 60);

/// Configuration for [`WellnessService`](crate::WellnessService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// SQLite URL used by the binary.
    pub database_url: String,

    pub chat_ttl: Duration,
    pub nutrition_ttl: Duration,
    pub recipe_ttl: Duration,
    /// TTL for metric reads and summaries.
    pub telemetry_ttl: Duration,

    /// Entry bound for each cache family.
    pub cache_max_entries: usize,

    /// Records per storage call when batch writing.
    pub batch_chunk_size: usize,

    /// Time limit for every collaborator call.
    pub call_timeout: Duration,

    /// Days of history synthesized for a user with no data.
    pub history_days: u32,

    /// Fixed seed for the synthesizer; entropy when unset.
    pub synth_seed: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            chat_ttl: Duration::from_secs(DEFAULT_CHAT_TTL_SECS),
            nutrition_ttl: Duration::from_secs(DEFAULT_NUTRITION_TTL_SECS),
            recipe_ttl: Duration::from_secs(DEFAULT_RECIPE_TTL_SECS),
            telemetry_ttl: Duration::from_secs(DEFAULT_TELEMETRY_TTL_SECS),
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES as usize,
            batch_chunk_size: DEFAULT_BATCH_CHUNK_SIZE as usize,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            history_days: DEFAULT_HISTORY_DAYS as u32,
            synth_seed: None,
        }
    }
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `VITALS_DATABASE_URL` - SQLite URL (default: sqlite:vitals.db?mode=rwc)
    /// - `VITALS_CHAT_TTL_SECS` - Chat cache TTL, 30 to 60 (default: 45)
    /// - `VITALS_NUTRITION_TTL_SECS` - Nutrition cache TTL (default: 900)
    /// - `VITALS_RECIPE_TTL_SECS` - Recipe cache TTL (default: 600)
    /// - `VITALS_TELEMETRY_TTL_SECS` - Metric and summary TTL (default: 120)
    /// - `VITALS_CACHE_MAX_ENTRIES` - Entries per cache family (default: 500)
    /// - `VITALS_BATCH_CHUNK_SIZE` - Records per storage call (default: 100)
    /// - `VITALS_CALL_TIMEOUT_SECS` - Collaborator call limit (default: 20)
    /// - `VITALS_HISTORY_DAYS` - Synthesized history length, at most 365 (default: 7)
    /// - `VITALS_SYNTH_SEED` - Fixed synthesizer seed (default: entropy)
    ///
    /// A variable that is set but invalid is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let database_url = string_var(&lookup, "VITALS_DATABASE_URL")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let chat_ttl = positive_var(&lookup, "VITALS_CHAT_TTL_SECS", DEFAULT_CHAT_TTL_SECS)?;
        if chat_ttl < CHAT_TTL_RANGE.0 || chat_ttl > CHAT_TTL_RANGE.1 {
            return Err(ConfigError::OutOfRange {
                name: "VITALS_CHAT_TTL_SECS".to_string(),
                reason: format!(
                    "must be between {} and {} seconds",
                    CHAT_TTL_RANGE.0, CHAT_TTL_RANGE.1
                ),
            });
        }

        let nutrition_ttl =
            positive_var(&lookup, "VITALS_NUTRITION_TTL_SECS", DEFAULT_NUTRITION_TTL_SECS)?;
        let recipe_ttl = positive_var(&lookup, "VITALS_RECIPE_TTL_SECS", DEFAULT_RECIPE_TTL_SECS)?;
        let telemetry_ttl =
            positive_var(&lookup, "VITALS_TELEMETRY_TTL_SECS", DEFAULT_TELEMETRY_TTL_SECS)?;
        let cache_max_entries =
            positive_var(&lookup, "VITALS_CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES)?;
        let batch_chunk_size =
            positive_var(&lookup, "VITALS_BATCH_CHUNK_SIZE", DEFAULT_BATCH_CHUNK_SIZE)?;
        let call_timeout =
            positive_var(&lookup, "VITALS_CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS)?;
        let history_days = positive_var(&lookup, "VITALS_HISTORY_DAYS", DEFAULT_HISTORY_DAYS)?;
        if history_days > u64::from(MAX_HISTORY_DAYS) {
            return Err(ConfigError::OutOfRange {
                name: "VITALS_HISTORY_DAYS".to_string(),
                reason: format!("must be at most {} days", MAX_HISTORY_DAYS),
            });
        }
        let synth_seed = parse_var::<_, u64>(&lookup, "VITALS_SYNTH_SEED")?;

        Ok(Self {
            database_url,
            chat_ttl: Duration::from_secs(chat_ttl),
            nutrition_ttl: Duration::from_secs(nutrition_ttl),
            recipe_ttl: Duration::from_secs(recipe_ttl),
            telemetry_ttl: Duration::from_secs(telemetry_ttl),
            cache_max_entries: cache_max_entries as usize,
            batch_chunk_size: batch_chunk_size as usize,
            call_timeout: Duration::from_secs(call_timeout),
            history_days: history_days as u32,
            synth_seed,
        })
    }

    /// Create a new config builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }
}

/// Builder for ServiceConfig.
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    pub fn chat_ttl(mut self, ttl: Duration) -> Self {
        self.config.chat_ttl = ttl;
        self
    }

    pub fn nutrition_ttl(mut self, ttl: Duration) -> Self {
        self.config.nutrition_ttl = ttl;
        self
    }

    pub fn recipe_ttl(mut self, ttl: Duration) -> Self {
        self.config.recipe_ttl = ttl;
        self
    }

    pub fn telemetry_ttl(mut self, ttl: Duration) -> Self {
        self.config.telemetry_ttl = ttl;
        self
    }

    pub fn cache_max_entries(mut self, entries: usize) -> Self {
        self.config.cache_max_entries = entries;
        self
    }

    pub fn batch_chunk_size(mut self, size: usize) -> Self {
        self.config.batch_chunk_size = size;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    /// Capped at [`MAX_HISTORY_DAYS`].
    pub fn history_days(mut self, days: u32) -> Self {
        self.config.history_days = days.min(MAX_HISTORY_DAYS);
        self
    }

    pub fn synth_seed(mut self, seed: u64) -> Self {
        self.config.synth_seed = Some(seed);
        self
    }

    pub fn build(self) -> ServiceConfig {
        self.config
    }
}
