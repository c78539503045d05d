/**
 * Core Configuration
 *
 * Typed configuration for the profiler and the recommendation engine,
 * deserialized from TOML. Every field has a default; a missing or
 * unreadable config file is logged and the defaults are used, so
 * configuration problems never prevent startup.
 */
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub profiler: ProfilerConfig,
    pub recommender: RecommenderConfig,
}

/// Content-profiler settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Most active rooms considered per refresh
    pub max_rooms: usize,
    /// Most recent messages fetched per room
    pub messages_per_room: usize,
    /// Minimum document frequency for a vocabulary term
    pub min_df: usize,
    /// Maximum document-frequency ratio for a vocabulary term
    pub max_df_ratio: f64,
    /// Requested topic count (capped at the number of documents)
    pub num_topics: usize,
    /// Minimum non-trivial documents before topic modeling runs
    pub min_topic_docs: usize,
    /// Gibbs sampling sweeps per topic-model fit
    pub topic_iterations: usize,
    /// Seed for topic-model fits
    pub topic_seed: u64,
    /// Seconds between background refreshes
    pub refresh_interval_secs: u64,
    /// Milliseconds allowed per content-store call
    pub store_timeout_ms: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            max_rooms: 100,
            messages_per_room: 200,
            min_df: 1,
            max_df_ratio: 0.95,
            num_topics: 10,
            min_topic_docs: 3,
            topic_iterations: 50,
            topic_seed: 42,
            refresh_interval_secs: 30 * 60,
            store_timeout_ms: 5_000,
        }
    }
}

impl ProfilerConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Recommendation-engine settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Records kept per user in the recommendation history
    pub history_cap: usize,
    /// Similar users considered by collaborative filtering
    pub similar_user_limit: usize,
    /// Hybrid base weight of the content-based list
    pub content_weight: f64,
    /// Hybrid base weight of the collaborative list
    pub collaborative_weight: f64,
    /// Hybrid base weight of the topic-based list
    pub topic_weight: f64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            history_cap: 50,
            similar_user_limit: 10,
            content_weight: 0.4,
            collaborative_weight: 0.4,
            topic_weight: 0.2,
        }
    }
}

impl CoreConfig {
    /// Parse a TOML configuration string
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Load configuration from a TOML file, defaulting on any failure
    ///
    /// A missing file is expected (defaults apply silently); a present but
    /// unreadable or invalid file is logged as a warning.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("[Config] {} not found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        "[Config] Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "[Config] Failed to read {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}
