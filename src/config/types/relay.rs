//! Relay configuration types
//!
//! Rate gate window, pump supervision and tool guard settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relay pump and rate gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Rate window length
    #[serde(default = "default_rate_window", with = "humantime_serde")]
    pub rate_window: Duration,
    /// Requests admitted per window before the gate waits
    #[serde(default = "default_rate_quota")]
    pub rate_quota: u32,
    /// How long a cancelled pump may take to finish before it is aborted
    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,
    /// Capacity of the bounded queue feeding the agent engine
    #[serde(default = "default_input_queue_capacity")]
    pub input_queue_capacity: usize,
    /// Application name reported to the agent engine
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            rate_window: default_rate_window(),
            rate_quota: default_rate_quota(),
            shutdown_grace: default_shutdown_grace(),
            input_queue_capacity: default_input_queue_capacity(),
            app_name: default_app_name(),
        }
    }
}

fn default_rate_window() -> Duration {
    Duration::from_secs(60)
}

fn default_rate_quota() -> u32 {
    10
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_input_queue_capacity() -> usize {
    256
}

fn default_app_name() -> String {
    "cymbal_home_garden_streaming_chat".to_string()
}

/// Tool guard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Customer whose profile is bound when the client does not name one
    #[serde(default = "default_customer_id")]
    pub default_customer_id: String,
    /// Discounts at or below this value are approved without the tool body
    #[serde(default = "default_auto_approve_threshold")]
    pub auto_approve_threshold: f64,
    /// TTL of the process-wide profile cache
    #[serde(default = "default_profile_cache_ttl", with = "humantime_serde")]
    pub profile_cache_ttl: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        GuardConfig {
            default_customer_id: default_customer_id(),
            auto_approve_threshold: default_auto_approve_threshold(),
            profile_cache_ttl: default_profile_cache_ttl(),
        }
    }
}

fn default_customer_id() -> String {
    "123".to_string()
}

fn default_auto_approve_threshold() -> f64 {
    10.0
}

fn default_profile_cache_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}
