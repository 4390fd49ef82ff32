use config::{Config, ConfigError, Environment};
use fleetwatch_domain::DispatchConfig;
use fleetwatch_geo::{BoundingRegion, DEFAULT_MAX_JUMP_KM, PositionFilterConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // Operating region (defaults cover Sri Lanka)
    /// Southern edge of the accepted position envelope, degrees
    #[serde(default = "default_region_min_latitude")]
    pub region_min_latitude: f64,

    /// Northern edge of the accepted position envelope, degrees
    #[serde(default = "default_region_max_latitude")]
    pub region_max_latitude: f64,

    /// Western edge of the accepted position envelope, degrees
    #[serde(default = "default_region_min_longitude")]
    pub region_min_longitude: f64,

    /// Eastern edge of the accepted position envelope, degrees
    #[serde(default = "default_region_max_longitude")]
    pub region_max_longitude: f64,

    /// Largest plausible movement between consecutive fixes, km
    #[serde(default = "default_max_jump_km")]
    pub max_jump_km: f64,

    // Pipeline sizing
    /// Capacity of the inbound telemetry channel
    #[serde(default = "default_ingest_queue_capacity")]
    pub ingest_queue_capacity: usize,

    /// Capacity of the notification dispatch queue
    #[serde(default = "default_dispatch_queue_capacity")]
    pub dispatch_queue_capacity: usize,

    /// Concurrent push gateway calls the dispatch worker may have open
    #[serde(default = "default_dispatch_max_in_flight")]
    pub dispatch_max_in_flight: usize,

    /// Push gateway call timeout in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,

    /// Interval between stale-state sweeps in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    // Demo feed
    /// Emit synthetic telemetry for the seeded demo fleet
    #[serde(default = "default_demo_feed_enabled")]
    pub demo_feed_enabled: bool,

    /// Milliseconds between synthetic reports per vehicle
    #[serde(default = "default_demo_feed_interval_ms")]
    pub demo_feed_interval_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

// Region defaults
fn default_region_min_latitude() -> f64 {
    5.8
}

fn default_region_max_latitude() -> f64 {
    9.9
}

fn default_region_min_longitude() -> f64 {
    79.4
}

fn default_region_max_longitude() -> f64 {
    82.0
}

fn default_max_jump_km() -> f64 {
    DEFAULT_MAX_JUMP_KM
}

// Pipeline defaults
fn default_ingest_queue_capacity() -> usize {
    1024
}

fn default_dispatch_queue_capacity() -> usize {
    256
}

fn default_dispatch_max_in_flight() -> usize {
    8
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

// Demo feed defaults
fn default_demo_feed_enabled() -> bool {
    true
}

fn default_demo_feed_interval_ms() -> u64 {
    1000
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("FLEETWATCH").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn position_filter_config(&self) -> PositionFilterConfig {
        PositionFilterConfig {
            region: BoundingRegion::new(
                self.region_min_latitude,
                self.region_min_longitude,
                self.region_max_latitude,
                self.region_max_longitude,
            ),
            max_jump_km: self.max_jump_km,
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            queue_capacity: self.dispatch_queue_capacity,
            max_in_flight: self.dispatch_max_in_flight,
            gateway_timeout: Duration::from_secs(self.gateway_timeout_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn demo_feed_interval(&self) -> Duration {
        Duration::from_millis(self.demo_feed_interval_ms)
    }
}
