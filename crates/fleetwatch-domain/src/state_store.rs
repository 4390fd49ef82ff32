use crate::types::{DeviceState, IgnitionStatus};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use fleetwatch_geo::PositionFix;
use tracing::debug;

/// Hours of inactivity after which a device record is evicted.
pub const STATE_EXPIRY_HOURS: i64 = 24;

/// Everything the engine remembers about one device between samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub state: DeviceState,
    pub last_ignition: Option<IgnitionStatus>,
    pub last_fix: Option<PositionFix>,
}

impl DeviceRecord {
    fn new(device_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            state: DeviceState::new(device_id, now),
            last_ignition: None,
            last_fix: None,
        }
    }
}

/// Sharded in-memory store of live device records. Work on one device is
/// serialized by its entry lock; different devices do not contend.
#[derive(Debug, Default)]
pub struct DeviceStateStore {
    records: DashMap<String, DeviceRecord>,
}

impl DeviceStateStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Returns the live state for the device, creating the default record
    /// first if the device has not been seen before.
    pub fn get_or_create(&self, device_id: &str, now: DateTime<Utc>) -> DeviceState {
        self.records
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceRecord::new(device_id, now))
            .state
            .clone()
    }

    /// Runs `f` with exclusive access to the device's record, creating the
    /// default record first if needed. The closure runs under the entry's
    /// shard lock and must not block.
    pub fn update<R>(
        &self,
        device_id: &str,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut DeviceRecord) -> R,
    ) -> R {
        let mut entry = self
            .records
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceRecord::new(device_id, now));
        f(entry.value_mut())
    }

    pub fn get(&self, device_id: &str) -> Option<DeviceRecord> {
        self.records
            .get(device_id)
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.records.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record whose last update is more than the expiry window
    /// behind `now`. Returns the eviction count.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| {
            now.signed_duration_since(record.state.last_update)
                <= Duration::hours(STATE_EXPIRY_HOURS)
        });
        let evicted = before - self.records.len();
        if evicted > 0 {
            debug!(
                evicted,
                remaining = self.records.len(),
                "evicted stale device state"
            );
        }
        evicted
    }
}
