use chrono::{DateTime, Utc};
use fleetwatch_geo::PositionFix;
use serde::{Deserialize, Serialize};

/// Policy default for per-device overspeed thresholds, km/h.
pub const DEFAULT_OVERSPEED_THRESHOLD_KMH: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnitionStatus {
    On,
    Off,
    Unknown,
}

/// One raw report from a tracked vehicle. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub position: Option<PositionFix>,
    pub speed: Option<u32>,
    pub ignition: IgnitionStatus,
}

/// Registry data for a tracked vehicle, owned by an external system and
/// read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub device_id: String,
    pub display_name: String,
    pub registration_number: String,
    pub overspeed_threshold: u32,
}

/// Kinematic state tracked per device. Ignition history lives alongside
/// this in the store record, never in here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub device_id: String,
    pub is_moving: bool,
    pub is_overspeeding: bool,
    pub last_speed: u32,
    pub last_update: DateTime<Utc>,
}

impl DeviceState {
    pub fn new(device_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.into(),
            is_moving: false,
            is_overspeeding: false,
            last_speed: 0,
            last_update: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionKind {
    IgnitionOn,
    IgnitionOff,
    StartedMoving,
    StoppedMoving,
    OverspeedStarted,
    OverspeedEnded,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::IgnitionOn => "IGNITION_ON",
            TransitionKind::IgnitionOff => "IGNITION_OFF",
            TransitionKind::StartedMoving => "STARTED_MOVING",
            TransitionKind::StoppedMoving => "STOPPED_MOVING",
            TransitionKind::OverspeedStarted => "OVERSPEED_STARTED",
            TransitionKind::OverspeedEnded => "OVERSPEED_ENDED",
        }
    }
}

/// A detected state-change edge. Produced and consumed within a single
/// processing pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub device_id: String,
    pub kind: TransitionKind,
    pub speed: Option<u32>,
    pub ignition: Option<IgnitionStatus>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub user_id: String,
    pub push_token: String,
    pub permission_active: bool,
    pub access_expiry: Option<DateTime<Utc>>,
}

impl Subscriber {
    /// Whether this subscriber may receive pushes at `now`. Expiry is
    /// inclusive: a subscription expiring exactly now is still eligible.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.permission_active
            && self.access_expiry.is_none_or(|expiry| now <= expiry)
            && !self.push_token.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Alert,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Alert => "alert",
        }
    }
}

/// User-facing content for one transition, ready for the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushPriority {
    Normal,
    High,
}

/// The unit handed to the push gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub tokens: Vec<String>,
    pub data: serde_json::Value,
    pub priority: PushPriority,
    pub category: NotificationCategory,
}

/// Per-send delivery accounting reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryTally {
    pub sent: u32,
    pub delivered: u32,
    pub failed: u32,
}

/// Terminal result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Sent(DeliveryTally),
    NoRecipients,
    Failed(String),
}
