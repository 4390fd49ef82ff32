pub mod composer;
pub mod dispatch;
pub mod error;
pub mod in_memory;
pub mod repository;
pub mod state_store;
pub mod sweeper;
pub mod telemetry_service;
pub mod transitions;
pub mod types;

pub use composer::compose;
pub use dispatch::{
    DispatchConfig, DispatchQueue, DispatchRequest, DispatchWorker, Dispatcher, dispatch_channel,
};
pub use error::{DomainError, DomainResult};
pub use in_memory::{
    InMemoryDeviceProfileRepository, InMemorySubscriberRepository, LoggingPushGateway,
};
pub use repository::{DeviceProfileRepository, PushGateway, SubscriberRepository};
pub use state_store::{DeviceRecord, DeviceStateStore, STATE_EXPIRY_HOURS};
pub use sweeper::StateSweeper;
pub use telemetry_service::TelemetryService;
pub use transitions::{Detection, MOVING_SPEED_THRESHOLD_KMH, detect};
pub use types::{
    DEFAULT_OVERSPEED_THRESHOLD_KMH, DeliveryTally, DeviceProfile, DeviceState, DispatchOutcome,
    IgnitionStatus, Notification, NotificationCategory, PushMessage, PushPriority, Subscriber,
    TelemetryEvent, TransitionEvent, TransitionKind,
};
