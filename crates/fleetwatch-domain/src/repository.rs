use crate::error::DomainResult;
use crate::types::{DeliveryTally, DeviceProfile, PushMessage, Subscriber};
use async_trait::async_trait;

/// Read-only access to the external vehicle registry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceProfileRepository: Send + Sync {
    /// Ok(None) means the device is not registered; callers treat that as
    /// a no-op, not an error.
    async fn get_profile(&self, device_id: &str) -> DomainResult<Option<DeviceProfile>>;
}

/// Access to the users watching a given device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    async fn subscribers_for(&self, device_id: &str) -> DomainResult<Vec<Subscriber>>;
}

/// Outbound push transport. Implementations own the delivery semantics;
/// a failed send is reported back and never retried here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: PushMessage) -> DomainResult<DeliveryTally>;
}
