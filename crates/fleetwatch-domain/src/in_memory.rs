use crate::error::DomainResult;
use crate::repository::{DeviceProfileRepository, PushGateway, SubscriberRepository};
use crate::types::{DeliveryTally, DeviceProfile, PushMessage, Subscriber};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Process-local vehicle registry, good enough for the demo feed and tests.
#[derive(Debug, Default)]
pub struct InMemoryDeviceProfileRepository {
    profiles: RwLock<HashMap<String, DeviceProfile>>,
}

impl InMemoryDeviceProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, profile: DeviceProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.device_id.clone(), profile);
    }
}

#[async_trait]
impl DeviceProfileRepository for InMemoryDeviceProfileRepository {
    async fn get_profile(&self, device_id: &str) -> DomainResult<Option<DeviceProfile>> {
        Ok(self.profiles.read().await.get(device_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySubscriberRepository {
    subscriptions: RwLock<HashMap<String, Vec<Subscriber>>>,
}

impl InMemorySubscriberRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, device_id: impl Into<String>, subscriber: Subscriber) {
        self.subscriptions
            .write()
            .await
            .entry(device_id.into())
            .or_default()
            .push(subscriber);
    }
}

#[async_trait]
impl SubscriberRepository for InMemorySubscriberRepository {
    async fn subscribers_for(&self, device_id: &str) -> DomainResult<Vec<Subscriber>> {
        Ok(self
            .subscriptions
            .read()
            .await
            .get(device_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Stands in for the real push transport: logs the send and reports every
/// token as delivered.
#[derive(Debug, Default)]
pub struct LoggingPushGateway;

impl LoggingPushGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PushGateway for LoggingPushGateway {
    async fn send(&self, message: PushMessage) -> DomainResult<DeliveryTally> {
        let recipients = message.tokens.len() as u32;
        info!(
            title = %message.title,
            body = %message.body,
            category = message.category.as_str(),
            recipients,
            "push notification"
        );
        Ok(DeliveryTally {
            sent: recipients,
            delivered: recipients,
            failed: 0,
        })
    }
}
