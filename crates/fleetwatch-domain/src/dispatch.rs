use crate::error::{DomainError, DomainResult};
use crate::repository::{PushGateway, SubscriberRepository};
use crate::types::{DispatchOutcome, Notification, PushMessage, PushPriority, TransitionEvent};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub queue_capacity: usize,
    pub max_in_flight: usize,
    pub gateway_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_in_flight: 8,
            gateway_timeout: Duration::from_secs(10),
        }
    }
}

/// One composed notification ready to go out for one fired transition.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub device_id: String,
    pub notification: Notification,
    pub event: TransitionEvent,
}

/// Resolves who gets notified and hands the message to the push gateway.
/// Gateway trouble becomes a `Failed` outcome: it is surfaced and logged,
/// never retried, and the committed device state stands either way.
pub struct Dispatcher {
    subscriber_repository: Arc<dyn SubscriberRepository>,
    push_gateway: Arc<dyn PushGateway>,
    gateway_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        subscriber_repository: Arc<dyn SubscriberRepository>,
        push_gateway: Arc<dyn PushGateway>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            subscriber_repository,
            push_gateway,
            gateway_timeout,
        }
    }

    #[instrument(
        skip(self, request),
        fields(device_id = %request.device_id, kind = request.event.kind.as_str())
    )]
    pub async fn dispatch(&self, request: DispatchRequest) -> DomainResult<DispatchOutcome> {
        // 1. Resolve subscribers and keep the ones allowed to receive pushes
        let subscribers = self
            .subscriber_repository
            .subscribers_for(&request.device_id)
            .await?;
        let now = Utc::now();
        let tokens: Vec<String> = subscribers
            .iter()
            .filter(|subscriber| subscriber.is_eligible(now))
            .map(|subscriber| subscriber.push_token.clone())
            .collect();

        // 2. Nobody eligible or reachable is a documented no-op
        if tokens.is_empty() {
            info!(
                resolved = subscribers.len(),
                "no eligible subscribers, skipping dispatch"
            );
            return Ok(DispatchOutcome::NoRecipients);
        }

        // 3. Send under the bounded gateway timeout
        let recipients = tokens.len();
        let message = build_message(&request.notification, tokens, &request.event);
        let outcome =
            match tokio::time::timeout(self.gateway_timeout, self.push_gateway.send(message)).await
            {
                Ok(Ok(tally)) => {
                    debug!(
                        recipients,
                        sent = tally.sent,
                        delivered = tally.delivered,
                        failed = tally.failed,
                        "push gateway accepted dispatch"
                    );
                    DispatchOutcome::Sent(tally)
                }
                Ok(Err(gateway_error)) => {
                    error!(%gateway_error, recipients, "push gateway rejected dispatch");
                    DispatchOutcome::Failed(gateway_error.to_string())
                }
                Err(_) => {
                    let timeout = DomainError::GatewayTimeout {
                        seconds: self.gateway_timeout.as_secs(),
                    };
                    warn!(%timeout, recipients, "push gateway timed out");
                    DispatchOutcome::Failed(timeout.to_string())
                }
            };
        Ok(outcome)
    }
}

fn build_message(
    notification: &Notification,
    tokens: Vec<String>,
    event: &TransitionEvent,
) -> PushMessage {
    PushMessage {
        title: notification.title.clone(),
        body: notification.body.clone(),
        tokens,
        data: json!({
            "device_id": event.device_id,
            "kind": event.kind.as_str(),
            "speed": event.speed,
            "timestamp": event.timestamp.to_rfc3339(),
        }),
        priority: PushPriority::High,
        category: notification.category,
    }
}

struct DispatchJob {
    request: DispatchRequest,
    outcome: oneshot::Sender<DispatchOutcome>,
}

/// Producer handle to the dispatch worker's bounded queue.
#[derive(Clone)]
pub struct DispatchQueue {
    sender: mpsc::Sender<DispatchJob>,
}

impl DispatchQueue {
    /// Enqueues without waiting. A full queue tells the caller to drop the
    /// notification rather than stall sample processing; the returned
    /// receiver may be awaited for the outcome or dropped.
    pub fn submit(
        &self,
        request: DispatchRequest,
    ) -> DomainResult<oneshot::Receiver<DispatchOutcome>> {
        let (outcome_sender, outcome_receiver) = oneshot::channel();
        self.sender
            .try_send(DispatchJob {
                request,
                outcome: outcome_sender,
            })
            .map_err(|send_error| match send_error {
                mpsc::error::TrySendError::Full(_) => DomainError::DispatchQueueFull,
                mpsc::error::TrySendError::Closed(_) => DomainError::DispatchWorkerStopped,
            })?;
        Ok(outcome_receiver)
    }
}

/// Consumes the queue and fans sends out over at most `max_in_flight`
/// concurrent gateway calls. In-flight sends are drained on shutdown.
pub struct DispatchWorker {
    dispatcher: Arc<Dispatcher>,
    receiver: mpsc::Receiver<DispatchJob>,
    max_in_flight: usize,
}

pub fn dispatch_channel(
    dispatcher: Arc<Dispatcher>,
    config: &DispatchConfig,
) -> (DispatchQueue, DispatchWorker) {
    let (sender, receiver) = mpsc::channel(config.queue_capacity);
    (
        DispatchQueue { sender },
        DispatchWorker {
            dispatcher,
            receiver,
            max_in_flight: config.max_in_flight.max(1),
        },
    )
}

impl DispatchWorker {
    pub async fn run(mut self, ctx: CancellationToken) -> anyhow::Result<()> {
        let mut in_flight: JoinSet<()> = JoinSet::new();
        loop {
            // Reap whatever already finished so the cap counts live sends.
            while in_flight.try_join_next().is_some() {}

            tokio::select! {
                _ = ctx.cancelled() => break,
                job = self.receiver.recv() => {
                    let Some(job) = job else { break };
                    if in_flight.len() >= self.max_in_flight {
                        let _ = in_flight.join_next().await;
                    }
                    let dispatcher = self.dispatcher.clone();
                    in_flight.spawn(async move {
                        let device_id = job.request.device_id.clone();
                        let outcome = match dispatcher.dispatch(job.request).await {
                            Ok(outcome) => outcome,
                            Err(dispatch_error) => {
                                error!(%dispatch_error, device_id = %device_id, "dispatch failed");
                                DispatchOutcome::Failed(dispatch_error.to_string())
                            }
                        };
                        // Submitter may have dropped the receiver already.
                        let _ = job.outcome.send(outcome);
                    });
                }
            }
        }

        while in_flight.join_next().await.is_some() {}
        info!("dispatch worker stopped");
        Ok(())
    }
}
