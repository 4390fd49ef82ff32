use crate::composer::compose;
use crate::dispatch::{DispatchQueue, DispatchRequest};
use crate::error::DomainResult;
use crate::repository::DeviceProfileRepository;
use crate::state_store::DeviceStateStore;
use crate::transitions::detect;
use crate::types::{DeviceProfile, TelemetryEvent, TransitionEvent};
use chrono::Utc;
use fleetwatch_geo::{FilterOutcome, PositionFilter};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Orchestrates one report through filter, detection, and dispatch.
pub struct TelemetryService {
    profiles: Arc<dyn DeviceProfileRepository>,
    store: Arc<DeviceStateStore>,
    position_filter: PositionFilter,
    dispatch_queue: DispatchQueue,
}

impl TelemetryService {
    pub fn new(
        profiles: Arc<dyn DeviceProfileRepository>,
        store: Arc<DeviceStateStore>,
        position_filter: PositionFilter,
        dispatch_queue: DispatchQueue,
    ) -> Self {
        Self {
            profiles,
            store,
            position_filter,
            dispatch_queue,
        }
    }

    #[instrument(skip(self, report), fields(device_id = %report.device_id))]
    pub async fn process_report(&self, report: TelemetryEvent) -> DomainResult<()> {
        // 1. Unregistered devices are dropped, not errored
        let Some(profile) = self.profiles.get_profile(&report.device_id).await? else {
            debug!("no profile registered, ignoring report");
            return Ok(());
        };

        // 2. Filter, detect, and commit under the device's entry lock. A
        //    rejected fix drops the whole sample: nothing reaches detection
        //    and the record stays as it was.
        let events = self.store.update(&report.device_id, Utc::now(), |record| {
            let accepted_fix = match &report.position {
                Some(candidate) => {
                    match self.position_filter.filter(record.last_fix.as_ref(), candidate) {
                        FilterOutcome::Accepted(fix) => Some(fix),
                        FilterOutcome::Rejected(reason) => {
                            debug!(?reason, "dropping sample with untrusted fix");
                            return Vec::new();
                        }
                    }
                }
                None => None,
            };

            let detection = detect(&record.state, record.last_ignition, &report, &profile);
            record.state = detection.state;
            record.last_ignition = detection.last_ignition;
            if let Some(fix) = accepted_fix {
                record.last_fix = Some(fix);
            }
            detection.events
        });

        // 3. Hand fired transitions to the dispatch worker, off this path
        for event in events {
            self.submit(event, &profile);
        }

        Ok(())
    }

    fn submit(&self, event: TransitionEvent, profile: &DeviceProfile) {
        let kind = event.kind;
        let notification = compose(&event, profile);
        let request = DispatchRequest {
            device_id: event.device_id.clone(),
            notification,
            event,
        };
        // Fire-and-forget: the worker owns the outcome. The state change is
        // already committed, so a dropped notification costs a push, not
        // correctness.
        if let Err(submit_error) = self.dispatch_queue.submit(request) {
            warn!(%submit_error, kind = kind.as_str(), "dropping notification");
        }
    }
}
