use chrono::{Duration as ChronoDuration, Utc};
use fleetwatch_domain::{
    DEFAULT_OVERSPEED_THRESHOLD_KMH, DeviceProfile, IgnitionStatus, InMemoryDeviceProfileRepository,
    InMemorySubscriberRepository, Subscriber, TelemetryEvent,
};
use fleetwatch_geo::PositionFix;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const DEMO_DEVICE_IDS: [&str; 2] = ["demo-lorry-01", "demo-van-02"];

// A commute loop: pull away, speed past the limit, settle down, cycle the
// ignition, stop, pull away again.
const DEMO_CYCLE: [(u32, IgnitionStatus); 12] = [
    (0, IgnitionStatus::On),
    (0, IgnitionStatus::On),
    (3, IgnitionStatus::On),
    (8, IgnitionStatus::On),
    (15, IgnitionStatus::On),
    (25, IgnitionStatus::On),
    (65, IgnitionStatus::On),
    (70, IgnitionStatus::On),
    (45, IgnitionStatus::Off),
    (2, IgnitionStatus::On),
    (0, IgnitionStatus::Unknown),
    (8, IgnitionStatus::On),
];

// Colombo Fort, heading north in ~0.1 km steps.
const DEMO_ORIGIN: (f64, f64) = (6.9344, 79.8428);
const DEMO_STEP_DEGREES: f64 = 0.0009;
const DEMO_ROUTE_STEPS: usize = 400;

/// Registers the demo vehicles and their watchers. One subscription is
/// expired and one has no push token, so the eligibility filter has
/// something to do.
pub async fn seed_demo_fleet(
    profiles: &InMemoryDeviceProfileRepository,
    subscribers: &InMemorySubscriberRepository,
) {
    profiles
        .upsert(DeviceProfile {
            device_id: "demo-lorry-01".to_string(),
            display_name: "Demo Lorry".to_string(),
            registration_number: "LK-CAB-1234".to_string(),
            overspeed_threshold: DEFAULT_OVERSPEED_THRESHOLD_KMH,
        })
        .await;
    profiles
        .upsert(DeviceProfile {
            device_id: "demo-van-02".to_string(),
            display_name: "Demo Van".to_string(),
            registration_number: "LK-PB-5678".to_string(),
            overspeed_threshold: 80,
        })
        .await;

    subscribers
        .subscribe(
            "demo-lorry-01",
            Subscriber {
                user_id: "fleet-owner".to_string(),
                push_token: "demo-token-owner".to_string(),
                permission_active: true,
                access_expiry: None,
            },
        )
        .await;
    subscribers
        .subscribe(
            "demo-lorry-01",
            Subscriber {
                user_id: "former-driver".to_string(),
                push_token: "demo-token-former".to_string(),
                permission_active: true,
                access_expiry: Some(Utc::now() - ChronoDuration::hours(1)),
            },
        )
        .await;
    subscribers
        .subscribe(
            "demo-van-02",
            Subscriber {
                user_id: "dispatcher".to_string(),
                push_token: "demo-token-dispatch".to_string(),
                permission_active: true,
                access_expiry: None,
            },
        )
        .await;
    subscribers
        .subscribe(
            "demo-van-02",
            Subscriber {
                user_id: "auditor".to_string(),
                push_token: String::new(),
                permission_active: true,
                access_expiry: None,
            },
        )
        .await;

    info!(vehicles = DEMO_DEVICE_IDS.len(), "seeded demo fleet");
}

/// Emits one synthetic report per vehicle per tick until cancelled. The
/// vehicles run the same commute cycle offset from each other.
pub async fn run_demo_feed(
    sender: mpsc::Sender<TelemetryEvent>,
    interval: Duration,
    ctx: CancellationToken,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick = 0usize;
    let mut route_steps = [0usize; DEMO_DEVICE_IDS.len()];

    loop {
        tokio::select! {
            _ = ctx.cancelled() => break,
            _ = ticker.tick() => {
                for (index, device_id) in DEMO_DEVICE_IDS.iter().enumerate() {
                    let (speed, ignition) = DEMO_CYCLE[(tick + index * 6) % DEMO_CYCLE.len()];
                    if speed > 0 {
                        route_steps[index] += 1;
                    }
                    let report = TelemetryEvent {
                        device_id: (*device_id).to_string(),
                        timestamp: Utc::now(),
                        position: Some(demo_position(route_steps[index])),
                        speed: Some(speed),
                        ignition,
                    };
                    if sender.send(report).await.is_err() {
                        info!("telemetry channel closed, demo feed stopping");
                        return Ok(());
                    }
                }
                tick += 1;
            }
        }
    }

    info!("demo feed stopped");
    Ok(())
}

/// Out-and-back leg along the latitude axis, so consecutive positions
/// always stay within the erratic-jump gate.
fn demo_position(step: usize) -> PositionFix {
    let leg = step % (2 * DEMO_ROUTE_STEPS);
    let along = if leg < DEMO_ROUTE_STEPS {
        leg
    } else {
        2 * DEMO_ROUTE_STEPS - leg
    } as f64;
    PositionFix::new(DEMO_ORIGIN.0 + along * DEMO_STEP_DEGREES, DEMO_ORIGIN.1)
}
