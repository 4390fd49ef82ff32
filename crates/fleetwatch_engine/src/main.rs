mod config;
mod demo;
mod engine;
mod telemetry;

use config::ServiceConfig;
use engine::run_ingest;
use fleetwatch_domain::{
    DeviceStateStore, Dispatcher, InMemoryDeviceProfileRepository, InMemorySubscriberRepository,
    LoggingPushGateway, StateSweeper, TelemetryService, dispatch_channel,
};
use fleetwatch_geo::PositionFilter;
use fleetwatch_runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(config_error) => {
            eprintln!("failed to load configuration: {config_error}");
            std::process::exit(1);
        }
    };

    if let Err(telemetry_error) = telemetry::init_telemetry(&config) {
        eprintln!("failed to initialize telemetry: {telemetry_error}");
        std::process::exit(1);
    }

    info!(
        demo_feed = config.demo_feed_enabled,
        sweep_interval_secs = config.sweep_interval_secs,
        "starting fleetwatch engine"
    );
    debug!("configuration: {config:?}");

    // Shared state and the external-interface implementations
    let store = Arc::new(DeviceStateStore::new());
    let profiles = Arc::new(InMemoryDeviceProfileRepository::new());
    let subscribers = Arc::new(InMemorySubscriberRepository::new());
    let gateway = Arc::new(LoggingPushGateway::new());
    demo::seed_demo_fleet(&profiles, &subscribers).await;

    // Dispatch pipeline: bounded queue feeding the gateway worker
    let dispatch_config = config.dispatch_config();
    let dispatcher = Arc::new(Dispatcher::new(
        subscribers,
        gateway,
        dispatch_config.gateway_timeout,
    ));
    let (dispatch_queue, dispatch_worker) = dispatch_channel(dispatcher, &dispatch_config);

    // Ingest pipeline
    let service = Arc::new(TelemetryService::new(
        profiles,
        store.clone(),
        PositionFilter::new(config.position_filter_config()),
        dispatch_queue,
    ));
    let (report_sender, report_receiver) = mpsc::channel(config.ingest_queue_capacity);

    let sweeper = StateSweeper::new(store.clone(), config.sweep_interval());

    let mut runner = Runner::new()
        .with_named_process("telemetry_ingest", move |ctx| {
            run_ingest(service, report_receiver, ctx)
        })
        .with_named_process("dispatch_worker", move |ctx| dispatch_worker.run(ctx))
        .with_named_process("state_sweeper", move |ctx| sweeper.run(ctx));

    if config.demo_feed_enabled {
        let interval = config.demo_feed_interval();
        runner = runner.with_named_process("demo_feed", move |ctx| {
            demo::run_demo_feed(report_sender, interval, ctx)
        });
    }

    let closer_store = store.clone();
    runner = runner
        .with_closer(move || async move {
            info!(tracked_devices = closer_store.len(), "engine shutting down");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10));

    runner.run().await;
}
