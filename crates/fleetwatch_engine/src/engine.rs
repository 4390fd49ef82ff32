use fleetwatch_domain::{TelemetryEvent, TelemetryService};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Pulls reports off the ingest channel and runs each through the service.
/// A failed report is logged and skipped; the loop itself only stops on
/// cancellation or when every producer is gone.
pub async fn run_ingest(
    service: Arc<TelemetryService>,
    mut reports: mpsc::Receiver<TelemetryEvent>,
    ctx: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = ctx.cancelled() => break,
            report = reports.recv() => {
                let Some(report) = report else { break };
                if let Err(process_error) = service.process_report(report).await {
                    warn!(%process_error, "failed to process report");
                }
            }
        }
    }

    info!("telemetry ingest stopped");
    Ok(())
}
