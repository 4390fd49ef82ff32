//! Two named processes with graceful shutdown and cleanup.
//!
//! Run with: cargo run --example basic_runner, then press Ctrl+C.

use fleetwatch_runner::Runner;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    Runner::new()
        .with_named_process("ticker", |ctx| async move {
            let mut ticks = 0u64;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::info!(ticks, "ticker stopping");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        ticks += 1;
                        tracing::info!(ticks, "tick");
                    }
                }
            }
            Ok(())
        })
        .with_named_process("deadline", |ctx| async move {
            tokio::select! {
                _ = ctx.cancelled() => {
                    tracing::info!("deadline process stopping");
                    Ok(())
                }
                _ = tokio::time::sleep(Duration::from_secs(60)) => {
                    Err(anyhow::anyhow!("nobody pressed Ctrl+C within a minute"))
                }
            }
        })
        .with_closer(|| async move {
            tracing::info!("releasing resources");
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(5))
        .run()
        .await;
}
