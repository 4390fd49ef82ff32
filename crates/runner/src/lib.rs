//! Process runner for long-lived service binaries.
//!
//! A [`Runner`] holds a set of named app processes that run concurrently
//! until one of them fails or a shutdown signal (SIGINT/SIGTERM) arrives.
//! It then cancels the shared token, waits for the processes to return, and
//! runs the registered closers under a timeout before exiting.
//!
//! # Example
//!
//! ```no_run
//! use fleetwatch_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     Runner::new()
//!         .with_named_process("heartbeat", |ctx| async move {
//!             loop {
//!                 tokio::select! {
//!                     _ = ctx.cancelled() => break,
//!                     _ = tokio::time::sleep(Duration::from_secs(1)) => {
//!                         tracing::info!("still here");
//!                     }
//!                 }
//!             }
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("flushing state");
//!             Ok(())
//!         })
//!         .with_closer_timeout(Duration::from_secs(5))
//!         .run()
//!         .await;
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// A long-running unit of the application. It receives the shared
/// cancellation token and is expected to return soon after the token fires.
pub type AppProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>
        + Send,
>;

/// Cleanup step run after every process has stopped, success or not.
pub type Closer =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>> + Send>;

/// Orchestrates named app processes and their cleanup.
///
/// Processes run concurrently; the first process error (or an outside
/// signal) cancels all of them. Closers always run afterwards, bounded by
/// the closer timeout.
pub struct Runner {
    processes: Vec<(String, AppProcess)>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Adds a process under a name that shows up in the runner's logs.
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.processes
            .push((name.into(), Box::new(|token| Box::pin(process(token)))));
        self
    }

    /// Adds a process with a generated name.
    pub fn with_app_process<F, Fut>(self, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        let name = format!("process-{}", self.processes.len() + 1);
        self.with_named_process(name, process)
    }

    /// Adds a closer. Closers run after the processes stop, whatever the
    /// outcome; a failing closer is logged and does not stop the others.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    /// Bounds how long the closers may take together. Default 10 seconds.
    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Installs an externally controlled cancellation token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Runs to completion and exits the process with the resulting code.
    pub async fn run(self) {
        let code = self.execute().await;
        std::process::exit(code);
    }

    /// Runs all processes until they stop, then the closers. Returns the
    /// process exit code instead of exiting, so callers and tests can
    /// observe it.
    pub async fn execute(self) -> i32 {
        let Runner {
            processes,
            closers,
            closer_timeout,
            cancellation_token: token,
        } = self;

        let mut running = JoinSet::new();
        for (name, process) in processes {
            let process_token = token.clone();
            running.spawn(async move {
                let result = process(process_token).await;
                (name, result)
            });
        }

        let interrupt_token = token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received interrupt signal");
                    interrupt_token.cancel();
                }
                Err(signal_error) => {
                    error!(%signal_error, "failed to listen for interrupt signal");
                }
            }
        });

        #[cfg(unix)]
        {
            let sigterm_token = token.clone();
            tokio::spawn(async move {
                use tokio::signal::unix::{SignalKind, signal};
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                        info!("received SIGTERM");
                        sigterm_token.cancel();
                    }
                    Err(signal_error) => {
                        error!(%signal_error, "failed to listen for SIGTERM");
                    }
                }
            });
        }

        // Processes are trusted to return promptly once the token fires, so
        // the drain waits for all of them rather than aborting stragglers.
        let mut first_error = None;
        while let Some(joined) = running.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    debug!(process = %name, "process finished");
                }
                Ok((name, Err(process_error))) => {
                    error!(process = %name, "process failed: {process_error:#}");
                    if first_error.is_none() {
                        first_error = Some(process_error);
                    }
                    token.cancel();
                }
                Err(join_error) => {
                    error!("process panicked: {join_error}");
                    token.cancel();
                }
            }
        }

        if !closers.is_empty() {
            info!(timeout_secs = closer_timeout.as_secs(), "running closers");
            match tokio::time::timeout(closer_timeout, Self::run_closers(closers)).await {
                Ok(()) => info!("closers finished"),
                Err(_) => error!("closers timed out"),
            }
        }

        match first_error {
            Some(app_error) => {
                error!("exiting with error: {app_error:#}");
                1
            }
            None => {
                info!("exiting normally");
                0
            }
        }
    }

    async fn run_closers(closers: Vec<Closer>) {
        let mut closer_set = JoinSet::new();
        for closer in closers {
            closer_set.spawn(async move { closer().await });
        }
        while let Some(joined) = closer_set.join_next().await {
            match joined {
                Ok(Ok(())) => debug!("closer finished"),
                Ok(Err(closer_error)) => error!("closer failed: {closer_error:#}"),
                Err(join_error) => error!("closer panicked: {join_error}"),
            }
        }
    }
}
