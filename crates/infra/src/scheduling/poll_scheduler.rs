//! Interval scheduler for the polling fallback
//!
//! Drives `PollingService::run_once` on a fixed interval with lifecycle
//! management. Webhooks are the primary sync path; this scheduler is the
//! degraded substitute when push notifications are unavailable.

use std::sync::Arc;
use std::time::Duration;

use plansync_core::PollingService;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct PollSchedulerConfig {
    pub interval: Duration,
    pub enabled: bool,
}

impl Default for PollSchedulerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(900), enabled: true }
    }
}

pub struct PollScheduler {
    polling: Arc<PollingService>,
    config: PollSchedulerConfig,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new(polling: Arc<PollingService>, config: PollSchedulerConfig) -> Self {
        Self { polling, config, cancel: CancellationToken::new(), handle: Mutex::new(None) }
    }

    /// Spawn the polling loop. Starting a disabled or already-running
    /// scheduler is a no-op.
    pub async fn start(&self) {
        if !self.config.enabled {
            info!("polling fallback disabled by configuration");
            return;
        }
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            warn!("polling scheduler already running");
            return;
        }

        let polling = Arc::clone(&self.polling);
        let interval = self.config.interval;
        let cancel = self.cancel.clone();

        *handle = Some(tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "polling scheduler started");
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("polling scheduler stopped");
                        break;
                    }
                    () = tokio::time::sleep(interval) => {
                        match polling.run_once().await {
                            Ok(summary) => {
                                info!(
                                    examined = summary.examined,
                                    provisioned = summary.provisioned,
                                    refreshed = summary.refreshed,
                                    failed = summary.errors.len(),
                                    "polling pass complete"
                                );
                            }
                            Err(err) => {
                                // The next tick retries; a broken pass must
                                // not kill the loop.
                                error!(error = %err, "polling pass failed");
                            }
                        }
                    }
                }
            }
        }));
    }

    /// Cancel the loop and wait for the task to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "polling task join failed");
            }
        }
    }
}
