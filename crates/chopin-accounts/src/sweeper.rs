//! Background removal of abandoned registrations.
//!
//! Accounts that never followed their activation link are removed by
//! [`UserService::delete_pending_activations`], and token records that can
//! no longer be redeemed by [`UserService::purge_spent_tokens`]. The
//! sweeper calls both on a fixed interval until shut down.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::config::AccountsConfig;
use crate::service::UserService;

/// Default interval between sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Periodic pending-activation sweep.
pub struct PendingActivationSweeper {
    service: UserService,
    interval: Duration,
}

impl PendingActivationSweeper {
    pub fn new(service: UserService) -> Self {
        Self {
            service,
            interval: SWEEP_INTERVAL,
        }
    }

    pub fn from_config(service: UserService, config: &AccountsConfig) -> Self {
        Self::new(service).with_interval(config.sweep_interval())
    }

    /// Set the sweep period. A zero period is not a valid tick rate and
    /// keeps the default.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            warn!(
                default_secs = SWEEP_INTERVAL.as_secs(),
                "zero sweep interval ignored, using default"
            );
            self.interval = SWEEP_INTERVAL;
        } else {
            self.interval = interval;
        }
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single sweep and purge spent tokens. Returns the number of
    /// accounts removed. Errors are logged, not returned; the next cycle
    /// tries again.
    pub async fn run_cycle(&self) -> u64 {
        let removed = match self.service.delete_pending_activations().await {
            Ok(removed) => {
                debug!(removed, "pending activation sweep finished");
                removed
            }
            Err(e) => {
                warn!(error = %e, "pending activation sweep failed");
                0
            }
        };

        match self.service.purge_spent_tokens().await {
            Ok(purged) => debug!(purged, "spent token purge finished"),
            Err(e) => warn!(error = %e, "spent token purge failed"),
        }

        removed
    }

    /// Spawn the sweep loop. It stops when `shutdown` flips to `true` or
    /// its sender is dropped.
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = self.interval.as_secs(), "pending activation sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_cycle().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("pending activation sweeper stopped");
        })
    }
}
