//! Polling scheduler — drives the stall monitor on a fixed period.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

use lake_probe::MetricSource;
use lake_restart::Restarter;

use crate::cooldown::CooldownTimer;
use crate::monitor::{StallMonitor, TickOutcome};

/// Runs evaluations back to back on a fixed period and manages the
/// post-restart cooldown timer.
///
/// Evaluations never overlap: each one is awaited before the next tick is
/// taken, and ticks missed during a slow restart are delayed rather than
/// replayed in a burst.
pub struct Scheduler<F, R> {
    monitor: StallMonitor<F, R>,
    interval: Duration,
    restart_sleep: Duration,
    cooldown: CooldownTimer,
}

impl<F, R> Scheduler<F, R>
where
    F: MetricSource,
    R: Restarter,
{
    pub fn new(monitor: StallMonitor<F, R>, interval: Duration, restart_sleep: Duration) -> Self {
        let cooldown = CooldownTimer::new(monitor.cooldown_flag());
        Self {
            monitor,
            interval,
            restart_sleep,
            cooldown,
        }
    }

    pub fn monitor(&self) -> &StallMonitor<F, R> {
        &self.monitor
    }

    pub fn cooldown(&self) -> &CooldownTimer {
        &self.cooldown
    }

    /// Evaluate once and arm the cooldown after a successful restart.
    pub async fn tick(&mut self) -> TickOutcome {
        let outcome = self.monitor.evaluate().await;
        if let TickOutcome::Restarted { .. } = &outcome {
            info!(cooldown = ?self.restart_sleep, "entering restart cooldown");
            self.cooldown.arm(self.restart_sleep);
        }
        outcome
    }

    /// Run until `shutdown` fires. The first tick is immediate.
    ///
    /// Returns the monitor so the caller can inspect its final state.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> StallMonitor<F, R> {
        info!(
            interval = ?self.interval,
            stall_timeout = ?self.monitor.tracker().stall_timeout(),
            cooldown = ?self.restart_sleep,
            "stall monitor started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    info!("stall monitor shutting down");
                    break;
                }
            }
        }

        self.cooldown.cancel();
        let stats = self.monitor.stats();
        info!(
            ticks = stats.ticks,
            restarts = stats.restarts,
            restart_failures = stats.restart_failures,
            fetch_failures = stats.fetch_failures,
            "stall monitor stopped"
        );

        let Scheduler { monitor, .. } = self;
        monitor
    }
}
