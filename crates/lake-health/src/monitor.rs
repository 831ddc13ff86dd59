//! Stall monitor — one evaluation per tick.
//!
//! The monitor owns the tracker, the fetcher and the restarter. It never
//! spawns work itself; the [`Scheduler`](crate::Scheduler) drives it and
//! owns the cooldown timer.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use lake_probe::MetricSource;
use lake_restart::{RestartError, RestartReport, Restarter};

use crate::cooldown::CooldownFlag;
use crate::tracker::{Observation, StallState, StallTracker, Verdict};

/// Result of one evaluation.
#[derive(Debug)]
pub enum TickOutcome {
    /// Cooldown active; nothing fetched.
    Skipped,
    /// Fetched and classified; no restart needed.
    Observed(Verdict),
    /// Restart triggered and succeeded.
    Restarted {
        verdict: Verdict,
        report: RestartReport,
    },
    /// Restart triggered but failed; retried on a later tick.
    RestartFailed {
        verdict: Verdict,
        error: RestartError,
    },
}

/// Counters kept across the monitor's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub ticks: u64,
    pub skipped: u64,
    pub fetch_failures: u64,
    pub restarts: u64,
    pub restart_failures: u64,
}

/// Watches the block height and restarts the container when it stalls.
pub struct StallMonitor<F, R> {
    fetcher: F,
    restarter: R,
    tracker: StallTracker,
    cooldown: CooldownFlag,
    stats: MonitorStats,
}

impl<F, R> StallMonitor<F, R>
where
    F: MetricSource,
    R: Restarter,
{
    /// Create a monitor; the stall clock starts now.
    pub fn new(fetcher: F, restarter: R, stall_timeout: Duration) -> Self {
        Self {
            fetcher,
            restarter,
            tracker: StallTracker::new(stall_timeout, Instant::now()),
            cooldown: CooldownFlag::new(),
            stats: MonitorStats::default(),
        }
    }

    /// The flag a cooldown timer must clear to resume evaluation.
    pub fn cooldown_flag(&self) -> CooldownFlag {
        self.cooldown.clone()
    }

    pub fn state(&self) -> StallState {
        self.tracker.state()
    }

    pub fn last_height(&self) -> Option<u64> {
        self.tracker.last_height()
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    pub fn tracker(&self) -> &StallTracker {
        &self.tracker
    }

    pub fn restarter(&self) -> &R {
        &self.restarter
    }

    /// Run one evaluation.
    pub async fn evaluate(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        // Read once; authoritative for the whole tick.
        if self.cooldown.is_active() {
            self.stats.skipped += 1;
            debug!("still in restart cooldown period, skipping query");
            return TickOutcome::Skipped;
        }
        self.tracker.cooldown_elapsed();

        let observation = match self.fetcher.fetch().await {
            Ok(sample) => {
                info!(
                    height = sample.height,
                    last = ?self.tracker.last_height(),
                    source = %sample.source,
                    "current block height"
                );
                Observation::Height(sample.height)
            }
            Err(e) => {
                self.stats.fetch_failures += 1;
                warn!(error = %e, "error querying block height");
                Observation::Unavailable
            }
        };

        let verdict = self.tracker.observe(observation, Instant::now());
        let timeout = self.tracker.stall_timeout();
        match verdict {
            Verdict::Progressed { height, previous: None } => {
                info!(height, "initial block height");
            }
            Verdict::Progressed { height, .. } => {
                debug!(height, "block height progressing");
            }
            Verdict::Regressed { .. } => {}
            Verdict::Stalled {
                height,
                stalled_for,
                restart,
            } => {
                if restart {
                    warn!(height, ?stalled_for, threshold = ?timeout, "block height stalled past threshold, restarting container");
                } else {
                    info!(height, ?stalled_for, "block height stalled");
                }
            }
            Verdict::FetchFailed {
                stalled_for,
                restart,
            } => {
                if restart {
                    warn!(?stalled_for, threshold = ?timeout, "block height query failing past threshold, restarting container");
                }
            }
        }

        if !verdict.wants_restart() {
            return TickOutcome::Observed(verdict);
        }

        match self.restarter.restart().await {
            Ok(report) => {
                self.tracker.restart_succeeded(Instant::now());
                self.cooldown.engage();
                self.stats.restarts += 1;
                info!(
                    container = %report.container,
                    elapsed = ?report.elapsed,
                    output = %report.output,
                    "container restarted"
                );
                TickOutcome::Restarted { verdict, report }
            }
            Err(error) => {
                self.stats.restart_failures += 1;
                error!(container = %self.restarter.target(), error = %error, "error restarting container");
                TickOutcome::RestartFailed { verdict, error }
            }
        }
    }
}
