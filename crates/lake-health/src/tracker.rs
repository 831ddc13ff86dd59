//! Stall-detection state machine.
//!
//! Pure bookkeeping: the caller supplies each observation and the current
//! instant, the tracker answers with a [`Verdict`]. No I/O happens here.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Where the indexer stands from the supervisor's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallState {
    /// No height observed yet.
    Unknown,
    /// Last observation moved the height.
    Progressing,
    /// Height unchanged since the last progress.
    Stalled,
    /// A restart succeeded; evaluation is suspended.
    CoolingDown,
}

/// One tick's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The fetch produced a height.
    Height(u64),
    /// The fetch failed.
    Unavailable,
}

/// What the tracker concluded from an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Height increased, or was seen for the first time.
    Progressed { height: u64, previous: Option<u64> },
    /// Height went backwards. Absorbed as progress.
    Regressed { from: u64, to: u64 },
    /// Height unchanged.
    Stalled {
        height: u64,
        stalled_for: Duration,
        restart: bool,
    },
    /// No height available this tick.
    FetchFailed { stalled_for: Duration, restart: bool },
}

impl Verdict {
    /// Whether the stall timeout was exceeded.
    pub fn wants_restart(&self) -> bool {
        matches!(
            self,
            Verdict::Stalled { restart: true, .. } | Verdict::FetchFailed { restart: true, .. }
        )
    }
}

/// Tracks the last known height and when it last moved.
#[derive(Debug, Clone)]
pub struct StallTracker {
    state: StallState,
    last_height: Option<u64>,
    last_progress: Instant,
    stall_timeout: Duration,
}

impl StallTracker {
    /// Start a tracker whose stall clock begins at `now`.
    pub fn new(stall_timeout: Duration, now: Instant) -> Self {
        Self {
            state: StallState::Unknown,
            last_height: None,
            last_progress: now,
            stall_timeout,
        }
    }

    /// Record an observation and classify it.
    pub fn observe(&mut self, observation: Observation, now: Instant) -> Verdict {
        let height = match observation {
            Observation::Height(height) => height,
            Observation::Unavailable => {
                let stalled_for = self.stalled_for(now);
                return Verdict::FetchFailed {
                    stalled_for,
                    restart: stalled_for > self.stall_timeout,
                };
            }
        };

        match self.last_height {
            Some(last) if height == last => {
                self.state = StallState::Stalled;
                let stalled_for = self.stalled_for(now);
                debug!(height, ?stalled_for, "block height unchanged");
                Verdict::Stalled {
                    height,
                    stalled_for,
                    restart: stalled_for > self.stall_timeout,
                }
            }
            Some(last) if height < last => {
                warn!(from = last, to = height, "block height decreased");
                self.progress(height, now);
                Verdict::Regressed {
                    from: last,
                    to: height,
                }
            }
            previous => {
                self.progress(height, now);
                Verdict::Progressed { height, previous }
            }
        }
    }

    /// A restart went through: reset the stall clock and suspend evaluation.
    pub fn restart_succeeded(&mut self, now: Instant) {
        self.last_progress = now;
        self.state = StallState::CoolingDown;
    }

    /// Cooldown expired; the next observation decides the real state.
    pub fn cooldown_elapsed(&mut self) {
        if self.state == StallState::CoolingDown {
            self.state = if self.last_height.is_some() {
                StallState::Stalled
            } else {
                StallState::Unknown
            };
        }
    }

    fn progress(&mut self, height: u64, now: Instant) {
        self.last_height = Some(height);
        self.last_progress = now;
        self.state = StallState::Progressing;
    }

    pub fn state(&self) -> StallState {
        self.state
    }

    pub fn last_height(&self) -> Option<u64> {
        self.last_height
    }

    pub fn last_progress(&self) -> Instant {
        self.last_progress
    }

    pub fn stall_timeout(&self) -> Duration {
        self.stall_timeout
    }

    /// Time since the height last moved (or since the last restart).
    pub fn stalled_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_progress)
    }
}
