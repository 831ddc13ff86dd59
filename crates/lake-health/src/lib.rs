//! lake-health — stall detection and self-healing for the indexer.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (fixed interval, one evaluation at a time)
//!   ├── StallMonitor::evaluate()
//!   │   ├── CooldownFlag set? → skip tick
//!   │   ├── MetricSource::fetch() → height | error
//!   │   ├── StallTracker::observe() → Verdict
//!   │   └── Verdict wants restart → Restarter::restart()
//!   └── CooldownTimer (armed after a successful restart)
//! ```
//!
//! # Stall clock
//!
//! The clock starts when the monitor is created and resets whenever the
//! height moves (up, or anomalously down) and whenever a restart succeeds.
//! A flat height and a failing fetch both count against it. A failed restart
//! does not reset it, so the restart is retried on the next tick.

pub mod cooldown;
pub mod monitor;
pub mod scheduler;
pub mod tracker;

pub use cooldown::{CooldownFlag, CooldownTimer};
pub use monitor::{MonitorStats, StallMonitor, TickOutcome};
pub use scheduler::Scheduler;
pub use tracker::{Observation, StallState, StallTracker, Verdict};
