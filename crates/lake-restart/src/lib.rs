//! lake-restart — restarts the indexer container.
//!
//! Runs `<command...> <container>` (default `docker restart <container>`)
//! with a hard timeout. Output from both streams is captured and attached to
//! the result either way, so a failed restart can be diagnosed from the log.
//! There is no retry here; the stall monitor decides when to try again.

pub mod error;
pub mod restarter;

pub use error::{RestartError, RestartResult};
pub use restarter::{ContainerRestarter, RestartReport, Restarter};
