//! lake-core — shared types and configuration for lake-supervisor.
//!
//! The supervisor watches an indexer's block-height metric and restarts its
//! container when the height stops moving. This crate holds the pieces every
//! other crate agrees on: the immutable [`SupervisorConfig`] snapshot and the
//! [`MetricSample`] value produced by each fetch.

pub mod config;
pub mod duration;
pub mod types;

pub use config::{ConfigError, ConfigResult, RawConfig, SupervisorConfig};
pub use duration::{format_duration, parse_duration};
pub use types::*;
