//! Shared foundation for TrainTrack services
//!
//! Provides the pieces every service crate builds on:
//! - Common error type and result alias (`error`)
//! - Domain events and the in-process event bus (`events`)
//! - TOML configuration loading with environment overrides (`config`)
//! - Timestamp formats used on disk and on the wire (`time`)
//! - SQLite pool setup and schema bootstrap (`db`)

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
