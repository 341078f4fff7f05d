//! `medlog` - Telemetry intake and reporting for medicine-reminder devices
//!
//! This library provides the dose event model, the bounded in-memory log
//! store with its compliance statistics, and the HTTP API that devices and
//! dashboards talk to.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod ingest;
pub mod logging;
pub mod query;
pub mod seed;
pub mod server;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use event::{DoseEvent, DoseStatus};
pub use ingest::{DoseReport, Ingestor};
pub use logging::init_logging;
pub use query::DateRange;
pub use store::{LogStore, StatsView};
