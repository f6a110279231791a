//! `birdlog` - A personal birdwatching log
//!
//! This library stores birds, locations, trips and sightings in `SQLite` and
//! builds the reports a birder keeps: the life list, year and month lists,
//! and per-location species lists that roll up every nested location.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod paginate;
pub mod reports;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use storage::{Storage, StorageStats};
pub use store::RecordStore;
