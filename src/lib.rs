//! vcache: a thread-safe in-process key-value cache
//!
//! [`Store`] owns the data behind sharded reader/writer locks, [`Client`]
//! is the facade callers use, and [`protocol`] drives both from console
//! command lines.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod store;

pub use client::Client;
pub use config::Config;
pub use error::{CommandError, ConfigError};
pub use store::{IndexSlot, SecondaryKeys, Store};
