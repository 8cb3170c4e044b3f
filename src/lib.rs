//! Per-user point balances with serialized credits and debits
//!
//! Mutations for one user are applied one at a time, in submission order, by running them on a
//! [`sequential::KeySequentialExecutor`] keyed by the user id. Mutations for different users do
//! not wait on each other.
//!
//! - [`domain`] - balances, transaction records and amounts
//! - [`ports`] - storage collaborators the service depends on
//! - [`adapters`] - concrete implementations of the ports
//! - [`commands`] - the [`commands::PointService`] and its operations
//! - [`config`] - service configuration

pub mod adapters;
pub mod commands;
pub mod config;
pub mod domain;
pub mod ports;
pub mod sequential;

pub use commands::{Error, ErrorKind, PointService};
pub use config::PointConfig;
