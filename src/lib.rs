//! Sett - vault / controller / strategy capital allocation
//!
//! A vault issues shares against idle plus deployed want, a controller
//! authorizes and routes funds, and a strategy holds a liquidity position
//! behind a [`adapter::PositionAdapter`] with slippage-bounded exits.
//! [`protocol::Protocol`] wires the three together and commits each
//! operation all-or-nothing.

pub mod access;
pub mod adapter;
pub mod config;
pub mod controller;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod math;
pub mod protocol;
pub mod strategy;
pub mod tokens;
pub mod types;
pub mod vault;

pub use config::Config;
pub use error::{ProtocolError, Result};
pub use protocol::Protocol;
