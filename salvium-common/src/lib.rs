//! Shared types for the Salvium light-wallet workspace.
//!
//! This crate holds the pieces every other crate agrees on: the flat wallet
//! error taxonomy, the network enum, and the protocol constants that are not
//! specific to any single subsystem.

pub mod consts;
pub mod error;
pub mod network;

pub use error::{WalletError, WalletResult};
pub use network::Network;
