//! Ironmetric CLI library
//!
//! The `ironmetric` binary is a thin wrapper around these modules so that
//! command handlers can be exercised from integration tests.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
