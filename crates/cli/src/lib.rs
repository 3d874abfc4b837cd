//! nimbus CLI library
//!
//! Exposes the command tree and output helpers to integration tests.

pub mod commands;
pub mod exit_code;
pub mod output;
