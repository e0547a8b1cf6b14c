//! meshctl-cli library root.
//!
//! Argument parsing, the defaults file and the command runner live here so
//! integration tests can drive them without spawning the binary.

pub mod cli;
pub mod config;
pub mod run;
