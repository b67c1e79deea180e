// ABOUTME: Library root for tagflip - exposes the controller and backends for testing.
// ABOUTME: The main binary is in main.rs.

pub mod backend;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod trigger;
pub mod types;
