//! Interactive terminal process monitor.
//!
//! Each refresh cycle enumerates the process registry, reads name and memory
//! from every process' status file, samples CPU and sorts the result into a
//! bounded [`process::Snapshot`] that the terminal front end renders.

pub mod app;
pub mod config;
pub mod process;
pub mod signals;
pub mod ui;
