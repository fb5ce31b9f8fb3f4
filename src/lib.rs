//! Black Magic Probe helper: probe discovery, GDB machine-interface
//! plumbing and the flash/erase/reset/debug action flows.

pub mod actions;
pub mod cli;
pub mod download;
pub mod gdb;
pub mod probe;
