//! hotwire - restart a program whenever a file it loaded changes.
//!
//! The supervised program reports the files it loads over a socket (see
//! [`ipc::Reporter`]); the supervisor watches them and restarts the program
//! after a debounced change.

pub mod cli;
pub mod config;
pub mod display;
pub mod ipc;
pub mod process;
pub mod supervisor;
pub mod watcher;
