//! CLI module for argument parsing and configuration resolution.

mod args;

pub use args::*;
