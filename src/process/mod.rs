//! Spawning and stopping the supervised program.

mod child;

pub use child::*;
