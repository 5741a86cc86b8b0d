//! Supervisor module for restart coordination and lifecycle state.

mod generation;
mod runner;
mod scheduler;
mod shutdown;
mod state;

pub use generation::*;
pub use runner::*;
pub use scheduler::*;
pub use shutdown::*;
pub use state::*;
