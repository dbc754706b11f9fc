//! Orchestration core: routing and the run loop
//!
//! A run starts at the entry worker and alternates between asking the router
//! for the next worker and executing that worker's turn, until the router
//! terminates, the iteration bound is hit, or the run is cancelled.

mod executor;
mod router;
mod traits;
mod turn;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use executor::{NetworkRunner, RunError, RunStatus};
pub use traits::{LlmClient, RegistryLlmClient};
pub use turn::{History, RequestError, RequestMessage, RunRequest, Turn, TurnOutcome};
