//! Task-orchestration engine.
//!
//! - `collection` - ordered, fail-fast task collections and their entries
//! - `parallel` - concurrently launched, jointly awaited action groups
//! - `executor` - the seam between the engine and effectful actions
//! - `result` - step outcomes and result trees
//!
//! The engine knows nothing about workflows; it runs whatever tree it is given.

pub mod collection;
pub mod executor;
pub mod parallel;
pub mod result;

pub use collection::{Entry, TaskCollection};
pub use executor::{ActionExecutor, LocalExecutor};
pub use parallel::ParallelGroup;
pub use result::{FailureKind, Outcome, StepResult, StepSummary};
