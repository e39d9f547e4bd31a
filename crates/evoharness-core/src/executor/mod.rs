//! CandidateExecutor: runs one candidate against one input under strict bounds.
//!
//! # Modules
//!
//! - [`discovery`]: `TargetFunction` naming rule and `discover()`
//! - [`limits`]   : `ExecutionLimits` (wall clock, operations, sizes)
//! - [`engine`]   : `CandidateExecutor`, `LoadedCandidate`

pub mod discovery;
pub mod engine;
pub mod limits;

pub use discovery::{discover, TargetFunction};
pub use engine::{CandidateExecutor, LoadedCandidate};
pub use limits::ExecutionLimits;

pub(crate) use engine::run_blocking;
