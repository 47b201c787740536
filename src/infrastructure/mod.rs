//! Infrastructure layer: durable state and filesystem plumbing

/// Clock abstraction for time-dependent behavior
pub mod clock;
/// Atomic file persistence helpers
pub mod fsio;
/// Data-directory resolution
pub mod paths;
/// Process-global snapshot of indexed codebases
pub mod snapshot;
/// Per-codebase manifest synchronization
pub mod sync;
