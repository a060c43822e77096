//! # devext-std
//!
//! Resolution cache and dispatcher for devext extension methods.
//!
//! This crate provides:
//! - **Resolution cache**: [`ResolutionCache`], memoizing registry scans per
//!   `(type, hook, binding)`
//! - **Dispatch**: [`Dispatcher`] with fire, static and pipeline entry points
//! - **Failure sinks**: [`TracingSink`], [`SilentSink`], or any closure
//! - **Testing helpers**: [`testing`]
//! - **Distributed registration**: `collected` (feature `inventory`)

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use devext_core;

// Modules
pub mod cache;
#[cfg(feature = "inventory")]
pub mod collected;
pub mod dispatcher;
pub mod sink;
pub mod testing;

pub use cache::{Resolution, ResolutionCache, ResolutionKey};
pub use dispatcher::{
    DispatchOutcome, Dispatcher, DispatcherBuilder, DispatcherConfig, PipelinePolicy,
};
pub use sink::{FailureSink, SilentSink, TracingSink};

#[cfg(feature = "inventory")]
pub use inventory;
