//! Testing utilities for devext.
//!
//! This module provides utilities to make testing extension methods easier.
//!
//! # Features
//!
//! - [`CollectingSink`]: A failure sink that keeps every report
//! - [`CallLog`]: A shared log extension methods can write to

use crate::sink::FailureSink;
use devext_core::{CandidateId, InvokeError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================================================
// Collecting Sink
// ============================================================================

/// One failure as seen by a [`CollectingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFailure {
    /// The hook being dispatched.
    pub hook: String,
    /// The failing candidate.
    pub candidate: CandidateId,
    /// The error, rendered with `Display`.
    pub message: String,
}

/// A failure sink that records everything it receives.
///
/// Clones share the same record.
///
/// # Example
///
/// ```rust,ignore
/// let sink = CollectingSink::new();
/// let dispatcher = Dispatcher::builder(registry).sink(sink.clone()).build();
///
/// dispatcher.invoke_instance(&mut player, "OnSpawn", &())?;
///
/// assert!(sink.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    failures: Arc<Mutex<Vec<RecordedFailure>>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the recorded failures.
    pub fn failures(&self) -> Vec<RecordedFailure> {
        self.lock().clone()
    }

    /// Get the number of recorded failures.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear all recorded failures.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedFailure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FailureSink for CollectingSink {
    fn report(&self, hook: &str, candidate: &CandidateId, error: &InvokeError) {
        self.lock().push(RecordedFailure {
            hook: hook.to_string(),
            candidate: candidate.clone(),
            message: error.to_string(),
        });
    }
}

// ============================================================================
// Call Log
// ============================================================================

/// An ordered log of calls, shared between clones.
///
/// Capture a clone in each extension method under test and assert on the
/// order afterwards.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, call: impl Into<String>) {
        self.lock().push(call.into());
    }

    /// Get a clone of the entries.
    pub fn calls(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Get the number of entries.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// How often `call` was recorded.
    pub fn count_of(&self, call: &str) -> usize {
        self.lock().iter().filter(|c| *c == call).count()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
