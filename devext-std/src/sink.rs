//! Failure sinks.
//!
//! A dispatcher never lets a failing extension method escape to its caller.
//! Every failure is handed to a [`FailureSink`] once instead.

use devext_core::{CandidateId, InvokeError};
use tracing::warn;

/// Receives one report per failing candidate.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot receive invocation failures",
    label = "missing `FailureSink` implementation",
    note = "Closures of shape `Fn(&str, &CandidateId, &InvokeError)` implement `FailureSink`."
)]
pub trait FailureSink: Send + Sync {
    /// Called when `candidate`, dispatched for `hook`, failed with `error`.
    fn report(&self, hook: &str, candidate: &CandidateId, error: &InvokeError);
}

impl<F> FailureSink for F
where
    F: Fn(&str, &CandidateId, &InvokeError) + Send + Sync,
{
    fn report(&self, hook: &str, candidate: &CandidateId, error: &InvokeError) {
        self(hook, candidate, error);
    }
}

/// Logs failures through `tracing` at `WARN`.
///
/// This is the sink a dispatcher uses unless another one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn report(&self, hook: &str, candidate: &CandidateId, error: &InvokeError) {
        warn!(hook, candidate = %candidate, error = %error, "extension method failed");
    }
}

/// Discards failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl FailureSink for SilentSink {
    fn report(&self, _hook: &str, _candidate: &CandidateId, _error: &InvokeError) {}
}
