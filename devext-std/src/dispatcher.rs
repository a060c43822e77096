//! Hook dispatch.
//!
//! The [`Dispatcher`] is constructed once at start-up and passed to the code
//! that fires hooks. It owns its [`ResolutionCache`]; there is no global state.

use crate::{
    cache::{Resolution, ResolutionCache},
    sink::{FailureSink, TracingSink},
};
use devext_core::{
    Binding, Candidate, DispatchError, InvokeError, Receiver, ReturnValue, TypeInfo,
    TypeRegistry, TypeToken,
};
use std::{
    any::{Any, TypeId, type_name},
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::debug;

/// What a pipeline does after a step fails.
///
/// Either way the subject from before the failing step is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelinePolicy {
    /// Continue with the next candidate.
    #[default]
    Continue,
    /// Skip the remaining candidates.
    Abort,
}

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Behavior after a failing pipeline step.
    pub pipeline_policy: PipelinePolicy,
    /// Convert candidate panics into [`InvokeError::Panicked`].
    pub catch_panics: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pipeline_policy: PipelinePolicy::Continue,
            catch_panics: true,
        }
    }
}

impl DispatcherConfig {
    /// Set the pipeline failure policy.
    pub fn with_pipeline_policy(mut self, policy: PipelinePolicy) -> Self {
        self.pipeline_policy = policy;
        self
    }

    /// Set whether candidate panics are caught.
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }
}

/// Counts from one fire-mode dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Candidates that were invoked.
    pub invoked: usize,
    /// Candidates among them that failed.
    pub failed: usize,
}

impl DispatchOutcome {
    /// Candidates that ran to completion.
    pub fn succeeded(&self) -> usize {
        self.invoked - self.failed
    }

    /// Whether no candidate failed.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

// ============================================================================
// DispatcherBuilder
// ============================================================================

/// Builder for a [`Dispatcher`].
///
/// # Example
/// ```ignore
/// let dispatcher = Dispatcher::builder(registry)
///     .pipeline_policy(PipelinePolicy::Abort)
///     .sink(|hook: &str, id: &CandidateId, err: &InvokeError| eprintln!("{hook}: {id}: {err}"))
///     .build();
/// ```
pub struct DispatcherBuilder {
    registry: Arc<TypeRegistry>,
    config: DispatcherConfig,
    sink: Arc<dyn FailureSink>,
}

impl DispatcherBuilder {
    /// Start from the default configuration and the [`TracingSink`].
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            config: DispatcherConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the pipeline failure policy.
    pub fn pipeline_policy(mut self, policy: PipelinePolicy) -> Self {
        self.config.pipeline_policy = policy;
        self
    }

    /// Set whether candidate panics are caught.
    pub fn catch_panics(mut self, catch_panics: bool) -> Self {
        self.config.catch_panics = catch_panics;
        self
    }

    /// Send invocation failures to `sink`.
    pub fn sink(mut self, sink: impl FailureSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Send invocation failures to an already shared sink.
    pub fn shared_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build the dispatcher with an empty cache.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            cache: ResolutionCache::new(self.registry),
            config: self.config,
            sink: self.sink,
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Invokes the extension methods registered for a hook.
///
/// Candidate failures are reported to the configured [`FailureSink`] and never
/// returned; the only error a caller sees is misuse such as an empty hook name.
pub struct Dispatcher {
    cache: ResolutionCache,
    config: DispatcherConfig,
    sink: Arc<dyn FailureSink>,
}

impl Dispatcher {
    /// Dispatcher with the default configuration, logging failures via `tracing`.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::builder(registry).build()
    }

    /// Start configuring a dispatcher.
    pub fn builder(registry: Arc<TypeRegistry>) -> DispatcherBuilder {
        DispatcherBuilder::new(registry)
    }

    /// The registry candidates are resolved from.
    pub fn registry(&self) -> &TypeRegistry {
        self.cache.registry()
    }

    /// The resolution cache.
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// The active configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Candidates of `T` for `hook`, through the cache.
    pub fn resolve<T: Any>(&self, hook: &str, binding: Binding) -> Resolution {
        self.cache.resolve_for::<T>(hook, binding)
    }

    /// Fire `hook` on `target`, ignoring return values.
    ///
    /// `None` is a no-op. Candidates run in resolution order and a failing
    /// candidate does not stop the ones after it. The hook name is checked
    /// before the target, so an empty name is an error even for `None`.
    pub fn invoke_instance<'t, T: Any>(
        &self,
        target: impl Into<Option<&'t mut T>>,
        hook: &str,
        args: &dyn Any,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.invoke_dyn(target.into().map(|t| t as &mut dyn Any), hook, args)
    }

    /// Fire `hook` on a type-erased target, resolved by its concrete type.
    ///
    /// Validation happens before the `None` check, as in
    /// [`invoke_instance`](Self::invoke_instance).
    pub fn invoke_dyn(
        &self,
        target: Option<&mut dyn Any>,
        hook: &str,
        args: &dyn Any,
    ) -> Result<DispatchOutcome, DispatchError> {
        validate(hook)?;
        let Some(target) = target else {
            debug!(hook, "no target, skipping dispatch");
            return Ok(DispatchOutcome::default());
        };

        let type_id = (*target).type_id();
        let candidates = self.cache.resolve(type_id, hook, Binding::Instance);
        let mut outcome = DispatchOutcome::default();
        for candidate in candidates.iter() {
            let result = self.call(candidate, Receiver::Instance(&mut *target), args);
            self.settle(hook, candidate, result, &mut outcome);
        }

        debug!(
            hook,
            ty = self.type_label(type_id),
            invoked = outcome.invoked,
            failed = outcome.failed,
            "dispatched instance hook"
        );
        Ok(outcome)
    }

    /// Fire `hook` on the static methods of `ty`.
    pub fn invoke_static(
        &self,
        ty: TypeToken,
        hook: &str,
        args: &dyn Any,
    ) -> Result<DispatchOutcome, DispatchError> {
        validate(hook)?;
        let candidates = self.cache.resolve(ty.id(), hook, Binding::Static);
        let mut outcome = DispatchOutcome::default();
        for candidate in candidates.iter() {
            let result = self.call(candidate, Receiver::Type, args);
            self.settle(hook, candidate, result, &mut outcome);
        }

        debug!(
            hook,
            ty = ty.name(),
            invoked = outcome.invoked,
            failed = outcome.failed,
            "dispatched static hook"
        );
        Ok(outcome)
    }

    /// Thread `target` through every candidate for `hook`.
    ///
    /// Each candidate receives the current subject and returns the next one;
    /// the last returned subject is the result. With no candidates `target`
    /// comes back unchanged. A step that fails, returns nothing, or returns a
    /// value of another type is reported, and the subject from before it is
    /// kept; [`PipelinePolicy`] decides whether later steps still run.
    pub fn invoke_pipeline<T: Any>(
        &self,
        target: T,
        hook: &str,
        args: &dyn Any,
    ) -> Result<T, DispatchError> {
        validate(hook)?;
        let candidates = self.cache.resolve(TypeId::of::<T>(), hook, Binding::Instance);
        let mut subject = target;
        let mut failed = 0;

        for candidate in candidates.iter() {
            let step = match self.call(candidate, Receiver::Instance(&mut subject), args) {
                Ok(Some(value)) => value.downcast::<T>().map_err(|value| InvokeError::ReturnMismatch {
                    expected: type_name::<T>(),
                    found: value.type_name(),
                }),
                Ok(None) => Err(InvokeError::ReturnMismatch {
                    expected: type_name::<T>(),
                    found: "()",
                }),
                Err(err) => Err(err),
            };

            match step {
                Ok(next) => subject = next,
                Err(err) => {
                    failed += 1;
                    self.sink.report(hook, candidate.id(), &err);
                    if self.config.pipeline_policy == PipelinePolicy::Abort {
                        break;
                    }
                }
            }
        }

        debug!(
            hook,
            ty = type_name::<T>(),
            candidates = candidates.len(),
            failed,
            "dispatched pipeline hook"
        );
        Ok(subject)
    }

    fn call(
        &self,
        candidate: &Candidate,
        receiver: Receiver<'_>,
        args: &dyn Any,
    ) -> Result<Option<ReturnValue>, InvokeError> {
        if !self.config.catch_panics {
            return candidate.invoke(receiver, args);
        }
        panic::catch_unwind(AssertUnwindSafe(|| candidate.invoke(receiver, args)))
            .unwrap_or_else(|payload| Err(InvokeError::Panicked(panic_message(payload.as_ref()))))
    }

    fn settle(
        &self,
        hook: &str,
        candidate: &Candidate,
        result: Result<Option<ReturnValue>, InvokeError>,
        outcome: &mut DispatchOutcome,
    ) {
        outcome.invoked += 1;
        if let Err(err) = result {
            outcome.failed += 1;
            self.sink.report(hook, candidate.id(), &err);
        }
    }

    fn type_label(&self, type_id: TypeId) -> &'static str {
        self.registry()
            .get(type_id)
            .map_or("<unregistered>", TypeInfo::name)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn validate(hook: &str) -> Result<(), DispatchError> {
    if hook.is_empty() {
        return Err(DispatchError::EmptyHookName);
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
