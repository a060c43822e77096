//! # devext - Extension-Method Dispatch
//!
//! `devext` lets independently written modules attach "extension methods" to a
//! type under a hook name, and lets the host fire every method for that hook at
//! a chosen point without knowing which methods exist.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use devext::prelude::*;
//! use std::sync::Arc;
//!
//! struct Player { hp: u32 }
//!
//! let mut types = TypeRegistry::builder();
//! types.declare::<Player>(|ty| {
//!     ty.method("heal", "OnSpawn", |p: &mut Player, amount: &u32| p.hp += amount);
//! })?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(types.build()?));
//! dispatcher.invoke_instance(&mut player, "OnSpawn", &10u32)?;
//! ```
//!
//! ## Dispatch Modes
//!
//! - **Fire** ([`Dispatcher::invoke_instance`], [`Dispatcher::invoke_static`]):
//!   every candidate runs, return values are ignored
//! - **Pipeline** ([`Dispatcher::invoke_pipeline`]): each candidate's result
//!   becomes the next candidate's subject
//!
//! Resolutions are cached per dispatcher. A failing candidate is reported to
//! the dispatcher's [`FailureSink`] and never stops the others.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use devext_core::{
    // Methods
    Binding,
    // Errors
    BoxError,
    Candidate,
    CandidateId,
    DevextError,
    DispatchError,
    ErasedMethod,
    // Registry
    Extensible,
    // Markers
    HookMarker,
    IntoOutcome,
    InvokeError,
    MethodDecl,
    Receiver,
    RegistryError,
    ReturnValue,
    TypeBuilder,
    TypeInfo,
    TypeRegistry,
    TypeRegistryBuilder,
    TypeToken,
    Upcast,
};

// Dispatch
pub use devext_std::{
    DispatchOutcome, Dispatcher, DispatcherBuilder, DispatcherConfig, FailureSink,
    PipelinePolicy, Resolution, ResolutionCache, ResolutionKey, SilentSink, TracingSink,
};

/// Failure sink implementations.
pub mod sinks {
    pub use devext_std::sink::{FailureSink, SilentSink, TracingSink};
}

/// Testing utilities.
pub mod testing {
    pub use devext_std::testing::{CallLog, CollectingSink, RecordedFailure};
}

#[cfg(feature = "inventory")]
pub use devext_std::collected::{TypeRegistration, collect_registry, collect_types};

/// Prelude module - common imports for devext.
///
/// # Usage
///
/// ```rust,ignore
/// use devext::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Errors
        BoxError,
        DispatchError,
        // Dispatch
        Dispatcher,
        // Registry
        Extensible,
        FailureSink,
        InvokeError,
        PipelinePolicy,
        RegistryError,
        TypeBuilder,
        TypeRegistry,
        TypeToken,
    };
}

#[cfg(feature = "macros")]
pub use devext_macros::extensions;

#[cfg(feature = "inventory")]
pub use inventory;
