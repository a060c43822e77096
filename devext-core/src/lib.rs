//! # devext-core
//!
//! Core types for devext extension-method dispatch.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! add-on modules that only declare extension methods and never dispatch.
//!
//! # Building Blocks
//!
//! ## Markers ([`HookMarker`])
//!
//! A hook name attached to a method. It ties the method to every dispatch of
//! that hook. A method carries at most one marker.
//!
//! ## Methods ([`ErasedMethod`], [`Candidate`])
//!
//! Extension methods are declared with concrete signatures and stored
//! type-erased. Argument, subject and return types are re-checked when the
//! method is invoked, so a mismatch becomes an [`InvokeError`].
//!
//! ## Registry ([`TypeRegistry`])
//!
//! Method tables for every registered type, including which parent a type
//! inherits methods from. [`TypeRegistry::scan`] answers which methods of a
//! type extend a given hook.
//!
//! # Error Types
//!
//! - [`DevextError`] - Top-level error type
//! - [`DispatchError`] - Caller misuse at a dispatch entry point
//! - [`InvokeError`] - A candidate failed
//! - [`RegistryError`] - Invalid declarations

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod marker;
mod method;
mod registry;
mod response;

// Re-exports
pub use error::{BoxError, DevextError, DispatchError, InvokeError, RegistryError};
pub use marker::HookMarker;
pub use method::{
    Binding, Candidate, CandidateId, ErasedMethod, MethodDecl, Receiver, ReturnValue, Upcast,
};
pub use registry::{Extensible, TypeBuilder, TypeInfo, TypeRegistry, TypeRegistryBuilder, TypeToken};
pub use response::IntoOutcome;
