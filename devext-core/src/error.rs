//! Error types for devext.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`DevextError`] - Top-level error type for all devext operations
//! - [`DispatchError`] - Caller misuse at a dispatch entry point
//! - [`InvokeError`] - A single candidate failed to run
//! - [`RegistryError`] - Errors while declaring types and methods

use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all devext operations.
#[derive(Error, Debug)]
pub enum DevextError {
    /// A dispatch entry point was misused.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// A candidate failed while being invoked.
    #[error("invoke error: {0}")]
    Invoke(#[from] InvokeError),

    /// A type or method declaration was rejected.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors surfaced to the caller of a dispatch entry point.
///
/// Candidate failures never show up here; they go to the failure sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The hook name was empty.
    #[error("hook name must not be empty")]
    EmptyHookName,
}

/// Errors produced by invoking a single candidate.
#[derive(Error, Debug)]
pub enum InvokeError {
    /// The call-time arguments were not of the type the candidate expects.
    #[error("argument mismatch: expected `{expected}`")]
    ArgumentMismatch {
        /// Type name the candidate accepts.
        expected: &'static str,
    },

    /// The subject could not be viewed as the candidate's declaring type.
    #[error("subject mismatch: expected `{expected}`")]
    SubjectMismatch {
        /// Type name the candidate is declared on.
        expected: &'static str,
    },

    /// An instance method was invoked without an instance.
    #[error("instance method invoked without a receiver")]
    MissingReceiver,

    /// A pipeline step did not return a value of the subject's type.
    #[error("pipeline step returned `{found}`, expected `{expected}`")]
    ReturnMismatch {
        /// Subject type of the pipeline.
        expected: &'static str,
        /// What the candidate produced instead.
        found: &'static str,
    },

    /// The candidate panicked.
    #[error("candidate panicked: {0}")]
    Panicked(String),

    /// The candidate returned an error.
    #[error(transparent)]
    Failed(BoxError),
}

impl From<BoxError> for InvokeError {
    fn from(err: BoxError) -> Self {
        InvokeError::Failed(err)
    }
}

/// Errors that can occur while building a type registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The type was already registered.
    #[error("type already registered: {0}")]
    DuplicateType(&'static str),

    /// A method with this name was already declared on the type.
    #[error("method `{method}` declared twice on `{ty}`")]
    DuplicateMethod {
        /// Declaring type.
        ty: &'static str,
        /// Method name.
        method: String,
    },

    /// A method was declared without a name.
    #[error("method declared on `{0}` without a name")]
    EmptyMethodName(&'static str),

    /// The type declared a second parent.
    #[error("`{0}` declares more than one parent")]
    MultipleParents(&'static str),

    /// Following parents from this type leads back to it.
    #[error("inheritance cycle through `{0}`")]
    InheritanceCycle(&'static str),
}
