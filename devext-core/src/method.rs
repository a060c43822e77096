//! Type-erased extension methods.
//!
//! Extension methods are declared with concrete signatures and stored behind
//! [`ErasedMethod`] so a registry can hold methods of many types side by side.
//! Argument and subject types are checked again at call time; a mismatch is an
//! [`InvokeError`], never a panic.

use crate::{
    error::{BoxError, InvokeError},
    marker::HookMarker,
    response::IntoOutcome,
};
use std::{
    any::{Any, type_name},
    borrow::Cow,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

/// Which method set a declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    /// Methods invoked against an instance.
    Instance,
    /// Methods invoked against the type alone.
    Static,
}

/// What a candidate is invoked against.
pub enum Receiver<'a> {
    /// A live instance.
    Instance(&'a mut dyn Any),
    /// No instance; static dispatch.
    Type,
}

impl fmt::Debug for Receiver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Receiver::Instance(_) => f.write_str("Instance(..)"),
            Receiver::Type => f.write_str("Type"),
        }
    }
}

/// A value returned by a pipeline step, still type-erased.
pub struct ReturnValue {
    value: Box<dyn Any>,
    type_name: &'static str,
}

impl ReturnValue {
    /// Wrap a concrete value.
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the wrapped value's type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Recover the concrete value, or give it back on a type mismatch.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let type_name = self.type_name;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self { value, type_name }),
        }
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Object-safe form of an extension method.
pub trait ErasedMethod: Send + Sync + 'static {
    /// Invoke the method. `Ok(None)` means the method returns no subject.
    fn call(
        &self,
        receiver: Receiver<'_>,
        args: &dyn Any,
    ) -> Result<Option<ReturnValue>, InvokeError>;
}

fn subject<'a, T: Any>(receiver: Receiver<'a>) -> Result<&'a mut T, InvokeError> {
    match receiver {
        Receiver::Instance(this) => this.downcast_mut::<T>().ok_or(InvokeError::SubjectMismatch {
            expected: type_name::<T>(),
        }),
        Receiver::Type => Err(InvokeError::MissingReceiver),
    }
}

fn arguments<A: Any>(args: &dyn Any) -> Result<&A, InvokeError> {
    args.downcast_ref::<A>().ok_or(InvokeError::ArgumentMismatch {
        expected: type_name::<A>(),
    })
}

/// An instance method: `fn(&mut T, &A) -> R`.
pub(crate) struct InstanceFn<T, A, R, F> {
    f: F,
    _marker: PhantomData<fn(&mut T, &A) -> R>,
}

impl<T, A, R, F> InstanceFn<T, A, R, F>
where
    F: Fn(&mut T, &A) -> R,
{
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<T, A, R, F> ErasedMethod for InstanceFn<T, A, R, F>
where
    T: Any,
    A: Any,
    R: IntoOutcome + 'static,
    F: Fn(&mut T, &A) -> R + Send + Sync + 'static,
{
    fn call(
        &self,
        receiver: Receiver<'_>,
        args: &dyn Any,
    ) -> Result<Option<ReturnValue>, InvokeError> {
        let this = subject::<T>(receiver)?;
        let args = arguments::<A>(args)?;
        (self.f)(this, args).into_outcome()?;
        Ok(None)
    }
}

/// A static method: `fn(&A) -> R`. Any receiver is ignored.
pub(crate) struct StaticFn<A, R, F> {
    f: F,
    _marker: PhantomData<fn(&A) -> R>,
}

impl<A, R, F> StaticFn<A, R, F>
where
    F: Fn(&A) -> R,
{
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<A, R, F> ErasedMethod for StaticFn<A, R, F>
where
    A: Any,
    R: IntoOutcome + 'static,
    F: Fn(&A) -> R + Send + Sync + 'static,
{
    fn call(
        &self,
        _receiver: Receiver<'_>,
        args: &dyn Any,
    ) -> Result<Option<ReturnValue>, InvokeError> {
        let args = arguments::<A>(args)?;
        (self.f)(args).into_outcome()?;
        Ok(None)
    }
}

/// A method producing the next subject: `fn(&mut T, &A) -> Result<T, E>`.
pub(crate) struct TransformFn<T, A, E, F> {
    f: F,
    _marker: PhantomData<fn(&mut T, &A) -> Result<T, E>>,
}

impl<T, A, E, F> TransformFn<T, A, E, F>
where
    F: Fn(&mut T, &A) -> Result<T, E>,
{
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<T, A, E, F> ErasedMethod for TransformFn<T, A, E, F>
where
    T: Any,
    A: Any,
    E: Into<BoxError> + 'static,
    F: Fn(&mut T, &A) -> Result<T, E> + Send + Sync + 'static,
{
    fn call(
        &self,
        receiver: Receiver<'_>,
        args: &dyn Any,
    ) -> Result<Option<ReturnValue>, InvokeError> {
        let this = subject::<T>(receiver)?;
        let args = arguments::<A>(args)?;
        match (self.f)(this, args) {
            Ok(next) => Ok(Some(ReturnValue::new(next))),
            Err(e) => Err(InvokeError::Failed(e.into())),
        }
    }
}

/// Views a subtype instance as one of its parents.
pub trait Upcast: Send + Sync + 'static {
    /// Project `this` onto the parent, or `None` if `this` is not the subtype.
    fn upcast<'a>(&self, this: &'a mut dyn Any) -> Option<&'a mut dyn Any>;

    /// Name of the subtype this projection starts from.
    fn source(&self) -> &'static str;
}

/// Field projection from `T` to its parent `P`.
pub(crate) struct Projection<T, P> {
    project: fn(&mut T) -> &mut P,
}

impl<T, P> Projection<T, P> {
    pub(crate) fn new(project: fn(&mut T) -> &mut P) -> Self {
        Self { project }
    }
}

impl<T: Any, P: Any> Upcast for Projection<T, P> {
    fn upcast<'a>(&self, this: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let this = this.downcast_mut::<T>()?;
        Some((self.project)(this))
    }

    fn source(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Identity of a candidate: where it is declared and under which name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateId {
    declaring_type: &'static str,
    method: Cow<'static, str>,
}

impl CandidateId {
    /// Create an identity.
    pub fn new(declaring_type: &'static str, method: impl Into<Cow<'static, str>>) -> Self {
        Self {
            declaring_type,
            method: method.into(),
        }
    }

    /// Type the method implementation was declared on.
    pub fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    /// The method's name.
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.method)
    }
}

/// A method declared on a type, as stored in the registry.
#[derive(Clone)]
pub struct MethodDecl {
    pub(crate) name: Cow<'static, str>,
    pub(crate) marker: Option<HookMarker>,
    pub(crate) binding: Binding,
    pub(crate) method: Arc<dyn ErasedMethod>,
}

impl MethodDecl {
    /// The method's name; overrides share the name of what they override.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The marker declared on this method itself, if any.
    pub fn marker(&self) -> Option<&HookMarker> {
        self.marker.as_ref()
    }

    /// Instance or static.
    pub fn binding(&self) -> Binding {
        self.binding
    }
}

impl fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecl")
            .field("name", &self.name)
            .field("marker", &self.marker)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

/// A method selected for a hook on some type.
///
/// Inherited candidates carry the chain of projections from the type they were
/// resolved for up to the ancestor that declares them.
#[derive(Clone)]
pub struct Candidate {
    id: CandidateId,
    method: Arc<dyn ErasedMethod>,
    path: Arc<[Arc<dyn Upcast>]>,
}

impl Candidate {
    pub(crate) fn new(
        id: CandidateId,
        method: Arc<dyn ErasedMethod>,
        path: Arc<[Arc<dyn Upcast>]>,
    ) -> Self {
        Self { id, method, path }
    }

    /// Identity used when reporting failures.
    pub fn id(&self) -> &CandidateId {
        &self.id
    }

    /// Whether the implementation lives on an ancestor of the resolved type.
    pub fn is_inherited(&self) -> bool {
        !self.path.is_empty()
    }

    /// Invoke against `receiver` with `args`.
    pub fn invoke(
        &self,
        receiver: Receiver<'_>,
        args: &dyn Any,
    ) -> Result<Option<ReturnValue>, InvokeError> {
        let receiver = match receiver {
            Receiver::Instance(this) => Receiver::Instance(self.project(this)?),
            Receiver::Type => Receiver::Type,
        };
        self.method.call(receiver, args)
    }

    fn project<'a>(&self, this: &'a mut dyn Any) -> Result<&'a mut dyn Any, InvokeError> {
        let mut current = this;
        for step in self.path.iter() {
            current = step.upcast({ current }).ok_or(InvokeError::SubjectMismatch {
                expected: step.source(),
            })?;
        }
        Ok(current)
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("id", &self.id)
            .field("inherited", &self.is_inherited())
            .finish_non_exhaustive()
    }
}
