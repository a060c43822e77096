//! Type registry: the method tables extension lookups scan.
//!
//! Types declare their extension methods once, at start-up, through a
//! [`TypeBuilder`]. The resulting [`TypeRegistry`] is frozen and can be shared
//! across threads; scanning it is what a resolution cache memoizes.

use crate::{
    error::{BoxError, RegistryError},
    marker::HookMarker,
    method::{
        Binding, Candidate, CandidateId, ErasedMethod, InstanceFn, MethodDecl, Projection,
        StaticFn, TransformFn, Upcast,
    },
    response::IntoOutcome,
};
use std::{
    any::{Any, TypeId, type_name},
    borrow::Cow,
    collections::{HashMap, HashSet},
    convert::Infallible,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

/// Identity of a type used for static dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeToken {
    id: TypeId,
    name: &'static str,
}

impl TypeToken {
    /// Token for `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The runtime type identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type's name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A type whose extension methods can be declared to a registry.
///
/// Usually implemented by the `#[extensions]` attribute macro.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not declare extension methods",
    label = "missing `Extensible` implementation",
    note = "Annotate an `impl` block of `{Self}` with `#[extensions]`, or use `TypeRegistryBuilder::declare`."
)]
pub trait Extensible: Any {
    /// Declare this type's methods.
    fn declare(ty: &mut TypeBuilder<Self>)
    where
        Self: Sized;
}

/// Link from a type to the parent whose methods it inherits.
#[derive(Clone)]
struct ParentLink {
    id: TypeId,
    upcast: Arc<dyn Upcast>,
}

/// Everything the registry knows about one type.
pub struct TypeInfo {
    name: &'static str,
    parent: Option<ParentLink>,
    methods: Vec<MethodDecl>,
}

impl TypeInfo {
    /// The type's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The parent type, if one was declared.
    pub fn parent(&self) -> Option<TypeId> {
        self.parent.as_ref().map(|p| p.id)
    }

    /// Methods declared on this type itself, in declaration order.
    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("parent", &self.parent())
            .field("methods", &self.methods)
            .finish()
    }
}

// ============================================================================
// TypeBuilder - declaring one type's methods
// ============================================================================

/// Collects the method declarations of `T`.
///
/// Declarations chain; the first invalid declaration is reported when the
/// type is added to the registry.
///
/// # Example
/// ```ignore
/// builder.declare::<Player>(|ty| {
///     ty.method("log_spawn", "OnSpawn", |p: &mut Player, _: &()| p.spawned = true)
///         .static_method("count_spawn", "OnSpawn", |_: &()| {});
/// })?;
/// ```
pub struct TypeBuilder<T> {
    parent: Option<ParentLink>,
    methods: Vec<MethodDecl>,
    error: Option<RegistryError>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Any> TypeBuilder<T> {
    fn new() -> Self {
        Self {
            parent: None,
            methods: Vec::new(),
            error: None,
            _type: PhantomData,
        }
    }

    /// Declare an instance method tagged for `hook`.
    pub fn method<A, R, F>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        hook: impl Into<HookMarker>,
        f: F,
    ) -> &mut Self
    where
        A: Any,
        R: IntoOutcome + 'static,
        F: Fn(&mut T, &A) -> R + Send + Sync + 'static,
    {
        self.push(
            name.into(),
            Some(hook.into()),
            Binding::Instance,
            Arc::new(InstanceFn::new(f)),
        )
    }

    /// Declare an instance method overriding an ancestor's method of the same
    /// name without re-tagging it; the ancestor's marker applies.
    pub fn override_method<A, R, F>(&mut self, name: impl Into<Cow<'static, str>>, f: F) -> &mut Self
    where
        A: Any,
        R: IntoOutcome + 'static,
        F: Fn(&mut T, &A) -> R + Send + Sync + 'static,
    {
        self.push(
            name.into(),
            None,
            Binding::Instance,
            Arc::new(InstanceFn::new(f)),
        )
    }

    /// Declare a static method tagged for `hook`.
    pub fn static_method<A, R, F>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        hook: impl Into<HookMarker>,
        f: F,
    ) -> &mut Self
    where
        A: Any,
        R: IntoOutcome + 'static,
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        self.push(
            name.into(),
            Some(hook.into()),
            Binding::Static,
            Arc::new(StaticFn::new(f)),
        )
    }

    /// Declare an instance method that produces the next pipeline subject.
    pub fn transform<A, F>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        hook: impl Into<HookMarker>,
        f: F,
    ) -> &mut Self
    where
        A: Any,
        F: Fn(&mut T, &A) -> T + Send + Sync + 'static,
    {
        self.try_transform(name, hook, move |this: &mut T, args: &A| {
            Ok::<T, Infallible>(f(this, args))
        })
    }

    /// Fallible form of [`transform`](Self::transform).
    pub fn try_transform<A, E, F>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        hook: impl Into<HookMarker>,
        f: F,
    ) -> &mut Self
    where
        A: Any,
        E: Into<BoxError> + 'static,
        F: Fn(&mut T, &A) -> Result<T, E> + Send + Sync + 'static,
    {
        self.push(
            name.into(),
            Some(hook.into()),
            Binding::Instance,
            Arc::new(TransformFn::new(f)),
        )
    }

    /// Override an ancestor's pipeline step without re-tagging it.
    pub fn override_transform<A, F>(&mut self, name: impl Into<Cow<'static, str>>, f: F) -> &mut Self
    where
        A: Any,
        F: Fn(&mut T, &A) -> T + Send + Sync + 'static,
    {
        self.override_try_transform(name, move |this: &mut T, args: &A| {
            Ok::<T, Infallible>(f(this, args))
        })
    }

    /// Fallible form of [`override_transform`](Self::override_transform).
    pub fn override_try_transform<A, E, F>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        f: F,
    ) -> &mut Self
    where
        A: Any,
        E: Into<BoxError> + 'static,
        F: Fn(&mut T, &A) -> Result<T, E> + Send + Sync + 'static,
    {
        self.push(
            name.into(),
            None,
            Binding::Instance,
            Arc::new(TransformFn::new(f)),
        )
    }

    /// Inherit the instance methods of `P`, reached through `project`.
    pub fn inherits<P: Any>(&mut self, project: fn(&mut T) -> &mut P) -> &mut Self {
        if self.parent.is_some() {
            self.fail(RegistryError::MultipleParents(type_name::<T>()));
        } else {
            self.parent = Some(ParentLink {
                id: TypeId::of::<P>(),
                upcast: Arc::new(Projection::new(project)),
            });
        }
        self
    }

    fn push(
        &mut self,
        name: Cow<'static, str>,
        marker: Option<HookMarker>,
        binding: Binding,
        method: Arc<dyn ErasedMethod>,
    ) -> &mut Self {
        if name.is_empty() {
            self.fail(RegistryError::EmptyMethodName(type_name::<T>()));
        } else if self.methods.iter().any(|m| m.name == name) {
            self.fail(RegistryError::DuplicateMethod {
                ty: type_name::<T>(),
                method: name.into_owned(),
            });
        } else {
            self.methods.push(MethodDecl {
                name,
                marker,
                binding,
                method,
            });
        }
        self
    }

    fn fail(&mut self, err: RegistryError) {
        self.error.get_or_insert(err);
    }

    fn finish(self) -> Result<TypeInfo, RegistryError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(TypeInfo {
            name: type_name::<T>(),
            parent: self.parent,
            methods: self.methods,
        })
    }
}

// ============================================================================
// TypeRegistryBuilder - for constructing registries
// ============================================================================

/// Builder for constructing a [`TypeRegistry`].
///
/// # Example
/// ```ignore
/// let registry = TypeRegistryBuilder::new()
///     .register::<Player>()?
///     .register::<Boss>()?
///     .build()?;
/// ```
#[derive(Default)]
pub struct TypeRegistryBuilder {
    types: HashMap<TypeId, TypeInfo>,
}

impl TypeRegistryBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type through its [`Extensible`] implementation.
    pub fn register<T: Extensible>(mut self) -> Result<Self, RegistryError> {
        self.register_mut::<T>()?;
        Ok(self)
    }

    /// Register a type through its [`Extensible`] implementation (mutable version).
    pub fn register_mut<T: Extensible>(&mut self) -> Result<&mut Self, RegistryError> {
        self.declare::<T>(T::declare)
    }

    /// Register a type by declaring its methods inline.
    pub fn declare<T: Any>(
        &mut self,
        declare: impl FnOnce(&mut TypeBuilder<T>),
    ) -> Result<&mut Self, RegistryError> {
        let id = TypeId::of::<T>();
        if self.types.contains_key(&id) {
            return Err(RegistryError::DuplicateType(type_name::<T>()));
        }
        let mut ty = TypeBuilder::<T>::new();
        declare(&mut ty);
        self.types.insert(id, ty.finish()?);
        Ok(self)
    }

    /// Whether `T` was registered.
    pub fn contains<T: Any>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    /// Get the number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the builder has no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Build the immutable registry.
    ///
    /// Fails if following parent links from any type leads back to it.
    /// Parents that were never registered end the chain silently.
    pub fn build(self) -> Result<TypeRegistry, RegistryError> {
        for (start, info) in &self.types {
            let mut seen = HashSet::from([*start]);
            let mut next = info.parent();
            while let Some(id) = next {
                if !seen.insert(id) {
                    return Err(RegistryError::InheritanceCycle(info.name));
                }
                next = self.types.get(&id).and_then(TypeInfo::parent);
            }
        }
        Ok(TypeRegistry { types: self.types })
    }
}

// ============================================================================
// TypeRegistry - immutable, thread-safe method tables
// ============================================================================

/// An immutable, thread-safe collection of method tables.
pub struct TypeRegistry {
    types: HashMap<TypeId, TypeInfo>,
}

/// A method as seen from the scanned type, after overrides are applied.
struct Effective<'r> {
    decl: &'r MethodDecl,
    declared_on: &'static str,
    marker: Option<&'r HookMarker>,
    path: Arc<[Arc<dyn Upcast>]>,
}

impl TypeRegistry {
    /// Start building a registry.
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    /// Look up a registered type.
    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(&id)
    }

    /// Get the number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Find every method of `id` whose effective marker matches `hook`.
    ///
    /// Instance scans cover the type and its ancestors: methods declared on
    /// the type come first in declaration order, then inherited methods that
    /// were not overridden, nearest ancestor first. An override without its
    /// own marker carries the nearest ancestor's marker. Static scans cover
    /// the type's own static methods only. Unknown types yield nothing.
    ///
    /// This walks every declaration; callers are expected to cache the result.
    pub fn scan(&self, id: TypeId, hook: &str, binding: Binding) -> Vec<Candidate> {
        let Some(info) = self.types.get(&id) else {
            return Vec::new();
        };

        match binding {
            Binding::Static => info
                .methods
                .iter()
                .filter(|m| m.binding == Binding::Static)
                .filter(|m| m.marker.as_ref().is_some_and(|marker| marker.matches(hook)))
                .map(|m| {
                    Candidate::new(
                        CandidateId::new(info.name, m.name.clone()),
                        m.method.clone(),
                        Arc::from(Vec::new()),
                    )
                })
                .collect(),
            Binding::Instance => self
                .effective_methods(info)
                .into_iter()
                .filter(|e| e.marker.is_some_and(|marker| marker.matches(hook)))
                .map(|e| {
                    Candidate::new(
                        CandidateId::new(e.declared_on, e.decl.name.clone()),
                        e.decl.method.clone(),
                        e.path,
                    )
                })
                .collect(),
        }
    }

    fn effective_methods<'r>(&'r self, info: &'r TypeInfo) -> Vec<Effective<'r>> {
        let mut effective: Vec<Effective<'r>> = Vec::new();
        let mut by_name: HashMap<&'r str, usize> = HashMap::new();
        let mut path: Vec<Arc<dyn Upcast>> = Vec::new();
        let mut level = Some(info);

        while let Some(current) = level {
            let shared_path: Arc<[Arc<dyn Upcast>]> = Arc::from(path.clone());
            for decl in current
                .methods
                .iter()
                .filter(|m| m.binding == Binding::Instance)
            {
                match by_name.get(decl.name()) {
                    Some(&index) => {
                        let overriding = &mut effective[index];
                        if overriding.marker.is_none() {
                            overriding.marker = decl.marker.as_ref();
                        }
                    }
                    None => {
                        by_name.insert(decl.name(), effective.len());
                        effective.push(Effective {
                            decl,
                            declared_on: current.name,
                            marker: decl.marker.as_ref(),
                            path: shared_path.clone(),
                        });
                    }
                }
            }

            level = current.parent.as_ref().and_then(|link| {
                path.push(link.upcast.clone());
                self.types.get(&link.id)
            });
        }

        effective
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.values().map(TypeInfo::name).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Receiver;

    #[derive(Default)]
    struct Foo {
        log: Vec<&'static str>,
    }

    #[derive(Default)]
    struct Bar {
        foo: Foo,
    }

    #[derive(Default)]
    struct Baz {
        bar: Bar,
    }

    fn declare_foo(ty: &mut TypeBuilder<Foo>) {
        ty.method("start", "OnStart", |foo: &mut Foo, _: &()| foo.log.push("foo.start"))
            .method("stop", "OnStop", |foo: &mut Foo, _: &()| foo.log.push("foo.stop"))
            .static_method("boot", "OnStart", |_: &()| {});
    }

    fn names(candidates: &[Candidate]) -> Vec<String> {
        candidates.iter().map(|c| c.id().method().to_string()).collect()
    }

    #[test]
    fn scan_selects_matching_marker() {
        let mut builder = TypeRegistry::builder();
        builder.declare::<Foo>(declare_foo).unwrap();
        let registry = builder.build().unwrap();

        let found = registry.scan(TypeId::of::<Foo>(), "OnStart", Binding::Instance);
        assert_eq!(names(&found), ["start"]);
        assert!(!found[0].is_inherited());

        let found = registry.scan(TypeId::of::<Foo>(), "OnStart", Binding::Static);
        assert_eq!(names(&found), ["boot"]);

        assert!(registry.scan(TypeId::of::<Foo>(), "OnPause", Binding::Instance).is_empty());
        assert!(registry.scan(TypeId::of::<u8>(), "OnStart", Binding::Instance).is_empty());
    }

    #[test]
    fn empty_marker_is_excluded() {
        let mut builder = TypeRegistry::builder();
        builder
            .declare::<Foo>(|ty| {
                ty.method("broken", "", |_: &mut Foo, _: &()| {});
            })
            .unwrap();
        let registry = builder.build().unwrap();

        assert!(registry.scan(TypeId::of::<Foo>(), "", Binding::Instance).is_empty());
    }

    #[test]
    fn inherited_methods_follow_own_methods() {
        let mut builder = TypeRegistry::builder();
        builder.declare::<Foo>(declare_foo).unwrap();
        builder
            .declare::<Bar>(|ty| {
                ty.inherits(|bar: &mut Bar| &mut bar.foo)
                    .method("greet", "OnStart", |bar: &mut Bar, _: &()| {
                        bar.foo.log.push("bar.greet")
                    });
            })
            .unwrap();
        let registry = builder.build().unwrap();

        let found = registry.scan(TypeId::of::<Bar>(), "OnStart", Binding::Instance);
        assert_eq!(names(&found), ["greet", "start"]);
        assert!(found[1].is_inherited());

        let mut bar = Bar::default();
        for candidate in &found {
            candidate.invoke(Receiver::Instance(&mut bar), &()).unwrap();
        }
        assert_eq!(bar.foo.log, ["bar.greet", "foo.start"]);

        // Static methods are not inherited.
        assert!(registry.scan(TypeId::of::<Bar>(), "OnStart", Binding::Static).is_empty());
    }

    #[test]
    fn untagged_override_keeps_ancestor_marker() {
        let mut builder = TypeRegistry::builder();
        builder.declare::<Foo>(declare_foo).unwrap();
        builder
            .declare::<Bar>(|ty| {
                ty.inherits(|bar: &mut Bar| &mut bar.foo)
                    .override_method("start", |bar: &mut Bar, _: &()| {
                        bar.foo.log.push("bar.start")
                    });
            })
            .unwrap();
        builder
            .declare::<Baz>(|ty| {
                ty.inherits(|baz: &mut Baz| &mut baz.bar)
                    .override_method("stop", |baz: &mut Baz, _: &()| {
                        baz.bar.foo.log.push("baz.stop")
                    });
            })
            .unwrap();
        let registry = builder.build().unwrap();

        let found = registry.scan(TypeId::of::<Baz>(), "OnStart", Binding::Instance);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id().to_string(), format!("{}::start", type_name::<Bar>()));

        let found = registry.scan(TypeId::of::<Baz>(), "OnStop", Binding::Instance);
        assert_eq!(found[0].id().declaring_type(), type_name::<Baz>());

        let mut baz = Baz::default();
        for hook in ["OnStart", "OnStop"] {
            for candidate in registry.scan(TypeId::of::<Baz>(), hook, Binding::Instance) {
                candidate.invoke(Receiver::Instance(&mut baz), &()).unwrap();
            }
        }
        assert_eq!(baz.bar.foo.log, ["bar.start", "baz.stop"]);
    }

    #[test]
    fn retagged_override_replaces_marker() {
        let mut builder = TypeRegistry::builder();
        builder.declare::<Foo>(declare_foo).unwrap();
        builder
            .declare::<Bar>(|ty| {
                ty.inherits(|bar: &mut Bar| &mut bar.foo)
                    .method("start", "OnResume", |_: &mut Bar, _: &()| {});
            })
            .unwrap();
        let registry = builder.build().unwrap();

        assert!(registry.scan(TypeId::of::<Bar>(), "OnStart", Binding::Instance).is_empty());
        assert_eq!(
            registry.scan(TypeId::of::<Bar>(), "OnResume", Binding::Instance).len(),
            1
        );
    }

    #[test]
    fn untagged_transform_override_keeps_ancestor_marker() {
        #[derive(Default)]
        struct Page {
            text: String,
        }
        #[derive(Default)]
        struct Draft {
            page: Page,
        }

        let mut builder = TypeRegistry::builder();
        builder
            .declare::<Page>(|ty| {
                ty.transform("upper", "Render", |page: &mut Page, _: &()| Page {
                    text: page.text.to_uppercase(),
                });
            })
            .unwrap();
        builder
            .declare::<Draft>(|ty| {
                ty.inherits(|draft: &mut Draft| &mut draft.page)
                    .override_transform("upper", |draft: &mut Draft, _: &()| Draft {
                        page: Page {
                            text: format!("{}!", draft.page.text),
                        },
                    });
            })
            .unwrap();
        let registry = builder.build().unwrap();

        let own = registry.get(TypeId::of::<Draft>()).unwrap().methods();
        assert_eq!(own.len(), 1);
        assert!(own[0].marker().is_none());
        assert_eq!(own[0].binding(), Binding::Instance);

        let found = registry.scan(TypeId::of::<Draft>(), "Render", Binding::Instance);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id().declaring_type(), type_name::<Draft>());

        let mut draft = Draft {
            page: Page { text: "hi".into() },
        };
        let next = found[0]
            .invoke(Receiver::Instance(&mut draft), &())
            .unwrap()
            .unwrap()
            .downcast::<Draft>()
            .unwrap();
        assert_eq!(next.page.text, "hi!");
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let mut builder = TypeRegistry::builder();
        let err = builder
            .declare::<Foo>(|ty| {
                ty.method("start", "OnStart", |_: &mut Foo, _: &()| {})
                    .method("start", "OnStop", |_: &mut Foo, _: &()| {});
            })
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMethod { .. }));

        builder.declare::<Foo>(declare_foo).unwrap();
        let err = builder.declare::<Foo>(declare_foo).map(|_| ()).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateType(type_name::<Foo>()));
    }

    #[test]
    fn empty_method_name_is_rejected() {
        let mut builder = TypeRegistry::builder();
        let err = builder
            .declare::<Foo>(|ty| {
                ty.method("", "OnStart", |_: &mut Foo, _: &()| {});
            })
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyMethodName(type_name::<Foo>()));
    }

    #[test]
    fn inheritance_cycles_are_rejected() {
        struct Left {
            right: Option<Box<Right>>,
        }
        struct Right {
            left: Option<Box<Left>>,
        }

        let mut builder = TypeRegistry::builder();
        builder
            .declare::<Left>(|ty| {
                ty.inherits(|l: &mut Left| l.right.as_deref_mut().expect("right"));
            })
            .unwrap();
        builder
            .declare::<Right>(|ty| {
                ty.inherits(|r: &mut Right| r.left.as_deref_mut().expect("left"));
            })
            .unwrap();

        assert!(matches!(
            builder.build().unwrap_err(),
            RegistryError::InheritanceCycle(_)
        ));
    }

    #[test]
    fn second_parent_is_rejected() {
        let mut builder = TypeRegistry::builder();
        let err = builder
            .declare::<Baz>(|ty| {
                ty.inherits(|baz: &mut Baz| &mut baz.bar)
                    .inherits(|baz: &mut Baz| &mut baz.bar.foo);
            })
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err, RegistryError::MultipleParents(type_name::<Baz>()));
    }
}
