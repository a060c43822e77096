#![allow(dead_code)]

use devext::{
    Extensible, TypeBuilder, TypeRegistry, TypeRegistryBuilder, testing::CallLog,
};
use std::sync::Arc;

// ============================================================================
// Test Types
// ============================================================================

/// Base type with one method per lifecycle hook.
pub struct Foo {
    pub log: CallLog,
}

impl Foo {
    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone() }
    }
}

impl Extensible for Foo {
    fn declare(ty: &mut TypeBuilder<Self>) {
        ty.method("start", "OnStart", |foo: &mut Foo, _: &()| {
            foo.log.record("Foo.start")
        })
        .method("stop", "OnStop", |foo: &mut Foo, _: &()| {
            foo.log.record("Foo.stop")
        })
        .static_method("boot", "OnStart", |log: &CallLog| log.record("Foo::boot"));
    }
}

/// Derived type reaching `Foo` through a field.
pub struct Bar {
    pub foo: Foo,
}

impl Bar {
    pub fn new(log: &CallLog) -> Self {
        Self { foo: Foo::new(log) }
    }
}

impl Extensible for Bar {
    fn declare(ty: &mut TypeBuilder<Self>) {
        ty.inherits(|bar: &mut Bar| &mut bar.foo)
            .method("greet", "OnStart", |bar: &mut Bar, _: &()| {
                bar.foo.log.record("Bar.greet")
            });
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn builder() -> TypeRegistryBuilder {
    TypeRegistry::builder()
        .register::<Foo>()
        .and_then(|b| b.register::<Bar>())
        .expect("test types register")
}

pub fn registry() -> Arc<TypeRegistry> {
    Arc::new(builder().build().expect("test registry builds"))
}
