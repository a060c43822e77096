//! Distributed type registration via `inventory`.
//!
//! Add-on modules submit their types where they are defined; the host
//! collects every submission into one registry at start-up.
//!
//! ```rust,ignore
//! inventory::submit! { TypeRegistration::of::<Player>() }
//!
//! let registry = collect_registry()?;
//! ```

use devext_core::{Extensible, RegistryError, TypeRegistry, TypeRegistryBuilder};
use std::any::type_name;
use tracing::debug;

/// A type submitted for collection.
pub struct TypeRegistration {
    name: fn() -> &'static str,
    register: fn(&mut TypeRegistryBuilder) -> Result<(), RegistryError>,
}

impl TypeRegistration {
    /// Registration entry for `T`.
    pub const fn of<T: Extensible>() -> Self {
        Self {
            name: type_name::<T>,
            register: register_type::<T>,
        }
    }

    /// Name of the submitted type.
    pub fn name(&self) -> &'static str {
        (self.name)()
    }
}

fn register_type<T: Extensible>(builder: &mut TypeRegistryBuilder) -> Result<(), RegistryError> {
    builder.register_mut::<T>().map(|_| ())
}

inventory::collect!(TypeRegistration);

/// Register every submitted type into `builder`.
///
/// Returns how many types were added.
pub fn collect_types(builder: &mut TypeRegistryBuilder) -> Result<usize, RegistryError> {
    let mut count = 0;
    for registration in inventory::iter::<TypeRegistration> {
        debug!(ty = registration.name(), "collecting extension type");
        (registration.register)(builder)?;
        count += 1;
    }
    Ok(count)
}

/// Build a registry from every submitted type.
pub fn collect_registry() -> Result<TypeRegistry, RegistryError> {
    let mut builder = TypeRegistryBuilder::new();
    collect_types(&mut builder)?;
    builder.build()
}
