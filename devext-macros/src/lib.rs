//! Procedural macros for devext.
//!
//! Use these through the `devext` crate with the `macros` feature enabled;
//! the generated code refers to `::devext`.

use proc_macro::TokenStream;

mod extensions;

/// Declare the extension methods of an inherent `impl` block.
///
/// Every method tagged `#[hook("Name")]` is registered for the hook `Name`;
/// `#[hook(inherit)]` registers an override that keeps the marker of the
/// parent's method with the same name. Untagged methods are left alone.
///
/// The method signature decides how it is registered:
///
/// - `&self` / `&mut self` receiver: instance method; no receiver: static
/// - returning `Self` or `Result<Self, E>`: pipeline step
/// - remaining parameters form the call-time argument tuple; `&T` parameters
///   borrow from it (`&str` from a `String`, `&[T]` from a `Vec<T>`), owned
///   parameters are cloned out of it
///
/// # Options
///
/// - `extends = Parent, via = field`: inherit `Parent`'s instance methods,
///   reaching the parent through `self.field`
/// - `submit`: submit the type for `inventory` collection
///
/// # Example
///
/// ```rust,ignore
/// #[devext::extensions(extends = Actor, via = actor)]
/// impl Player {
///     #[hook("OnSpawn")]
///     fn greet(&mut self, name: &str) {
///         self.greeting = format!("hello {name}");
///     }
///
///     #[hook("OnSpawn")]
///     fn count_spawn(spawned: &u32) {}
/// }
///
/// dispatcher.invoke_instance(&mut player, "OnSpawn", &(String::from("ana"),))?;
/// ```
#[proc_macro_attribute]
pub fn extensions(attr: TokenStream, item: TokenStream) -> TokenStream {
    extensions::extensions_impl(attr, item)
}
