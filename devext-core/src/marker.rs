//! Hook markers.

use std::{borrow::Cow, fmt};

/// Tag attached to a method naming the hook it extends.
///
/// A method carries at most one marker. A marker with an empty name is
/// accepted at declaration time but never matches a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookMarker {
    hook_name: Cow<'static, str>,
}

impl HookMarker {
    /// Create a marker for the given hook name.
    pub fn new(hook_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            hook_name: hook_name.into(),
        }
    }

    /// The hook this marker ties its method to.
    pub fn hook_name(&self) -> &str {
        &self.hook_name
    }

    /// Whether the marker has a usable hook name.
    pub fn is_configured(&self) -> bool {
        !self.hook_name.is_empty()
    }

    /// Whether this marker selects its method for `hook`.
    pub fn matches(&self, hook: &str) -> bool {
        self.is_configured() && self.hook_name == hook
    }
}

impl fmt::Display for HookMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#[hook(\"{}\")]", self.hook_name)
    }
}

impl From<&'static str> for HookMarker {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for HookMarker {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
