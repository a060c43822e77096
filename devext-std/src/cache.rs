//! Resolution cache.
//!
//! Memoizes [`TypeRegistry::scan`] per `(type, hook, binding)`. Entries are
//! published whole and never replaced, so readers always see a complete list.

use devext_core::{Binding, Candidate, TypeRegistry};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};
use tracing::trace;

/// The candidates selected for one key, in resolution order.
pub type Resolution = Arc<[Candidate]>;

/// Identifies one cached resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionKey {
    type_id: TypeId,
    hook: String,
    binding: Binding,
}

impl ResolutionKey {
    /// Key for the given type identity.
    pub fn new(type_id: TypeId, hook: impl Into<String>, binding: Binding) -> Self {
        Self {
            type_id,
            hook: hook.into(),
            binding,
        }
    }

    /// Key for `T`.
    pub fn of<T: Any>(hook: impl Into<String>, binding: Binding) -> Self {
        Self::new(TypeId::of::<T>(), hook, binding)
    }

    /// The owning type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The hook name.
    pub fn hook(&self) -> &str {
        &self.hook
    }

    /// Instance or static method set.
    pub fn binding(&self) -> Binding {
        self.binding
    }
}

// Nested so that a hit can be looked up with a borrowed hook name.
type Entries = HashMap<(TypeId, Binding), HashMap<Box<str>, Resolution>>;

/// Write-once, read-many cache of hook resolutions over one registry.
pub struct ResolutionCache {
    registry: Arc<TypeRegistry>,
    entries: RwLock<Entries>,
    scans: AtomicUsize,
}

impl ResolutionCache {
    /// Create an empty cache over `registry`.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            entries: RwLock::new(HashMap::new()),
            scans: AtomicUsize::new(0),
        }
    }

    /// The registry this cache scans.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Candidates of `type_id` tagged for `hook`.
    ///
    /// Scans the registry on the first request for a key and returns the
    /// stored entry afterwards. When two threads miss the same key at once,
    /// both scan and the entry published first is the one both get back.
    pub fn resolve(&self, type_id: TypeId, hook: &str, binding: Binding) -> Resolution {
        if let Some(hit) = self.lookup(type_id, hook, binding) {
            trace!(?type_id, hook, ?binding, "resolution cache hit");
            return hit;
        }

        let scanned: Resolution = Arc::from(self.registry.scan(type_id, hook, binding));
        self.scans.fetch_add(1, Ordering::Relaxed);
        trace!(
            ty = self.registry.get(type_id).map_or("<unregistered>", |info| info.name()),
            hook,
            ?binding,
            candidates = scanned.len(),
            "resolved hook"
        );

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry((type_id, binding))
            .or_default()
            .entry(Box::from(hook))
            .or_insert(scanned)
            .clone()
    }

    /// Candidates of `T` tagged for `hook`.
    pub fn resolve_for<T: Any>(&self, hook: &str, binding: Binding) -> Resolution {
        self.resolve(TypeId::of::<T>(), hook, binding)
    }

    /// The stored entry for `key`, without scanning.
    pub fn get(&self, key: &ResolutionKey) -> Option<Resolution> {
        self.lookup(key.type_id, &key.hook, key.binding)
    }

    /// Whether `key` has been resolved.
    pub fn contains(&self, key: &ResolutionKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().map(HashMap::len).sum()
    }

    /// Whether nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many registry scans this cache has performed.
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    fn lookup(&self, type_id: TypeId, hook: &str, binding: Binding) -> Option<Resolution> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&(type_id, binding))?.get(hook).cloned()
    }
}

impl fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("entries", &self.len())
            .field("scans", &self.scans())
            .finish_non_exhaustive()
    }
}
