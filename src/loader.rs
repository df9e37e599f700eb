//! Type loading and lazy type references.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::descriptor::TypeDescriptor;
use crate::error::{BindError, BindErrorKind};
use crate::qname::QName;

/// Resolves qualified type names to descriptors.
///
/// Resolution may perform I/O (e.g. loading a type definition on demand), so
/// implementations must be safe for concurrent lookups; the engine assumes
/// thread-safety of the loader, not vice versa.
pub trait TypeLoader: Send + Sync {
    /// Look up a descriptor by qualified name.
    fn lookup(&self, name: &QName) -> Option<Arc<TypeDescriptor>>;
}

/// A deferred, by-name handle to a [`TypeDescriptor`].
///
/// Resolution is lazy and uncached: constructing a reference never touches a
/// loader, and every [`resolve`](TypeRef::resolve) call performs a fresh
/// lookup. This trades a small repeated-lookup cost for reduced memory
/// retention and no staleness when the loader is swapped. Callers who want
/// caching wrap the loader in a [`CachingLoader`] explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    name: QName,
}

impl TypeRef {
    /// Create a reference to the named type. Does not touch any loader.
    pub fn new(name: QName) -> Self {
        Self { name }
    }

    /// The referenced type's qualified name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Resolve the reference through the given loader.
    ///
    /// Fails with `TypeNotFound` when the loader has no matching entry.
    /// Resolution is idempotent in result for a fixed loader: the same name
    /// yields the same descriptor.
    pub fn resolve(&self, loader: &dyn TypeLoader) -> Result<Arc<TypeDescriptor>, BindError> {
        if self.name.local_name().is_empty() {
            return Err(BindError::new(BindErrorKind::InvalidTypeReference(
                "qualified name has an empty local part".into(),
            )));
        }
        loader
            .lookup(&self.name)
            .ok_or_else(|| BindError::new(BindErrorKind::TypeNotFound(self.name.clone())))
    }
}

/// An explicit memoizing decorator over a [`TypeLoader`].
///
/// Caching is opt-in and never silent: references themselves stay uncached,
/// so cache invalidation is the caller's problem, not the reference's.
/// Dropping the decorator drops the cache.
pub struct CachingLoader<L> {
    inner: L,
    cache: RwLock<HashMap<QName, Arc<TypeDescriptor>>>,
}

impl<L: TypeLoader> CachingLoader<L> {
    /// Wrap a loader with a lookup cache.
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The wrapped loader.
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: TypeLoader> TypeLoader for CachingLoader<L> {
    fn lookup(&self, name: &QName) -> Option<Arc<TypeDescriptor>> {
        if let Some(hit) = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(name).cloned())
        {
            return Some(hit);
        }
        let loaded = self.inner.lookup(name)?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(name.clone(), Arc::clone(&loaded));
        }
        Some(loaded)
    }
}

impl<L: TypeLoader + ?Sized> TypeLoader for &L {
    fn lookup(&self, name: &QName) -> Option<Arc<TypeDescriptor>> {
        (**self).lookup(name)
    }
}

impl<L: TypeLoader + ?Sized> TypeLoader for Arc<L> {
    fn lookup(&self, name: &QName) -> Option<Arc<TypeDescriptor>> {
        (**self).lookup(name)
    }
}
