//! Lazy, uncached type resolution through the loader seam.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use xsdbind::{
    BindErrorKind, BindingCatalog, CachingLoader, QName, SimpleKind, TypeDescriptor, TypeLoader,
    TypeRef,
};

mod common;

/// Counts every lookup that reaches it.
struct CountingLoader {
    catalog: BindingCatalog,
    calls: AtomicUsize,
}

impl CountingLoader {
    fn new() -> Self {
        Self {
            catalog: common::catalog(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TypeLoader for CountingLoader {
    fn lookup(&self, name: &QName) -> Option<Arc<TypeDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.catalog.lookup(name)
    }
}

#[test]
fn constructing_a_reference_never_touches_the_loader() {
    let loader = CountingLoader::new();
    let _refs: Vec<TypeRef> = (0..100)
        .map(|_| TypeRef::new(QName::local("string")))
        .collect();
    assert_eq!(loader.calls(), 0);
}

#[test]
fn every_resolve_is_a_fresh_lookup() {
    let loader = CountingLoader::new();
    let r = TypeRef::new(QName::local("string"));
    let first = r.resolve(&loader).unwrap();
    let second = r.resolve(&loader).unwrap();
    assert_eq!(loader.calls(), 2);
    // Same name, same descriptor.
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn caching_decorator_memoizes() {
    let loader = CachingLoader::new(CountingLoader::new());
    let r = TypeRef::new(QName::local("string"));
    r.resolve(&loader).unwrap();
    r.resolve(&loader).unwrap();
    assert_eq!(loader.inner().calls(), 1);
}

#[test]
fn resolve_miss_is_type_not_found() {
    let loader = CountingLoader::new();
    let err = TypeRef::new(QName::local("ghost")).resolve(&loader).unwrap_err();
    assert!(matches!(err.kind(), BindErrorKind::TypeNotFound(_)));
    // The miss still reached the loader; nothing was short-circuited.
    assert_eq!(loader.calls(), 1);
}

#[test]
fn swapping_the_loader_changes_what_a_reference_sees() {
    let r = TypeRef::new(QName::local("thing"));

    let first = BindingCatalog::builder()
        .add(TypeDescriptor::simple(QName::local("thing"), SimpleKind::Text))
        .build();
    let second = BindingCatalog::builder()
        .add(TypeDescriptor::simple(QName::local("thing"), SimpleKind::Integer))
        .build();

    use xsdbind::TypeCategory;
    assert_eq!(
        r.resolve(&first).unwrap().category(),
        TypeCategory::Simple(SimpleKind::Text)
    );
    assert_eq!(
        r.resolve(&second).unwrap().category(),
        TypeCategory::Simple(SimpleKind::Integer)
    );
}
