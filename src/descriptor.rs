//! Type descriptors and the binding catalog.
//!
//! A [`TypeDescriptor`] is immutable runtime metadata describing one schema
//! type's shape. Descriptors are produced by an external schema-compilation
//! stage, collected into a [`BindingCatalog`] once, and then shared read-only
//! across arbitrarily many concurrent traversals.

use std::collections::HashMap;
use std::sync::Arc;

use crate::loader::{TypeLoader, TypeRef};
use crate::qname::QName;

/// The lexical space of a simple (text-content) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    /// `true | false | 1 | 0`
    Boolean,
    /// Signed 64-bit integer.
    Integer,
    /// Floating-point decimal.
    Decimal,
    /// Any text.
    Text,
}

impl SimpleKind {
    /// Human-readable name of the lexical space, for error messages.
    pub fn lexical_space(self) -> &'static str {
        match self {
            SimpleKind::Boolean => "a boolean (true|false|1|0)",
            SimpleKind::Integer => "an integer",
            SimpleKind::Decimal => "a decimal",
            SimpleKind::Text => "text",
        }
    }
}

/// How many occurrences of a property the schema allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one occurrence; missing is a structural error.
    Single,
    /// Zero or one occurrence.
    Optional,
    /// Zero or more occurrences, collected into an array.
    Repeated,
}

/// Whether a property binds a child element or an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// A child element.
    Element,
    /// An attribute on the owning element's start tag.
    Attribute,
}

/// The category of a schema type, which selects its codec.
///
/// The category set is closed: it is fixed by the schema type system and
/// does not need open extensibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    /// Text content converted by a lexical space.
    Simple(SimpleKind),
    /// A complex type whose children are matched by qualified name.
    ComplexByName,
    /// A single container element wrapping repeated occurrences of one
    /// item element.
    WrappedArray,
    /// Text content accepted by the first matching member type.
    Union,
    /// Whitespace-separated text tokens, each converted by the item type.
    List,
}

/// One named child slot (element or attribute) of a complex type.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: QName,
    type_ref: TypeRef,
    cardinality: Cardinality,
    kind: PropertyKind,
}

impl PropertyDescriptor {
    /// A child-element property.
    pub fn element(name: QName, type_ref: TypeRef, cardinality: Cardinality) -> Self {
        Self {
            name,
            type_ref,
            cardinality,
            kind: PropertyKind::Element,
        }
    }

    /// An attribute property. Attributes are at most single-valued;
    /// `Cardinality::Repeated` is rejected when the dispatch table is built.
    pub fn attribute(name: QName, type_ref: TypeRef, cardinality: Cardinality) -> Self {
        Self {
            name,
            type_ref,
            cardinality,
            kind: PropertyKind::Attribute,
        }
    }

    /// The property's qualified name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// The deferred reference to the property's type.
    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// The allowed number of occurrences.
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Element or attribute.
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }
}

/// Immutable runtime metadata describing one schema type's shape.
///
/// Once published into a [`BindingCatalog`] a descriptor never changes; it
/// is shared by all concurrent unmarshal operations.
#[derive(Debug)]
pub struct TypeDescriptor {
    name: QName,
    category: TypeCategory,
    /// Child slots, in declared order. Only populated for `ComplexByName`.
    properties: Vec<PropertyDescriptor>,
    /// The single item slot of a `WrappedArray`.
    item: Option<PropertyDescriptor>,
    /// Member types of a `Union`, in declared order.
    members: Vec<TypeRef>,
    /// Item type of a `List`.
    item_type: Option<TypeRef>,
}

impl TypeDescriptor {
    /// A simple type with the given lexical space.
    pub fn simple(name: QName, kind: SimpleKind) -> Self {
        Self {
            name,
            category: TypeCategory::Simple(kind),
            properties: Vec::new(),
            item: None,
            members: Vec::new(),
            item_type: None,
        }
    }

    /// A complex type whose children are matched by name, in declared order.
    pub fn complex(name: QName, properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            name,
            category: TypeCategory::ComplexByName,
            properties,
            item: None,
            members: Vec::new(),
            item_type: None,
        }
    }

    /// A wrapped array: a container element holding repeated `item` elements.
    pub fn wrapped_array(name: QName, item: PropertyDescriptor) -> Self {
        Self {
            name,
            category: TypeCategory::WrappedArray,
            properties: Vec::new(),
            item: Some(item),
            members: Vec::new(),
            item_type: None,
        }
    }

    /// A union of member types, tried in declared order.
    pub fn union_of(name: QName, members: Vec<TypeRef>) -> Self {
        Self {
            name,
            category: TypeCategory::Union,
            properties: Vec::new(),
            item: None,
            members,
            item_type: None,
        }
    }

    /// A whitespace-separated list of `item_type` tokens.
    pub fn list_of(name: QName, item_type: TypeRef) -> Self {
        Self {
            name,
            category: TypeCategory::List,
            properties: Vec::new(),
            item: None,
            members: Vec::new(),
            item_type: Some(item_type),
        }
    }

    /// The type's qualified name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// The type's category.
    pub fn category(&self) -> TypeCategory {
        self.category
    }

    /// Child slots in declared order (empty unless `ComplexByName`).
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// The item slot of a `WrappedArray`.
    pub fn item(&self) -> Option<&PropertyDescriptor> {
        self.item.as_ref()
    }

    /// Union member types in declared order.
    pub fn members(&self) -> &[TypeRef] {
        &self.members
    }

    /// The item type of a `List`.
    pub fn item_type(&self) -> Option<&TypeRef> {
        self.item_type.as_ref()
    }
}

// ============================================================================
// Binding catalog
// ============================================================================

/// The read-only table of all known type descriptors for one schema.
///
/// Built once via [`CatalogBuilder`], then frozen; queries are pure lookups
/// by qualified name. The catalog itself implements [`TypeLoader`].
#[derive(Debug, Default)]
pub struct BindingCatalog {
    types: HashMap<QName, Arc<TypeDescriptor>>,
}

impl BindingCatalog {
    /// Start building a catalog.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder {
            types: HashMap::new(),
        }
    }

    /// Look up a descriptor by qualified name.
    pub fn get(&self, name: &QName) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).cloned()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all registered descriptors.
    pub fn iter(&self) -> impl Iterator<Item = (&QName, &Arc<TypeDescriptor>)> {
        self.types.iter()
    }
}

impl TypeLoader for BindingCatalog {
    fn lookup(&self, name: &QName) -> Option<Arc<TypeDescriptor>> {
        self.get(name)
    }
}

/// Append-only accumulator for a [`BindingCatalog`].
#[derive(Debug)]
pub struct CatalogBuilder {
    types: HashMap<QName, Arc<TypeDescriptor>>,
}

impl CatalogBuilder {
    /// Register a descriptor. A descriptor registered later under the same
    /// qualified name replaces the earlier one.
    pub fn add(mut self, descriptor: TypeDescriptor) -> Self {
        self.types
            .insert(descriptor.name().clone(), Arc::new(descriptor));
        self
    }

    /// Freeze the catalog.
    pub fn build(self) -> BindingCatalog {
        BindingCatalog { types: self.types }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_after_freeze() {
        let catalog = BindingCatalog::builder()
            .add(TypeDescriptor::simple(
                QName::local("string"),
                SimpleKind::Text,
            ))
            .build();
        assert_eq!(catalog.len(), 1);
        let td = catalog.get(&QName::local("string")).unwrap();
        assert_eq!(td.category(), TypeCategory::Simple(SimpleKind::Text));
        assert!(catalog.get(&QName::local("missing")).is_none());
    }
}
