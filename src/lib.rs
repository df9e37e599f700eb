//! Schema-typed XML binding runtime.
//!
//! Converts between XML documents and a generic in-memory value graph in
//! both directions, driven by a read-only catalog of type descriptors
//! produced by an external schema-compilation stage. No codegen: documents
//! bind to [`Value`] at runtime, dispatched on the descriptor's type
//! category.
//!
//! # Example
//!
//! ```
//! use xsdbind::{
//!     BindingCatalog, Cardinality, Marshaler, PropertyDescriptor, QName, SimpleKind,
//!     TypeDescriptor, TypeRef, UnmarshalTable, Unmarshaler, Value,
//! };
//!
//! # fn main() -> Result<(), xsdbind::BindError> {
//! let catalog = BindingCatalog::builder()
//!     .add(TypeDescriptor::simple(QName::local("string"), SimpleKind::Text))
//!     .add(TypeDescriptor::simple(QName::local("int"), SimpleKind::Integer))
//!     .add(TypeDescriptor::complex(
//!         QName::local("person"),
//!         vec![
//!             PropertyDescriptor::element(
//!                 QName::local("name"),
//!                 TypeRef::new(QName::local("string")),
//!                 Cardinality::Single,
//!             ),
//!             PropertyDescriptor::element(
//!                 QName::local("age"),
//!                 TypeRef::new(QName::local("int")),
//!                 Cardinality::Single,
//!             ),
//!         ],
//!     ))
//!     .build();
//!
//! let table = UnmarshalTable::build(&catalog)?;
//! let engine = Unmarshaler::new(&catalog, &table);
//! let value = engine.from_str(
//!     "<person><name>Ada</name><age>36</age></person>",
//!     &QName::local("person"),
//! )?;
//!
//! let Value::Complex(person) = &value else { unreachable!() };
//! assert_eq!(person.get_local("name"), Some(&Value::Text("Ada".into())));
//! assert_eq!(person.get_local("age"), Some(&Value::Int(36)));
//!
//! let xml = Marshaler::new(&catalog).to_string(
//!     &value,
//!     &QName::local("person"),
//!     &QName::local("person"),
//! )?;
//! assert_eq!(xml, "<person><name>Ada</name><age>36</age></person>");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cursor;
pub mod descriptor;
pub mod error;
pub mod loader;
pub mod marshal;
pub mod qname;
pub mod unmarshal;
pub mod value;

pub use cursor::{DocumentCursor, EventCursor};
pub use descriptor::{
    BindingCatalog, Cardinality, CatalogBuilder, PropertyDescriptor, PropertyKind, SimpleKind,
    TypeCategory, TypeDescriptor,
};
pub use error::{BindError, BindErrorKind};
pub use loader::{CachingLoader, TypeLoader, TypeRef};
pub use marshal::Marshaler;
pub use qname::QName;
pub use unmarshal::{UnmarshalOptions, UnmarshalTable, Unmarshaler, Unmarshaller};
pub use value::{ComplexValue, Value};
