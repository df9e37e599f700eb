//! Shared catalog fixture for the integration tests.

#![allow(dead_code)]

use xsdbind::{
    BindError, BindingCatalog, Cardinality, Marshaler, PropertyDescriptor, QName, SimpleKind,
    TypeDescriptor, TypeRef, UnmarshalOptions, UnmarshalTable, Unmarshaler, Value,
};

fn simple_ref(name: &str) -> TypeRef {
    TypeRef::new(QName::local(name))
}

/// A catalog covering all five type categories.
pub fn catalog() -> BindingCatalog {
    BindingCatalog::builder()
        .add(TypeDescriptor::simple(
            QName::local("string"),
            SimpleKind::Text,
        ))
        .add(TypeDescriptor::simple(
            QName::local("int"),
            SimpleKind::Integer,
        ))
        .add(TypeDescriptor::simple(
            QName::local("decimal"),
            SimpleKind::Decimal,
        ))
        .add(TypeDescriptor::simple(
            QName::local("boolean"),
            SimpleKind::Boolean,
        ))
        .add(TypeDescriptor::union_of(
            QName::local("boolOrInt"),
            vec![simple_ref("boolean"), simple_ref("int")],
        ))
        .add(TypeDescriptor::list_of(
            QName::local("intList"),
            simple_ref("int"),
        ))
        .add(TypeDescriptor::wrapped_array(
            QName::local("scores"),
            PropertyDescriptor::element(
                QName::local("score"),
                simple_ref("int"),
                Cardinality::Repeated,
            ),
        ))
        .add(TypeDescriptor::complex(
            QName::local("person"),
            vec![
                PropertyDescriptor::attribute(
                    QName::local("id"),
                    simple_ref("int"),
                    Cardinality::Optional,
                ),
                PropertyDescriptor::element(
                    QName::local("name"),
                    simple_ref("string"),
                    Cardinality::Single,
                ),
                PropertyDescriptor::element(
                    QName::local("age"),
                    simple_ref("int"),
                    Cardinality::Optional,
                ),
                PropertyDescriptor::element(
                    QName::local("nickname"),
                    simple_ref("string"),
                    Cardinality::Repeated,
                ),
            ],
        ))
        .add(TypeDescriptor::complex(
            QName::local("team"),
            vec![
                PropertyDescriptor::element(
                    QName::local("name"),
                    simple_ref("string"),
                    Cardinality::Single,
                ),
                PropertyDescriptor::element(
                    QName::local("scores"),
                    simple_ref("scores"),
                    Cardinality::Single,
                ),
                PropertyDescriptor::element(
                    QName::local("member"),
                    simple_ref("person"),
                    Cardinality::Repeated,
                ),
            ],
        ))
        .build()
}

pub fn unmarshal(xml: &str, root_type: &str) -> Result<Value, BindError> {
    unmarshal_with(xml, root_type, UnmarshalOptions::new())
}

pub fn unmarshal_strict(xml: &str, root_type: &str) -> Result<Value, BindError> {
    unmarshal_with(xml, root_type, UnmarshalOptions::new().strict(true))
}

pub fn unmarshal_with(
    xml: &str,
    root_type: &str,
    options: UnmarshalOptions,
) -> Result<Value, BindError> {
    let catalog = catalog();
    let table = UnmarshalTable::build(&catalog)?;
    Unmarshaler::with_options(&catalog, &table, options).from_str(xml, &QName::local(root_type))
}

/// Marshal using the same element name as the type name.
pub fn marshal(value: &Value, root_type: &str) -> Result<String, BindError> {
    let catalog = catalog();
    Marshaler::new(&catalog).to_string(
        value,
        &QName::local(root_type),
        &QName::local(root_type),
    )
}
