//! Value-to-document marshalling.
//!
//! The mirror of unmarshalling: walks a [`Value`] together with the type
//! descriptor it claims to conform to, and emits elements in the
//! descriptor's declared property order. Shape mismatches between value and
//! descriptor are typed errors, never silently coerced.

use std::io::Write;

use crate::descriptor::{Cardinality, PropertyKind, SimpleKind, TypeCategory, TypeDescriptor};
use crate::error::{BindError, BindErrorKind};
use crate::loader::{TypeLoader, TypeRef};
use crate::qname::QName;
use crate::value::Value;

type Result<T> = std::result::Result<T, BindError>;

/// The marshalling engine.
///
/// Stateless apart from the loader; safe to share across threads.
pub struct Marshaler<'a> {
    loader: &'a dyn TypeLoader,
}

impl<'a> Marshaler<'a> {
    /// An engine resolving type references through the given loader.
    pub fn new(loader: &'a dyn TypeLoader) -> Self {
        Self { loader }
    }

    /// Marshal a value to an XML string.
    ///
    /// `root_name` is the document's root element name; `root_type` names
    /// the descriptor the value conforms to.
    pub fn to_string(&self, value: &Value, root_name: &QName, root_type: &QName) -> Result<String> {
        let mut output = Vec::new();
        self.to_writer(&mut output, value, root_name, root_type)?;
        Ok(String::from_utf8(output).expect("XML output should be valid UTF-8"))
    }

    /// Streaming version of [`to_string`](Marshaler::to_string).
    pub fn to_writer<W: Write>(
        &self,
        writer: &mut W,
        value: &Value,
        root_name: &QName,
        root_type: &QName,
    ) -> Result<()> {
        let td = TypeRef::new(root_type.clone()).resolve(self.loader)?;
        self.marshal_element(writer, root_name, value, &td, None)
    }

    fn marshal_element(
        &self,
        w: &mut dyn Write,
        name: &QName,
        value: &Value,
        td: &TypeDescriptor,
        scope_ns: Option<&str>,
    ) -> Result<()> {
        log::trace!("marshalling <{name}> as '{}'", td.name());
        match td.category() {
            TypeCategory::Simple(_) | TypeCategory::Union | TypeCategory::List => {
                let text = self.lexical_of(td, value)?;
                self.open_tag(w, name, scope_ns, &[])?;
                write_escaped(w, &text, false)?;
                self.close_tag(w, name)
            }
            TypeCategory::ComplexByName => self.marshal_complex(w, name, value, td, scope_ns),
            TypeCategory::WrappedArray => self.marshal_wrapped_array(w, name, value, td, scope_ns),
        }
    }

    fn marshal_complex(
        &self,
        w: &mut dyn Write,
        name: &QName,
        value: &Value,
        td: &TypeDescriptor,
        scope_ns: Option<&str>,
    ) -> Result<()> {
        let complex = match value {
            Value::Complex(c) => c,
            other => return Err(mismatch("a complex value", other)),
        };

        // Attributes first, in declared order.
        let mut attributes: Vec<(QName, String)> = Vec::new();
        for prop in td.properties() {
            if prop.kind() != PropertyKind::Attribute {
                continue;
            }
            match complex.get(prop.name()) {
                Some(v) => {
                    let prop_td = prop.type_ref().resolve(self.loader)?;
                    attributes.push((prop.name().clone(), self.lexical_of(&prop_td, v)?));
                }
                None if prop.cardinality() == Cardinality::Single => {
                    return Err(BindError::new(BindErrorKind::MissingElement {
                        parent: td.name().clone(),
                        name: prop.name().clone(),
                    }));
                }
                None => {}
            }
        }

        self.open_tag(w, name, scope_ns, &attributes)?;
        let inner_ns = name.namespace().or(scope_ns);

        for prop in td.properties() {
            if prop.kind() != PropertyKind::Element {
                continue;
            }
            let slot = complex.get(prop.name());
            match (prop.cardinality(), slot) {
                (Cardinality::Repeated, Some(Value::Array(items))) => {
                    let prop_td = prop.type_ref().resolve(self.loader)?;
                    for item in items {
                        self.marshal_element(w, prop.name(), item, &prop_td, inner_ns)?;
                    }
                }
                (Cardinality::Repeated, Some(other)) => {
                    return Err(mismatch("an array", other));
                }
                (Cardinality::Repeated, None) => {}
                (_, Some(v)) => {
                    let prop_td = prop.type_ref().resolve(self.loader)?;
                    self.marshal_element(w, prop.name(), v, &prop_td, inner_ns)?;
                }
                (Cardinality::Single, None) => {
                    return Err(BindError::new(BindErrorKind::MissingElement {
                        parent: td.name().clone(),
                        name: prop.name().clone(),
                    }));
                }
                (Cardinality::Optional, None) => {}
            }
        }

        self.close_tag(w, name)
    }

    fn marshal_wrapped_array(
        &self,
        w: &mut dyn Write,
        name: &QName,
        value: &Value,
        td: &TypeDescriptor,
        scope_ns: Option<&str>,
    ) -> Result<()> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(mismatch("an array", other)),
        };
        let item = td.item().ok_or_else(|| {
            BindError::new(BindErrorKind::UnsupportedTypeCategory {
                type_name: td.name().clone(),
                detail: "wrapped array has no item slot".into(),
            })
        })?;
        let item_td = item.type_ref().resolve(self.loader)?;

        self.open_tag(w, name, scope_ns, &[])?;
        let inner_ns = name.namespace().or(scope_ns);
        for v in items {
            self.marshal_element(w, item.name(), v, &item_td, inner_ns)?;
        }
        self.close_tag(w, name)
    }

    /// The canonical lexical form of a value under a text-valued type.
    fn lexical_of(&self, td: &TypeDescriptor, value: &Value) -> Result<String> {
        match td.category() {
            TypeCategory::Simple(kind) => simple_lexical(kind, value),
            TypeCategory::Union => {
                // First member whose lexical space covers the value's
                // variant wins, mirroring the unmarshal order.
                for member in td.members() {
                    let member_td = member.resolve(self.loader)?;
                    match self.lexical_of(&member_td, value) {
                        Ok(text) => return Ok(text),
                        Err(e) if matches!(e.kind(), BindErrorKind::MarshalMismatch { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
                Err(mismatch("a value covered by a union member", value))
            }
            TypeCategory::List => {
                let items = match value {
                    Value::Array(items) => items,
                    other => return Err(mismatch("an array", other)),
                };
                let item_ref = td.item_type().ok_or_else(|| {
                    BindError::new(BindErrorKind::UnsupportedTypeCategory {
                        type_name: td.name().clone(),
                        detail: "list has no item type".into(),
                    })
                })?;
                let item_td = item_ref.resolve(self.loader)?;
                let mut out = String::new();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&self.lexical_of(&item_td, item)?);
                }
                Ok(out)
            }
            TypeCategory::ComplexByName | TypeCategory::WrappedArray => Err(BindError::new(
                BindErrorKind::UnsupportedOperation(format!(
                    "type '{}' has element content, not character data",
                    td.name()
                )),
            )),
        }
    }

    fn open_tag(
        &self,
        w: &mut dyn Write,
        name: &QName,
        scope_ns: Option<&str>,
        attributes: &[(QName, String)],
    ) -> Result<()> {
        write!(w, "<{}", name.local_name()).map_err(io_err)?;
        if name.namespace() != scope_ns {
            write!(w, " xmlns=\"").map_err(io_err)?;
            write_escaped(w, name.namespace().unwrap_or(""), true)?;
            write!(w, "\"").map_err(io_err)?;
        }
        // Namespaced attributes get generated prefixes declared in place.
        let mut prefixes = 0usize;
        for (attr_name, attr_value) in attributes {
            match attr_name.namespace() {
                Some(ns) => {
                    prefixes += 1;
                    write!(w, " xmlns:n{prefixes}=\"").map_err(io_err)?;
                    write_escaped(w, ns, true)?;
                    write!(w, "\" n{prefixes}:{}=\"", attr_name.local_name()).map_err(io_err)?;
                }
                None => {
                    write!(w, " {}=\"", attr_name.local_name()).map_err(io_err)?;
                }
            }
            write_escaped(w, attr_value, true)?;
            write!(w, "\"").map_err(io_err)?;
        }
        write!(w, ">").map_err(io_err)?;
        Ok(())
    }

    fn close_tag(&self, w: &mut dyn Write, name: &QName) -> Result<()> {
        write!(w, "</{}>", name.local_name()).map_err(io_err)?;
        Ok(())
    }
}

fn simple_lexical(kind: SimpleKind, value: &Value) -> Result<String> {
    match (kind, value) {
        (SimpleKind::Boolean, Value::Bool(b)) => Ok(b.to_string()),
        (SimpleKind::Integer, Value::Int(i)) => Ok(i.to_string()),
        (SimpleKind::Decimal, Value::Decimal(d)) => Ok(d.to_string()),
        (SimpleKind::Text, Value::Text(t)) => Ok(t.clone()),
        (kind, other) => Err(BindError::new(BindErrorKind::MarshalMismatch {
            expected: kind.lexical_space(),
            got: other.kind_name().to_string(),
        })),
    }
}

fn mismatch(expected: &'static str, got: &Value) -> BindError {
    BindError::new(BindErrorKind::MarshalMismatch {
        expected,
        got: got.kind_name().to_string(),
    })
}

fn io_err(e: std::io::Error) -> BindError {
    BindError::new(BindErrorKind::Io(e.to_string()))
}

/// Write text with XML special characters escaped. Unescaped runs are
/// written in one call rather than byte by byte.
fn write_escaped(w: &mut dyn Write, text: &str, in_attribute: bool) -> Result<()> {
    let mut rest = text;
    loop {
        let stop = rest
            .find(|c| matches!(c, '&' | '<' | '>') || (in_attribute && c == '"'));
        match stop {
            Some(i) => {
                w.write_all(rest[..i].as_bytes()).map_err(io_err)?;
                let escaped: &[u8] = match rest.as_bytes()[i] {
                    b'&' => b"&amp;",
                    b'<' => b"&lt;",
                    b'>' => b"&gt;",
                    _ => b"&quot;",
                };
                w.write_all(escaped).map_err(io_err)?;
                rest = &rest[i + 1..];
            }
            None => {
                w.write_all(rest.as_bytes()).map_err(io_err)?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(text: &str, in_attribute: bool) -> String {
        let mut buf = Vec::new();
        write_escaped(&mut buf, text, in_attribute).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_escapes_markup_but_not_quotes() {
        assert_eq!(escaped("a < b & \"c\" > d", false), "a &lt; b &amp; \"c\" &gt; d");
    }

    #[test]
    fn attribute_escapes_quotes_too() {
        assert_eq!(escaped("a \"b\" & c", true), "a &quot;b&quot; &amp; c");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(escaped("hello world 123", true), "hello world 123");
    }

    #[test]
    fn simple_lexical_rejects_wrong_variant() {
        let err = simple_lexical(SimpleKind::Integer, &Value::Text("x".into())).unwrap_err();
        assert!(matches!(err.kind(), BindErrorKind::MarshalMismatch { .. }));
        assert_eq!(simple_lexical(SimpleKind::Boolean, &Value::Bool(true)).unwrap(), "true");
    }
}
