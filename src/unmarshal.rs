//! Document-to-value unmarshalling.
//!
//! Dispatch is category-driven: an [`UnmarshalTable`] is built once from the
//! binding catalog, validating every descriptor eagerly, and maps each type
//! to the codec for its category. The codecs themselves are a closed enum,
//! not open virtual dispatch, because the schema type system's category set
//! is closed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cursor::{DocumentCursor, EventCursor};
use crate::descriptor::{
    BindingCatalog, Cardinality, PropertyDescriptor, PropertyKind, SimpleKind, TypeCategory,
    TypeDescriptor,
};
use crate::error::{BindError, BindErrorKind};
use crate::loader::{TypeLoader, TypeRef};
use crate::qname::QName;
use crate::value::{ComplexValue, Value};

type Result<T> = std::result::Result<T, BindError>;

/// Options controlling unmarshalling behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmarshalOptions {
    strict: bool,
}

impl UnmarshalOptions {
    /// Default options: lenient, unmatched children and attributes are
    /// skipped.
    pub fn new() -> Self {
        Self::default()
    }

    /// When `true`, a child element or attribute that matches no property
    /// fails the whole operation instead of being skipped, and a duplicate
    /// occurrence of a single-valued child is an error instead of
    /// last-wins.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Whether strict mode is on.
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

// ============================================================================
// Dispatch table
// ============================================================================

/// The codec selected for a type. One variant per type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmarshaller {
    /// Text content through a lexical space.
    Simple(SimpleKind),
    /// Children matched by qualified name.
    ComplexByName,
    /// One container element wrapping repeated item elements.
    WrappedArray,
    /// First member type whose lexical space accepts the text wins.
    Union,
    /// Whitespace-separated tokens of the item type.
    List,
}

impl Unmarshaller {
    fn name(self) -> &'static str {
        match self {
            Unmarshaller::Simple(_) => "simple",
            Unmarshaller::ComplexByName => "complex-by-name",
            Unmarshaller::WrappedArray => "wrapped-array",
            Unmarshaller::Union => "union",
            Unmarshaller::List => "list",
        }
    }
}

/// The frozen map from type name to codec.
///
/// Building the table validates every descriptor in the catalog; a
/// descriptor whose category data is inconsistent (a wrapped array with no
/// item slot, a union member that is not text-valued) fails construction
/// with `UnsupportedTypeCategory` instead of failing later mid-document.
#[derive(Debug)]
pub struct UnmarshalTable {
    codecs: HashMap<QName, Unmarshaller>,
}

impl UnmarshalTable {
    /// Build the table from a catalog, checking every descriptor.
    pub fn build(catalog: &BindingCatalog) -> Result<Self> {
        let mut codecs = HashMap::new();
        for (name, td) in catalog.iter() {
            let codec = Self::check(catalog, td)?;
            codecs.insert(name.clone(), codec);
        }
        Ok(Self { codecs })
    }

    fn config_err(td: &TypeDescriptor, detail: impl Into<String>) -> BindError {
        BindError::new(BindErrorKind::UnsupportedTypeCategory {
            type_name: td.name().clone(),
            detail: detail.into(),
        })
    }

    fn check(catalog: &BindingCatalog, td: &TypeDescriptor) -> Result<Unmarshaller> {
        match td.category() {
            TypeCategory::Simple(kind) => Ok(Unmarshaller::Simple(kind)),
            TypeCategory::ComplexByName => {
                for prop in td.properties() {
                    if prop.kind() == PropertyKind::Attribute
                        && prop.cardinality() == Cardinality::Repeated
                    {
                        return Err(Self::config_err(
                            td,
                            format!("attribute property '{}' cannot repeat", prop.name()),
                        ));
                    }
                }
                Ok(Unmarshaller::ComplexByName)
            }
            TypeCategory::WrappedArray => {
                let item = td
                    .item()
                    .ok_or_else(|| Self::config_err(td, "wrapped array has no item slot"))?;
                if item.kind() != PropertyKind::Element {
                    return Err(Self::config_err(
                        td,
                        "wrapped array item must be an element",
                    ));
                }
                Ok(Unmarshaller::WrappedArray)
            }
            TypeCategory::Union => {
                if td.members().is_empty() {
                    return Err(Self::config_err(td, "union has no member types"));
                }
                for member in td.members() {
                    let member_td = catalog.get(member.name()).ok_or_else(|| {
                        Self::config_err(
                            td,
                            format!("union member '{}' is not in the catalog", member.name()),
                        )
                    })?;
                    if !matches!(
                        member_td.category(),
                        TypeCategory::Simple(_) | TypeCategory::List
                    ) {
                        return Err(Self::config_err(
                            td,
                            format!("union member '{}' is not text-valued", member.name()),
                        ));
                    }
                }
                Ok(Unmarshaller::Union)
            }
            TypeCategory::List => {
                let item_type = td
                    .item_type()
                    .ok_or_else(|| Self::config_err(td, "list has no item type"))?;
                let item_td = catalog.get(item_type.name()).ok_or_else(|| {
                    Self::config_err(
                        td,
                        format!("list item type '{}' is not in the catalog", item_type.name()),
                    )
                })?;
                if !matches!(item_td.category(), TypeCategory::Simple(_)) {
                    return Err(Self::config_err(
                        td,
                        format!("list item type '{}' is not simple", item_type.name()),
                    ));
                }
                Ok(Unmarshaller::List)
            }
        }
    }

    /// Select the codec for a descriptor.
    pub fn lookup(&self, td: &TypeDescriptor) -> Result<Unmarshaller> {
        self.codecs.get(td.name()).copied().ok_or_else(|| {
            Self::config_err(td, "type is not registered in the dispatch table")
        })
    }
}

// ============================================================================
// Intermediary
// ============================================================================

/// Call-scoped accumulator for one complex element's properties.
///
/// Slots are parallel to the descriptor's declared property order, so the
/// finished value lists properties in declared order no matter what order
/// the document supplied them in.
struct Intermediary<'d> {
    descriptor: &'d TypeDescriptor,
    slots: Vec<Slot>,
}

enum Slot {
    Empty,
    One(Value),
    Many(Vec<Value>),
}

impl<'d> Intermediary<'d> {
    fn begin(descriptor: &'d TypeDescriptor) -> Self {
        let slots = descriptor
            .properties()
            .iter()
            .map(|_| Slot::Empty)
            .collect();
        Self { descriptor, slots }
    }

    /// Record one occurrence of the property at `index`.
    ///
    /// A second occurrence of a single-valued property is an error in
    /// strict mode and last-wins otherwise.
    fn set(&mut self, index: usize, value: Value, strict: bool) -> Result<()> {
        let prop = &self.descriptor.properties()[index];
        match prop.cardinality() {
            Cardinality::Repeated => match &mut self.slots[index] {
                Slot::Many(items) => items.push(value),
                slot => *slot = Slot::Many(vec![value]),
            },
            Cardinality::Single | Cardinality::Optional => {
                if !matches!(self.slots[index], Slot::Empty) && strict {
                    return Err(BindError::new(BindErrorKind::DuplicateElement {
                        parent: self.descriptor.name().clone(),
                        name: prop.name().clone(),
                    }));
                }
                self.slots[index] = Slot::One(value);
            }
        }
        Ok(())
    }

    /// Check required slots and produce the finished value.
    fn end(self) -> Result<ComplexValue> {
        let mut complex = ComplexValue::new();
        for (prop, slot) in self.descriptor.properties().iter().zip(self.slots) {
            match slot {
                Slot::One(value) => complex.set(prop.name().clone(), value),
                Slot::Many(items) => complex.set(prop.name().clone(), Value::Array(items)),
                Slot::Empty => match prop.cardinality() {
                    Cardinality::Single => {
                        return Err(BindError::new(BindErrorKind::MissingElement {
                            parent: self.descriptor.name().clone(),
                            name: prop.name().clone(),
                        }));
                    }
                    Cardinality::Optional => {}
                    Cardinality::Repeated => {
                        complex.set(prop.name().clone(), Value::Array(Vec::new()));
                    }
                },
            }
        }
        Ok(complex)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The unmarshalling engine.
///
/// Stateless apart from its configuration: one engine may drive any number
/// of concurrent operations, each over its own cursor.
pub struct Unmarshaler<'a> {
    loader: &'a dyn TypeLoader,
    table: &'a UnmarshalTable,
    options: UnmarshalOptions,
}

impl<'a> Unmarshaler<'a> {
    /// An engine with default (lenient) options.
    pub fn new(loader: &'a dyn TypeLoader, table: &'a UnmarshalTable) -> Self {
        Self {
            loader,
            table,
            options: UnmarshalOptions::new(),
        }
    }

    /// An engine with explicit options.
    pub fn with_options(
        loader: &'a dyn TypeLoader,
        table: &'a UnmarshalTable,
        options: UnmarshalOptions,
    ) -> Self {
        Self {
            loader,
            table,
            options,
        }
    }

    /// Unmarshal a whole document: parse `input`, bind the root element
    /// against the named type, and return the resulting value.
    pub fn from_str(&self, input: &str, root_type: &QName) -> Result<Value> {
        let mut cursor = EventCursor::from_str(input)?;
        self.from_cursor(&mut cursor, root_type)
            .map_err(|e| e.with_source(input))
    }

    /// Unmarshal from an already-positioned cursor. The cursor must be at
    /// (or before) the root start-element; afterwards it sits one event past
    /// the root's end-element.
    pub fn from_cursor(
        &self,
        cursor: &mut dyn DocumentCursor,
        root_type: &QName,
    ) -> Result<Value> {
        if !cursor.advance_to_next_start_element()? {
            return Err(BindError::new(BindErrorKind::UnexpectedEof));
        }
        self.unmarshal_element(cursor, &TypeRef::new(root_type.clone()))
    }

    /// Bind the element at the cursor against the declared type, honoring an
    /// `xsi:type` substitution hint when the document carries one.
    fn unmarshal_element(
        &self,
        cursor: &mut dyn DocumentCursor,
        declared: &TypeRef,
    ) -> Result<Value> {
        let td = match cursor.type_attribute() {
            Some(hint) => {
                log::trace!("substituting '{hint}' for declared type '{}'", declared.name());
                TypeRef::new(hint.clone()).resolve(self.loader)
            }
            None => declared.resolve(self.loader),
        }
        .map_err(|e| attach_span(e, cursor))?;
        self.unmarshal_type(cursor, &td)
    }

    fn unmarshal_type(
        &self,
        cursor: &mut dyn DocumentCursor,
        td: &Arc<TypeDescriptor>,
    ) -> Result<Value> {
        let codec = self.table.lookup(td)?;
        if let Some(name) = cursor.element_name() {
            log::trace!("unmarshalling <{name}> as '{}' ({})", td.name(), codec.name());
        }
        match codec {
            Unmarshaller::Simple(_) | Unmarshaller::Union | Unmarshaller::List => {
                let span = cursor.span();
                let text = consume_text_content(cursor)?;
                self.convert_text(td, &text)
                    .map_err(|e| match span {
                        Some(span) => e.with_span(span),
                        None => e,
                    })
            }
            Unmarshaller::ComplexByName => self.unmarshal_complex(cursor, td),
            Unmarshaller::WrappedArray => self.unmarshal_wrapped_array(cursor, td),
        }
    }

    fn unmarshal_complex(
        &self,
        cursor: &mut dyn DocumentCursor,
        td: &Arc<TypeDescriptor>,
    ) -> Result<Value> {
        let start = expect_start(cursor)?;
        let mut inter = Intermediary::begin(td);

        let attributes = cursor.attributes().to_vec();
        for (attr_name, attr_value) in &attributes {
            let matched = td
                .properties()
                .iter()
                .position(|p| p.kind() == PropertyKind::Attribute && p.name() == attr_name);
            match matched {
                Some(index) => {
                    let prop = &td.properties()[index];
                    let prop_td = prop
                        .type_ref()
                        .resolve(self.loader)
                        .map_err(|e| attach_span(e, cursor))?;
                    let value = self
                        .unmarshal_attribute(attr_value, &prop_td)
                        .map_err(|e| attach_span(e, cursor))?;
                    inter.set(index, value, self.options.is_strict())?;
                }
                None if self.options.is_strict() => {
                    return Err(err_at(
                        cursor,
                        BindErrorKind::UnexpectedAttribute {
                            parent: start.clone(),
                            name: attr_name.clone(),
                        },
                    ));
                }
                None => {
                    log::trace!("skipping unmatched attribute '{attr_name}' on <{start}>");
                }
            }
        }

        cursor.next()?;
        while cursor.advance_to_next_start_element()? {
            let child = expect_start(cursor)?;
            let matched = td
                .properties()
                .iter()
                .position(|p| p.kind() == PropertyKind::Element && p.name() == &child);
            match matched {
                Some(index) => {
                    let prop = &td.properties()[index];
                    let value = self.fill_element_prop(cursor, prop)?;
                    inter.set(index, value, self.options.is_strict())?;
                }
                None if self.options.is_strict() => {
                    return Err(err_at(
                        cursor,
                        BindErrorKind::UnexpectedElement {
                            parent: start.clone(),
                            name: child,
                        },
                    ));
                }
                None => {
                    log::trace!("skipping unmatched element <{child}> in <{start}>");
                    skip_element(cursor)?;
                }
            }
        }

        assert_end(cursor, &start)?;
        if cursor.has_next() {
            cursor.next()?;
        }
        let span = cursor.span();
        inter.end().map(Value::Complex).map_err(|e| match span {
            Some(span) => e.with_span(span),
            None => e,
        })
    }

    fn unmarshal_wrapped_array(
        &self,
        cursor: &mut dyn DocumentCursor,
        td: &Arc<TypeDescriptor>,
    ) -> Result<Value> {
        let start = expect_start(cursor)?;
        let item = td.item().ok_or_else(|| {
            BindError::new(BindErrorKind::UnsupportedTypeCategory {
                type_name: td.name().clone(),
                detail: "wrapped array has no item slot".into(),
            })
        })?;

        let mut items = Vec::new();
        cursor.next()?;
        while cursor.advance_to_next_start_element()? {
            let child = expect_start(cursor)?;
            if item.name() == &child {
                items.push(self.fill_element_prop(cursor, item)?);
            } else if self.options.is_strict() {
                return Err(err_at(
                    cursor,
                    BindErrorKind::UnexpectedElement {
                        parent: start.clone(),
                        name: child,
                    },
                ));
            } else {
                log::trace!("skipping unmatched element <{child}> in <{start}>");
                skip_element(cursor)?;
            }
        }

        assert_end(cursor, &start)?;
        if cursor.has_next() {
            cursor.next()?;
        }
        Ok(Value::Array(items))
    }

    /// Bind one matched child element: resolve its property's type through
    /// the loader (fresh lookup every call) and recurse.
    fn fill_element_prop(
        &self,
        cursor: &mut dyn DocumentCursor,
        prop: &PropertyDescriptor,
    ) -> Result<Value> {
        self.unmarshal_element(cursor, prop.type_ref())
    }

    /// Attributes carry text only; structured categories cannot appear here.
    fn unmarshal_attribute(&self, text: &str, td: &Arc<TypeDescriptor>) -> Result<Value> {
        match self.table.lookup(td)? {
            Unmarshaller::Simple(_) | Unmarshaller::Union | Unmarshaller::List => {
                self.convert_text(td, text)
            }
            Unmarshaller::ComplexByName | Unmarshaller::WrappedArray => {
                Err(BindError::new(BindErrorKind::UnsupportedOperation(format!(
                    "type '{}' has element content and cannot bind an attribute",
                    td.name()
                ))))
            }
        }
    }

    /// Convert character data by a text-valued type (simple, union, list).
    fn convert_text(&self, td: &TypeDescriptor, text: &str) -> Result<Value> {
        match td.category() {
            TypeCategory::Simple(kind) => lexical_to_value(kind, text),
            TypeCategory::Union => {
                for member in td.members() {
                    let member_td = member.resolve(self.loader)?;
                    match self.convert_text(&member_td, text) {
                        Ok(value) => {
                            log::trace!(
                                "union '{}' accepted value via member '{}'",
                                td.name(),
                                member.name()
                            );
                            return Ok(value);
                        }
                        // A lexical mismatch just means "try the next
                        // member"; anything else is an infrastructure
                        // failure and propagates.
                        Err(e)
                            if matches!(
                                e.kind(),
                                BindErrorKind::InvalidValue { .. }
                                    | BindErrorKind::NoUnionMemberMatched { .. }
                            ) => {}
                        Err(e) => return Err(e),
                    }
                }
                Err(BindError::new(BindErrorKind::NoUnionMemberMatched {
                    type_name: td.name().clone(),
                    value: text.to_string(),
                }))
            }
            TypeCategory::List => {
                let item_ref = td.item_type().ok_or_else(|| {
                    BindError::new(BindErrorKind::UnsupportedTypeCategory {
                        type_name: td.name().clone(),
                        detail: "list has no item type".into(),
                    })
                })?;
                let item_td = item_ref.resolve(self.loader)?;
                let mut items = Vec::new();
                for token in text.split_whitespace() {
                    items.push(self.convert_text(&item_td, token)?);
                }
                Ok(Value::Array(items))
            }
            TypeCategory::ComplexByName | TypeCategory::WrappedArray => Err(BindError::new(
                BindErrorKind::UnsupportedOperation(format!(
                    "type '{}' has element content, not character data",
                    td.name()
                )),
            )),
        }
    }
}

// ============================================================================
// Shared cursor helpers
// ============================================================================

fn err_at(cursor: &dyn DocumentCursor, kind: BindErrorKind) -> BindError {
    attach_span(BindError::new(kind), cursor)
}

fn attach_span(err: BindError, cursor: &dyn DocumentCursor) -> BindError {
    match cursor.span() {
        Some(span) => err.with_span(span),
        None => err,
    }
}

fn expect_start(cursor: &dyn DocumentCursor) -> Result<QName> {
    if !cursor.is_start_element() {
        return Err(err_at(
            cursor,
            BindErrorKind::UnexpectedEvent("expected a start element".into()),
        ));
    }
    cursor
        .element_name()
        .cloned()
        .ok_or_else(|| BindError::new(BindErrorKind::UnexpectedEvent("unnamed element".into())))
}

/// Verify that the cursor sits at the end-element matching the recorded
/// start identity. Any other outcome means the cursor has desynchronized
/// and continuing would corrupt sibling parsing.
fn assert_end(cursor: &dyn DocumentCursor, start: &QName) -> Result<()> {
    if !cursor.is_end_element() {
        return Err(err_at(cursor, BindErrorKind::UnexpectedEof));
    }
    match cursor.element_name() {
        Some(end) if end == start => Ok(()),
        Some(end) => Err(err_at(
            cursor,
            BindErrorKind::MalformedStructure {
                expected: start.clone(),
                got: end.clone(),
            },
        )),
        None => Err(BindError::new(BindErrorKind::UnexpectedEvent(
            "unnamed end element".into(),
        ))),
    }
}

/// Consume a text-only element: cursor at its start-element on entry, one
/// past its end-element on exit (when a next event exists). Child elements
/// inside are a structural error.
fn consume_text_content(cursor: &mut dyn DocumentCursor) -> Result<String> {
    let start = expect_start(cursor)?;
    cursor.next()?;
    let mut text = String::new();
    loop {
        if cursor.is_text() {
            if let Some(chunk) = cursor.text() {
                text.push_str(chunk);
            }
            cursor.next()?;
        } else if cursor.is_end_element() {
            assert_end(cursor, &start)?;
            break;
        } else if cursor.is_start_element() {
            return Err(err_at(
                cursor,
                BindErrorKind::UnexpectedEvent(format!(
                    "element inside text-only content of <{start}>"
                )),
            ));
        } else {
            return Err(err_at(cursor, BindErrorKind::UnexpectedEof));
        }
    }
    if cursor.has_next() {
        cursor.next()?;
    }
    Ok(text)
}

/// Skip the element at the cursor and its whole subtree, leaving the cursor
/// one past its end-element.
fn skip_element(cursor: &mut dyn DocumentCursor) -> Result<()> {
    let mut depth = 0usize;
    loop {
        if cursor.is_start_element() {
            depth += 1;
        } else if cursor.is_end_element() {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                if cursor.has_next() {
                    cursor.next()?;
                }
                return Ok(());
            }
        } else if !cursor.has_next() {
            return Err(err_at(cursor, BindErrorKind::UnexpectedEof));
        }
        cursor.next()?;
    }
}

/// Convert a lexical value by a simple type's lexical space.
pub(crate) fn lexical_to_value(kind: SimpleKind, text: &str) -> Result<Value> {
    let invalid = || {
        BindError::new(BindErrorKind::InvalidValue {
            value: text.to_string(),
            expected: kind.lexical_space(),
        })
    };
    match kind {
        SimpleKind::Boolean => match text.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        SimpleKind::Integer => text.trim().parse::<i64>().map(Value::Int).map_err(|_| invalid()),
        SimpleKind::Decimal => {
            let trimmed = text.trim();
            let parsed = trimmed.parse::<f64>().map_err(|_| invalid())?;
            // "inf" and "NaN" parse as f64 but are outside the decimal
            // lexical space.
            if !parsed.is_finite() {
                return Err(invalid());
            }
            Ok(Value::Decimal(parsed))
        }
        SimpleKind::Text => Ok(Value::Text(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_lexical_space() {
        assert_eq!(
            lexical_to_value(SimpleKind::Boolean, "true").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            lexical_to_value(SimpleKind::Boolean, " 0 ").unwrap(),
            Value::Bool(false)
        );
        assert!(lexical_to_value(SimpleKind::Boolean, "yes").is_err());
        assert!(lexical_to_value(SimpleKind::Boolean, "TRUE").is_err());
    }

    #[test]
    fn integer_lexical_space() {
        assert_eq!(
            lexical_to_value(SimpleKind::Integer, "-42").unwrap(),
            Value::Int(-42)
        );
        assert_eq!(
            lexical_to_value(SimpleKind::Integer, "+7").unwrap(),
            Value::Int(7)
        );
        assert!(lexical_to_value(SimpleKind::Integer, "4.2").is_err());
    }

    #[test]
    fn decimal_rejects_non_finite() {
        assert_eq!(
            lexical_to_value(SimpleKind::Decimal, "3.25").unwrap(),
            Value::Decimal(3.25)
        );
        assert!(lexical_to_value(SimpleKind::Decimal, "inf").is_err());
        assert!(lexical_to_value(SimpleKind::Decimal, "NaN").is_err());
    }

    #[test]
    fn text_is_not_trimmed() {
        assert_eq!(
            lexical_to_value(SimpleKind::Text, "  a b  ").unwrap(),
            Value::Text("  a b  ".to_string())
        );
    }
}
