//! The in-memory object graph produced and consumed by the engine.

use crate::qname::QName;

/// A value bound from (or marshalled to) a document subtree.
///
/// The variant set is closed because the schema type system's category set
/// is closed: simple content maps to the scalar variants, wrapped arrays and
/// lists to [`Value::Array`], complex types to [`Value::Complex`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean simple content.
    Bool(bool),
    /// Integer simple content.
    Int(i64),
    /// Decimal simple content.
    Decimal(f64),
    /// Text simple content.
    Text(String),
    /// A wrapped array, a list, or the occurrences of a repeated property.
    Array(Vec<Value>),
    /// A complex value: named properties built from child elements and
    /// attributes.
    Complex(ComplexValue),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<ComplexValue> for Value {
    fn from(v: ComplexValue) -> Self {
        Value::Complex(v)
    }
}

impl Value {
    /// Short description of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "a boolean",
            Value::Int(_) => "an integer",
            Value::Decimal(_) => "a decimal",
            Value::Text(_) => "text",
            Value::Array(_) => "an array",
            Value::Complex(_) => "a complex value",
        }
    }
}

/// A complex value: a sequence of named properties.
///
/// Unmarshalling stores properties in the descriptor's declared order, and
/// marshalling emits them in the descriptor's declared order regardless of
/// the order they were set here — declaration order is part of the wire
/// contract. Equality is therefore order-insensitive: two complex values are
/// equal when they hold the same named properties, however they were
/// assembled.
#[derive(Debug, Clone, Default)]
pub struct ComplexValue {
    properties: Vec<(QName, Value)>,
}

impl ComplexValue {
    /// An empty complex value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any existing entry with the same name.
    pub fn set(&mut self, name: QName, value: impl Into<Value>) {
        let value = value.into();
        if let Some(slot) = self.properties.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.properties.push((name, value));
        }
    }

    /// Builder-style [`set`](ComplexValue::set).
    pub fn with(mut self, name: QName, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Get a property by qualified name.
    pub fn get(&self, name: &QName) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Get a property by local name, ignoring namespaces.
    pub fn get_local(&self, local_name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(n, _)| n.local_name() == local_name)
            .map(|(_, v)| v)
    }

    /// All properties, in the order they were set.
    pub fn properties(&self) -> &[(QName, Value)] {
        &self.properties
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True if no properties are set.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PartialEq for ComplexValue {
    fn eq(&self, other: &Self) -> bool {
        self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}
