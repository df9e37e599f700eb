//! Error types for the binding runtime.

use std::{
    error::Error,
    fmt::{self, Display},
};

use miette::SourceSpan;

use crate::qname::QName;

/// Error type for marshalling and unmarshalling.
///
/// Every failure aborts the current document traversal; the engine never
/// logs-and-ignores or returns a partially built value.
#[derive(Debug)]
pub struct BindError {
    /// The specific kind of error
    pub(crate) kind: BindErrorKind,
    /// Source code for diagnostics
    pub(crate) source_code: Option<String>,
    /// Primary span where the error occurred
    pub(crate) span: Option<SourceSpan>,
}

impl BindError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &BindErrorKind {
        &self.kind
    }

    /// Create a new error with the given kind.
    pub(crate) fn new(kind: impl Into<BindErrorKind>) -> Self {
        BindError {
            kind: kind.into(),
            source_code: None,
            span: None,
        }
    }

    /// Attach source code to this error for diagnostics.
    pub(crate) fn with_source(mut self, source: impl Into<String>) -> Self {
        if self.source_code.is_none() {
            self.source_code = Some(source.into());
        }
        self
    }

    /// Attach a span to this error for diagnostics.
    pub(crate) fn with_span(mut self, span: impl Into<SourceSpan>) -> Self {
        if self.span.is_none() {
            self.span = Some(span.into());
        }
        self
    }
}

impl Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        write!(f, "{kind}")
    }
}

impl Error for BindError {}

impl<K: Into<BindErrorKind>> From<K> for BindError {
    fn from(value: K) -> Self {
        BindError::new(value)
    }
}

/// Detailed classification of binding errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum BindErrorKind {
    /// A type reference resolved against a loader with no matching entry.
    TypeNotFound(QName),
    /// A type reference was constructed with an empty qualified name.
    InvalidTypeReference(String),
    /// The dispatch table has no codec for a descriptor, or the descriptor's
    /// category data is inconsistent (e.g. a wrapped array with no item slot).
    /// This is a configuration error, not a per-document error.
    UnsupportedTypeCategory {
        /// The offending type's qualified name.
        type_name: QName,
        /// What was inconsistent about it.
        detail: String,
    },
    /// The cursor's end-element identity does not match the recorded
    /// start-element identity. The cursor has desynchronized; continuing
    /// would silently corrupt sibling parsing.
    MalformedStructure {
        /// The start-element identity recorded when the subtree was entered.
        expected: QName,
        /// The end-element identity actually observed.
        got: QName,
    },
    /// A required (single-cardinality) child element was missing when the
    /// intermediary was finalized.
    MissingElement {
        /// The enclosing element.
        parent: QName,
        /// The missing child element.
        name: QName,
    },
    /// A single- or optional-cardinality child element occurred twice
    /// (strict mode only).
    DuplicateElement {
        /// The enclosing element.
        parent: QName,
        /// The repeated child element.
        name: QName,
    },
    /// A child element matched no property (strict mode only).
    UnexpectedElement {
        /// The enclosing element.
        parent: QName,
        /// The unmatched child element.
        name: QName,
    },
    /// An attribute matched no property (strict mode only).
    UnexpectedAttribute {
        /// The enclosing element.
        parent: QName,
        /// The unmatched attribute.
        name: QName,
    },
    /// A union conversion exhausted all member types without a match.
    NoUnionMemberMatched {
        /// The union type.
        type_name: QName,
        /// The lexical value that no member accepted.
        value: String,
    },
    /// A codec was invoked in a context it does not support (e.g.
    /// attribute-unmarshalling a wrapped array). Indicates caller misuse.
    UnsupportedOperation(String),
    /// A lexical value could not be converted to the expected simple type.
    InvalidValue {
        /// The offending lexical value.
        value: String,
        /// The expected lexical space.
        expected: &'static str,
    },
    /// Failed to parse the XML document.
    Parse(String),
    /// Unexpected end of input.
    UnexpectedEof,
    /// Unexpected document event.
    UnexpectedEvent(String),
    /// The cursor was advanced past end-of-input.
    Stream(String),
    /// IO error during marshalling.
    Io(String),
    /// A value's shape does not match the descriptor it is being
    /// marshalled against.
    MarshalMismatch {
        /// What the descriptor called for.
        expected: &'static str,
        /// What the value actually was.
        got: String,
    },
}

impl BindErrorKind {
    /// Returns an error code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            BindErrorKind::TypeNotFound(_) => "bind::type_not_found",
            BindErrorKind::InvalidTypeReference(_) => "bind::invalid_type_reference",
            BindErrorKind::UnsupportedTypeCategory { .. } => "bind::unsupported_type_category",
            BindErrorKind::MalformedStructure { .. } => "bind::malformed_structure",
            BindErrorKind::MissingElement { .. } => "bind::missing_element",
            BindErrorKind::DuplicateElement { .. } => "bind::duplicate_element",
            BindErrorKind::UnexpectedElement { .. } => "bind::unexpected_element",
            BindErrorKind::UnexpectedAttribute { .. } => "bind::unexpected_attribute",
            BindErrorKind::NoUnionMemberMatched { .. } => "bind::no_union_member_matched",
            BindErrorKind::UnsupportedOperation(_) => "bind::unsupported_operation",
            BindErrorKind::InvalidValue { .. } => "bind::invalid_value",
            BindErrorKind::Parse(_) => "bind::parse",
            BindErrorKind::UnexpectedEof => "bind::unexpected_eof",
            BindErrorKind::UnexpectedEvent(_) => "bind::unexpected_event",
            BindErrorKind::Stream(_) => "bind::stream",
            BindErrorKind::Io(_) => "bind::io",
            BindErrorKind::MarshalMismatch { .. } => "bind::marshal_mismatch",
        }
    }
}

impl Display for BindErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindErrorKind::TypeNotFound(name) => {
                write!(f, "no type descriptor found for '{name}'")
            }
            BindErrorKind::InvalidTypeReference(msg) => {
                write!(f, "invalid type reference: {msg}")
            }
            BindErrorKind::UnsupportedTypeCategory { type_name, detail } => {
                write!(f, "no codec for type '{type_name}': {detail}")
            }
            BindErrorKind::MalformedStructure { expected, got } => {
                write!(
                    f,
                    "end element '{got}' does not match start element '{expected}'"
                )
            }
            BindErrorKind::MissingElement { parent, name } => {
                write!(f, "missing required element '{name}' in '{parent}'")
            }
            BindErrorKind::DuplicateElement { parent, name } => {
                write!(f, "duplicate element '{name}' in '{parent}'")
            }
            BindErrorKind::UnexpectedElement { parent, name } => {
                write!(f, "unexpected element '{name}' in '{parent}'")
            }
            BindErrorKind::UnexpectedAttribute { parent, name } => {
                write!(f, "unexpected attribute '{name}' on '{parent}'")
            }
            BindErrorKind::NoUnionMemberMatched { type_name, value } => {
                write!(
                    f,
                    "no member of union '{type_name}' accepts the value '{value}'"
                )
            }
            BindErrorKind::UnsupportedOperation(msg) => {
                write!(f, "unsupported operation: {msg}")
            }
            BindErrorKind::InvalidValue { value, expected } => {
                write!(f, "cannot parse '{value}' as {expected}")
            }
            BindErrorKind::Parse(msg) => write!(f, "XML parse error: {msg}"),
            BindErrorKind::UnexpectedEof => write!(f, "unexpected end of input"),
            BindErrorKind::UnexpectedEvent(msg) => write!(f, "unexpected event: {msg}"),
            BindErrorKind::Stream(msg) => write!(f, "stream error: {msg}"),
            BindErrorKind::Io(msg) => write!(f, "IO error: {msg}"),
            BindErrorKind::MarshalMismatch { expected, got } => {
                write!(f, "descriptor expects {expected}, value is {got}")
            }
        }
    }
}

// ============================================================================
// Diagnostic Implementation
// ============================================================================

impl miette::Diagnostic for BindError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_code
            .as_ref()
            .map(|s| s as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        if let Some(span) = self.span {
            let label = match &self.kind {
                BindErrorKind::MalformedStructure { expected, .. } => {
                    format!("expected end of `{expected}`")
                }
                BindErrorKind::UnexpectedElement { name, .. } => {
                    format!("no property matches `{name}`")
                }
                BindErrorKind::UnexpectedAttribute { name, .. } => {
                    format!("no property matches attribute `{name}`")
                }
                BindErrorKind::DuplicateElement { name, .. } => {
                    format!("`{name}` already seen")
                }
                BindErrorKind::NoUnionMemberMatched { value, .. } => {
                    format!("`{value}` matched no union member")
                }
                BindErrorKind::InvalidValue { expected, .. } => {
                    format!("expected {expected}")
                }
                _ => "error occurred here".to_string(),
            };
            Some(Box::new(std::iter::once(miette::LabeledSpan::at(
                span, label,
            ))))
        } else {
            None
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match &self.kind {
            BindErrorKind::UnexpectedElement { .. } => Some(Box::new(
                "unmatched children are skipped when strict mode is off",
            )),
            BindErrorKind::UnsupportedTypeCategory { .. } => Some(Box::new(
                "the binding catalog and the dispatch table were built inconsistently",
            )),
            _ => None,
        }
    }
}
