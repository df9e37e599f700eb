//! Qualified names.

use std::fmt;

/// A qualified XML name with optional namespace URI.
///
/// Elements and attributes are identified by their namespace URI, not by the
/// prefix used in the document. For example, `tns:price` and `p:price` are
/// the same name if both prefixes resolve to the same URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// The namespace URI, or `None` for "no namespace".
    ///
    /// - Elements without a prefix and no default `xmlns` are in no namespace.
    /// - Attributes without a prefix are always in no namespace (even with default xmlns).
    namespace: Option<String>,
    /// The local name (without prefix).
    local_name: String,
}

impl QName {
    /// Create a qualified name with no namespace.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: name.into(),
        }
    }

    /// Create a qualified name with a namespace.
    pub fn with_ns(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// The local name (without prefix).
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// The namespace URI, or `None` for "no namespace".
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}
