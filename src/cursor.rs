//! The pull-style document cursor.
//!
//! The engine consumes documents through the [`DocumentCursor`] trait: a
//! single-direction, never-rewindable cursor over element/text events. Any
//! streaming parser can sit behind it; [`EventCursor`] is the built-in
//! implementation over quick-xml.
//!
//! Every cursor operation mutates position. A cursor must never be driven by
//! more than one logical unmarshal operation at a time — it has no internal
//! synchronization, which `&mut self` on the advancing operations enforces.

use miette::SourceSpan;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::error::{BindError, BindErrorKind};
use crate::qname::QName;

pub(crate) type Result<T> = std::result::Result<T, BindError>;

const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Pull-based, single-direction streaming interface over a document.
///
/// The central protocol invariant of the whole engine: a codec invoked at a
/// start-element must leave the cursor exactly one event past the matching
/// end-element. Violating this corrupts all subsequent siblings' parsing.
pub trait DocumentCursor {
    /// True if the current event is a start-element.
    fn is_start_element(&self) -> bool;
    /// True if the current event is an end-element.
    fn is_end_element(&self) -> bool;
    /// True if the current event is text content.
    fn is_text(&self) -> bool;
    /// True if there is at least one event after the current one.
    fn has_next(&self) -> bool;

    /// The current element's qualified name, if the current event is a
    /// start- or end-element.
    fn element_name(&self) -> Option<&QName>;
    /// The current text content, if the current event is text.
    fn text(&self) -> Option<&str>;
    /// The current start-element's attributes (`xmlns` and `xsi:type` are
    /// consumed by the cursor and never appear here).
    fn attributes(&self) -> &[(QName, String)];
    /// The current start-element's resolved `xsi:type` hint, if any.
    fn type_attribute(&self) -> Option<&QName>;
    /// A source span for the current event, for diagnostics.
    fn span(&self) -> Option<SourceSpan>;

    /// Advance one event. Fails with a stream error past end-of-input.
    fn next(&mut self) -> Result<()>;

    /// Skip non-start events (end-elements of exhausted children,
    /// whitespace text) until either a start-element is found (returns
    /// `true`, cursor positioned there) or the enclosing end-element is
    /// reached (returns `false`, cursor positioned at it). At document level
    /// the end of input counts as the enclosing end.
    fn advance_to_next_start_element(&mut self) -> Result<bool> {
        loop {
            if self.is_start_element() {
                return Ok(true);
            }
            if self.is_end_element() || !self.has_next() {
                return Ok(false);
            }
            self.next()?;
        }
    }

    /// The current element's local name.
    fn local_name(&self) -> Option<&str> {
        self.element_name().map(|n| n.local_name())
    }

    /// The current element's namespace URI.
    fn namespace_uri(&self) -> Option<&str> {
        self.element_name().and_then(|n| n.namespace())
    }
}

// ============================================================================
// Owned events
// ============================================================================

/// A document event with owned, namespace-resolved data.
#[derive(Debug, Clone)]
enum OwnedEvent {
    Start {
        name: QName,
        attributes: Vec<(QName, String)>,
        type_hint: Option<QName>,
    },
    End {
        name: QName,
    },
    Text {
        content: String,
    },
    Eof,
}

#[derive(Debug, Clone)]
struct SpannedEvent {
    event: OwnedEvent,
    /// Byte offset in the original input where this event starts.
    offset: usize,
    /// Length of the event in bytes.
    len: usize,
}

impl SpannedEvent {
    fn span(&self) -> SourceSpan {
        SourceSpan::from((self.offset, self.len))
    }
}

// ============================================================================
// Event collector
// ============================================================================

/// Collects all events from the parser upfront, resolving namespaces while
/// the prefix scope is still known. Empty elements are expanded into a
/// start/end pair so codec logic is uniform.
struct EventCollector<'input> {
    reader: NsReader<&'input [u8]>,
    input: &'input str,
}

impl<'input> EventCollector<'input> {
    fn new(input: &'input str) -> Self {
        let mut reader = NsReader::from_str(input);
        // trim_text(true) would drop whitespace-only text events, which
        // breaks entity handling. Whitespace is filtered at consumption.
        reader.config_mut().trim_text(false);
        Self { reader, input }
    }

    fn resolve_ns(resolve: ResolveResult<'_>) -> Option<String> {
        match resolve {
            ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                log::warn!(
                    "unknown namespace prefix: {}",
                    String::from_utf8_lossy(&prefix)
                );
                None
            }
        }
    }

    fn collect_all(mut self) -> Result<Vec<SpannedEvent>> {
        let mut events = Vec::new();
        let mut buf = Vec::new();

        loop {
            let offset = self.reader.buffer_position() as usize;
            let (resolve, event) = match self.reader.read_resolved_event_into(&mut buf) {
                Ok(pair) => pair,
                Err(e) => return Err(parse_err(self.input, e)),
            };
            // Convert the namespace to owned right away: the resolve result
            // keeps the reader mutably borrowed for as long as it lives.
            let ns = Self::resolve_ns(resolve);

            match event {
                Event::Start(ref e) => {
                    let (name, attributes, type_hint) = self.collect_start(ns, e)?;
                    let len = self.reader.buffer_position() as usize - offset;
                    events.push(SpannedEvent {
                        event: OwnedEvent::Start {
                            name,
                            attributes,
                            type_hint,
                        },
                        offset,
                        len,
                    });
                }
                Event::Empty(ref e) => {
                    // Expand into a start/end pair at the same span.
                    let (name, attributes, type_hint) = self.collect_start(ns, e)?;
                    let len = self.reader.buffer_position() as usize - offset;
                    events.push(SpannedEvent {
                        event: OwnedEvent::Start {
                            name: name.clone(),
                            attributes,
                            type_hint,
                        },
                        offset,
                        len,
                    });
                    events.push(SpannedEvent {
                        event: OwnedEvent::End { name },
                        offset,
                        len,
                    });
                }
                Event::End(ref e) => {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    let name = match ns {
                        Some(uri) => QName::with_ns(uri, local),
                        None => QName::local(local),
                    };
                    let len = self.reader.buffer_position() as usize - offset;
                    events.push(SpannedEvent {
                        event: OwnedEvent::End { name },
                        offset,
                        len,
                    });
                }
                Event::Text(e) => {
                    let content = e.decode().map_err(|e| parse_err(self.input, e))?;
                    let len = self.reader.buffer_position() as usize - offset;
                    events.push(SpannedEvent {
                        event: OwnedEvent::Text {
                            content: content.into_owned(),
                        },
                        offset,
                        len,
                    });
                }
                Event::CData(e) => {
                    let content = String::from_utf8_lossy(&e).into_owned();
                    let len = self.reader.buffer_position() as usize - offset;
                    events.push(SpannedEvent {
                        event: OwnedEvent::Text { content },
                        offset,
                        len,
                    });
                }
                Event::GeneralRef(e) => {
                    // Entity references are reported separately in
                    // quick-xml 0.38+; resolve and fold into text.
                    let raw = e.decode().map_err(|e| parse_err(self.input, e))?;
                    let content = resolve_entity(&raw, self.input)?;
                    let len = self.reader.buffer_position() as usize - offset;
                    events.push(SpannedEvent {
                        event: OwnedEvent::Text { content },
                        offset,
                        len,
                    });
                }
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => {
                    events.push(SpannedEvent {
                        event: OwnedEvent::Eof,
                        offset,
                        len: 0,
                    });
                    break;
                }
            }
            buf.clear();
        }

        Ok(events)
    }

    fn collect_start(
        &self,
        ns: Option<String>,
        e: &BytesStart<'_>,
    ) -> Result<(QName, Vec<(QName, String)>, Option<QName>)> {
        let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let name = match ns {
            Some(uri) => QName::with_ns(uri, local),
            None => QName::local(local),
        };

        let mut attributes = Vec::new();
        let mut type_hint = None;
        for attr in e.attributes() {
            let attr = attr.map_err(|e| parse_err(self.input, e))?;

            if is_xml_namespace_attribute(&attr.key) {
                continue;
            }

            let (attr_resolve, _) = self.reader.resolve_attribute(attr.key);
            let attr_ns = Self::resolve_ns(attr_resolve);
            let attr_local = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| parse_err(self.input, e))?
                .into_owned();

            if attr_ns.as_deref() == Some(XSI_NS) && attr_local == "type" {
                // Resolve the QName-valued hint while the prefix scope is
                // still in force; an unprefixed value takes the default
                // namespace, per QName-in-content rules.
                let (hint_resolve, hint_local) =
                    self.reader.resolve_element(quick_xml::name::QName(value.as_bytes()));
                let hint_ns = Self::resolve_ns(hint_resolve);
                let hint_local = String::from_utf8_lossy(hint_local.as_ref()).into_owned();
                type_hint = Some(match hint_ns {
                    Some(uri) => QName::with_ns(uri, hint_local),
                    None => QName::local(hint_local),
                });
                continue;
            }

            let qname = match attr_ns {
                Some(uri) => QName::with_ns(uri, attr_local),
                None => QName::local(attr_local),
            };
            attributes.push((qname, value));
        }

        Ok((name, attributes, type_hint))
    }
}

fn parse_err(input: &str, e: impl std::fmt::Display) -> BindError {
    BindError::new(BindErrorKind::Parse(e.to_string())).with_source(input)
}

/// Check if the attribute is reserved for XML namespace declarations.
fn is_xml_namespace_attribute(name: &quick_xml::name::QName<'_>) -> bool {
    match name.prefix() {
        Some(prefix) => prefix.as_ref() == b"xmlns",
        None => name.local_name().as_ref() == b"xmlns",
    }
}

/// Resolve a general entity reference to its character value.
/// Handles both named entities (lt, gt, amp, etc.) and numeric entities
/// (&#10;, &#x09;, etc.)
fn resolve_entity(raw: &str, input: &str) -> Result<String> {
    if let Some(resolved) = resolve_xml_entity(raw) {
        return Ok(resolved.into());
    }

    if let Some(rest) = raw.strip_prefix('#') {
        let code = if let Some(hex) = rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).map_err(|_| {
                BindError::new(BindErrorKind::Parse(format!(
                    "invalid hex numeric entity: #{rest}"
                )))
                .with_source(input)
            })?
        } else {
            rest.parse::<u32>().map_err(|_| {
                BindError::new(BindErrorKind::Parse(format!(
                    "invalid decimal numeric entity: #{rest}"
                )))
                .with_source(input)
            })?
        };

        let ch = char::from_u32(code).ok_or_else(|| {
            BindError::new(BindErrorKind::Parse(format!(
                "invalid Unicode code point: {code}"
            )))
            .with_source(input)
        })?;
        return Ok(ch.to_string());
    }

    // Unknown entity, keep as-is with & and ;
    Ok(format!("&{raw};"))
}

// ============================================================================
// Event cursor
// ============================================================================

/// A [`DocumentCursor`] over a pre-collected, namespace-resolved event
/// stream.
pub struct EventCursor {
    events: Vec<SpannedEvent>,
    pos: usize,
}

impl EventCursor {
    /// Parse a document and position the cursor at its first event.
    pub fn from_str(input: &str) -> Result<Self> {
        let events = EventCollector::new(input).collect_all()?;
        Ok(Self { events, pos: 0 })
    }

    /// The current event index. Monotonically advancing; useful for
    /// auditing the cursor-position protocol in tests and diagnostics.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn current(&self) -> &SpannedEvent {
        // collect_all always terminates the stream with an Eof entry
        &self.events[self.pos]
    }
}

impl DocumentCursor for EventCursor {
    fn is_start_element(&self) -> bool {
        matches!(self.current().event, OwnedEvent::Start { .. })
    }

    fn is_end_element(&self) -> bool {
        matches!(self.current().event, OwnedEvent::End { .. })
    }

    fn is_text(&self) -> bool {
        matches!(self.current().event, OwnedEvent::Text { .. })
    }

    fn has_next(&self) -> bool {
        self.pos + 1 < self.events.len()
    }

    fn element_name(&self) -> Option<&QName> {
        match &self.current().event {
            OwnedEvent::Start { name, .. } | OwnedEvent::End { name } => Some(name),
            _ => None,
        }
    }

    fn text(&self) -> Option<&str> {
        match &self.current().event {
            OwnedEvent::Text { content } => Some(content),
            _ => None,
        }
    }

    fn attributes(&self) -> &[(QName, String)] {
        match &self.current().event {
            OwnedEvent::Start { attributes, .. } => attributes,
            _ => &[],
        }
    }

    fn type_attribute(&self) -> Option<&QName> {
        match &self.current().event {
            OwnedEvent::Start { type_hint, .. } => type_hint.as_ref(),
            _ => None,
        }
    }

    fn span(&self) -> Option<SourceSpan> {
        Some(self.current().span())
    }

    fn next(&mut self) -> Result<()> {
        if !self.has_next() {
            return Err(BindError::new(BindErrorKind::Stream(
                "cursor advanced past end of input".into(),
            )));
        }
        self.pos += 1;
        Ok(())
    }
}
