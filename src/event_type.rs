//! Event Type Descriptors.
//!
//! Ein [`EventType`] beschreibt eine Alternative eines Grammar-Zustands:
//! Art des Events, optional der QName bzw. die Namespace-URI, die Position
//! im Code Tuple und den Zustand, in den nach dem Event gewechselt wird.
//!
//! Zwei Indizes existieren nebeneinander und werden nie auseinander
//! abgeleitet:
//! - `index`: Position in der [`EventTypeList`] (semantischer Zugriff)
//! - `depth`/`position`: Platz im Code Tuple (Bit-Codierung)
//!
//! Schema-informed Listen sind nach Ebene, dann Position sortiert. Built-in
//! Listen wachsen nur am Ende, ihre gelernten Einträge stehen deshalb
//! hinter den System-Events tieferer Ebenen.

use std::fmt;

use crate::grammar::GrammarId;
use crate::qname::{ExpandedNameId, InternedStr, StringInterner};
use crate::schema::NodeId;

/// Semantische Art eines Events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// SD
    StartDocument,
    /// ED
    EndDocument,
    /// SE(qname)
    StartElement,
    /// SE(uri:*)
    StartElementNs,
    /// SE(*)
    StartElementAny,
    /// EE
    EndElement,
    /// AT(qname) mit Schema-Typ
    Attribute,
    /// AT(uri:*)
    AttributeNs,
    /// AT(*)
    AttributeAny,
    /// AT(qname) [untyped value]: deklariertes Attribut mit ungültigem Wert
    AttributeInvalid,
    /// AT(*) [untyped value]
    AttributeAnyUntyped,
    /// CH mit Schema-Typ
    Characters,
    /// CH [untyped value]
    CharactersUntyped,
    /// AT(xsi:type)
    XsiType,
    /// AT(xsi:nil)
    XsiNil,
    /// NS
    NamespaceDecl,
    /// SC
    SelfContained,
    /// CM
    Comment,
    /// PI
    ProcessingInstruction,
    /// ER
    EntityReference,
    /// DT
    DocType,
}

impl EventKind {
    /// Kurzform wie in EXI 8 ("SE(*)", "CH [untyped]").
    pub fn symbol(self) -> &'static str {
        match self {
            Self::StartDocument => "SD",
            Self::EndDocument => "ED",
            Self::StartElement => "SE(qname)",
            Self::StartElementNs => "SE(uri:*)",
            Self::StartElementAny => "SE(*)",
            Self::EndElement => "EE",
            Self::Attribute => "AT(qname)",
            Self::AttributeNs => "AT(uri:*)",
            Self::AttributeAny => "AT(*)",
            Self::AttributeInvalid => "AT(qname) [untyped]",
            Self::AttributeAnyUntyped => "AT(*) [untyped]",
            Self::Characters => "CH",
            Self::CharactersUntyped => "CH [untyped]",
            Self::XsiType => "AT(xsi:type)",
            Self::XsiNil => "AT(xsi:nil)",
            Self::NamespaceDecl => "NS",
            Self::SelfContained => "SC",
            Self::Comment => "CM",
            Self::ProcessingInstruction => "PI",
            Self::EntityReference => "ER",
            Self::DocType => "DT",
        }
    }

    /// Ob die Art einen QName trägt.
    pub fn has_name(self) -> bool {
        matches!(self, Self::StartElement | Self::Attribute | Self::AttributeInvalid)
    }

    /// Ob die Art eine Namespace-URI trägt.
    pub fn has_uri(self) -> bool {
        matches!(self, Self::StartElementNs | Self::AttributeNs)
    }

    /// SE in irgendeiner Form.
    pub fn is_start_element(self) -> bool {
        matches!(self, Self::StartElement | Self::StartElementNs | Self::StartElementAny)
    }

    /// AT in irgendeiner Form, ohne xsi:type/xsi:nil.
    pub fn is_attribute(self) -> bool {
        matches!(
            self,
            Self::Attribute
                | Self::AttributeNs
                | Self::AttributeAny
                | Self::AttributeInvalid
                | Self::AttributeAnyUntyped
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Verweis auf einen Zustand einer Grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrammarRef {
    pub grammar: GrammarId,
    pub state: u32,
}

impl GrammarRef {
    pub fn new(grammar: GrammarId, state: u32) -> Self {
        Self { grammar, state }
    }
}

/// Eine Alternative eines Grammar-Zustands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventType {
    pub(crate) kind: EventKind,
    pub(crate) name: Option<ExpandedNameId>,
    pub(crate) uri: Option<InternedStr>,
    pub(crate) depth: u8,
    pub(crate) index: usize,
    pub(crate) position: u32,
    pub(crate) subsequent: Option<GrammarRef>,
    pub(crate) ensuing: Option<GrammarId>,
    pub(crate) datatype: Option<NodeId>,
    pub(crate) serial: Option<u32>,
    pub(crate) particle: Option<NodeId>,
    pub(crate) deviation: bool,
}

impl EventType {
    /// Neue Alternative ohne Payload; Ebene und Indizes setzt der Tuple-Aufbau.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            name: None,
            uri: None,
            depth: 1,
            index: 0,
            position: 0,
            subsequent: None,
            ensuing: None,
            datatype: None,
            serial: None,
            particle: None,
            deviation: false,
        }
    }

    pub(crate) fn with_name(mut self, name: ExpandedNameId) -> Self {
        self.name = Some(name);
        self
    }

    pub(crate) fn with_uri(mut self, uri: InternedStr) -> Self {
        self.uri = Some(uri);
        self
    }

    pub(crate) fn with_subsequent(mut self, next: Option<GrammarRef>) -> Self {
        self.subsequent = next;
        self
    }

    pub(crate) fn with_ensuing(mut self, grammar: Option<GrammarId>) -> Self {
        self.ensuing = grammar;
        self
    }

    pub(crate) fn with_datatype(mut self, datatype: Option<NodeId>) -> Self {
        self.datatype = datatype;
        self
    }

    pub(crate) fn with_serial(mut self, serial: u32, particle: NodeId) -> Self {
        self.serial = Some(serial);
        self.particle = Some(particle);
        self
    }

    pub(crate) fn as_deviation(mut self) -> Self {
        self.deviation = true;
        self
    }

    /// Art des Events.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// QName für SE(qname), AT(qname) und AT(qname) [untyped].
    pub fn name(&self) -> Option<ExpandedNameId> {
        self.name
    }

    /// Namespace für SE(uri:*) und AT(uri:*).
    pub fn uri(&self) -> Option<InternedStr> {
        self.uri
    }

    /// Ebene im Code Tuple (1 bis 3).
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Index in der Event-Type-Liste.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Physischer Platz im Tuple seiner Ebene.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Zustand nach dem Event (None für EE und ED).
    pub fn subsequent(&self) -> Option<GrammarRef> {
        self.subsequent
    }

    /// Grammar des Kind-Elements bei SE(qname).
    pub fn ensuing(&self) -> Option<GrammarId> {
        self.ensuing
    }

    /// Simple Type des Werts bei typisiertem CH/AT.
    pub fn datatype(&self) -> Option<NodeId> {
        self.datatype
    }

    /// Deklarations-Serial des erzeugenden Particles.
    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    /// Ob die Alternative nur wegen Deviations existiert.
    pub fn is_deviation(&self) -> bool {
        self.deviation
    }

    /// Lesbare Form mit aufgelösten Namen, z.B. `SE(root)` oder `AT(urn:x:*)`.
    pub fn label(&self, interner: &StringInterner) -> String {
        let base = match self.kind {
            EventKind::StartElement => format!("SE({})", self.name_label(interner)),
            EventKind::Attribute => format!("AT({})", self.name_label(interner)),
            EventKind::AttributeInvalid => format!("AT({}) [untyped]", self.name_label(interner)),
            EventKind::StartElementNs => format!("SE({}:*)", self.uri_label(interner)),
            EventKind::AttributeNs => format!("AT({}:*)", self.uri_label(interner)),
            other => other.symbol().to_string(),
        };
        if self.deviation {
            format!("{base} ~")
        } else {
            base
        }
    }

    fn name_label(&self, interner: &StringInterner) -> String {
        self.name.map_or_else(|| "?".to_string(), |n| n.display(interner))
    }

    fn uri_label(&self, interner: &StringInterner) -> String {
        self.uri.map_or_else(|| "?".to_string(), |u| interner.resolve(u).to_string())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.symbol())
    }
}

/// Geordnete Liste der Alternativen eines Zustands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTypeList {
    items: Vec<EventType>,
}

/// Liste ohne Alternativen, z.B. für einen beendeten Dokument-Frame.
pub static EMPTY_EVENT_TYPES: EventTypeList = EventTypeList { items: Vec::new() };

impl EventTypeList {
    /// Anzahl der Alternativen.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Ob die Liste leer ist.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Alternative am Index.
    pub fn get(&self, index: usize) -> Option<&EventType> {
        self.items.get(index)
    }

    /// Alle Alternativen in Listenreihenfolge.
    pub fn iter(&self) -> std::slice::Iter<'_, EventType> {
        self.items.iter()
    }

    /// Erste Alternative, auf die `pred` zutrifft.
    pub fn find(&self, pred: impl Fn(&EventType) -> bool) -> Option<&EventType> {
        self.items.iter().find(|e| pred(e))
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, EventType> {
        self.items.iter_mut()
    }

    pub(crate) fn push(&mut self, mut event: EventType) -> usize {
        let index = self.items.len();
        event.index = index;
        self.items.push(event);
        index
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }
}

impl<'a> IntoIterator for &'a EventTypeList {
    type Item = &'a EventType;
    type IntoIter = std::slice::Iter<'a, EventType>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbole() {
        assert_eq!(EventKind::StartElementAny.symbol(), "SE(*)");
        assert_eq!(EventKind::AttributeAnyUntyped.to_string(), "AT(*) [untyped]");
        assert_eq!(EventType::new(EventKind::EndElement).to_string(), "EE");
    }

    #[test]
    fn arten_klassifiziert() {
        assert!(EventKind::StartElementNs.is_start_element());
        assert!(EventKind::AttributeInvalid.is_attribute());
        assert!(!EventKind::XsiType.is_attribute());
        assert!(EventKind::AttributeInvalid.has_name());
        assert!(EventKind::AttributeNs.has_uri());
    }

    #[test]
    fn label_mit_namen() {
        let mut i = StringInterner::new();
        let n = i.intern_expanded("", "root").unwrap();
        let u = i.intern("urn:x").unwrap();
        let se = EventType::new(EventKind::StartElement).with_name(n);
        assert_eq!(se.label(&i), "SE(root)");
        let at = EventType::new(EventKind::AttributeNs).with_uri(u);
        assert_eq!(at.label(&i), "AT(urn:x:*)");
        let dev = EventType::new(EventKind::AttributeAny).as_deviation();
        assert_eq!(dev.label(&i), "AT(*) ~");
    }

    #[test]
    fn push_vergibt_index() {
        let mut list = EventTypeList::default();
        assert_eq!(list.push(EventType::new(EventKind::EndElement)), 0);
        assert_eq!(list.push(EventType::new(EventKind::CharactersUntyped)), 1);
        assert_eq!(list.get(1).map(EventType::index), Some(1));
        list.truncate(1);
        assert_eq!(list.len(), 1);
        assert!(EMPTY_EVENT_TYPES.is_empty());
    }
}
