//! Grammar-Varianten und ihre Zustände (EXI 8.4, 8.5).
//!
//! Eine [`Grammar`] ist eine Liste von [`GrammarState`]s; jeder Zustand
//! hält die beiden parallelen Sichten auf seine Alternativen: die
//! semantische [`EventTypeList`] und den bitcodierten [`CodeTuple`].
//!
//! Die Variante ([`GrammarKind`]) ist ein geschlossenes Enum. Das
//! Übergangsverhalten pro Variante steht in [`crate::traversal`] als
//! `match` über die Variante.
//!
//! # Architektur
//!
//! - Schema-informed Grammars werden einmal im [`crate::cache::GrammarCache`]
//!   gebaut und danach nur gelesen
//! - Built-in Grammars ([`GrammarKind::BuiltInElement`],
//!   [`GrammarKind::BuiltInFragment`]) wachsen beim Lernen, siehe
//!   [`crate::built_in`]
//! - Alle Verweise zwischen Grammars laufen über [`GrammarId`]
//!
//! # EXI-Referenz
//!
//! - 8.4.1 Built-in Document Grammar
//! - 8.5.1 Schema-informed Document Grammar
//! - 8.5.2 Schema-informed Fragment Grammar
//! - 8.5.3 Schema-informed Element Fragment Grammar

use std::fmt;

use crate::code_tuple::{CodeTuple, Draft, assemble};
use crate::event_type::{EventKind, EventType, EventTypeList, GrammarRef};
use crate::options::GrammarOptions;
use crate::qname::{ExpandedNameId, StringInterner};
use crate::schema::NodeId;
use crate::undeclared::misc_group;

pub use crate::proto_grammar::StateStatus;

/// Zustand "vor SD" von Document und Fragment.
pub const START_STATE: u32 = 0;
/// DocContent bzw. FragmentContent.
pub const CONTENT_STATE: u32 = 1;
/// DocEnd.
pub const DOC_END_STATE: u32 = 2;
/// Tag-Zustand von Built-in Element und Element Fragment.
pub const TAG_STATE: u32 = 0;
/// Content-Zustand von Built-in Element und Element Fragment.
pub const ELEMENT_CONTENT_STATE: u32 = 1;

/// Handle einer Grammar im Cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GrammarId(pub(crate) u32);

impl GrammarId {
    /// Position im Grammar-Arena des Caches.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GrammarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// Variante einer Grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    /// Document (EXI 8.4.1, 8.5.1): SD, ein Wurzel-Element, ED.
    Document,
    /// Schema-informed Fragment (EXI 8.5.2).
    Fragment,
    /// Element Fragment für mehrdeutige oder unbekannte Elemente (EXI 8.5.3).
    ElementFragment,
    /// Type Grammar eines Schema-Typs (EXI 8.5.4.1.3). Auch der einzelne
    /// Kopf-Zustand, den xsi:type bei nillable Elementen ansteuert.
    Type,
    /// TypeEmpty: nur Attribute, dann EE (xsi:nil="true").
    TypeEmpty,
    /// Element-Use: erster Zustand eines Elements mit Augmentations,
    /// danach geht es in der Type Grammar weiter.
    ElementUse,
    /// Built-in Element Grammar (EXI 8.4.3), lernt.
    BuiltInElement,
    /// Built-in Fragment Grammar (EXI 8.4.2), lernt SE(qname).
    BuiltInFragment,
}

impl GrammarKind {
    /// Ob die Grammar zur Laufzeit wächst.
    pub fn is_built_in(self) -> bool {
        matches!(self, Self::BuiltInElement | Self::BuiltInFragment)
    }

    /// Ob die Grammar ein Element (nicht Dokument/Fragment) beschreibt.
    pub fn is_element(self) -> bool {
        !matches!(self, Self::Document | Self::Fragment | Self::BuiltInFragment)
    }
}

/// Ein Zustand: Event-Type-Liste plus Code Tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarState {
    pub(crate) events: EventTypeList,
    pub(crate) tuple: CodeTuple,
    pub(crate) status: StateStatus,
    pub(crate) tag: bool,
    /// Listenlänge am Rücksetzpunkt (nur Built-in).
    pub(crate) checkpoint: usize,
    pub(crate) limit_warned: bool,
}

impl GrammarState {
    pub(crate) fn new(drafts: Vec<Draft>, reversed: bool, status: StateStatus, tag: bool) -> Self {
        let (events, tuple) = assemble(drafts, reversed);
        let checkpoint = events.len();
        Self { events, tuple, status, tag, checkpoint, limit_warned: false }
    }

    /// Alternativen in Listenreihenfolge.
    pub fn events(&self) -> &EventTypeList {
        &self.events
    }

    /// Code-Baum der Alternativen.
    pub fn tuple(&self) -> &CodeTuple {
        &self.tuple
    }

    /// Depleting, Accepted oder Complete.
    pub fn status(&self) -> StateStatus {
        self.status
    }

    /// Ob Attribute hier noch möglich sind.
    pub fn is_tag(&self) -> bool {
        self.tag
    }

    /// Anzahl seit dem Rücksetzpunkt gelernter Alternativen.
    pub fn learned(&self) -> usize {
        self.events.len().saturating_sub(self.checkpoint)
    }
}

/// Eine Grammar: Variante plus Zustände.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    pub(crate) kind: GrammarKind,
    pub(crate) states: Vec<GrammarState>,
    pub(crate) type_def: Option<NodeId>,
    pub(crate) element: Option<NodeId>,
    pub(crate) name: Option<ExpandedNameId>,
    pub(crate) dirty: bool,
}

impl Grammar {
    pub(crate) fn new(kind: GrammarKind, states: Vec<GrammarState>) -> Self {
        Self { kind, states, type_def: None, element: None, name: None, dirty: false }
    }

    pub(crate) fn with_type(mut self, type_def: NodeId) -> Self {
        self.type_def = Some(type_def);
        self
    }

    pub(crate) fn with_element(mut self, element: NodeId) -> Self {
        self.element = Some(element);
        self
    }

    /// Variante.
    pub fn kind(&self) -> GrammarKind {
        self.kind
    }

    /// Zustand nach Index.
    pub fn state(&self, index: u32) -> Option<&GrammarState> {
        self.states.get(index as usize)
    }

    /// Alle Zustände.
    pub fn states(&self) -> &[GrammarState] {
        &self.states
    }

    /// Schema-Typ (Type, TypeEmpty, ElementUse).
    pub fn type_def(&self) -> Option<NodeId> {
        self.type_def
    }

    /// Element-Deklaration (ElementUse).
    pub fn element(&self) -> Option<NodeId> {
        self.element
    }

    /// QName einer Built-in Element Grammar.
    pub fn name(&self) -> Option<ExpandedNameId> {
        self.name
    }

    /// Ob seit dem letzten Reset gelernt wurde.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Alle Zustände mit Codes, für Diagnose und Tests.
    pub fn describe(&self, names: &StringInterner) -> String {
        let mut out = String::new();
        for (i, state) in self.states.iter().enumerate() {
            let tag = if state.tag { ", tag" } else { "" };
            out.push_str(&format!("state {i} [{:?}{tag}]\n", state.status));
            out.push_str(&state.tuple.describe(&state.events, names));
        }
        out
    }
}

fn event(kind: EventKind, next: Option<GrammarRef>) -> Draft {
    Draft::Event(EventType::new(kind).with_subsequent(next))
}

fn start_element(name: ExpandedNameId, ensuing: GrammarId, next: GrammarRef) -> Draft {
    Draft::Event(
        EventType::new(EventKind::StartElement)
            .with_name(name)
            .with_ensuing(Some(ensuing))
            .with_subsequent(Some(next)),
    )
}

fn start_state(id: GrammarId) -> GrammarState {
    let drafts = vec![event(EventKind::StartDocument, Some(GrammarRef::new(id, CONTENT_STATE)))];
    GrammarState::new(drafts, false, StateStatus::Depleting, false)
}

/// Document Grammar (EXI 8.4.1, 8.5.1).
///
/// ```text
/// Document   : SD DocContent                      0
/// DocContent : SE(G_0) DocEnd ... SE(G_n-1) DocEnd 0..n-1
///              SE(*) DocEnd                       n
///              DT DocContent                      n+1.0
///              CM DocContent, PI DocContent       n+1.1.x
/// DocEnd     : ED                                 0
///              CM DocEnd, PI DocEnd               1.x
/// ```
///
/// `globals` muss bereits nach local-name, dann URI sortiert sein.
pub(crate) fn document(id: GrammarId, globals: &[(ExpandedNameId, GrammarId)], options: &GrammarOptions) -> Grammar {
    let content = GrammarRef::new(id, CONTENT_STATE);
    let end = GrammarRef::new(id, DOC_END_STATE);

    let mut doc_content: Vec<Draft> = globals.iter().map(|&(n, g)| start_element(n, g, end)).collect();
    doc_content.push(event(EventKind::StartElementAny, Some(end)));
    let mut tail = Vec::new();
    if options.preserve().dtd {
        tail.push(event(EventKind::DocType, Some(content)));
    }
    tail.extend(misc_group(options.preserve(), content));
    doc_content.extend(Draft::group(tail));

    let mut doc_end = vec![event(EventKind::EndDocument, None)];
    doc_end.extend(misc_group(options.preserve(), end));

    Grammar::new(
        GrammarKind::Document,
        vec![
            start_state(id),
            GrammarState::new(doc_content, false, StateStatus::Depleting, false),
            GrammarState::new(doc_end, false, StateStatus::Complete, false),
        ],
    )
}

/// Schema-informed Fragment Grammar (EXI 8.5.2).
///
/// ```text
/// Fragment        : SD FragmentContent
/// FragmentContent : SE(F_0) FragmentContent ... SE(F_n-1) FragmentContent
///                   SE(*) FragmentContent, ED, CM/PI-Gruppe
/// ```
pub(crate) fn fragment(id: GrammarId, elements: &[(ExpandedNameId, GrammarId)], options: &GrammarOptions) -> Grammar {
    let content = GrammarRef::new(id, CONTENT_STATE);
    let mut drafts: Vec<Draft> = elements.iter().map(|&(n, g)| start_element(n, g, content)).collect();
    drafts.push(event(EventKind::StartElementAny, Some(content)));
    drafts.push(event(EventKind::EndDocument, None));
    drafts.extend(misc_group(options.preserve(), content));
    Grammar::new(
        GrammarKind::Fragment,
        vec![start_state(id), GrammarState::new(drafts, false, StateStatus::Accepted, false)],
    )
}

/// Element Fragment Grammar (EXI 8.5.3).
///
/// Tag-Zustand: AT(A_i) für jedes eindeutige Attribut (sortiert), AT(*),
/// SE(F_i), SE(*), EE, CH [untyped]. Der Content-Zustand ohne Attribute.
pub(crate) fn element_fragment(
    id: GrammarId,
    attributes: &[(ExpandedNameId, Option<NodeId>)],
    elements: &[(ExpandedNameId, GrammarId)],
    options: &GrammarOptions,
) -> Grammar {
    let tag = GrammarRef::new(id, TAG_STATE);
    let content = GrammarRef::new(id, ELEMENT_CONTENT_STATE);

    let body = |with_attributes: bool| {
        let mut drafts: Vec<Draft> = Vec::new();
        if with_attributes {
            drafts.extend(attributes.iter().map(|&(name, datatype)| {
                Draft::Event(
                    EventType::new(EventKind::Attribute)
                        .with_name(name)
                        .with_datatype(datatype)
                        .with_subsequent(Some(tag)),
                )
            }));
            drafts.push(event(EventKind::AttributeAny, Some(tag)));
        }
        drafts.extend(elements.iter().map(|&(n, g)| start_element(n, g, content)));
        drafts.push(event(EventKind::StartElementAny, Some(content)));
        drafts.push(event(EventKind::EndElement, None));
        drafts.push(event(EventKind::CharactersUntyped, Some(content)));
        let mut tail = Vec::new();
        if options.preserve().dtd {
            tail.push(event(EventKind::EntityReference, Some(content)));
        }
        tail.extend(misc_group(options.preserve(), content));
        drafts.extend(Draft::group(tail));
        drafts
    };

    Grammar::new(
        GrammarKind::ElementFragment,
        vec![
            GrammarState::new(body(true), false, StateStatus::Accepted, true),
            GrammarState::new(body(false), false, StateStatus::Accepted, false),
        ],
    )
}
