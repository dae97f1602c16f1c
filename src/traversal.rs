//! Traversal State Frames: ein Frame pro offenem Element (EXI 8).
//!
//! Eine [`Traversal`] führt einen Stack von Frames über einem
//! [`GrammarCache`]. Jeder Frame hält die aktuelle Grammar, den Zustand und
//! die Phase. Pro Event-Art gibt es eine Übergangsmethode; sie
//!
//! 1. sucht die passende Alternative im aktuellen Zustand,
//! 2. berechnet deren Event Code (vor dem Lernen),
//! 3. lernt bei Built-in Grammars ggf. eine neue Alternative,
//! 4. wechselt den Zustand, legt Kind-Frames an oder entfernt sie.
//!
//! Ist kein Event passend, liefert die Methode
//! [`Error::GrammarViolation`]; der Traversal ist danach nicht mehr
//! verwendbar.
//!
//! # Phasen
//!
//! ```text
//! Document:  Created ─SD→ Depleting ─(Kind fertig)→ Completed ─ED→ End
//! Fragment:  Created ─SD→ Accepted ──────────────────────────────ED→ End
//! Element:   Depleting / Accepted / Complete (nach Zustandsstatus)
//! ```
//!
//! # Beispiel
//!
//! ```
//! use exi_grammar::{GrammarCache, GrammarOptions, Phase, Traversal};
//!
//! let mut cache = GrammarCache::schema_less(GrammarOptions::default())?;
//! let root = cache.intern_name("", "root")?;
//! let mut t = Traversal::new(&mut cache);
//! t.enter_document()?;
//! t.start_document()?;
//! let se = t.start_element(root)?;
//! assert_eq!(se.code.to_string(), "0");
//! t.characters()?;
//! t.end_element()?;
//! t.end_document()?;
//! assert_eq!(t.phase(), Some(Phase::End));
//! assert!(t.event_types()?.is_empty());
//! # Ok::<(), exi_grammar::Error>(())
//! ```

use log::trace;

use crate::cache::GrammarCache;
use crate::code_tuple::{CodeTuple, EMPTY_CODE_TUPLE};
use crate::event_code::EventCode;
use crate::event_type::{EMPTY_EVENT_TYPES, EventKind, EventType, EventTypeList, GrammarRef};
use crate::grammar::{GrammarId, GrammarKind, StateStatus, TAG_STATE};
use crate::qname::{ExpandedNameId, URI_XSI};
use crate::schema::NodeId;
use crate::{Error, Result};

/// Phase eines Frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Document/Fragment vor SD.
    Created,
    /// Pflicht-Inhalt steht aus (Element) bzw. Wurzel-Element offen (Document).
    Depleting,
    /// EE bzw. ED möglich, weiterer Inhalt ebenfalls.
    Accepted,
    /// Element: nur noch EE.
    Complete,
    /// Document: Wurzel-Element beendet, nur noch ED.
    Completed,
    /// Nach ED; keine Alternativen mehr.
    End,
}

impl From<StateStatus> for Phase {
    fn from(status: StateStatus) -> Self {
        match status {
            StateStatus::Depleting => Phase::Depleting,
            StateStatus::Accepted => Phase::Accepted,
            StateStatus::Complete => Phase::Complete,
        }
    }
}

/// Ergebnis eines Übergangs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMatch {
    /// Index der gewählten Alternative in der Event-Type-Liste.
    pub index: usize,
    /// Event Code der Alternative vor einem Lernschritt.
    pub code: EventCode,
    /// Art der gewählten Alternative.
    pub kind: EventKind,
    /// Ob die Alternative nur wegen Deviations existiert.
    pub deviation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    grammar: GrammarId,
    state: u32,
    phase: Phase,
    datatype: Option<NodeId>,
    self_contained: bool,
    nilled: bool,
    /// Element-Deklaration ist nillable; übersteht xsi:type.
    nillable: bool,
}

impl Frame {
    fn at(&self) -> GrammarRef {
        GrammarRef::new(self.grammar, self.state)
    }
}

/// Frame-Stack eines Dokuments über einem Cache.
#[derive(Debug)]
pub struct Traversal<'c> {
    cache: &'c mut GrammarCache,
    frames: Vec<Frame>,
    depth: usize,
}

impl<'c> Traversal<'c> {
    /// Traversal ohne offenen Frame.
    pub fn new(cache: &'c mut GrammarCache) -> Self {
        Self { cache, frames: Vec::with_capacity(16), depth: 0 }
    }

    /// Der Cache.
    pub fn cache(&self) -> &GrammarCache {
        self.cache
    }

    /// Setzt das Gelernte zurück und öffnet den Document-Frame.
    pub fn enter_document(&mut self) -> Result<()> {
        let grammar = self.cache.document_grammar();
        self.enter_root(grammar)
    }

    /// Setzt das Gelernte zurück und öffnet den Fragment-Frame.
    pub fn enter_fragment(&mut self) -> Result<()> {
        let grammar = self.cache.fragment_grammar()?;
        self.enter_root(grammar)
    }

    fn enter_root(&mut self, grammar: GrammarId) -> Result<()> {
        self.cache.reset();
        self.depth = 0;
        self.push(Frame {
            grammar,
            state: 0,
            phase: Phase::Created,
            datatype: None,
            self_contained: false,
            nilled: false,
            nillable: false,
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Abfragen
    // ------------------------------------------------------------------------

    /// Anzahl offener Frames (Document bzw. Fragment eingeschlossen).
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn top(&self) -> Result<&Frame> {
        self.depth
            .checked_sub(1)
            .and_then(|i| self.frames.get(i))
            .ok_or_else(|| Error::precondition("no open frame"))
    }

    fn top_mut(&mut self) -> Result<&mut Frame> {
        self.depth
            .checked_sub(1)
            .and_then(|i| self.frames.get_mut(i))
            .ok_or_else(|| Error::precondition("no open frame"))
    }

    /// Phase des obersten Frames.
    pub fn phase(&self) -> Option<Phase> {
        self.top().ok().map(|f| f.phase)
    }

    /// Aktuelle Grammar und Zustand.
    pub fn current(&self) -> Option<GrammarRef> {
        self.top().ok().map(Frame::at)
    }

    /// Datentyp des zuletzt gelesenen AT- oder CH-Werts.
    pub fn datatype(&self) -> Option<NodeId> {
        self.top().ok().and_then(|f| f.datatype)
    }

    /// Ob das aktuelle Element xsi:nil="true" trägt.
    pub fn is_nilled(&self) -> bool {
        self.top().is_ok_and(|f| f.nilled)
    }

    /// Ob das aktuelle Element mit SC markiert ist.
    pub fn is_self_contained(&self) -> bool {
        self.top().is_ok_and(|f| f.self_contained)
    }

    /// Ob im aktuellen Zustand noch Attribute möglich sind.
    pub fn in_tag(&self) -> bool {
        self.top()
            .ok()
            .and_then(|f| self.cache.state(f.at()).ok())
            .is_some_and(|s| s.is_tag())
    }

    /// Zulässige Alternativen im aktuellen Zustand; leer nach ED.
    pub fn event_types(&self) -> Result<&EventTypeList> {
        let frame = self.top()?;
        if frame.phase == Phase::End {
            return Ok(&EMPTY_EVENT_TYPES);
        }
        self.cache.events(frame.at())
    }

    /// Code Tuple des aktuellen Zustands; leer nach ED.
    pub fn code_tuple(&self) -> Result<&CodeTuple> {
        let frame = self.top()?;
        if frame.phase == Phase::End {
            return Ok(&EMPTY_CODE_TUPLE);
        }
        self.cache.tuple(frame.at())
    }

    // ------------------------------------------------------------------------
    // Document
    // ------------------------------------------------------------------------

    /// SD.
    pub fn start_document(&mut self) -> Result<EventMatch> {
        let frame = *self.top()?;
        if frame.phase != Phase::Created {
            return Err(self.violation("SD"));
        }
        let (matched, event) = self.select(&[&|e| e.kind() == EventKind::StartDocument], "SD")?;
        let kind = self.kind(frame.grammar)?;
        let top = self.top_mut()?;
        if let Some(next) = event.subsequent() {
            top.grammar = next.grammar;
            top.state = next.state;
        }
        top.phase = if kind == GrammarKind::Document { Phase::Depleting } else { Phase::Accepted };
        Ok(matched)
    }

    /// ED. Der Frame bleibt in Phase [`Phase::End`] stehen.
    pub fn end_document(&mut self) -> Result<EventMatch> {
        if self.depth != 1 {
            return Err(self.violation("ED"));
        }
        let (matched, _) = self.select(&[&|e| e.kind() == EventKind::EndDocument], "ED")?;
        self.top_mut()?.phase = Phase::End;
        trace!("document end");
        Ok(matched)
    }

    // ------------------------------------------------------------------------
    // Elemente
    // ------------------------------------------------------------------------

    /// SE: erst SE(qname), dann SE(uri:*), dann SE(*).
    pub fn start_element(&mut self, name: ExpandedNameId) -> Result<EventMatch> {
        let uri = name.uri();
        self.start_element_with(
            name,
            &[
                &|e| e.kind() == EventKind::StartElement && e.name() == Some(name),
                &|e| e.kind() == EventKind::StartElementNs && e.uri() == Some(uri),
                &|e| e.kind() == EventKind::StartElementAny && !e.is_deviation(),
                &|e| e.kind() == EventKind::StartElementAny,
            ],
        )
    }

    /// SE über Wildcard, auch wenn SE(qname) vorhanden wäre.
    pub fn start_element_wildcard(&mut self, name: ExpandedNameId) -> Result<EventMatch> {
        let uri = name.uri();
        self.start_element_with(
            name,
            &[
                &|e| e.kind() == EventKind::StartElementNs && e.uri() == Some(uri),
                &|e| e.kind() == EventKind::StartElementAny && !e.is_deviation(),
                &|e| e.kind() == EventKind::StartElementAny,
            ],
        )
    }

    fn start_element_with(&mut self, name: ExpandedNameId, tiers: &[&dyn Fn(&EventType) -> bool]) -> Result<EventMatch> {
        let frame = *self.top()?;
        if matches!(frame.phase, Phase::Created | Phase::End) {
            return Err(self.violation(format!("SE({})", self.label(name))));
        }
        let (matched, event) = self.select(tiers, &format!("SE({})", self.label(name)))?;
        let kind = self.kind(frame.grammar)?;
        let child = match event.ensuing() {
            Some(g) => g,
            None => self.resolve_child(kind, name)?,
        };

        if event.kind() == EventKind::StartElementAny && kind.is_built_in() {
            let learned = EventType::new(EventKind::StartElement)
                .with_name(name)
                .with_ensuing(Some(child))
                .with_subsequent(event.subsequent());
            self.cache.learn(frame.grammar, frame.state, learned);
        }

        self.advance(event.subsequent())?;
        let state = self.cache.state(GrammarRef::new(child, 0))?;
        let phase = Phase::from(state.status());
        let nillable = self.cache.is_nillable(child);
        self.push(Frame {
            grammar: child,
            state: 0,
            phase,
            datatype: None,
            self_contained: false,
            nilled: false,
            nillable,
        });
        Ok(matched)
    }

    /// Grammar für ein Kind-Element ohne eigene Deklaration im Zustand.
    fn resolve_child(&mut self, parent: GrammarKind, name: ExpandedNameId) -> Result<GrammarId> {
        if matches!(parent, GrammarKind::ElementFragment | GrammarKind::Fragment)
            && let Some(ef) = self.cache.element_fragment_grammar()
        {
            return Ok(ef);
        }
        let declared = self
            .cache
            .schema()
            .and_then(|s| s.global_element(name))
            .and_then(|e| self.cache.element_grammar(e));
        match declared {
            Some(g) => Ok(g),
            None => self.cache.built_in_grammar(name),
        }
    }

    /// EE; entfernt den Frame und meldet dem Eltern-Frame das Ende.
    pub fn end_element(&mut self) -> Result<EventMatch> {
        let frame = *self.top()?;
        let kind = self.kind(frame.grammar)?;
        if !kind.is_element() || self.depth < 2 {
            return Err(self.violation("EE"));
        }
        let (matched, event) = self.select(
            &[
                &|e| e.kind() == EventKind::EndElement && !e.is_deviation(),
                &|e| e.kind() == EventKind::EndElement,
            ],
            "EE",
        )?;
        if kind == GrammarKind::BuiltInElement && frame.state == TAG_STATE && event.depth() > 1 {
            self.cache.learn(frame.grammar, frame.state, EventType::new(EventKind::EndElement));
        }
        self.pop()?;
        self.done()?;
        Ok(matched)
    }

    // Eltern-Frame nach dem Ende eines Kindes.
    fn done(&mut self) -> Result<()> {
        let frame = *self.top()?;
        if self.kind(frame.grammar)? == GrammarKind::Document {
            self.top_mut()?.phase = Phase::Completed;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Attribute
    // ------------------------------------------------------------------------

    /// AT: erst AT(qname), dann AT(uri:*), dann AT(*).
    ///
    /// Unter strict gibt es kein AT(*) für nicht deklarierte Attribute.
    pub fn attribute(&mut self, name: ExpandedNameId) -> Result<EventMatch> {
        let uri = name.uri();
        self.attribute_with(
            name,
            &[
                &|e| e.kind() == EventKind::Attribute && e.name() == Some(name),
                &|e| e.kind() == EventKind::AttributeNs && e.uri() == Some(uri),
                &|e| e.kind() == EventKind::AttributeAny && !e.is_deviation(),
                &|e| e.kind() == EventKind::AttributeAny,
            ],
        )
    }

    /// AT über Wildcard.
    pub fn attribute_wildcard(&mut self, name: ExpandedNameId) -> Result<EventMatch> {
        let uri = name.uri();
        self.attribute_with(
            name,
            &[
                &|e| e.kind() == EventKind::AttributeNs && e.uri() == Some(uri),
                &|e| e.kind() == EventKind::AttributeAny && !e.is_deviation(),
                &|e| e.kind() == EventKind::AttributeAny,
            ],
        )
    }

    /// AT mit ungültigem Wert: AT(qname) [untyped], dann AT(*) [untyped].
    pub fn attribute_untyped(&mut self, name: ExpandedNameId) -> Result<EventMatch> {
        self.attribute_with(
            name,
            &[
                &|e| e.kind() == EventKind::AttributeInvalid && e.name() == Some(name),
                &|e| e.kind() == EventKind::AttributeAnyUntyped,
            ],
        )
    }

    fn attribute_with(&mut self, name: ExpandedNameId, tiers: &[&dyn Fn(&EventType) -> bool]) -> Result<EventMatch> {
        let frame = *self.top()?;
        let label = format!("AT({})", self.label(name));
        let (matched, event) = self.select(tiers, &label)?;
        let kind = self.kind(frame.grammar)?;

        if event.kind() == EventKind::AttributeAny && kind.is_built_in() && !self.is_xsi_type(name) {
            let learned = EventType::new(EventKind::Attribute)
                .with_name(name)
                .with_subsequent(event.subsequent());
            self.cache.learn(frame.grammar, frame.state, learned);
        }

        let datatype = match event.kind() {
            EventKind::Attribute => event.datatype(),
            EventKind::AttributeNs | EventKind::AttributeAny => self.global_attribute_type(name),
            _ => None,
        };
        self.advance(event.subsequent())?;
        self.top_mut()?.datatype = datatype;
        Ok(matched)
    }

    fn global_attribute_type(&self, name: ExpandedNameId) -> Option<NodeId> {
        let schema = self.cache.schema()?;
        let attribute = schema.global_attribute(name)?;
        schema.attribute(attribute).ok().map(|a| a.type_def)
    }

    fn is_xsi_type(&self, name: ExpandedNameId) -> bool {
        name.resolve(self.cache.names()) == (URI_XSI, "type")
    }

    /// AT(xsi:type): bindet den Frame an die Type Grammar von `type_name`.
    ///
    /// Bei nillable Elementen landet der Frame im Kopf mit AT(xsi:nil) auf
    /// Code 0, damit xsi:nil weiterhin folgen kann. Ohne Schema gibt es keine
    /// Typen: das Event läuft als gewöhnliches AT(*) durch, ohne Rebind und
    /// ohne Lernen.
    pub fn xsi_type(&mut self, type_name: ExpandedNameId) -> Result<EventMatch> {
        let frame = *self.top()?;
        let (matched, event) = self.select(
            &[
                &|e| e.kind() == EventKind::XsiType,
                &|e| e.kind() == EventKind::AttributeAny && !e.is_deviation(),
                &|e| e.kind() == EventKind::AttributeAny,
            ],
            "AT(xsi:type)",
        )?;
        let Some(schema) = self.cache.schema() else {
            self.advance(event.subsequent())?;
            return Ok(matched);
        };
        let type_def = schema
            .global_type(type_name)
            .ok_or_else(|| Error::XsiTypeNotFound(self.label(type_name)))?;
        let grammar = if frame.nillable {
            self.cache.nillable_type_grammar(type_def)
        } else {
            self.cache.type_grammar(type_def)
        };
        let grammar = grammar.ok_or_else(|| Error::XsiTypeNotFound(self.label(type_name)))?;
        self.rebind(grammar)?;
        Ok(matched)
    }

    /// AT(xsi:nil): `true` bindet an TypeEmpty, `false` an die Type Grammar.
    pub fn xsi_nil(&mut self, nil: bool) -> Result<EventMatch> {
        let frame = *self.top()?;
        let (matched, event) = self.select(
            &[
                &|e| e.kind() == EventKind::XsiNil,
                &|e| e.kind() == EventKind::AttributeAny && !e.is_deviation(),
                &|e| e.kind() == EventKind::AttributeAny,
            ],
            "AT(xsi:nil)",
        )?;
        let type_def = self.cache.grammar(frame.grammar).and_then(|g| g.type_def());
        let target = type_def.and_then(|t| {
            if nil { self.cache.type_empty_grammar(t) } else { self.cache.type_grammar(t) }
        });
        match target {
            Some(grammar) => self.rebind(grammar)?,
            None => self.advance(event.subsequent())?,
        }
        self.top_mut()?.nilled = nil;
        Ok(matched)
    }

    fn rebind(&mut self, grammar: GrammarId) -> Result<()> {
        let phase = Phase::from(self.cache.state(GrammarRef::new(grammar, 0))?.status());
        let top = self.top_mut()?;
        top.grammar = grammar;
        top.state = 0;
        top.phase = phase;
        trace!("rebind to {grammar}");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Inhalt
    // ------------------------------------------------------------------------

    /// CH: getypt, sonst [untyped].
    pub fn characters(&mut self) -> Result<EventMatch> {
        self.characters_with(&[
            &|e| e.kind() == EventKind::Characters,
            &|e| e.kind() == EventKind::CharactersUntyped && !e.is_deviation(),
            &|e| e.kind() == EventKind::CharactersUntyped,
        ])
    }

    /// CH [untyped]: Wert passt nicht zum Datentyp.
    pub fn characters_untyped(&mut self) -> Result<EventMatch> {
        let built_in = self
            .top()
            .and_then(|f| self.kind(f.grammar))
            .is_ok_and(GrammarKind::is_built_in);
        if built_in {
            return self.characters();
        }
        self.characters_with(&[
            &|e| e.kind() == EventKind::CharactersUntyped && !e.is_deviation(),
            &|e| e.kind() == EventKind::CharactersUntyped,
        ])
    }

    fn characters_with(&mut self, tiers: &[&dyn Fn(&EventType) -> bool]) -> Result<EventMatch> {
        let frame = *self.top()?;
        let (matched, event) = self.select(tiers, "CH")?;
        if self.kind(frame.grammar)? == GrammarKind::BuiltInElement && event.depth() > 1 {
            let learned = EventType::new(EventKind::Characters).with_subsequent(event.subsequent());
            self.cache.learn(frame.grammar, frame.state, learned);
        }
        self.advance(event.subsequent())?;
        self.top_mut()?.datatype = event.datatype();
        Ok(matched)
    }

    /// CM.
    pub fn comment(&mut self) -> Result<EventMatch> {
        self.misc(EventKind::Comment)
    }

    /// PI.
    pub fn processing_instruction(&mut self) -> Result<EventMatch> {
        self.misc(EventKind::ProcessingInstruction)
    }

    /// ER.
    pub fn entity_reference(&mut self) -> Result<EventMatch> {
        self.misc(EventKind::EntityReference)
    }

    /// DT.
    pub fn doc_type(&mut self) -> Result<EventMatch> {
        self.misc(EventKind::DocType)
    }

    /// NS.
    pub fn namespace_declaration(&mut self) -> Result<EventMatch> {
        self.misc(EventKind::NamespaceDecl)
    }

    /// SC: markiert den Frame, Phase bleibt.
    pub fn self_contained(&mut self) -> Result<EventMatch> {
        let matched = self.misc(EventKind::SelfContained)?;
        self.top_mut()?.self_contained = true;
        Ok(matched)
    }

    fn misc(&mut self, kind: EventKind) -> Result<EventMatch> {
        let (matched, event) = self.select(&[&|e| e.kind() == kind], kind.symbol())?;
        self.advance(event.subsequent())?;
        Ok(matched)
    }

    // ------------------------------------------------------------------------
    // Hilfsfunktionen
    // ------------------------------------------------------------------------

    fn kind(&self, grammar: GrammarId) -> Result<GrammarKind> {
        self.cache
            .grammar(grammar)
            .map(|g| g.kind())
            .ok_or_else(|| Error::precondition(format!("unknown grammar {grammar}")))
    }

    /// Erste Stufe mit Treffer; innerhalb der Stufe der kürzeste Code.
    fn select(&self, tiers: &[&dyn Fn(&EventType) -> bool], label: &str) -> Result<(EventMatch, EventType)> {
        let frame = self.top()?;
        if frame.phase == Phase::End {
            return Err(self.violation(label.to_string()));
        }
        let state = self.cache.state(frame.at())?;
        let found = tiers.iter().find_map(|pred| {
            state
                .events()
                .iter()
                .filter(|e| pred(e))
                .min_by_key(|e| (e.depth(), e.index()))
        });
        let Some(event) = found else {
            return Err(self.violation(label.to_string()));
        };
        let code = state
            .tuple()
            .code_of(event.index())
            .ok_or_else(|| Error::precondition(format!("event {} without code", event.index())))?;
        let matched = EventMatch { index: event.index(), code, kind: event.kind(), deviation: event.is_deviation() };
        Ok((matched, event.clone()))
    }

    /// Zustandswechsel des obersten Frames; Element-Phasen folgen dem Status.
    fn advance(&mut self, next: Option<GrammarRef>) -> Result<()> {
        let Some(next) = next else { return Ok(()) };
        let kind = self.kind(next.grammar)?;
        let status = self.cache.state(next)?.status();
        let top = self.top_mut()?;
        top.grammar = next.grammar;
        top.state = next.state;
        if kind.is_element() {
            top.phase = Phase::from(status);
        }
        Ok(())
    }

    fn push(&mut self, frame: Frame) {
        if let Some(slot) = self.frames.get_mut(self.depth) {
            *slot = frame;
        } else {
            self.frames.push(frame);
        }
        self.depth += 1;
        trace!("push {} depth {}", frame.grammar, self.depth);
    }

    fn pop(&mut self) -> Result<Frame> {
        let frame = *self.top()?;
        self.depth -= 1;
        trace!("pop {} depth {}", frame.grammar, self.depth);
        Ok(frame)
    }

    fn label(&self, name: ExpandedNameId) -> String {
        name.display(self.cache.names())
    }

    fn violation(&self, event: impl Into<String>) -> Error {
        let state = self.top().map(|f| format!("{}:{}", f.grammar, f.state)).unwrap_or_default();
        Error::grammar_violation(event.into(), state)
    }
}
