//! Grammar Cache: besitzt alle Grammars eines Schemas (EXI 8.5).
//!
//! Der Cache hat zwei Teile:
//!
//! - **eingefroren** (hinter `Arc`): Type, TypeEmpty, Element-Use,
//!   Document, Fragment, Element Fragment und die Vorlage der Built-in
//!   Element Grammar. Einmal gebaut, danach nur gelesen.
//! - **gelernt**: Built-in Grammars pro (URI, local-name), die String
//!   Table und die Liste der seit dem letzten Reset berührten Grammars.
//!
//! Ids `0..F` adressieren den eingefrorenen Teil, Ids ab `F` den gelernten.
//! [`GrammarCache::fork`] teilt den eingefrorenen Teil und startet einen
//! frischen gelernten Teil, z.B. für ein zweites, paralleles Dokument.
//!
//! # Aufbau
//!
//! ```text
//! Typ T     → ProtoGrammar → normalize → ordering → undeclared → Type_T
//!                                                             → TypeEmpty_T
//! Element E → Augmentations + Zustand 0 von Type_{E.type}    → ElementUse_E
//! ```

use std::sync::Arc;

use log::{debug, trace};

use crate::built_in;
use crate::event_type::{EventKind, EventType, EventTypeList, GrammarRef};
use crate::grammar::{self, Grammar, GrammarId, GrammarKind, GrammarState, StateStatus};
use crate::code_tuple::CodeTuple;
use crate::options::GrammarOptions;
use crate::ordering::{canonical_order, sort_names};
use crate::proto_grammar::{NormalGrammar, ProtoGrammar, ProtoProduction, Terminal};
use crate::qname::{ExpandedNameId, StringInterner};
use crate::schema::{NodeId, Schema};
use crate::string_table::StringTable;
use crate::undeclared::{Augmentations, StateLayout, augmentations, element_state};
use crate::{Error, FastHashMap, FastIndexMap, Result};

// ============================================================================
// Eingefrorener Teil
// ============================================================================

#[derive(Debug)]
struct Frozen {
    options: GrammarOptions,
    schema: Option<Schema>,
    grammars: Vec<Grammar>,
    document: GrammarId,
    fragment: Option<GrammarId>,
    element_fragment: Option<GrammarId>,
    template: GrammarId,
    elements: FastHashMap<NodeId, GrammarId>,
    types: FastHashMap<NodeId, TypeIds>,
}

/// Grammars eines Schema-Typs.
#[derive(Debug, Clone, Copy)]
struct TypeIds {
    full: GrammarId,
    empty: GrammarId,
    /// Kopf mit AT(xsi:nil) auf Code 0; Ziel von xsi:type bei nillable Elementen.
    nillable: GrammarId,
}

impl Frozen {
    fn names(&self) -> StringInterner {
        self.schema.as_ref().map(|s| s.interner().clone()).unwrap_or_default()
    }
}

// ============================================================================
// Gelernter Teil
// ============================================================================

#[derive(Debug)]
struct Learned {
    grammars: Vec<Grammar>,
    strings: StringTable,
    touched: Vec<GrammarId>,
    fragment: Option<GrammarId>,
}

impl Learned {
    fn new(frozen: &Frozen) -> Result<Self> {
        let mut learned = Self {
            grammars: Vec::new(),
            strings: StringTable::with_names(frozen.names()),
            touched: Vec::new(),
            fragment: None,
        };
        if frozen.schema.is_none() {
            let id = learned_id(frozen, 0)?;
            learned.grammars.push(built_in::fragment(id, &frozen.options));
            learned.fragment = Some(id);
        }
        Ok(learned)
    }
}

fn learned_id(frozen: &Frozen, offset: usize) -> Result<GrammarId> {
    let index = frozen.grammars.len().checked_add(offset).ok_or(Error::IntegerOverflow)?;
    u32::try_from(index).map(GrammarId).map_err(|_| Error::IntegerOverflow)
}

// ============================================================================
// GrammarCache
// ============================================================================

/// Besitzt alle Grammars; Traversals greifen über [`GrammarId`] zu.
///
/// Nicht für zwei gleichzeitige Dokumente geeignet: Built-in Grammars
/// lernen. Zwischen zwei Dokumenten [`reset`](Self::reset) aufrufen (macht
/// [`Traversal::enter_document`](crate::traversal::Traversal::enter_document)
/// selbst), für parallele Dokumente [`fork`](Self::fork) verwenden.
#[derive(Debug)]
pub struct GrammarCache {
    frozen: Arc<Frozen>,
    learned: Learned,
}

impl GrammarCache {
    /// Baut alle Schema-informed Grammars.
    pub fn with_schema(schema: Schema, options: GrammarOptions) -> Result<Self> {
        options.validate()?;
        let frozen = Builder::new(&schema, &options).build()?;
        let frozen = Frozen { schema: Some(schema), ..frozen };
        Self::from_frozen(Arc::new(frozen))
    }

    /// Cache ohne Schema: Built-in Document, Fragment und Element Grammars.
    pub fn schema_less(options: GrammarOptions) -> Result<Self> {
        options.validate()?;
        let document = GrammarId(0);
        let template = GrammarId(1);
        let grammars = vec![
            grammar::document(document, &[], &options),
            built_in::element_template(template, &options),
        ];
        debug!("schema-less grammar cache built");
        Self::from_frozen(Arc::new(Frozen {
            options,
            schema: None,
            grammars,
            document,
            fragment: None,
            element_fragment: None,
            template,
            elements: FastHashMap::default(),
            types: FastHashMap::default(),
        }))
    }

    fn from_frozen(frozen: Arc<Frozen>) -> Result<Self> {
        let learned = Learned::new(&frozen)?;
        Ok(Self { frozen, learned })
    }

    /// Neuer Cache mit demselben eingefrorenen Teil und leerem Gelerntem.
    pub fn fork(&self) -> Result<Self> {
        Self::from_frozen(Arc::clone(&self.frozen))
    }

    /// Optionen, mit denen gebaut wurde.
    pub fn options(&self) -> &GrammarOptions {
        &self.frozen.options
    }

    /// Das Schema, oder `None` im schema-losen Modus.
    pub fn schema(&self) -> Option<&Schema> {
        self.frozen.schema.as_ref()
    }

    /// Document Grammar.
    pub fn document_grammar(&self) -> GrammarId {
        self.frozen.document
    }

    /// Fragment Grammar: Schema-informed oder Built-in.
    pub fn fragment_grammar(&self) -> Result<GrammarId> {
        self.frozen
            .fragment
            .or(self.learned.fragment)
            .ok_or_else(|| Error::precondition("cache has no fragment grammar"))
    }

    /// Element Fragment Grammar (nur mit Schema).
    pub fn element_fragment_grammar(&self) -> Option<GrammarId> {
        self.frozen.element_fragment
    }

    /// Element-Use Grammar einer Element-Deklaration.
    pub fn element_grammar(&self, element: NodeId) -> Option<GrammarId> {
        self.frozen.elements.get(&element).copied()
    }

    /// Type Grammar eines Typs.
    pub fn type_grammar(&self, type_def: NodeId) -> Option<GrammarId> {
        self.frozen.types.get(&type_def).map(|ids| ids.full)
    }

    /// TypeEmpty Grammar eines Typs (xsi:nil="true").
    pub fn type_empty_grammar(&self, type_def: NodeId) -> Option<GrammarId> {
        self.frozen.types.get(&type_def).map(|ids| ids.empty)
    }

    /// Type Grammar für ein nillable Element nach xsi:type: Zustand 0 trägt
    /// AT(xsi:nil) auf Code 0, danach geht es in der Type Grammar weiter.
    pub fn nillable_type_grammar(&self, type_def: NodeId) -> Option<GrammarId> {
        self.frozen.types.get(&type_def).map(|ids| ids.nillable)
    }

    /// Type Grammar eines benannten Typs (für xsi:type).
    pub fn named_type_grammar(&self, name: ExpandedNameId) -> Option<GrammarId> {
        let type_def = self.schema()?.global_type(name)?;
        self.type_grammar(type_def)
    }

    /// Ob `grammar` die Element-Use Grammar eines nillable Elements ist.
    pub fn is_nillable(&self, grammar: GrammarId) -> bool {
        let element = self.grammar(grammar).and_then(Grammar::element);
        match (self.schema(), element) {
            (Some(schema), Some(e)) => schema.element(e).is_ok_and(|d| d.nillable),
            _ => false,
        }
    }

    /// Grammar nach Id.
    pub fn grammar(&self, id: GrammarId) -> Option<&Grammar> {
        let frozen = self.frozen.grammars.len();
        match id.index().checked_sub(frozen) {
            None => self.frozen.grammars.get(id.index()),
            Some(i) => self.learned.grammars.get(i),
        }
    }

    pub(crate) fn grammar_mut(&mut self, id: GrammarId) -> Option<&mut Grammar> {
        let i = id.index().checked_sub(self.frozen.grammars.len())?;
        self.learned.grammars.get_mut(i)
    }

    /// Zustand hinter einem Verweis.
    pub fn state(&self, r: GrammarRef) -> Result<&GrammarState> {
        self.grammar(r.grammar)
            .and_then(|g| g.state(r.state))
            .ok_or_else(|| Error::precondition(format!("no state {} in {}", r.state, r.grammar)))
    }

    /// Event-Type-Liste eines Zustands.
    pub fn events(&self, r: GrammarRef) -> Result<&EventTypeList> {
        Ok(self.state(r)?.events())
    }

    /// Code Tuple eines Zustands.
    pub fn tuple(&self, r: GrammarRef) -> Result<&CodeTuple> {
        Ok(self.state(r)?.tuple())
    }

    /// Ob die Grammar zum gelernten Teil gehört.
    pub fn is_built_in(&self, id: GrammarId) -> bool {
        id.index() >= self.frozen.grammars.len()
    }

    /// Anzahl Grammars im eingefrorenen Teil.
    pub fn frozen_count(&self) -> usize {
        self.frozen.grammars.len()
    }

    /// Anzahl Built-in Grammars im gelernten Teil.
    pub fn built_in_count(&self) -> usize {
        self.learned.grammars.len()
    }

    // --- Namen ---

    /// Alle bekannten Namen.
    pub fn names(&self) -> &StringInterner {
        self.learned.strings.names()
    }

    /// Internt (URI, local-name).
    pub fn intern_name(&mut self, uri: &str, local_name: &str) -> Result<ExpandedNameId> {
        self.learned.strings.intern_name(uri, local_name)
    }

    /// Sucht (URI, local-name) ohne anzulegen.
    pub fn name(&self, uri: &str, local_name: &str) -> Option<ExpandedNameId> {
        self.learned.strings.name(uri, local_name)
    }

    /// Built-in Element Grammar für `name`; legt sie beim ersten Mal an.
    pub fn built_in_grammar(&mut self, name: ExpandedNameId) -> Result<GrammarId> {
        if let Some(id) = self.learned.strings.lookup_grammar(name) {
            return Ok(id);
        }
        let id = learned_id(&self.frozen, self.learned.grammars.len())?;
        let template = self
            .frozen
            .grammars
            .get(self.frozen.template.index())
            .ok_or_else(|| Error::precondition("built-in template missing"))?;
        self.learned
            .grammars
            .push(built_in::reify(template, self.frozen.template, id, name));
        trace!("{id}: built-in grammar for {}", name.display(self.learned.strings.names()));
        Ok(self.learned.strings.register_grammar(name, id))
    }

    // --- Lernen und Reset ---

    /// Lernt eine Alternative in einer Built-in Grammar.
    ///
    /// `None` wenn die Grammar nicht lernt oder ihr Limit erreicht ist.
    pub(crate) fn learn(&mut self, id: GrammarId, state: u32, event: EventType) -> Option<usize> {
        let grammar = self.grammar_mut(id)?;
        let was_dirty = grammar.is_dirty();
        let index = built_in::learn(grammar, id, state, event)?;
        if !was_dirty {
            self.learned.touched.push(id);
        }
        Some(index)
    }

    /// Anzahl der seit dem letzten Reset berührten Built-in Grammars.
    pub fn touched_count(&self) -> usize {
        self.learned.touched.len()
    }

    /// Setzt alle berührten Built-in Grammars auf ihren Rücksetzpunkt.
    ///
    /// Besucht nur berührte Grammars. Liefert deren Anzahl.
    pub fn reset(&mut self) -> usize {
        let touched = std::mem::take(&mut self.learned.touched);
        let mut removed = 0;
        for &id in &touched {
            if let Some(g) = self.grammar_mut(id) {
                removed += built_in::reset(g);
            }
        }
        if !touched.is_empty() {
            debug!("reset: {} built-in grammars, {removed} learned productions removed", touched.len());
        }
        touched.len()
    }

    /// Codes und Events eines Zustands, eine Zeile pro Event.
    pub fn describe(&self, r: GrammarRef) -> Result<String> {
        let state = self.state(r)?;
        Ok(state.tuple().describe(state.events(), self.names()))
    }
}

// ============================================================================
// Builder (Schema-informed)
// ============================================================================

/// Zustand 0 eines Typs; Element-Use Grammars übernehmen ihn.
struct TypeHead {
    primary: Vec<EventType>,
    layout: StateLayout,
    status: StateStatus,
}

struct Builder<'a> {
    schema: &'a Schema,
    options: &'a GrammarOptions,
    next: u32,
    types: FastIndexMap<NodeId, TypeIds>,
    elements: FastIndexMap<NodeId, GrammarId>,
    heads: FastHashMap<NodeId, TypeHead>,
}

impl<'a> Builder<'a> {
    fn new(schema: &'a Schema, options: &'a GrammarOptions) -> Self {
        Self {
            schema,
            options,
            next: 0,
            types: FastIndexMap::default(),
            elements: FastIndexMap::default(),
            heads: FastHashMap::default(),
        }
    }

    fn alloc(&mut self) -> Result<GrammarId> {
        let id = GrammarId(self.next);
        self.next = self.next.checked_add(1).ok_or(Error::IntegerOverflow)?;
        Ok(id)
    }

    /// Ids werden vorab vergeben; die Grammars entstehen in Id-Reihenfolge.
    fn build(mut self) -> Result<Frozen> {
        let schema = self.schema;
        for t in schema.types() {
            let ids = TypeIds { full: self.alloc()?, empty: self.alloc()?, nillable: self.alloc()? };
            self.types.insert(t, ids);
        }
        for (e, _) in schema.elements() {
            let id = self.alloc()?;
            self.elements.insert(e, id);
        }
        let document = self.alloc()?;
        let fragment = self.alloc()?;
        let element_fragment = self.alloc()?;
        let template = self.alloc()?;

        let mut grammars = Vec::with_capacity(self.next as usize);
        let types: Vec<_> = self.types.iter().map(|(&t, &ids)| (t, ids)).collect();
        for (t, ids) in types {
            let (full, empty) = ProtoGrammar::type_grammars(schema, t)?;
            let (g, head) = self.type_grammar(GrammarKind::Type, ids.full, &full.normalize())?;
            grammars.push(g.with_type(t));
            let (g, _) = self.type_grammar(GrammarKind::TypeEmpty, ids.empty, &empty.normalize())?;
            grammars.push(g.with_type(t));
            grammars.push(self.nillable_head(ids.nillable, &head).with_type(t));
            self.heads.insert(t, head);
        }
        let elements: Vec<_> = self.elements.iter().map(|(&e, &id)| (e, id)).collect();
        for (e, id) in elements {
            grammars.push(self.element_use(id, e)?);
        }

        let globals = self.globals()?;
        let (fragment_elements, fragment_attributes) = self.fragment_members(element_fragment)?;
        grammars.push(grammar::document(document, &globals, self.options));
        grammars.push(grammar::fragment(fragment, &fragment_elements, self.options));
        grammars.push(grammar::element_fragment(
            element_fragment,
            &fragment_attributes,
            &fragment_elements,
            self.options,
        ));
        grammars.push(built_in::element_template(template, self.options));

        if grammars.len() != self.next as usize {
            return Err(Error::schema_inconsistency("grammar ids out of step with construction"));
        }
        debug!(
            "grammar cache built: {} type grammars, {} element grammars, {} global elements, {} fragment elements",
            self.types.len(),
            self.elements.len(),
            globals.len(),
            fragment_elements.len()
        );

        Ok(Frozen {
            options: self.options.clone(),
            schema: None,
            grammars,
            document,
            fragment: Some(fragment),
            element_fragment: Some(element_fragment),
            template,
            elements: self.elements.into_iter().collect(),
            types: self.types.into_iter().collect(),
        })
    }

    fn type_grammar(&self, kind: GrammarKind, id: GrammarId, normal: &NormalGrammar) -> Result<(Grammar, TypeHead)> {
        let n = normal.len();
        let content = normal.content_index();
        let content2 = (self.options.deviations() && content < n).then(|| GrammarRef::new(id, n as u32));

        let mut states = Vec::with_capacity(n + 1);
        let mut head = None;
        let mut content_primary = None;
        for j in 0..n {
            let primary = self.primary(id, normal.productions(j))?;
            let here = GrammarRef::new(id, j as u32);
            let tag = j <= content;
            let layout = StateLayout { here, content: if tag { content2.unwrap_or(here) } else { here }, tag };
            let status = normal.status(j);
            if j == 0 {
                head = Some(TypeHead { primary: primary.clone(), layout, status });
            }
            if j == content && content2.is_some() {
                content_primary = Some(primary.clone());
            }
            states.push(GrammarState::new(element_state(Vec::new(), primary, &layout, self.options), false, status, tag));
        }
        if let (Some(c2), Some(primary)) = (content2, content_primary) {
            let layout = StateLayout { here: c2, content: c2, tag: false };
            states.push(GrammarState::new(
                element_state(Vec::new(), primary, &layout, self.options),
                false,
                normal.status(content),
                false,
            ));
        }
        let head = head.ok_or_else(|| Error::schema_inconsistency(format!("{id}: type grammar without states")))?;
        Ok((Grammar::new(kind, states), head))
    }

    /// Primäre Events eines normalisierten Zustands, kanonisch sortiert.
    fn primary(&self, id: GrammarId, productions: &[ProtoProduction]) -> Result<Vec<EventType>> {
        let mut events = Vec::with_capacity(productions.len());
        for p in productions {
            let Some(terminal) = p.terminal else { continue };
            let next = Some(GrammarRef::new(id, p.rhs as u32));
            let event = match terminal {
                Terminal::StartElement { name, element } => {
                    let ensuing = self.elements.get(&element).copied().ok_or_else(|| {
                        Error::schema_inconsistency(format!("particle names unknown element {}", element.index()))
                    })?;
                    EventType::new(EventKind::StartElement)
                        .with_name(name)
                        .with_ensuing(Some(ensuing))
                        .with_subsequent(next)
                }
                Terminal::StartElementNs(uri) => {
                    EventType::new(EventKind::StartElementNs).with_uri(uri).with_subsequent(next)
                }
                Terminal::StartElementAny => EventType::new(EventKind::StartElementAny).with_subsequent(next),
                Terminal::EndElement => EventType::new(EventKind::EndElement),
                Terminal::Attribute { name, attribute } => EventType::new(EventKind::Attribute)
                    .with_name(name)
                    .with_datatype(Some(self.schema.attribute(attribute)?.type_def))
                    .with_subsequent(next),
                Terminal::AttributeNs(uri) => {
                    EventType::new(EventKind::AttributeNs).with_uri(uri).with_subsequent(next)
                }
                Terminal::AttributeAny => EventType::new(EventKind::AttributeAny).with_subsequent(next),
                Terminal::Characters(datatype) => EventType::new(EventKind::Characters)
                    .with_datatype(Some(datatype))
                    .with_subsequent(next),
                Terminal::CharactersUntyped => {
                    EventType::new(EventKind::CharactersUntyped).with_subsequent(next)
                }
            };
            events.push(match (p.serial, p.particle) {
                (Some(serial), Some(particle)) => event.with_serial(serial, particle),
                _ => event,
            });
        }
        canonical_order(&mut events, self.schema.interner())?;
        Ok(events)
    }

    fn element_use(&self, id: GrammarId, element: NodeId) -> Result<Grammar> {
        let decl = self.schema.element(element)?;
        let head = self.heads.get(&decl.type_def).ok_or_else(|| {
            Error::schema_inconsistency(format!("element {} has no type grammar", element.index()))
        })?;
        let aug = Augmentations { typable: self.schema.is_typable(decl.type_def)?, nillable: decl.nillable };
        let here = GrammarRef::new(id, 0);
        let augment = augmentations(aug, self.options, here);
        let drafts = element_state(augment, head.primary.clone(), &head.layout, self.options);
        let state = GrammarState::new(drafts, false, head.status, true);
        Ok(Grammar::new(GrammarKind::ElementUse, vec![state])
            .with_type(decl.type_def)
            .with_element(element))
    }

    /// Zustand 0 eines Typs mit AT(xsi:nil) als erstem Event. xsi:type ist
    /// schon gefallen und taucht hier nicht mehr auf.
    fn nillable_head(&self, id: GrammarId, head: &TypeHead) -> Grammar {
        let aug = Augmentations { typable: false, nillable: true };
        let mut augment = augmentations(aug, self.options, GrammarRef::new(id, 0));
        augment.retain(|e| e.kind() != EventKind::XsiType);
        let drafts = element_state(augment, head.primary.clone(), &head.layout, self.options);
        Grammar::new(GrammarKind::Type, vec![GrammarState::new(drafts, false, head.status, true)])
    }

    /// Globale, nicht abstrakte Elemente nach local-name, dann URI.
    fn globals(&self) -> Result<Vec<(ExpandedNameId, GrammarId)>> {
        let mut out = Vec::new();
        for (name, element) in self.schema.global_elements() {
            if self.schema.element(element)?.is_abstract {
                continue;
            }
            if let Some(&id) = self.elements.get(&element) {
                out.push((name, id));
            }
        }
        let names = self.schema.interner();
        out.sort_by(|a, b| names.compare_names(a.0, b.0));
        Ok(out)
    }

    /// Elemente und Attribute für Fragment und Element Fragment.
    ///
    /// Ein Element-Name mit mehreren Deklarationen verschiedenen Typs oder
    /// verschiedener Nillability zeigt auf das Element Fragment. Ein
    /// Attribut-Name mit mehreren Typen bekommt `xs:string`.
    #[allow(clippy::type_complexity)]
    fn fragment_members(
        &self,
        element_fragment: GrammarId,
    ) -> Result<(Vec<(ExpandedNameId, GrammarId)>, Vec<(ExpandedNameId, Option<NodeId>)>)> {
        let names = self.schema.interner();

        let mut by_name: FastIndexMap<ExpandedNameId, Vec<NodeId>> = FastIndexMap::default();
        for (id, decl) in self.schema.elements() {
            if !decl.is_abstract {
                by_name.entry(decl.name).or_default().push(id);
            }
        }
        let mut element_names: Vec<_> = by_name.keys().copied().collect();
        sort_names(&mut element_names, names);
        let mut elements = Vec::with_capacity(element_names.len());
        for name in element_names {
            let decls = by_name.get(&name).map_or(&[][..], Vec::as_slice);
            let Some(&first) = decls.first() else { continue };
            let first_decl = self.schema.element(first)?;
            let mut unique = true;
            for &other in &decls[1..] {
                let d = self.schema.element(other)?;
                unique &= d.type_def == first_decl.type_def && d.nillable == first_decl.nillable;
            }
            let target = if unique {
                let preferred = decls
                    .iter()
                    .copied()
                    .find(|&d| self.schema.element(d).is_ok_and(|e| e.global))
                    .unwrap_or(first);
                self.elements.get(&preferred).copied().unwrap_or(element_fragment)
            } else {
                element_fragment
            };
            elements.push((name, target));
        }

        let mut attr_types: FastIndexMap<ExpandedNameId, Option<NodeId>> = FastIndexMap::default();
        let string_type = self.schema.string_type();
        for (_, decl) in self.schema.attributes() {
            attr_types
                .entry(decl.name)
                .and_modify(|t| {
                    if *t != Some(decl.type_def) {
                        *t = Some(string_type);
                    }
                })
                .or_insert(Some(decl.type_def));
        }
        let mut attr_names: Vec<_> = attr_types.keys().copied().collect();
        sort_names(&mut attr_names, names);
        let attributes = attr_names
            .into_iter()
            .map(|n| (n, attr_types.get(&n).copied().flatten()))
            .collect();

        Ok((elements, attributes))
    }
}
