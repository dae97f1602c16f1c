//! Proto-Grammars für Schema-informed Grammars (EXI 8.5.4.1, 8.5.4.2).
//!
//! Proto-Grammars sind das Zwischenformat zwischen Schema-Korpus und
//! fertigem Grammar-Zustand. Sie unterscheiden sich von normalisierten
//! Grammars durch:
//!
//! 1. **ε-Produktionen** (Productions ohne Terminal): `L : R`
//! 2. **Doppelte Terminals**: mehrere Productions mit gleichem Terminal
//!    und verschiedenen Zielen
//!
//! [`ProtoGrammar::normalize`] entfernt beides und liefert eine
//! [`NormalGrammar`], deren Zustände direkt in Event-Type-Listen
//! übersetzt werden.
//!
//! # Workflow
//!
//! ```text
//! Schema → ProtoGrammar (⊕, Particles, Wildcards)
//!        → normalize(): ε-Closure, Union-Zustände, Pruning
//!        → NormalGrammar → ordering → undeclared → GrammarState
//! ```
//!
//! # EXI-Referenz
//!
//! - 8.5.4.1.1 Grammar Concatenation Operator
//! - 8.5.4.1.3 Type Grammars
//! - 8.5.4.1.5 Particles
//! - 8.5.4.2 EXI Normalized Grammars

use crate::ordering::substitution_group;
use crate::qname::{ExpandedNameId, InternedStr};
use crate::schema::{Compositor, ContentClass, MaxOccurs, NodeId, NodeKind, Schema, WildcardConstraint};
use crate::{FastHashMap, FastIndexMap, Result};

// ============================================================================
// Terminal
// ============================================================================

/// Terminal-Symbol einer Proto-Production.
///
/// Trägt die Korpus-Knoten, aus denen später `ensuing` (Element-Deklaration)
/// und `datatype` (Simple Type) abgeleitet werden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    StartElement { name: ExpandedNameId, element: NodeId },
    StartElementNs(InternedStr),
    StartElementAny,
    EndElement,
    Attribute { name: ExpandedNameId, attribute: NodeId },
    AttributeNs(InternedStr),
    AttributeAny,
    Characters(NodeId),
    CharactersUntyped,
}

/// Vergleichsschlüssel für Duplicate-Terminal-Elimination.
///
/// SE und AT werden nach Namen verglichen, nicht nach Deklaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TerminalKey {
    StartElement(ExpandedNameId),
    StartElementNs(InternedStr),
    StartElementAny,
    EndElement,
    Attribute(ExpandedNameId),
    AttributeNs(InternedStr),
    AttributeAny,
    Characters,
    CharactersUntyped,
}

impl Terminal {
    fn key(&self) -> TerminalKey {
        match *self {
            Self::StartElement { name, .. } => TerminalKey::StartElement(name),
            Self::StartElementNs(uri) => TerminalKey::StartElementNs(uri),
            Self::StartElementAny => TerminalKey::StartElementAny,
            Self::EndElement => TerminalKey::EndElement,
            Self::Attribute { name, .. } => TerminalKey::Attribute(name),
            Self::AttributeNs(uri) => TerminalKey::AttributeNs(uri),
            Self::AttributeAny => TerminalKey::AttributeAny,
            Self::Characters(_) => TerminalKey::Characters,
            Self::CharactersUntyped => TerminalKey::CharactersUntyped,
        }
    }

    /// AT in irgendeiner Form.
    pub fn is_attribute(&self) -> bool {
        matches!(self, Self::Attribute { .. } | Self::AttributeNs(_) | Self::AttributeAny)
    }
}

// ============================================================================
// ProtoProduction / ProtoGrammar
// ============================================================================

/// Production einer Proto-Grammar.
///
/// `terminal = None` ist eine ε-Produktion. Für SE-Terminals werden
/// Serial und Particle mitgeführt (Schema-Order, EXI 8.5.4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoProduction {
    pub terminal: Option<Terminal>,
    pub rhs: usize,
    pub serial: Option<u32>,
    pub particle: Option<NodeId>,
}

impl ProtoProduction {
    /// Production mit Terminal.
    pub fn new(terminal: Terminal, rhs: usize) -> Self {
        Self { terminal: Some(terminal), rhs, serial: None, particle: None }
    }

    /// Production mit Terminal aus einem Particle.
    pub fn from_particle(terminal: Terminal, rhs: usize, serial: u32, particle: NodeId) -> Self {
        Self { terminal: Some(terminal), rhs, serial: Some(serial), particle: Some(particle) }
    }

    /// ε-Produktion `L : R`.
    pub fn epsilon(rhs: usize) -> Self {
        Self { terminal: None, rhs, serial: None, particle: None }
    }

    /// Ob dies eine ε-Produktion ist.
    pub fn is_epsilon(&self) -> bool {
        self.terminal.is_none()
    }

    fn is_end_element(&self) -> bool {
        self.terminal == Some(Terminal::EndElement)
    }
}

/// Proto-Grammar: Liste von NonTerminals, Index 0 ist der Start.
///
/// EE-Productions markieren Accept-Zustände; die Concatenation ersetzt sie
/// durch ε zum Start der rechten Grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtoGrammar {
    states: Vec<Vec<ProtoProduction>>,
}

impl ProtoGrammar {
    /// Leere Grammar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fügt ein NonTerminal hinzu und gibt dessen Index zurück.
    pub fn add_state(&mut self, productions: Vec<ProtoProduction>) -> usize {
        self.states.push(productions);
        self.states.len() - 1
    }

    /// Productions eines NonTerminals.
    pub fn state(&self, index: usize) -> Option<&[ProtoProduction]> {
        self.states.get(index).map(Vec::as_slice)
    }

    /// Anzahl der NonTerminals.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Ob die Grammar keine NonTerminals hat.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// `G_0 : EE` (leerer Inhalt, TypeEmpty, max=0).
    pub fn end_element_only() -> Self {
        let mut g = Self::new();
        g.add_state(vec![ProtoProduction::new(Terminal::EndElement, 0)]);
        g
    }

    /// Simple Content (EXI 8.5.4.1.3.1).
    ///
    /// ```text
    /// Type_0 : CH Type_1
    /// Type_1 : EE
    /// ```
    pub fn simple_content(datatype: NodeId) -> Self {
        let mut g = Self::new();
        g.add_state(vec![ProtoProduction::new(Terminal::Characters(datatype), 1)]);
        g.add_state(vec![ProtoProduction::new(Terminal::EndElement, 0)]);
        g
    }

    fn add_optional_ee(&mut self) {
        if let Some(first) = self.states.first_mut() {
            first.push(ProtoProduction::new(Terminal::EndElement, 0));
        }
    }

    /// Ersetzt EE durch ε zum Start (unbounded Schleife).
    fn make_unbounded_loop(&mut self) {
        for state in &mut self.states {
            for prod in state.iter_mut().filter(|p| p.is_end_element()) {
                *prod = ProtoProduction::epsilon(0);
            }
        }
    }

    /// Mixed Content: `Content_j : CH [untyped] Content_j` für jedes j.
    pub fn add_mixed_content(&mut self) {
        for (idx, state) in self.states.iter_mut().enumerate() {
            state.push(ProtoProduction::new(Terminal::CharactersUntyped, idx));
        }
    }

    /// Grammar Concatenation `self ⊕ other` (EXI 8.5.4.1.1).
    ///
    /// ```text
    /// 1. NonTerminals von R mit Offset len(L) anhängen
    /// 2. EE-Productions in L durch ε → R_0 ersetzen
    /// ```
    pub fn concatenate(self, other: ProtoGrammar) -> ProtoGrammar {
        let mut builder = ConcatBuilder::new(self);
        builder.append(other);
        builder.finish()
    }

    // ========================================================================
    // Aufbau aus dem Korpus
    // ========================================================================

    /// Attribute Use (EXI 8.5.4.1.4).
    ///
    /// ```text
    /// Attribute_0 : AT(qname) Attribute_1
    ///             | EE                      (nur optional)
    /// Attribute_1 : EE
    /// ```
    pub fn attribute_use(schema: &Schema, attribute_use: NodeId) -> Result<Self> {
        let usage = schema.attribute_use(attribute_use)?;
        let decl = schema.attribute(usage.attribute)?;
        let mut g = Self::new();
        let mut first = vec![ProtoProduction::new(
            Terminal::Attribute { name: decl.name, attribute: usage.attribute },
            1,
        )];
        if !usage.required {
            first.push(ProtoProduction::new(Terminal::EndElement, 0));
        }
        g.add_state(first);
        g.add_state(vec![ProtoProduction::new(Terminal::EndElement, 0)]);
        Ok(g)
    }

    /// Attribute Wildcard auf `G_0` (EXI 8.5.4.1.3.2).
    ///
    /// `##any`/`##other` ergeben `AT(*)`, eine Namespace-Liste ein
    /// `AT(uri:*)` je URI; alle zeigen zurück auf `G_0`.
    pub fn add_attribute_wildcard(&mut self, constraint: &WildcardConstraint) {
        let Some(first) = self.states.first_mut() else { return };
        match constraint {
            WildcardConstraint::Any | WildcardConstraint::Not(_) => {
                first.push(ProtoProduction::new(Terminal::AttributeAny, 0));
            }
            WildcardConstraint::Namespaces(uris) => {
                first.extend(uris.iter().map(|&u| ProtoProduction::new(Terminal::AttributeNs(u), 0)));
            }
        }
    }

    /// Type- und TypeEmpty-Grammar eines Typs (EXI 8.5.4.1.3).
    ///
    /// Liefert `(Type, TypeEmpty)`. Attribute Uses werden nach local-name,
    /// dann URI sortiert; ein Attribute Wildcard landet auf jeder
    /// Attribut-Grammar und einer zusätzlichen EE-Grammar davor.
    pub fn type_grammars(schema: &Schema, type_def: NodeId) -> Result<(Self, Self)> {
        if schema.kind(type_def)? == NodeKind::SimpleType {
            return Ok((Self::simple_content(type_def), Self::end_element_only()));
        }
        let ct = schema.complex_type(type_def)?;

        let mut uses = Vec::with_capacity(ct.attribute_uses.len());
        for &u in &ct.attribute_uses {
            let usage = schema.attribute_use(u)?;
            uses.push((schema.attribute(usage.attribute)?.name, u));
        }
        let names = schema.interner();
        uses.sort_by(|a, b| names.compare_names(a.0, b.0));

        let mut attribute_grammars = uses
            .iter()
            .map(|&(_, u)| Self::attribute_use(schema, u))
            .collect::<Result<Vec<_>>>()?;
        if let Some(wc) = ct.attribute_wildcard {
            let constraint = &schema.wildcard(wc)?.constraint;
            attribute_grammars.push(Self::end_element_only());
            for g in &mut attribute_grammars {
                g.add_attribute_wildcard(constraint);
            }
        }

        let content = match ct.content {
            ContentClass::Empty => Self::end_element_only(),
            ContentClass::Simple(datatype) => Self::simple_content(datatype),
            ContentClass::ElementOnly(particle) => Self::particle(schema, particle)?,
            ContentClass::Mixed(particle) => {
                let mut g = Self::particle(schema, particle)?;
                g.add_mixed_content();
                g
            }
        };

        let concat = |last: ProtoGrammar| {
            let mut iter = attribute_grammars.iter().cloned();
            match iter.next() {
                Some(first) => {
                    let mut builder = ConcatBuilder::new(first);
                    for g in iter {
                        builder.append(g);
                    }
                    builder.append(last);
                    builder.finish()
                }
                None => last,
            }
        };
        Ok((concat(content), concat(Self::end_element_only())))
    }

    /// Particle (EXI 8.5.4.1.5): Term mit min/max occurs.
    pub fn particle(schema: &Schema, particle: NodeId) -> Result<Self> {
        let p = *schema.particle(particle)?;
        if let MaxOccurs::Bounded(max) = p.max_occurs
            && max < p.min_occurs
        {
            return Err(crate::Error::InvalidParticleOccurs { min: p.min_occurs, max });
        }
        let term = Self::term(schema, p.term, p.serial, particle)?;

        match (p.min_occurs, p.max_occurs) {
            (_, MaxOccurs::Bounded(0)) => Ok(Self::end_element_only()),
            (1, MaxOccurs::Bounded(1)) => Ok(term),
            (0, MaxOccurs::Bounded(1)) => {
                let mut g = term;
                g.add_optional_ee();
                Ok(g)
            }
            (0, MaxOccurs::Unbounded) => {
                let mut g = term;
                g.make_unbounded_loop();
                g.add_optional_ee();
                Ok(g)
            }
            (min, MaxOccurs::Unbounded) => {
                let mut builder = ConcatBuilder::new(term.clone());
                for _ in 1..min {
                    builder.append(term.clone());
                }
                let mut loop_copy = term;
                loop_copy.make_unbounded_loop();
                loop_copy.add_optional_ee();
                builder.append(loop_copy);
                Ok(builder.finish())
            }
            (min, MaxOccurs::Bounded(max)) => {
                let optional = {
                    let mut g = term.clone();
                    g.add_optional_ee();
                    g
                };
                let mut builder = if min == 0 {
                    ConcatBuilder::new(optional.clone())
                } else {
                    ConcatBuilder::new(term.clone())
                };
                for _ in 1..min {
                    builder.append(term.clone());
                }
                for _ in min.max(1)..max {
                    builder.append(optional.clone());
                }
                Ok(builder.finish())
            }
        }
    }

    fn term(schema: &Schema, term: NodeId, serial: u32, particle: NodeId) -> Result<Self> {
        match schema.kind(term)? {
            NodeKind::Element => Self::element_term(schema, term, serial, particle),
            NodeKind::Wildcard => Self::wildcard_term(schema, term, serial, particle),
            NodeKind::ModelGroup => Self::model_group(schema, term),
            other => Err(crate::Error::schema_inconsistency(format!(
                "particle term {} is {other:?}",
                term.index()
            ))),
        }
    }

    /// Element Term mit Substitution Group (EXI 8.5.4.1.6).
    ///
    /// ```text
    /// ParticleTerm_0 : SE(E_0) ParticleTerm_1 ... SE(E_n) ParticleTerm_1
    /// ParticleTerm_1 : EE
    /// ```
    fn element_term(schema: &Schema, element: NodeId, serial: u32, particle: NodeId) -> Result<Self> {
        let mut first = Vec::new();
        for member in substitution_group(schema, element)? {
            let name = schema.element(member)?.name;
            first.push(ProtoProduction::from_particle(
                Terminal::StartElement { name, element: member },
                1,
                serial,
                particle,
            ));
        }
        let mut g = Self::new();
        g.add_state(first);
        g.add_state(vec![ProtoProduction::new(Terminal::EndElement, 0)]);
        Ok(g)
    }

    /// Wildcard Term (EXI 8.5.4.1.7).
    fn wildcard_term(schema: &Schema, wildcard: NodeId, serial: u32, particle: NodeId) -> Result<Self> {
        let first = match &schema.wildcard(wildcard)?.constraint {
            WildcardConstraint::Any | WildcardConstraint::Not(_) => vec![ProtoProduction::from_particle(
                Terminal::StartElementAny,
                1,
                serial,
                particle,
            )],
            WildcardConstraint::Namespaces(uris) => uris
                .iter()
                .map(|&u| ProtoProduction::from_particle(Terminal::StartElementNs(u), 1, serial, particle))
                .collect(),
        };
        let mut g = Self::new();
        g.add_state(first);
        g.add_state(vec![ProtoProduction::new(Terminal::EndElement, 0)]);
        Ok(g)
    }

    /// Model Group Term (EXI 8.5.4.1.8).
    fn model_group(schema: &Schema, group: NodeId) -> Result<Self> {
        let group = schema.model_group(group)?;
        if group.particles.is_empty() {
            return Ok(Self::end_element_only());
        }
        let parts = group
            .particles
            .iter()
            .map(|&p| Self::particle(schema, p))
            .collect::<Result<Vec<_>>>()?;

        match group.compositor {
            // Particle_0 ⊕ Particle_1 ⊕ ... ⊕ Particle_n-1
            Compositor::Sequence => {
                let mut iter = parts.into_iter();
                let Some(first) = iter.next() else { return Ok(Self::end_element_only()) };
                let mut builder = ConcatBuilder::new(first);
                for g in iter {
                    builder.append(g);
                }
                Ok(builder.finish())
            }
            // Term_0 : ε Particle_j,0 für alle j (EE bleibt erhalten)
            Compositor::Choice => Ok(Self::union_of(parts, None)),
            // Term_0 : EE | ε Particle_j,0; EE der Particles wird ε → Term_0
            Compositor::All => Ok(Self::union_of(parts, Some(0))),
        }
    }

    fn union_of(parts: Vec<ProtoGrammar>, loop_back: Option<usize>) -> Self {
        let mut g = Self::new();
        let mut offsets = Vec::with_capacity(parts.len());
        let mut next = 1;
        for part in &parts {
            offsets.push(next);
            next += part.len();
        }
        let mut first: Vec<ProtoProduction> = Vec::with_capacity(parts.len() + 1);
        if loop_back.is_some() {
            first.push(ProtoProduction::new(Terminal::EndElement, 0));
        }
        first.extend(offsets.iter().map(|&o| ProtoProduction::epsilon(o)));
        g.add_state(first);

        for (part, offset) in parts.into_iter().zip(offsets) {
            for state in part.states {
                let shifted = state
                    .into_iter()
                    .map(|p| match loop_back {
                        Some(target) if p.is_end_element() => ProtoProduction::epsilon(target),
                        _ => ProtoProduction { rhs: p.rhs + offset, ..p },
                    })
                    .collect();
                g.add_state(shifted);
            }
        }
        g
    }

    // ========================================================================
    // Normalisierung (EXI 8.5.4.2)
    // ========================================================================

    /// Normalisiert die Grammar.
    ///
    /// 1. ε-Elimination über die ε-Closure jedes NonTerminals
    /// 2. Duplicate Terminals: Union-NonTerminals für gleiche Terminals mit
    ///    verschiedenen Zielen (Teilmengenkonstruktion mit Union-Cache)
    /// 3. Entfernen unerreichbarer NonTerminals, Start bleibt Index 0
    pub fn normalize(self) -> NormalGrammar {
        let closed = self.eliminate_epsilon();
        let merged = eliminate_duplicate_terminals(&closed);
        prune(merged)
    }

    fn eliminate_epsilon(&self) -> Vec<Vec<ProtoProduction>> {
        let n = self.states.len();
        let mut out = Vec::with_capacity(n);
        let mut seen = vec![false; n];
        let mut stack = Vec::new();
        for start in 0..n {
            seen.iter_mut().for_each(|s| *s = false);
            let mut productions: Vec<ProtoProduction> = Vec::new();
            stack.push(start);
            seen[start] = true;
            while let Some(idx) = stack.pop() {
                for prod in &self.states[idx] {
                    match prod.terminal {
                        None => {
                            if prod.rhs < n && !seen[prod.rhs] {
                                seen[prod.rhs] = true;
                                stack.push(prod.rhs);
                            }
                        }
                        Some(t) => {
                            let duplicate = productions
                                .iter()
                                .any(|p| p.terminal.map(|x| x.key()) == Some(t.key()) && p.rhs == prod.rhs);
                            if !duplicate {
                                productions.push(*prod);
                            }
                        }
                    }
                }
            }
            out.push(productions);
        }
        out
    }
}

fn min_serial(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Teilmengenkonstruktion über Mengen ursprünglicher NonTerminals.
fn eliminate_duplicate_terminals(closed: &[Vec<ProtoProduction>]) -> Vec<Vec<ProtoProduction>> {
    let mut sets: Vec<Vec<usize>> = (0..closed.len()).map(|i| vec![i]).collect();
    let mut union_cache: FastHashMap<Vec<usize>, usize> =
        sets.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect();
    let mut out: Vec<Vec<ProtoProduction>> = Vec::with_capacity(closed.len());

    let mut k = 0;
    while k < sets.len() {
        let mut groups: FastIndexMap<TerminalKey, (ProtoProduction, Vec<usize>)> = FastIndexMap::default();
        for &member in &sets[k] {
            for prod in &closed[member] {
                let Some(t) = prod.terminal else { continue };
                let entry = groups.entry(t.key()).or_insert_with(|| (*prod, Vec::new()));
                entry.0.serial = min_serial(entry.0.serial, prod.serial);
                if entry.0.serial == prod.serial && prod.particle.is_some() {
                    entry.0.particle = prod.particle;
                }
                entry.1.push(prod.rhs);
            }
        }

        let mut productions = Vec::with_capacity(groups.len());
        for (_, (mut prod, mut targets)) in groups {
            if prod.is_end_element() {
                prod.rhs = 0;
                productions.push(prod);
                continue;
            }
            targets.sort_unstable();
            targets.dedup();
            prod.rhs = match union_cache.get(&targets) {
                Some(&idx) => idx,
                None => {
                    let idx = sets.len();
                    sets.push(targets.clone());
                    union_cache.insert(targets, idx);
                    idx
                }
            };
            productions.push(prod);
        }
        out.push(productions);
        k += 1;
    }
    out
}

fn prune(states: Vec<Vec<ProtoProduction>>) -> NormalGrammar {
    if states.is_empty() {
        return NormalGrammar { states: Vec::new() };
    }
    let mut reachable = vec![false; states.len()];
    let mut stack = vec![0usize];
    reachable[0] = true;
    while let Some(idx) = stack.pop() {
        for prod in &states[idx] {
            if !prod.is_end_element() && !reachable[prod.rhs] {
                reachable[prod.rhs] = true;
                stack.push(prod.rhs);
            }
        }
    }
    let mut remap = vec![usize::MAX; states.len()];
    let mut next = 0;
    for (idx, keep) in reachable.iter().enumerate() {
        if *keep {
            remap[idx] = next;
            next += 1;
        }
    }
    let states = states
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| reachable[*idx])
        .map(|(_, prods)| {
            prods
                .into_iter()
                .map(|p| if p.is_end_element() { p } else { ProtoProduction { rhs: remap[p.rhs], ..p } })
                .collect()
        })
        .collect();
    NormalGrammar { states }
}

/// Effizienter Concatenation-Builder für viele wiederholte Kopien.
///
/// Ersetzt EE nur im jeweils letzten Block statt bei jeder Concatenation
/// über alle NonTerminals zu iterieren.
struct ConcatBuilder {
    grammar: ProtoGrammar,
    tail_start: usize,
    tail_len: usize,
}

impl ConcatBuilder {
    fn new(grammar: ProtoGrammar) -> Self {
        let tail_len = grammar.len();
        Self { grammar, tail_start: 0, tail_len }
    }

    fn append(&mut self, other: ProtoGrammar) {
        if other.is_empty() {
            return;
        }
        let offset = self.grammar.states.len();
        let other_len = other.states.len();
        for state in other.states {
            let shifted = state
                .into_iter()
                .map(|p| ProtoProduction { rhs: p.rhs + offset, ..p })
                .collect();
            self.grammar.states.push(shifted);
        }
        let end = self.tail_start + self.tail_len;
        for state in &mut self.grammar.states[self.tail_start..end] {
            for prod in state.iter_mut().filter(|p| p.is_end_element()) {
                *prod = ProtoProduction::epsilon(offset);
            }
        }
        self.tail_start = offset;
        self.tail_len = other_len;
    }

    fn finish(self) -> ProtoGrammar {
        self.grammar
    }
}

// ============================================================================
// NormalGrammar
// ============================================================================

/// Status eines normalisierten Zustands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateStatus {
    /// Kein EE möglich, Pflicht-Inhalt steht noch aus.
    Depleting,
    /// EE möglich, weiterer Inhalt ebenfalls.
    Accepted,
    /// Nur noch EE.
    Complete,
}

/// Normalisierte Grammar: keine ε-Produktionen, keine doppelten Terminals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalGrammar {
    states: Vec<Vec<ProtoProduction>>,
}

impl NormalGrammar {
    /// Anzahl der Zustände.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Ob die Grammar keine Zustände hat.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Productions eines Zustands (alle mit Terminal).
    pub fn productions(&self, state: usize) -> &[ProtoProduction] {
        self.states.get(state).map_or(&[], Vec::as_slice)
    }

    /// Content-Index (EXI 8.5.4.4.1): erster Zustand ohne AT-Production.
    ///
    /// Haben alle Zustände AT-Productions, ist der Index `len()`.
    pub fn content_index(&self) -> usize {
        self.states
            .iter()
            .position(|prods| !prods.iter().any(|p| p.terminal.is_some_and(|t| t.is_attribute())))
            .unwrap_or(self.states.len())
    }

    /// Status eines Zustands nach seinen Productions.
    pub fn status(&self, state: usize) -> StateStatus {
        let prods = self.productions(state);
        let has_ee = prods.iter().any(ProtoProduction::is_end_element);
        match (has_ee, prods.len()) {
            (false, _) => StateStatus::Depleting,
            (true, 1) => StateStatus::Complete,
            (true, _) => StateStatus::Accepted,
        }
    }
}
