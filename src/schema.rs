//! Kompiliertes Schema als flaches Array (Eingabe der Grammar-Erzeugung, EXI 8.5).
//!
//! Alle Deklarationen liegen in einem `Vec<Node>` und werden über
//! [`NodeId`] adressiert. Die Grammar-Erzeugung liest den Korpus nur
//! über die Accessor-Methoden von [`Schema`]; ein Knoten der falschen Art
//! an einer Stelle, an der eine bestimmte Art erwartet wird, ergibt
//! [`Error::SchemaInconsistency`].
//!
//! Schemas entstehen über den [`SchemaBuilder`], der Particle-Serials in
//! Deklarationsreihenfolge vergibt und `xs:anyType`/`xs:string`
//! vorregistriert.
//!
//! # Beispiel
//!
//! ```
//! use exi_grammar::schema::{MaxOccurs, SchemaBuilder};
//!
//! let mut b = SchemaBuilder::new();
//! let string = b.string_type();
//! let root = b.name("", "root").unwrap();
//! b.global_element(root, string).unwrap();
//! let schema = b.build();
//!
//! assert_eq!(schema.global_elements().count(), 1);
//! # let _ = MaxOccurs::Unbounded;
//! ```
//!
//! # EXI-Referenz
//!
//! - 8.5.4.1.3 Type Grammars
//! - 8.5.4.1.5 Particles
//! - 8.5.4.1.6 Element Terms
//! - 8.5.4.1.7 Wildcard Terms
//! - 8.5.4.1.8 Model Group Terms

use crate::qname::{ExpandedNameId, InternedStr, StringInterner, URI_XSD};
use crate::{Error, FastHashSet, FastIndexMap, Result};

/// Handle eines Knotens im Korpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position im Knoten-Array.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Art eines Korpus-Knotens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Attribute,
    AttributeUse,
    ComplexType,
    SimpleType,
    Particle,
    ModelGroup,
    Wildcard,
}

/// Element Declaration (8.5.4.1.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    pub name: ExpandedNameId,
    /// Typ-Knoten (ComplexType oder SimpleType).
    pub type_def: NodeId,
    pub nillable: bool,
    pub is_abstract: bool,
    pub global: bool,
    /// Head der Substitution Group, der dieses Element angehört.
    pub substitution_head: Option<NodeId>,
}

/// Attribute Declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: ExpandedNameId,
    /// Simple-Type-Knoten des Attributwerts.
    pub type_def: NodeId,
    pub global: bool,
}

/// Attribute Use eines Complex Types (8.5.4.1.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeUse {
    pub attribute: NodeId,
    pub required: bool,
}

/// Inhaltsklasse eines Typs (8.5.4.1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// Nur Attribute, dann EE.
    Empty,
    /// Zeichendaten mit dem angegebenen Simple Type.
    Simple(NodeId),
    /// Element-Only: Particle-Knoten des Content Models.
    ElementOnly(NodeId),
    /// Mixed: Particle plus CH [untyped] in jedem Zustand.
    Mixed(NodeId),
}

/// Complex Type Definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexType {
    pub name: Option<ExpandedNameId>,
    pub base: Option<NodeId>,
    pub attribute_uses: Vec<NodeId>,
    /// Wildcard-Knoten für `anyAttribute`.
    pub attribute_wildcard: Option<NodeId>,
    pub content: ContentClass,
}

/// Variety eines Simple Types (XSD 1.0 Part 2 §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variety {
    #[default]
    Atomic,
    List,
    Union,
}

/// Simple Type Definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleType {
    pub name: Option<ExpandedNameId>,
    pub base: Option<NodeId>,
    pub variety: Variety,
}

/// MaxOccurs Constraint für Particles (8.5.4.1.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(usize),
    Unbounded,
}

/// Particle: Term mit Wiederholungsgrenzen und Deklarations-Serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Particle {
    pub min_occurs: usize,
    pub max_occurs: MaxOccurs,
    /// Element-, Wildcard- oder ModelGroup-Knoten.
    pub term: NodeId,
    /// Vom Schema-Compiler vergebene Reihenfolge (8.5.4.3 "schema order").
    pub serial: u32,
}

/// Compositor einer Model Group (8.5.4.1.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compositor {
    Sequence,
    Choice,
    All,
}

/// Model Group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGroup {
    pub compositor: Compositor,
    pub particles: Vec<NodeId>,
}

/// Namespace Constraint für Wildcards (8.5.4.1.7).
///
/// - `Any` und `Not` erzeugen SE(*) bzw. AT(*)
/// - `Namespaces` erzeugt SE(uri:*) bzw. AT(uri:*) je URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardConstraint {
    Any,
    /// `##other`: alles außer dem Namespace (`None` = absent).
    Not(Option<InternedStr>),
    /// Explizite Namespace-Liste; "" steht für absent.
    Namespaces(Vec<InternedStr>),
}

impl WildcardConstraint {
    /// Ob ein Name mit der URI `uri` vom Wildcard erfasst wird.
    pub fn admits(&self, uri: InternedStr, empty: Option<InternedStr>) -> bool {
        match self {
            Self::Any => true,
            Self::Not(excluded) => {
                // ##other schließt auch absent aus
                Some(uri) != *excluded && Some(uri) != empty
            }
            Self::Namespaces(uris) => uris.contains(&uri),
        }
    }
}

/// Wildcard-Knoten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    pub constraint: WildcardConstraint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Element(ElementDecl),
    Attribute(AttributeDecl),
    AttributeUse(AttributeUse),
    ComplexType(ComplexType),
    SimpleType(SimpleType),
    Particle(Particle),
    ModelGroup(ModelGroup),
    Wildcard(Wildcard),
}

impl Node {
    fn kind(&self) -> NodeKind {
        match self {
            Node::Element(_) => NodeKind::Element,
            Node::Attribute(_) => NodeKind::Attribute,
            Node::AttributeUse(_) => NodeKind::AttributeUse,
            Node::ComplexType(_) => NodeKind::ComplexType,
            Node::SimpleType(_) => NodeKind::SimpleType,
            Node::Particle(_) => NodeKind::Particle,
            Node::ModelGroup(_) => NodeKind::ModelGroup,
            Node::Wildcard(_) => NodeKind::Wildcard,
        }
    }
}

// ============================================================================
// Schema (read-only Korpus)
// ============================================================================

/// Kompilierter, unveränderlicher Schema-Korpus.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<Node>,
    interner: StringInterner,
    global_elements: FastIndexMap<ExpandedNameId, NodeId>,
    global_attributes: FastIndexMap<ExpandedNameId, NodeId>,
    global_types: FastIndexMap<ExpandedNameId, NodeId>,
    substitution_members: FastIndexMap<NodeId, Vec<NodeId>>,
    types_with_named_subtypes: FastHashSet<NodeId>,
    any_type: NodeId,
    string_type: NodeId,
}

fn mismatch(id: NodeId, expected: &str, found: Option<NodeKind>) -> Error {
    match found {
        Some(kind) => Error::schema_inconsistency(format!(
            "node {} is {kind:?}, expected {expected}",
            id.0
        )),
        None => Error::schema_inconsistency(format!("node {} does not exist", id.0)),
    }
}

macro_rules! accessor {
    ($(#[$doc:meta])* $fn_name:ident, $variant:ident, $ty:ty, $label:literal) => {
        $(#[$doc])*
        pub fn $fn_name(&self, id: NodeId) -> Result<&$ty> {
            match self.nodes.get(id.index()) {
                Some(Node::$variant(inner)) => Ok(inner),
                other => Err(mismatch(id, $label, other.map(Node::kind))),
            }
        }
    };
}

impl Schema {
    /// Startet einen neuen Builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Der Interner, in dem alle Namen des Korpus liegen.
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    /// Anzahl der Knoten.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Ob der Korpus leer ist (nie der Fall nach `build`).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Art eines Knotens.
    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        self.nodes
            .get(id.index())
            .map(Node::kind)
            .ok_or_else(|| mismatch(id, "any node", None))
    }

    accessor!(
        /// Element Declaration.
        element, Element, ElementDecl, "element declaration");
    accessor!(
        /// Attribute Declaration.
        attribute, Attribute, AttributeDecl, "attribute declaration");
    accessor!(
        /// Attribute Use.
        attribute_use, AttributeUse, AttributeUse, "attribute use");
    accessor!(
        /// Complex Type.
        complex_type, ComplexType, ComplexType, "complex type");
    accessor!(
        /// Simple Type.
        simple_type, SimpleType, SimpleType, "simple type");
    accessor!(
        /// Particle.
        particle, Particle, Particle, "particle");
    accessor!(
        /// Model Group.
        model_group, ModelGroup, ModelGroup, "model group");
    accessor!(
        /// Wildcard.
        wildcard, Wildcard, Wildcard, "wildcard");

    /// Ob der Knoten ein Typ (simple oder complex) ist.
    pub fn is_type(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            Ok(NodeKind::ComplexType | NodeKind::SimpleType)
        )
    }

    /// Name eines Typs (None für anonyme Typen).
    pub fn type_name(&self, id: NodeId) -> Result<Option<ExpandedNameId>> {
        match self.nodes.get(id.index()) {
            Some(Node::ComplexType(ct)) => Ok(ct.name),
            Some(Node::SimpleType(st)) => Ok(st.name),
            other => Err(mismatch(id, "type definition", other.map(Node::kind))),
        }
    }

    /// Base-Type eines Typs.
    pub fn base_type(&self, id: NodeId) -> Result<Option<NodeId>> {
        match self.nodes.get(id.index()) {
            Some(Node::ComplexType(ct)) => Ok(ct.base),
            Some(Node::SimpleType(st)) => Ok(st.base),
            other => Err(mismatch(id, "type definition", other.map(Node::kind))),
        }
    }

    /// Inhaltsklasse eines Typs; Simple Types haben immer `Simple(self)`.
    pub fn content_class(&self, id: NodeId) -> Result<ContentClass> {
        match self.nodes.get(id.index()) {
            Some(Node::ComplexType(ct)) => Ok(ct.content),
            Some(Node::SimpleType(_)) => Ok(ContentClass::Simple(id)),
            other => Err(mismatch(id, "type definition", other.map(Node::kind))),
        }
    }

    /// Globale Element-Deklaration nach Namen.
    pub fn global_element(&self, name: ExpandedNameId) -> Option<NodeId> {
        self.global_elements.get(&name).copied()
    }

    /// Alle globalen Elemente in Deklarationsreihenfolge.
    pub fn global_elements(&self) -> impl Iterator<Item = (ExpandedNameId, NodeId)> + '_ {
        self.global_elements.iter().map(|(n, id)| (*n, *id))
    }

    /// Globale Attribut-Deklaration nach Namen.
    pub fn global_attribute(&self, name: ExpandedNameId) -> Option<NodeId> {
        self.global_attributes.get(&name).copied()
    }

    /// Benannter Typ nach Namen.
    pub fn global_type(&self, name: ExpandedNameId) -> Option<NodeId> {
        self.global_types.get(&name).copied()
    }

    /// Alle Element-Deklarationen (global und lokal) in Knotenreihenfolge.
    pub fn elements(&self) -> impl Iterator<Item = (NodeId, &ElementDecl)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match n {
            Node::Element(e) => Some((NodeId(i as u32), e)),
            _ => None,
        })
    }

    /// Alle Attribut-Deklarationen (global und lokal) in Knotenreihenfolge.
    pub fn attributes(&self) -> impl Iterator<Item = (NodeId, &AttributeDecl)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match n {
            Node::Attribute(a) => Some((NodeId(i as u32), a)),
            _ => None,
        })
    }

    /// Alle Typ-Knoten in Knotenreihenfolge.
    pub fn types(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match n {
            Node::ComplexType(_) | Node::SimpleType(_) => Some(NodeId(i as u32)),
            _ => None,
        })
    }

    /// Transitiv registrierte Mitglieder der Substitution Group eines Heads.
    ///
    /// Der Head selbst ist nicht enthalten.
    pub fn substitution_members(&self, head: NodeId) -> &[NodeId] {
        self.substitution_members
            .get(&head)
            .map_or(&[], Vec::as_slice)
    }

    /// Ob xsi:type für diesen Typ sinnvoll ist (8.5.4.4.2): benannte
    /// Sub-Typen vorhanden oder Union-Variety.
    pub fn is_typable(&self, id: NodeId) -> Result<bool> {
        if self.types_with_named_subtypes.contains(&id) {
            return Ok(true);
        }
        match self.nodes.get(id.index()) {
            Some(Node::SimpleType(st)) => Ok(st.variety == Variety::Union),
            Some(Node::ComplexType(_)) => Ok(false),
            other => Err(mismatch(id, "type definition", other.map(Node::kind))),
        }
    }

    /// `xs:anyType`.
    pub fn any_type(&self) -> NodeId {
        self.any_type
    }

    /// `xs:string`.
    pub fn string_type(&self) -> NodeId {
        self.string_type
    }
}

// ============================================================================
// SchemaBuilder
// ============================================================================

/// Builder für [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    nodes: Vec<Node>,
    interner: StringInterner,
    next_serial: u32,
    global_elements: FastIndexMap<ExpandedNameId, NodeId>,
    global_attributes: FastIndexMap<ExpandedNameId, NodeId>,
    global_types: FastIndexMap<ExpandedNameId, NodeId>,
    any_type: NodeId,
    string_type: NodeId,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Neuer Builder mit vorregistriertem `xs:string` und `xs:anyType`.
    pub fn new() -> Self {
        let mut b = Self {
            nodes: Vec::new(),
            interner: StringInterner::new(),
            next_serial: 0,
            global_elements: FastIndexMap::default(),
            global_attributes: FastIndexMap::default(),
            global_types: FastIndexMap::default(),
            any_type: NodeId(0),
            string_type: NodeId(0),
        };
        b.register_builtins();
        b
    }

    // Wenige Knoten, Namen passen immer in den frischen Interner.
    fn register_builtins(&mut self) {
        let name = |b: &mut Self, local: &str| {
            let uri = b.interner.intern(URI_XSD).unwrap_or(InternedStr(0));
            let local = b.interner.intern(local).unwrap_or(InternedStr(0));
            ExpandedNameId::new(uri, local)
        };
        let string_name = name(self, "string");
        self.string_type = self.simple_type(Some(string_name), None, Variety::Atomic);

        let any_name = name(self, "anyType");
        let any_wc = self.push(Node::Wildcard(Wildcard { constraint: WildcardConstraint::Any }));
        let any_attr_wc = self.push(Node::Wildcard(Wildcard { constraint: WildcardConstraint::Any }));
        let serial = self.take_serial();
        let particle = self.push(Node::Particle(Particle {
            min_occurs: 0,
            max_occurs: MaxOccurs::Unbounded,
            term: any_wc,
            serial,
        }));
        self.any_type = self.complex_type(ComplexType {
            name: Some(any_name),
            base: None,
            attribute_uses: Vec::new(),
            attribute_wildcard: Some(any_attr_wc),
            content: ContentClass::Mixed(particle),
        });
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn take_serial(&mut self) -> u32 {
        let s = self.next_serial;
        self.next_serial += 1;
        s
    }

    /// Internt einen Namen im Korpus-Interner.
    pub fn name(&mut self, uri: &str, local_name: &str) -> Result<ExpandedNameId> {
        self.interner.intern_expanded(uri, local_name)
    }

    /// Internt eine einzelne URI (für Wildcard-Constraints).
    pub fn uri(&mut self, uri: &str) -> Result<InternedStr> {
        self.interner.intern(uri)
    }

    /// `xs:string`.
    pub fn string_type(&self) -> NodeId {
        self.string_type
    }

    /// `xs:anyType`.
    pub fn any_type(&self) -> NodeId {
        self.any_type
    }

    /// Legt einen Simple Type an; benannte Typen werden global registriert.
    pub fn simple_type(&mut self, name: Option<ExpandedNameId>, base: Option<NodeId>, variety: Variety) -> NodeId {
        let id = self.push(Node::SimpleType(SimpleType { name, base, variety }));
        if let Some(n) = name {
            self.global_types.insert(n, id);
        }
        id
    }

    /// Legt einen Complex Type an; benannte Typen werden global registriert.
    pub fn complex_type(&mut self, ct: ComplexType) -> NodeId {
        let name = ct.name;
        let id = self.push(Node::ComplexType(ct));
        if let Some(n) = name {
            self.global_types.insert(n, id);
        }
        id
    }

    fn element_decl(&mut self, name: ExpandedNameId, type_def: NodeId, global: bool) -> Result<NodeId> {
        if !matches!(
            self.nodes.get(type_def.index()),
            Some(Node::ComplexType(_) | Node::SimpleType(_))
        ) {
            return Err(Error::schema_inconsistency(format!(
                "element type {} is not a type definition",
                type_def.0
            )));
        }
        let id = self.push(Node::Element(ElementDecl {
            name,
            type_def,
            nillable: false,
            is_abstract: false,
            global,
            substitution_head: None,
        }));
        Ok(id)
    }

    /// Lokale Element-Deklaration.
    pub fn element(&mut self, name: ExpandedNameId, type_def: NodeId) -> Result<NodeId> {
        self.element_decl(name, type_def, false)
    }

    /// Globale Element-Deklaration.
    pub fn global_element(&mut self, name: ExpandedNameId, type_def: NodeId) -> Result<NodeId> {
        let id = self.element_decl(name, type_def, true)?;
        self.global_elements.insert(name, id);
        Ok(id)
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementDecl> {
        match self.nodes.get_mut(id.index()) {
            Some(Node::Element(e)) => Ok(e),
            other => Err(mismatch(id, "element declaration", other.map(|n| n.kind()))),
        }
    }

    /// Setzt `nillable` einer Element-Deklaration.
    pub fn set_nillable(&mut self, element: NodeId, nillable: bool) -> Result<()> {
        self.element_mut(element)?.nillable = nillable;
        Ok(())
    }

    /// Setzt `abstract` einer Element-Deklaration.
    pub fn set_abstract(&mut self, element: NodeId, is_abstract: bool) -> Result<()> {
        self.element_mut(element)?.is_abstract = is_abstract;
        Ok(())
    }

    /// Registriert `member` als substituierbar für `head`.
    pub fn substitutes(&mut self, member: NodeId, head: NodeId) -> Result<()> {
        self.element_mut(head)?;
        self.element_mut(member)?.substitution_head = Some(head);
        Ok(())
    }

    /// Lokale Attribut-Deklaration.
    pub fn attribute(&mut self, name: ExpandedNameId, type_def: NodeId) -> NodeId {
        self.push(Node::Attribute(AttributeDecl { name, type_def, global: false }))
    }

    /// Globale Attribut-Deklaration.
    pub fn global_attribute(&mut self, name: ExpandedNameId, type_def: NodeId) -> NodeId {
        let id = self.push(Node::Attribute(AttributeDecl { name, type_def, global: true }));
        self.global_attributes.insert(name, id);
        id
    }

    /// Attribute Use.
    pub fn attribute_use(&mut self, attribute: NodeId, required: bool) -> NodeId {
        self.push(Node::AttributeUse(AttributeUse { attribute, required }))
    }

    /// Particle mit automatisch vergebenem Serial.
    pub fn particle(&mut self, min_occurs: usize, max_occurs: MaxOccurs, term: NodeId) -> Result<NodeId> {
        let serial = self.next_serial;
        let id = self.particle_with_serial(min_occurs, max_occurs, term, serial)?;
        self.next_serial += 1;
        Ok(id)
    }

    /// Particle mit explizitem Serial; vergibt keinen neuen Serial.
    pub fn particle_with_serial(
        &mut self,
        min_occurs: usize,
        max_occurs: MaxOccurs,
        term: NodeId,
        serial: u32,
    ) -> Result<NodeId> {
        if let MaxOccurs::Bounded(max) = max_occurs
            && max < min_occurs
        {
            return Err(Error::InvalidParticleOccurs { min: min_occurs, max });
        }
        Ok(self.push(Node::Particle(Particle { min_occurs, max_occurs, term, serial })))
    }

    /// Model Group.
    pub fn model_group(&mut self, compositor: Compositor, particles: Vec<NodeId>) -> NodeId {
        self.push(Node::ModelGroup(ModelGroup { compositor, particles }))
    }

    /// Sequence-Gruppe.
    pub fn sequence(&mut self, particles: Vec<NodeId>) -> NodeId {
        self.model_group(Compositor::Sequence, particles)
    }

    /// Choice-Gruppe.
    pub fn choice(&mut self, particles: Vec<NodeId>) -> NodeId {
        self.model_group(Compositor::Choice, particles)
    }

    /// All-Gruppe.
    pub fn all(&mut self, particles: Vec<NodeId>) -> NodeId {
        self.model_group(Compositor::All, particles)
    }

    /// Wildcard; eine leere Namespace-Liste ist ungültig.
    pub fn wildcard(&mut self, constraint: WildcardConstraint) -> Result<NodeId> {
        if let WildcardConstraint::Namespaces(uris) = &constraint
            && uris.is_empty()
        {
            return Err(Error::EmptyNamespaceList);
        }
        Ok(self.push(Node::Wildcard(Wildcard { constraint })))
    }

    /// Schließt den Korpus ab.
    ///
    /// Berechnet transitive Substitution Groups und die Menge der Typen
    /// mit benannten Sub-Typen.
    pub fn build(self) -> Schema {
        let mut substitution_members: FastIndexMap<NodeId, Vec<NodeId>> = FastIndexMap::default();
        for (i, node) in self.nodes.iter().enumerate() {
            let Node::Element(e) = node else { continue };
            let member = NodeId(i as u32);
            let mut seen: FastHashSet<NodeId> = FastHashSet::default();
            let mut head = e.substitution_head;
            while let Some(h) = head {
                if !seen.insert(h) {
                    break;
                }
                substitution_members.entry(h).or_default().push(member);
                head = match self.nodes.get(h.index()) {
                    Some(Node::Element(he)) => he.substitution_head,
                    _ => None,
                };
            }
        }

        let mut types_with_named_subtypes: FastHashSet<NodeId> = FastHashSet::default();
        for node in &self.nodes {
            let (name, mut base) = match node {
                Node::ComplexType(ct) => (ct.name, ct.base),
                Node::SimpleType(st) => (st.name, st.base),
                _ => continue,
            };
            if name.is_none() {
                continue;
            }
            let mut seen: FastHashSet<NodeId> = FastHashSet::default();
            while let Some(b) = base {
                if !seen.insert(b) {
                    break;
                }
                types_with_named_subtypes.insert(b);
                base = match self.nodes.get(b.index()) {
                    Some(Node::ComplexType(ct)) => ct.base,
                    Some(Node::SimpleType(st)) => st.base,
                    _ => None,
                };
            }
        }

        Schema {
            nodes: self.nodes,
            interner: self.interner,
            global_elements: self.global_elements,
            global_attributes: self.global_attributes,
            global_types: self.global_types,
            substitution_members,
            types_with_named_subtypes,
            any_type: self.any_type,
            string_type: self.string_type,
        }
    }
}
