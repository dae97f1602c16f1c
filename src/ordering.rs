//! Kanonische Reihenfolge der primären Event Types (EXI 8.5.4.3).
//!
//! Encoder und Decoder müssen aus demselben Schema dieselben Codes
//! ableiten. Die Reihenfolge innerhalb eines Zustands ist deshalb fest:
//!
//! ```text
//! AT(qname)   nach local-name, dann URI
//! AT(uri:*)   nach URI
//! AT(*)
//! SE(uri:*)   nach Particle-Serial, dann URI
//! SE(qname)   nach Particle-Serial; Substitution-Group-Mitglieder eines
//!             Particles nach local-name, dann URI
//! SE(*)
//! EE
//! CH, CH [untyped]
//! ```
//!
//! Alle String-Vergleiche sind ordinal ([`StringInterner::compare_names`]).

use std::cmp::Ordering;

use crate::event_type::{EventKind, EventType};
use crate::qname::{ExpandedNameId, StringInterner};
use crate::schema::{NodeId, Schema};
use crate::{Error, FastHashMap, Result};

fn rank(kind: EventKind) -> u8 {
    match kind {
        EventKind::Attribute => 0,
        EventKind::AttributeNs => 1,
        EventKind::AttributeAny => 2,
        EventKind::StartElementNs => 3,
        EventKind::StartElement => 4,
        EventKind::StartElementAny => 5,
        EventKind::EndElement => 6,
        EventKind::Characters => 7,
        EventKind::CharactersUntyped => 8,
        _ => 9,
    }
}

/// Vergleicht zwei primäre Event Types nach der kanonischen Reihenfolge.
pub fn compare(a: &EventType, b: &EventType, names: &StringInterner) -> Ordering {
    let by_rank = rank(a.kind()).cmp(&rank(b.kind()));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match a.kind() {
        EventKind::Attribute => compare_opt_names(a.name(), b.name(), names),
        EventKind::AttributeNs => compare_uris(a, b, names),
        EventKind::StartElementNs => compare_serials(a.serial(), b.serial())
            .then_with(|| compare_uris(a, b, names)),
        EventKind::StartElement => compare_serials(a.serial(), b.serial())
            .then_with(|| compare_opt_names(a.name(), b.name(), names)),
        _ => Ordering::Equal,
    }
}

// Events ohne Serial (nicht aus Particles) hinter alle mit Serial.
fn compare_serials(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_opt_names(a: Option<ExpandedNameId>, b: Option<ExpandedNameId>, names: &StringInterner) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => names.compare_names(x, y),
        _ => Ordering::Equal,
    }
}

fn compare_uris(a: &EventType, b: &EventType, names: &StringInterner) -> Ordering {
    let ua = a.uri().map_or("", |u| names.resolve(u));
    let ub = b.uri().map_or("", |u| names.resolve(u));
    ua.cmp(ub)
}

/// Sortiert die primären Event Types eines Zustands (stabil).
///
/// Zwei SE-Events mit gleichem Serial aus verschiedenen Particles ergeben
/// [`Error::DuplicateParticleSerial`]; die Reihenfolge wäre sonst nicht
/// eindeutig.
pub fn canonical_order(events: &mut [EventType], names: &StringInterner) -> Result<()> {
    check_serials(events)?;
    events.sort_by(|a, b| compare(a, b, names));
    Ok(())
}

fn check_serials(events: &[EventType]) -> Result<()> {
    let mut owners: FastHashMap<u32, NodeId> = FastHashMap::default();
    for e in events.iter().filter(|e| e.kind().is_start_element()) {
        let (Some(serial), Some(particle)) = (e.serial(), e.particle) else {
            continue;
        };
        match owners.get(&serial) {
            Some(&owner) if owner != particle => {
                return Err(Error::DuplicateParticleSerial { serial });
            }
            Some(_) => {}
            None => {
                owners.insert(serial, particle);
            }
        }
    }
    Ok(())
}

/// Expandiert ein Element-Particle zu seiner Substitution Group (EXI 8.5.4.1.6).
///
/// Enthält das Element selbst und alle transitiv substituierbaren
/// Elemente, ohne abstrakte Deklarationen, sortiert nach local-name, dann URI.
pub fn substitution_group(schema: &Schema, element: NodeId) -> Result<Vec<NodeId>> {
    let mut group = Vec::with_capacity(1 + schema.substitution_members(element).len());
    for &candidate in std::iter::once(&element).chain(schema.substitution_members(element)) {
        if !schema.element(candidate)?.is_abstract {
            group.push(candidate);
        }
    }
    let mut keyed = Vec::with_capacity(group.len());
    for id in group {
        keyed.push((schema.element(id)?.name, id));
    }
    let names = schema.interner();
    keyed.sort_by(|a, b| names.compare_names(a.0, b.0));
    Ok(keyed.into_iter().map(|(_, id)| id).collect())
}

/// Sortiert Namen nach local-name, dann URI und entfernt Duplikate.
pub fn sort_names(list: &mut Vec<ExpandedNameId>, names: &StringInterner) {
    list.sort_by(|a, b| names.compare_names(*a, *b));
    list.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MaxOccurs, SchemaBuilder};

    fn se(name: ExpandedNameId, serial: u32, particle: u32) -> EventType {
        EventType::new(EventKind::StartElement)
            .with_name(name)
            .with_serial(serial, NodeId(particle))
    }

    #[test]
    fn arten_reihenfolge() {
        let mut i = StringInterner::new();
        let a = i.intern_expanded("", "a").unwrap();
        let u = i.intern("urn:x").unwrap();
        let mut events = vec![
            EventType::new(EventKind::Characters),
            EventType::new(EventKind::EndElement),
            EventType::new(EventKind::StartElementAny),
            se(a, 0, 1),
            EventType::new(EventKind::StartElementNs).with_uri(u).with_serial(1, NodeId(2)),
            EventType::new(EventKind::AttributeAny),
            EventType::new(EventKind::Attribute).with_name(a),
        ];
        canonical_order(&mut events, &i).unwrap();
        let kinds: Vec<_> = events.iter().map(EventType::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Attribute,
                EventKind::AttributeAny,
                EventKind::StartElementNs,
                EventKind::StartElement,
                EventKind::StartElementAny,
                EventKind::EndElement,
                EventKind::Characters,
            ]
        );
    }

    #[test]
    fn elemente_nach_serial_nicht_nach_namen() {
        let mut i = StringInterner::new();
        let z = i.intern_expanded("", "z").unwrap();
        let a = i.intern_expanded("", "a").unwrap();
        let mut events = vec![se(a, 5, 2), se(z, 3, 1)];
        canonical_order(&mut events, &i).unwrap();
        assert_eq!(events[0].name(), Some(z));
    }

    #[test]
    fn attribute_nach_local_name_dann_uri() {
        let mut i = StringInterner::new();
        let b = i.intern_expanded("", "b").unwrap();
        let a2 = i.intern_expanded("urn:2", "a").unwrap();
        let a1 = i.intern_expanded("urn:1", "a").unwrap();
        let mut events: Vec<_> = [b, a2, a1]
            .into_iter()
            .map(|n| EventType::new(EventKind::Attribute).with_name(n))
            .collect();
        canonical_order(&mut events, &i).unwrap();
        let order: Vec<_> = events.iter().filter_map(EventType::name).collect();
        assert_eq!(order, vec![a1, a2, b]);
    }

    #[test]
    fn doppelter_serial_ist_fehler() {
        let mut i = StringInterner::new();
        let a = i.intern_expanded("", "a").unwrap();
        let b = i.intern_expanded("", "b").unwrap();
        let mut events = vec![se(a, 7, 1), se(b, 7, 2)];
        assert_eq!(
            canonical_order(&mut events, &i),
            Err(Error::DuplicateParticleSerial { serial: 7 })
        );
        // gleiches Particle (Substitution Group) ist erlaubt
        let mut events = vec![se(b, 7, 1), se(a, 7, 1)];
        assert!(canonical_order(&mut events, &i).is_ok());
        assert_eq!(events[0].name(), Some(a));
    }

    #[test]
    fn substitution_group_sortiert_ohne_abstrakte() {
        let mut sb = SchemaBuilder::new();
        let s = sb.string_type();
        let head_name = sb.name("ns1", "head").unwrap();
        let b2 = sb.name("ns2", "B").unwrap();
        let a1 = sb.name("ns1", "A").unwrap();
        let a2 = sb.name("ns2", "A").unwrap();
        let head = sb.global_element(head_name, s).unwrap();
        sb.set_abstract(head, true).unwrap();
        let eb2 = sb.global_element(b2, s).unwrap();
        let ea1 = sb.global_element(a1, s).unwrap();
        let ea2 = sb.global_element(a2, s).unwrap();
        for m in [eb2, ea1, ea2] {
            sb.substitutes(m, head).unwrap();
        }
        let p = sb.particle(1, MaxOccurs::Bounded(1), head).unwrap();
        let schema = sb.build();
        assert!(schema.particle(p).is_ok());
        assert_eq!(substitution_group(&schema, head).unwrap(), vec![ea1, ea2, eb2]);
    }

    #[test]
    fn namen_sortiert_und_eindeutig() {
        let mut i = StringInterner::new();
        let b = i.intern_expanded("", "b").unwrap();
        let a = i.intern_expanded("", "a").unwrap();
        let mut list = vec![b, a, b];
        sort_names(&mut list, &i);
        assert_eq!(list, vec![a, b]);
    }
}
