//! Schema-informed Grammars: Traversal, Deviations, xsi:type/xsi:nil (EXI 8.5).

use exi_grammar::{
    ComplexType, ContentClass, Error, EventCode, EventKind, GrammarCache, GrammarKind, GrammarOptions, MaxOccurs,
    Phase, Preserve, Schema, SchemaBuilder, Traversal,
};

include!("common/schemas.rs");

fn current_kind(t: &Traversal<'_>) -> GrammarKind {
    let r = t.current().unwrap();
    t.cache().grammar(r.grammar).unwrap().kind()
}

#[test]
fn dokument_durchlauf() {
    let mut cache = GrammarCache::with_schema(sample_schema(), GrammarOptions::default()).unwrap();
    let string = cache.schema().unwrap().string_type();
    let root = cache.name("", "root").unwrap();
    let a = cache.name("", "a").unwrap();
    let id = cache.name("", "id").unwrap();

    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    assert_eq!(t.start_document().unwrap().code, EventCode::one(0));
    assert_eq!(t.start_element(root).unwrap().code, EventCode::one(0));
    assert_eq!(current_kind(&t), GrammarKind::ElementUse);

    let at = t.attribute(id).unwrap();
    assert_eq!(at.code, EventCode::one(2));
    assert!(!at.deviation);
    assert_eq!(t.datatype(), Some(string));

    let se = t.start_element(a).unwrap();
    assert_eq!(se.kind, EventKind::StartElement);
    assert!(!se.deviation);
    let ch = t.characters().unwrap();
    assert_eq!(ch.kind, EventKind::Characters);
    assert_eq!(t.datatype(), Some(string));
    assert!(!t.end_element().unwrap().deviation);
    assert!(!t.end_element().unwrap().deviation);
    assert_eq!(t.phase(), Some(Phase::Completed));
    t.end_document().unwrap();
    assert!(t.event_types().unwrap().is_empty());
}

#[test]
fn pflichtelement_fehlt_mit_deviation() {
    let mut cache = GrammarCache::with_schema(sample_schema(), GrammarOptions::default()).unwrap();
    let root = cache.name("", "root").unwrap();
    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    let ee = t.end_element().unwrap();
    assert_eq!(ee.code, EventCode::two(4, 0));
    assert!(ee.deviation);
}

#[test]
fn abweichungen_ohne_strict() {
    let mut cache = GrammarCache::with_schema(sample_schema(), GrammarOptions::default()).unwrap();
    let root = cache.name("", "root").unwrap();
    let id = cache.name("", "id").unwrap();
    let foo = cache.intern_name("", "foo").unwrap();
    let x = cache.intern_name("urn:x", "x").unwrap();

    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();

    let at = t.attribute(foo).unwrap();
    assert_eq!(at.code, EventCode::two(4, 1));
    assert!(at.deviation);
    let invalid = t.attribute_untyped(id).unwrap();
    assert_eq!(invalid.code, EventCode::three(4, 2, 0));
    assert_eq!(invalid.kind, EventKind::AttributeInvalid);

    let se = t.start_element(x).unwrap();
    assert_eq!(se.kind, EventKind::StartElementAny);
    assert!(se.deviation);
    assert_eq!(current_kind(&t), GrammarKind::BuiltInElement);
    t.end_element().unwrap();
    t.end_element().unwrap();
    t.end_document().unwrap();
}

#[test]
fn strict_verbietet_abweichungen() {
    let opts = GrammarOptions::default().with_strict();
    let mut cache = GrammarCache::with_schema(sample_schema(), opts).unwrap();
    let root = cache.name("", "root").unwrap();
    let foo = cache.intern_name("", "foo").unwrap();
    let t2 = cache.name("", "T2").unwrap();

    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    // xsi:nil, AT(id), SE(a)
    assert_eq!(t.event_types().unwrap().len(), 3);
    assert!(matches!(t.attribute(foo), Err(Error::GrammarViolation { .. })));
    assert!(matches!(t.start_element(foo), Err(Error::GrammarViolation { .. })));
    assert!(matches!(t.xsi_type(t2), Err(Error::GrammarViolation { .. })));
    assert!(matches!(t.end_element(), Err(Error::GrammarViolation { .. })));
}

#[test]
fn xsi_type_wechselt_grammar() {
    let mut cache = GrammarCache::with_schema(sample_schema(), GrammarOptions::default()).unwrap();
    let root = cache.name("", "root").unwrap();
    let a = cache.name("", "a").unwrap();
    let t2 = cache.name("", "T2").unwrap();
    let nope = cache.intern_name("", "Nope").unwrap();

    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    match t.xsi_type(nope) {
        Err(Error::XsiTypeNotFound(name)) => assert_eq!(name, "Nope"),
        other => panic!("unerwartet: {other:?}"),
    }
    let m = t.xsi_type(t2).unwrap();
    assert_eq!(m.code, EventCode::one(0));
    assert!(m.deviation);
    assert_eq!(current_kind(&t), GrammarKind::Type);
    t.start_element(a).unwrap();
    t.characters().unwrap();
    t.end_element().unwrap();
    assert!(!t.end_element().unwrap().deviation);
}

#[test]
fn xsi_nil_bindet_type_empty() {
    let mut cache = GrammarCache::with_schema(sample_schema(), GrammarOptions::default().with_strict()).unwrap();
    let root = cache.name("", "root").unwrap();
    let a = cache.name("", "a").unwrap();

    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    let nil = t.xsi_nil(true).unwrap();
    assert_eq!(nil.kind, EventKind::XsiNil);
    assert!(!nil.deviation);
    assert!(t.is_nilled());
    assert_eq!(current_kind(&t), GrammarKind::TypeEmpty);
    assert!(matches!(t.start_element(a), Err(Error::GrammarViolation { .. })));
    t.end_element().unwrap();
}

#[test]
fn xsi_nil_false_bleibt_beim_typ() {
    let mut cache = GrammarCache::with_schema(sample_schema(), GrammarOptions::default()).unwrap();
    let root = cache.name("", "root").unwrap();
    let a = cache.name("", "a").unwrap();
    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    t.xsi_nil(false).unwrap();
    assert!(!t.is_nilled());
    assert_eq!(current_kind(&t), GrammarKind::Type);
    assert!(!t.start_element(a).unwrap().deviation);
}

#[test]
fn xsi_type_dann_xsi_nil_bei_nillable() {
    for opts in [GrammarOptions::default().with_strict(), GrammarOptions::default()] {
        let mut cache = GrammarCache::with_schema(nillable_type_schema(), opts).unwrap();
        let root = cache.name("", "root").unwrap();
        let derived = cache.name("", "Derived").unwrap();

        let mut t = Traversal::new(&mut cache);
        t.enter_document().unwrap();
        t.start_document().unwrap();
        t.start_element(root).unwrap();
        let ty = t.xsi_type(derived).unwrap();
        assert_eq!(ty.code, EventCode::one(0));
        assert!(!ty.deviation);

        let nil = t.xsi_nil(true).unwrap();
        assert_eq!(nil.code, EventCode::one(0));
        assert_eq!(nil.kind, EventKind::XsiNil);
        assert!(!nil.deviation);
        assert!(t.is_nilled());
        assert_eq!(current_kind(&t), GrammarKind::TypeEmpty);
        assert!(!t.end_element().unwrap().deviation);
        t.end_document().unwrap();
    }
}

#[test]
fn xsi_type_dann_xsi_nil_false_nutzt_abgeleiteten_typ() {
    let opts = GrammarOptions::default().with_strict();
    let mut cache = GrammarCache::with_schema(nillable_type_schema(), opts).unwrap();
    let root = cache.name("", "root").unwrap();
    let derived = cache.name("", "Derived").unwrap();
    let a = cache.name("", "a").unwrap();
    let b = cache.name("", "b").unwrap();

    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    t.xsi_type(derived).unwrap();
    t.xsi_nil(false).unwrap();
    assert_eq!(current_kind(&t), GrammarKind::Type);
    t.start_element(a).unwrap();
    t.characters().unwrap();
    t.end_element().unwrap();
    t.start_element(b).unwrap();
    t.characters().unwrap();
    t.end_element().unwrap();
    t.end_element().unwrap();
}

#[test]
fn phasen_bei_einfachem_wurzeltyp() {
    for opts in [GrammarOptions::default(), GrammarOptions::default().with_strict()] {
        let mut cache = GrammarCache::with_schema(simple_root_schema(), opts).unwrap();
        let root = cache.name("", "root").unwrap();

        let mut t = Traversal::new(&mut cache);
        t.enter_document().unwrap();
        let mut phases = vec![t.phase()];
        t.start_document().unwrap();
        phases.push(t.phase());
        t.start_element(root).unwrap();
        phases.push(t.phase());
        t.characters().unwrap();
        phases.push(t.phase());
        t.end_element().unwrap();
        phases.push(t.phase());
        t.end_document().unwrap();
        phases.push(t.phase());

        let expected = [
            Phase::Created,
            Phase::Depleting,
            Phase::Depleting,
            Phase::Complete,
            Phase::Completed,
            Phase::End,
        ];
        assert_eq!(phases, expected.map(Some).to_vec());
        assert!(t.event_types().unwrap().is_empty());
    }
}

#[test]
fn attribut_nach_unbekanntem_inhalt_ist_verletzung() {
    let mut cache = GrammarCache::with_schema(sample_schema(), GrammarOptions::default()).unwrap();
    let root = cache.name("", "root").unwrap();
    let a = cache.name("", "a").unwrap();
    let id = cache.name("", "id").unwrap();
    let x = cache.intern_name("", "x").unwrap();

    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    assert!(t.start_element(x).unwrap().deviation);
    t.end_element().unwrap();
    // zurück im Inhalt: keine Attribute mehr, SE(a) bleibt primär
    assert!(!t.in_tag());
    assert!(matches!(t.attribute(id), Err(Error::GrammarViolation { .. })));
    assert!(!t.start_element(a).unwrap().deviation);
}

#[test]
fn substitution_group_reihenfolge() {
    let opts = GrammarOptions::default().with_strict();
    let mut cache = GrammarCache::with_schema(substitution_schema(), opts).unwrap();
    let root = cache.name("", "root").unwrap();
    let b = cache.name("urn:ns2", "B").unwrap();

    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    // Document: {urn:ns1}A, {urn:ns2}A, {urn:ns2}B, root, SE(*)
    assert_eq!(t.start_element(root).unwrap().code, EventCode::one(3));

    let events = t.event_types().unwrap();
    let tuple = t.code_tuple().unwrap();
    let names: Vec<String> = tuple
        .codes()
        .iter()
        .map(|&(_, i)| events.get(i).and_then(|e| e.name()).unwrap().display(t.cache().names()))
        .collect();
    assert_eq!(names, vec!["{urn:ns1}A", "{urn:ns2}A", "{urn:ns2}B"]);
    assert_eq!(tuple.width(), 2);

    assert_eq!(t.start_element(b).unwrap().code, EventCode::one(2));
    assert_eq!(current_kind(&t), GrammarKind::ElementUse);
}

#[test]
fn doppelter_serial_wird_abgelehnt() {
    let mut sb = SchemaBuilder::new();
    let s = sb.string_type();
    let x_name = sb.name("", "x").unwrap();
    let y_name = sb.name("", "y").unwrap();
    let root_name = sb.name("", "root").unwrap();
    let x = sb.element(x_name, s).unwrap();
    let y = sb.element(y_name, s).unwrap();
    let px = sb.particle_with_serial(1, MaxOccurs::Bounded(1), x, 5).unwrap();
    let py = sb.particle_with_serial(1, MaxOccurs::Bounded(1), y, 5).unwrap();
    let choice = sb.choice(vec![px, py]);
    let content = sb.particle(1, MaxOccurs::Bounded(1), choice).unwrap();
    let ct = sb.complex_type(ComplexType {
        name: None,
        base: None,
        attribute_uses: vec![],
        attribute_wildcard: None,
        content: ContentClass::ElementOnly(content),
    });
    sb.global_element(root_name, ct).unwrap();

    let err = GrammarCache::with_schema(sb.build(), GrammarOptions::default()).unwrap_err();
    assert!(matches!(err, Error::DuplicateParticleSerial { serial: 5 }));
}

#[test]
fn ungueltige_optionen() {
    let opts = GrammarOptions::default()
        .with_strict()
        .with_preserve(Preserve { comments: true, ..Preserve::default() });
    let err = GrammarCache::with_schema(sample_schema(), opts).unwrap_err();
    assert!(matches!(err, Error::InvalidOptionCombination(_)));
}

#[test]
fn fragment_mit_schema() {
    let mut cache = GrammarCache::with_schema(sample_schema(), GrammarOptions::default()).unwrap();
    let string = cache.schema().unwrap().string_type();
    let a = cache.name("", "a").unwrap();
    let id = cache.name("", "id").unwrap();
    let zz = cache.intern_name("", "zz").unwrap();

    let mut t = Traversal::new(&mut cache);
    t.enter_fragment().unwrap();
    t.start_document().unwrap();
    assert_eq!(t.phase(), Some(Phase::Accepted));
    assert_eq!(t.start_element(a).unwrap().code, EventCode::one(0));
    assert_eq!(current_kind(&t), GrammarKind::ElementUse);
    t.characters().unwrap();
    t.end_element().unwrap();

    assert_eq!(t.start_element(zz).unwrap().code, EventCode::one(3));
    assert_eq!(current_kind(&t), GrammarKind::ElementFragment);
    assert_eq!(t.attribute(id).unwrap().code, EventCode::one(0));
    assert_eq!(t.datatype(), Some(string));
    assert_eq!(t.end_element().unwrap().code, EventCode::one(6));
    assert_eq!(t.end_document().unwrap().code, EventCode::one(4));
}

#[test]
fn schema_fork_teilt_grammars() {
    let cache = GrammarCache::with_schema(sample_schema(), GrammarOptions::default()).unwrap();
    let mut fork = cache.fork().unwrap();
    assert_eq!(fork.frozen_count(), cache.frozen_count());
    let root = fork.name("", "root").unwrap();
    let mut t = Traversal::new(&mut fork);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    assert_eq!(t.start_element(root).unwrap().code, EventCode::one(0));
}
