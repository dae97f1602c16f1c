// Gemeinsame Test-Schemas.
//
// Wird per `include!` eingebunden. Benötigte Imports:
//   use exi_grammar::{ComplexType, ContentClass, MaxOccurs, Schema, SchemaBuilder};

/// `<root id?>` (nillable) mit Sequenz `a, b?` aus xs:string; dazu der
/// benannte Typ `T2`, der nur `a` enthält.
#[allow(dead_code)]
fn sample_schema() -> Schema {
    let mut sb = SchemaBuilder::new();
    let s = sb.string_type();
    let a_name = sb.name("", "a").unwrap();
    let b_name = sb.name("", "b").unwrap();
    let id_name = sb.name("", "id").unwrap();
    let root_name = sb.name("", "root").unwrap();
    let t2_name = sb.name("", "T2").unwrap();

    let a = sb.element(a_name, s).unwrap();
    let b = sb.element(b_name, s).unwrap();
    let pa = sb.particle(1, MaxOccurs::Bounded(1), a).unwrap();
    let pb = sb.particle(0, MaxOccurs::Bounded(1), b).unwrap();
    let seq = sb.sequence(vec![pa, pb]);
    let content = sb.particle(1, MaxOccurs::Bounded(1), seq).unwrap();
    let id = sb.attribute(id_name, s);
    let use_id = sb.attribute_use(id, false);
    let ct = sb.complex_type(ComplexType {
        name: None,
        base: None,
        attribute_uses: vec![use_id],
        attribute_wildcard: None,
        content: ContentClass::ElementOnly(content),
    });
    let root = sb.global_element(root_name, ct).unwrap();
    sb.set_nillable(root, true).unwrap();

    let pa2 = sb.particle(1, MaxOccurs::Bounded(1), a).unwrap();
    let seq2 = sb.sequence(vec![pa2]);
    let content2 = sb.particle(1, MaxOccurs::Bounded(1), seq2).unwrap();
    sb.complex_type(ComplexType {
        name: Some(t2_name),
        base: None,
        attribute_uses: vec![],
        attribute_wildcard: None,
        content: ContentClass::ElementOnly(content2),
    });
    sb.build()
}

/// Head `{urn:ns1}A` mit den Mitgliedern `{urn:ns2}B` und `{urn:ns2}A`;
/// `root` enthält genau einen Head-Particle.
#[allow(dead_code)]
fn substitution_schema() -> Schema {
    let mut sb = SchemaBuilder::new();
    let s = sb.string_type();
    let head_name = sb.name("urn:ns1", "A").unwrap();
    let b_name = sb.name("urn:ns2", "B").unwrap();
    let a2_name = sb.name("urn:ns2", "A").unwrap();
    let root_name = sb.name("", "root").unwrap();

    let head = sb.global_element(head_name, s).unwrap();
    let b = sb.global_element(b_name, s).unwrap();
    let a2 = sb.global_element(a2_name, s).unwrap();
    sb.substitutes(b, head).unwrap();
    sb.substitutes(a2, head).unwrap();

    let p = sb.particle(1, MaxOccurs::Bounded(1), head).unwrap();
    let seq = sb.sequence(vec![p]);
    let content = sb.particle(1, MaxOccurs::Bounded(1), seq).unwrap();
    let ct = sb.complex_type(ComplexType {
        name: None,
        base: None,
        attribute_uses: vec![],
        attribute_wildcard: None,
        content: ContentClass::ElementOnly(content),
    });
    sb.global_element(root_name, ct).unwrap();
    sb.build()
}

/// Nillable `root` vom benannten Typ `Base` (Sequenz `a`); `Derived` leitet
/// von `Base` ab und hängt ein optionales `b` an.
#[allow(dead_code)]
fn nillable_type_schema() -> Schema {
    let mut sb = SchemaBuilder::new();
    let s = sb.string_type();
    let a_name = sb.name("", "a").unwrap();
    let b_name = sb.name("", "b").unwrap();
    let root_name = sb.name("", "root").unwrap();
    let base_name = sb.name("", "Base").unwrap();
    let derived_name = sb.name("", "Derived").unwrap();

    let a = sb.element(a_name, s).unwrap();
    let b = sb.element(b_name, s).unwrap();
    let pa = sb.particle(1, MaxOccurs::Bounded(1), a).unwrap();
    let seq = sb.sequence(vec![pa]);
    let content = sb.particle(1, MaxOccurs::Bounded(1), seq).unwrap();
    let base = sb.complex_type(ComplexType {
        name: Some(base_name),
        base: None,
        attribute_uses: vec![],
        attribute_wildcard: None,
        content: ContentClass::ElementOnly(content),
    });

    let pa2 = sb.particle(1, MaxOccurs::Bounded(1), a).unwrap();
    let pb = sb.particle(0, MaxOccurs::Bounded(1), b).unwrap();
    let seq2 = sb.sequence(vec![pa2, pb]);
    let content2 = sb.particle(1, MaxOccurs::Bounded(1), seq2).unwrap();
    sb.complex_type(ComplexType {
        name: Some(derived_name),
        base: Some(base),
        attribute_uses: vec![],
        attribute_wildcard: None,
        content: ContentClass::ElementOnly(content2),
    });

    let root = sb.global_element(root_name, base).unwrap();
    sb.set_nillable(root, true).unwrap();
    sb.build()
}

/// Globales `root` vom Typ xs:string.
#[allow(dead_code)]
fn simple_root_schema() -> Schema {
    let mut sb = SchemaBuilder::new();
    let s = sb.string_type();
    let root_name = sb.name("", "root").unwrap();
    sb.global_element(root_name, s).unwrap();
    sb.build()
}
