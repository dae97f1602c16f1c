//! Built-in Grammars ohne Schema: Codes, Lernen, Reset (EXI 8.4.3).

use exi_grammar::{CodeItem, Error, EventCode, EventKind, GrammarCache, GrammarOptions, Phase, Preserve, Traversal};

fn cache() -> GrammarCache {
    GrammarCache::schema_less(GrammarOptions::default()).unwrap()
}

#[test]
fn leeres_element_codes() {
    let mut cache = cache();
    let root = cache.intern_name("", "root").unwrap();
    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    assert_eq!(t.start_document().unwrap().code, EventCode::one(0));
    assert_eq!(t.start_element(root).unwrap().code, EventCode::one(0));
    let ee = t.end_element().unwrap();
    assert_eq!(ee.code, EventCode::two(0, 0));
    assert_eq!(ee.kind, EventKind::EndElement);
    assert_eq!(t.end_document().unwrap().code, EventCode::one(0));
}

#[test]
fn in_tag_waechst_um_eins_und_behaelt_plaetze() {
    let mut cache = cache();
    let root = cache.intern_name("", "root").unwrap();
    let a = cache.intern_name("", "a").unwrap();
    let b = cache.intern_name("", "b").unwrap();
    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();

    let before = t.code_tuple().unwrap().len();
    assert_eq!(before, 1);
    assert_eq!(t.attribute(a).unwrap().code, EventCode::two(0, 1));
    assert_eq!(t.code_tuple().unwrap().len(), before + 1);
    assert_eq!(t.code_tuple().unwrap().width(), 1);

    assert_eq!(t.attribute(b).unwrap().code, EventCode::two(1, 1));
    let a_index = t.event_types().unwrap().find(|e| e.name() == Some(a)).unwrap().index();
    let tuple = t.code_tuple().unwrap();
    assert_eq!(tuple.len(), before + 2);
    assert!(matches!(tuple.items()[0], CodeItem::Tuple(_)));
    assert!(matches!(tuple.items()[1], CodeItem::Event(i) if i == a_index));
    assert_eq!(tuple.code_of(a_index), Some(EventCode::one(1)));

    assert_eq!(t.attribute(a).unwrap().code, EventCode::one(1));
    assert_eq!(t.attribute(b).unwrap().code, EventCode::one(0));
}

#[test]
fn bitbreiten_nach_lernen() {
    let mut cache = cache();
    let root = cache.intern_name("", "root").unwrap();
    let a = cache.intern_name("", "a").unwrap();
    let b = cache.intern_name("", "b").unwrap();
    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    assert_eq!(t.code_tuple().unwrap().widths_for(&EventCode::two(0, 3)), Some(vec![0, 2]));
    t.attribute(a).unwrap();
    t.attribute(b).unwrap();
    let tuple = t.code_tuple().unwrap();
    assert_eq!(tuple.widths_for(&EventCode::one(0)), Some(vec![2]));
    assert_eq!(tuple.widths_for(&EventCode::two(2, 3)), Some(vec![2, 2]));
    assert_eq!(tuple.widths_for(&EventCode::two(0, 0)), None);
}

#[test]
fn ch_nur_einmal_gelernt() {
    let mut cache = cache();
    let root = cache.intern_name("", "root").unwrap();
    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    t.start_element(root).unwrap();
    t.end_element().unwrap();
    // Content-Zustand: EE 0, SE(*) 1.0, CH 1.1
    assert_eq!(t.characters().unwrap().code, EventCode::two(1, 1));
    assert_eq!(t.characters().unwrap().code, EventCode::one(0));
    let len = t.code_tuple().unwrap().len();
    t.characters().unwrap();
    assert_eq!(t.code_tuple().unwrap().len(), len);
}

#[test]
fn reset_idempotent_zwischen_dokumenten() {
    let mut cache = cache();
    let root = cache.intern_name("", "root").unwrap();
    let a = cache.intern_name("", "a").unwrap();
    let mut first = Vec::new();
    for _ in 0..3 {
        let mut t = Traversal::new(&mut cache);
        t.enter_document().unwrap();
        t.start_document().unwrap();
        t.start_element(root).unwrap();
        let codes = vec![t.attribute(a).unwrap().code, t.start_element(a).unwrap().code];
        t.end_element().unwrap();
        t.end_element().unwrap();
        t.end_document().unwrap();
        if first.is_empty() {
            first = codes;
        } else {
            assert_eq!(codes, first);
        }
    }
    assert_eq!(cache.reset(), 2);
    assert_eq!(cache.reset(), 0);
}

#[test]
fn dokument_endet_mit_leerer_liste() {
    let mut cache = cache();
    let root = cache.intern_name("", "root").unwrap();
    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    assert_eq!(t.phase(), Some(Phase::Depleting));
    t.start_element(root).unwrap();
    assert_eq!(t.phase(), Some(Phase::Accepted));
    t.end_element().unwrap();
    assert_eq!(t.phase(), Some(Phase::Completed));
    t.end_document().unwrap();
    assert_eq!(t.phase(), Some(Phase::End));
    assert!(t.event_types().unwrap().is_empty());
    assert!(t.code_tuple().unwrap().is_empty());
    assert!(matches!(t.end_document(), Err(Error::GrammarViolation { .. })));
}

#[test]
fn misc_im_element() {
    let opts = GrammarOptions::default().with_preserve(Preserve { comments: true, pis: true, ..Preserve::default() });
    let mut cache = GrammarCache::schema_less(opts).unwrap();
    let root = cache.intern_name("", "root").unwrap();
    let mut t = Traversal::new(&mut cache);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    assert_eq!(t.processing_instruction().unwrap().code, EventCode::three(0, 4, 1));
    assert!(!t.in_tag());
    assert_eq!(t.comment().unwrap().code, EventCode::three(1, 2, 0));
}

#[test]
fn fork_sieht_nichts_gelerntes() {
    let mut cache = cache();
    let root = cache.intern_name("", "root").unwrap();
    let a = cache.intern_name("", "a").unwrap();
    {
        let mut t = Traversal::new(&mut cache);
        t.enter_document().unwrap();
        t.start_document().unwrap();
        t.start_element(root).unwrap();
        t.attribute(a).unwrap();
    }
    let mut fork = cache.fork().unwrap();
    assert_eq!(fork.name("", "a"), None);
    let root = fork.intern_name("", "root").unwrap();
    let a = fork.intern_name("", "a").unwrap();
    let mut t = Traversal::new(&mut fork);
    t.enter_document().unwrap();
    t.start_document().unwrap();
    t.start_element(root).unwrap();
    assert_eq!(t.attribute(a).unwrap().code, EventCode::two(0, 1));
}

#[test]
fn fragment_ohne_schema() {
    let mut cache = cache();
    let a = cache.intern_name("", "a").unwrap();
    let b = cache.intern_name("", "b").unwrap();
    let mut t = Traversal::new(&mut cache);
    t.enter_fragment().unwrap();
    t.start_document().unwrap();
    t.start_element(a).unwrap();
    t.end_element().unwrap();
    // SE(a) 0, SE(*) 1, ED 2
    assert_eq!(t.start_element(b).unwrap().code, EventCode::one(1));
    t.end_element().unwrap();
    assert_eq!(t.start_element(a).unwrap().code, EventCode::one(1));
    t.end_element().unwrap();
    assert_eq!(t.end_document().unwrap().code, EventCode::one(3));
}
