//! Built-in Grammars und Grammar Learning (EXI 8.4.2, 8.4.3).
//!
//! Built-in Element Grammars starten mit den System-Events auf Ebene 2 und
//! lernen pro Dokument neue Alternativen auf Ebene 1:
//!
//! ```text
//! StartTagContent (Zustand 0)       ElementContent (Zustand 1)
//!   EE              0.0               EE            0
//!   AT(*)           0.1               SE(*)         1.0
//!   NS              0.2  (prefixes)   CH            1.1
//!   SC              0.3  (sc)         ER            1.2  (dtd)
//!   SE(*)           0.4               CM            1.3.0
//!   CH              0.5               PI            1.3.1
//!   ER              0.6  (dtd)
//!   CM, PI          0.7.x
//! ```
//!
//! Gelernte Alternativen bekommen Code 0, alle anderen rücken im ersten
//! Teil um eins auf. Die oberste Ebene ist deshalb ein reversed
//! [`CodeTuple`](crate::code_tuple::CodeTuple): physisch wird hinten
//! angehängt, vorhandene Items behalten ihren Platz.
//!
//! # Lernregeln
//!
//! | Event im Zustand      | gelernt                          |
//! |-----------------------|----------------------------------|
//! | AT(*) in Tag          | AT(qname) → Tag (nicht xsi:type) |
//! | SE(*) in Tag/Content  | SE(qname) → Content              |
//! | CH in Tag/Content     | CH → Content (einmal pro Zustand)|
//! | EE in Tag             | EE (einmal)                      |
//!
//! Pro Zustand und Dokument werden höchstens [`MAX_LEARNED_PRODUCTIONS`]
//! Alternativen gelernt; danach läuft das Event weiter über den Wildcard-Pfad.

use log::{trace, warn};

use crate::code_tuple::{CodeItem, Draft};
use crate::event_type::{EventKind, EventType, GrammarRef};
use crate::grammar::{
    CONTENT_STATE, ELEMENT_CONTENT_STATE, Grammar, GrammarId, GrammarKind, GrammarState, StateStatus, TAG_STATE,
};
use crate::options::GrammarOptions;
use crate::qname::ExpandedNameId;
use crate::undeclared::misc_group;

/// Obergrenze gelernter Alternativen pro Zustand und Dokument.
pub const MAX_LEARNED_PRODUCTIONS: usize = 100_000;

fn event(kind: EventKind, next: Option<GrammarRef>) -> Draft {
    Draft::Event(EventType::new(kind).with_subsequent(next))
}

/// Vorlage der Built-in Element Grammar.
///
/// Die Vorlage liegt im eingefrorenen Teil des Caches; pro Name wird
/// mit [`reify`] eine eigene Instanz angelegt.
pub(crate) fn element_template(id: GrammarId, options: &GrammarOptions) -> Grammar {
    let tag = GrammarRef::new(id, TAG_STATE);
    let content = GrammarRef::new(id, ELEMENT_CONTENT_STATE);
    let preserve = options.preserve();

    let mut tag_group = vec![event(EventKind::EndElement, None), event(EventKind::AttributeAny, Some(tag))];
    if preserve.prefixes {
        tag_group.push(event(EventKind::NamespaceDecl, Some(tag)));
    }
    if options.self_contained() {
        tag_group.push(event(EventKind::SelfContained, Some(tag)));
    }
    tag_group.extend(content_tail(options, content));

    let content_group = content_tail(options, content);

    let states = vec![
        GrammarState::new(Draft::group(tag_group).into_iter().collect(), true, StateStatus::Accepted, true),
        GrammarState::new(
            Draft::group(content_group)
                .into_iter()
                .chain(std::iter::once(event(EventKind::EndElement, None)))
                .collect(),
            true,
            StateStatus::Accepted,
            false,
        ),
    ];
    Grammar::new(GrammarKind::BuiltInElement, states)
}

// SE(*), CH, ER?, [CM?, PI?]: gemeinsamer Rest beider Zustände.
fn content_tail(options: &GrammarOptions, content: GrammarRef) -> Vec<Draft> {
    let mut items = vec![
        event(EventKind::StartElementAny, Some(content)),
        event(EventKind::Characters, Some(content)),
    ];
    if options.preserve().dtd {
        items.push(event(EventKind::EntityReference, Some(content)));
    }
    items.extend(misc_group(options.preserve(), content));
    items
}

/// Instanz der Vorlage für einen Namen.
///
/// Alle Verweise der Vorlage auf sich selbst zeigen danach auf `id`.
pub(crate) fn reify(template: &Grammar, template_id: GrammarId, id: GrammarId, name: ExpandedNameId) -> Grammar {
    let mut grammar = template.clone();
    for state in &mut grammar.states {
        for e in state.events.iter_mut() {
            if let Some(next) = e.subsequent.as_mut()
                && next.grammar == template_id
            {
                next.grammar = id;
            }
        }
    }
    grammar.name = Some(name);
    grammar.dirty = false;
    grammar
}

/// Built-in Fragment Grammar (EXI 8.4.2).
///
/// ```text
/// Fragment        : SD FragmentContent        0
/// FragmentContent : SE(*) FragmentContent     0
///                   ED                        1
///                   CM/PI FragmentContent     2.x
/// ```
pub(crate) fn fragment(id: GrammarId, options: &GrammarOptions) -> Grammar {
    let content = GrammarRef::new(id, CONTENT_STATE);
    let start = vec![event(EventKind::StartDocument, Some(content))];
    // physisch von hinten: reversed liest SE(*) als Code 0
    let mut body: Vec<Draft> = misc_group(options.preserve(), content).into_iter().collect();
    body.push(event(EventKind::EndDocument, None));
    body.push(event(EventKind::StartElementAny, Some(content)));
    Grammar::new(
        GrammarKind::BuiltInFragment,
        vec![
            GrammarState::new(start, false, StateStatus::Depleting, false),
            GrammarState::new(body, true, StateStatus::Accepted, false),
        ],
    )
}

/// Hängt eine gelernte Alternative an Zustand `state` an.
///
/// Liefert den Listen-Index oder `None`, wenn das Limit erreicht ist.
pub(crate) fn learn(grammar: &mut Grammar, id: GrammarId, state: u32, mut event: EventType) -> Option<usize> {
    debug_assert!(grammar.kind.is_built_in());
    let slot = grammar.states.get_mut(state as usize)?;
    if slot.learned() >= MAX_LEARNED_PRODUCTIONS {
        if !slot.limit_warned {
            warn!("{id} state {state}: learning limit of {MAX_LEARNED_PRODUCTIONS} reached, no further productions");
            slot.limit_warned = true;
        }
        return None;
    }
    event.depth = 1;
    event.position = slot.tuple.len() as u32;
    let kind = event.kind;
    let index = slot.events.push(event);
    slot.tuple.push(CodeItem::Event(index));
    grammar.dirty = true;
    trace!("{id} state {state}: learned {kind} at index {index}");
    Some(index)
}

/// Setzt alle Zustände auf ihren Rücksetzpunkt zurück.
///
/// Liefert die Anzahl entfernter Alternativen.
pub(crate) fn reset(grammar: &mut Grammar) -> usize {
    let mut removed = 0;
    for state in &mut grammar.states {
        state.events.truncate(state.checkpoint);
        removed += state.tuple.reset();
        state.limit_warned = false;
    }
    grammar.dirty = false;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_code::EventCode;
    use crate::grammar::START_STATE;
    use crate::options::Preserve;
    use crate::qname::StringInterner;

    fn code(g: &Grammar, state: u32, kind: EventKind) -> Option<EventCode> {
        let s = g.state(state)?;
        s.events().find(|e| e.kind() == kind).and_then(|e| s.tuple().code_of(e.index()))
    }

    fn names(locals: &[&str]) -> Vec<ExpandedNameId> {
        let mut i = StringInterner::new();
        locals.iter().map(|l| i.intern_expanded("", l).unwrap()).collect()
    }

    #[test]
    fn tag_zustand_standard() {
        let g = element_template(GrammarId(0), &GrammarOptions::default());
        assert_eq!(code(&g, TAG_STATE, EventKind::EndElement), Some(EventCode::two(0, 0)));
        assert_eq!(code(&g, TAG_STATE, EventKind::AttributeAny), Some(EventCode::two(0, 1)));
        assert_eq!(code(&g, TAG_STATE, EventKind::StartElementAny), Some(EventCode::two(0, 2)));
        // CH gehört im Start-Tag zur zweiten Ebene (EXI 8.4.3), nicht zum Content-Zustand.
        assert_eq!(code(&g, TAG_STATE, EventKind::Characters), Some(EventCode::two(0, 3)));
        assert_eq!(g.state(TAG_STATE).unwrap().tuple().len(), 1);
        assert_eq!(g.state(TAG_STATE).unwrap().tuple().width(), 0);
    }

    #[test]
    fn tag_zustand_alle_optionen() {
        let opts = GrammarOptions::default()
            .with_preserve(Preserve { comments: true, pis: true, dtd: true, prefixes: true })
            .with_self_contained();
        let g = element_template(GrammarId(0), &opts);
        assert_eq!(code(&g, TAG_STATE, EventKind::NamespaceDecl), Some(EventCode::two(0, 2)));
        assert_eq!(code(&g, TAG_STATE, EventKind::SelfContained), Some(EventCode::two(0, 3)));
        assert_eq!(code(&g, TAG_STATE, EventKind::StartElementAny), Some(EventCode::two(0, 4)));
        assert_eq!(code(&g, TAG_STATE, EventKind::EntityReference), Some(EventCode::two(0, 6)));
        assert_eq!(code(&g, TAG_STATE, EventKind::ProcessingInstruction), Some(EventCode::three(0, 7, 1)));
        assert_eq!(code(&g, ELEMENT_CONTENT_STATE, EventKind::Comment), Some(EventCode::three(1, 3, 0)));
    }

    #[test]
    fn content_zustand_ee_vorne() {
        let g = element_template(GrammarId(0), &GrammarOptions::default());
        assert_eq!(code(&g, ELEMENT_CONTENT_STATE, EventKind::EndElement), Some(EventCode::one(0)));
        assert_eq!(code(&g, ELEMENT_CONTENT_STATE, EventKind::StartElementAny), Some(EventCode::two(1, 0)));
        assert_eq!(code(&g, ELEMENT_CONTENT_STATE, EventKind::Characters), Some(EventCode::two(1, 1)));
        assert!(g.state(ELEMENT_CONTENT_STATE).unwrap().events().find(|e| e.kind().is_attribute()).is_none());
    }

    #[test]
    fn lernen_waechst_um_eins_und_behaelt_plaetze() {
        let opts = GrammarOptions::default();
        let template = element_template(GrammarId(0), &opts);
        let n = names(&["e", "a"]);
        let mut g = reify(&template, GrammarId(0), GrammarId(3), n[0]);
        let before = g.state(TAG_STATE).unwrap().tuple().len();
        let at = EventType::new(EventKind::Attribute)
            .with_name(n[1])
            .with_subsequent(Some(GrammarRef::new(GrammarId(3), TAG_STATE)));
        let idx = learn(&mut g, GrammarId(3), TAG_STATE, at).unwrap();
        let tag = g.state(TAG_STATE).unwrap();
        assert_eq!(tag.tuple().len(), before + 1);
        assert!(matches!(tag.tuple().items()[0], CodeItem::Tuple(_)));
        assert_eq!(tag.tuple().code_of(idx), Some(EventCode::one(0)));
        assert_eq!(code(&g, TAG_STATE, EventKind::EndElement), Some(EventCode::two(1, 0)));
        assert!(g.is_dirty());
    }

    #[test]
    fn reify_zeigt_auf_sich_selbst() {
        let template = element_template(GrammarId(1), &GrammarOptions::default());
        let x = names(&["x"])[0];
        let g = reify(&template, GrammarId(1), GrammarId(8), x);
        let se = g.state(TAG_STATE).unwrap().events().find(|e| e.kind() == EventKind::StartElementAny).unwrap();
        assert_eq!(se.subsequent(), Some(GrammarRef::new(GrammarId(8), ELEMENT_CONTENT_STATE)));
        assert_eq!(g.name(), Some(x));
    }

    #[test]
    fn reset_idempotent() {
        let n = names(&["e", "a", "b", "c"]);
        let mut g = reify(&element_template(GrammarId(0), &GrammarOptions::default()), GrammarId(0), GrammarId(0), n[0]);
        for &local in &n[1..] {
            let se = EventType::new(EventKind::StartElement).with_name(local);
            learn(&mut g, GrammarId(0), ELEMENT_CONTENT_STATE, se);
        }
        assert_eq!(g.state(ELEMENT_CONTENT_STATE).unwrap().tuple().len(), 5);
        assert_eq!(reset(&mut g), 3);
        assert_eq!(g.state(ELEMENT_CONTENT_STATE).unwrap().tuple().len(), 2);
        assert_eq!(g.state(ELEMENT_CONTENT_STATE).unwrap().events().len(), 3);
        assert!(!g.is_dirty());
        assert_eq!(reset(&mut g), 0);
    }

    #[test]
    fn limit_stoppt_lernen() {
        let e = names(&["e"])[0];
        let mut g = reify(&element_template(GrammarId(0), &GrammarOptions::default()), GrammarId(0), GrammarId(0), e);
        for _ in 0..MAX_LEARNED_PRODUCTIONS {
            assert!(learn(&mut g, GrammarId(0), TAG_STATE, EventType::new(EventKind::Attribute)).is_some());
        }
        assert!(learn(&mut g, GrammarId(0), TAG_STATE, EventType::new(EventKind::Attribute)).is_none());
        assert!(g.state(TAG_STATE).unwrap().limit_warned);
        reset(&mut g);
        assert!(learn(&mut g, GrammarId(0), TAG_STATE, EventType::new(EventKind::Attribute)).is_some());
    }

    #[test]
    fn fragment_codes() {
        let g = fragment(GrammarId(2), &GrammarOptions::default().with_preserve(Preserve { pis: true, ..Preserve::default() }));
        assert_eq!(g.state(START_STATE).unwrap().events().len(), 1);
        assert_eq!(code(&g, CONTENT_STATE, EventKind::StartElementAny), Some(EventCode::one(0)));
        assert_eq!(code(&g, CONTENT_STATE, EventKind::EndDocument), Some(EventCode::one(1)));
        assert_eq!(code(&g, CONTENT_STATE, EventKind::ProcessingInstruction), Some(EventCode::two(2, 0)));
    }
}
