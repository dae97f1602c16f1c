//! Code-Tuple-Aufbau für Element- und Type-Zustände (EXI 8.5.4.4).
//!
//! Ein Zustand besteht aus drei Teilen:
//!
//! ```text
//! Ebene 1:  [Augmentations] [primäre Events ...] [G2]
//! G2:       EE?  AT(*)  [G3 AT(qname)[untyped]... AT(*)[untyped]]
//!           SE(*)  CH[untyped]  ER?  [G3 CM? PI?]
//! ```
//!
//! - Augmentations (xsi:type, xsi:nil, NS, SC) nur im ersten Zustand einer
//!   Element-Grammar, jeweils mit eigenem Slot auf Ebene 1
//! - EE-Fallback, AT-Deviations, SE(*) und CH [untyped] nur mit Deviations
//!   (`permit_deviations && !strict`); AT-Deviations nur in Tag-Zuständen
//! - ER, CM und PI nach Preserve-Optionen
//!
//! Leere Gruppen entfallen. Die Bitbreiten ergeben sich beim Zusammenbau in
//! [`crate::code_tuple`].

use crate::code_tuple::Draft;
use crate::event_type::{EventKind, EventType, GrammarRef};
use crate::options::{GrammarOptions, Preserve};

/// Welche typbezogenen Augmentations ein Element erlaubt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Augmentations {
    /// Typ hat benannte Sub-Typen oder ist eine Union.
    pub typable: bool,
    /// Element ist nillable.
    pub nillable: bool,
}

/// Ziele der Fallback-Productions eines Zustands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StateLayout {
    /// Zustand selbst (Ziel von AT-Deviations).
    pub here: GrammarRef,
    /// Ziel von SE(*), CH, ER, CM, PI; für Tag-Zustände der Content2-Zustand.
    pub content: GrammarRef,
    /// Tag-Zustand (`j ≤ content`): AT-Deviations erlaubt.
    pub tag: bool,
}

/// Augmentation-Events für den ersten Zustand einer Element-Grammar.
///
/// Mit Deviations sind xsi:type und xsi:nil immer vorhanden, sonst nur für
/// typisierbare bzw. nillable Elemente. NS und SC folgen den Optionen.
pub(crate) fn augmentations(aug: Augmentations, options: &GrammarOptions, here: GrammarRef) -> Vec<EventType> {
    let mut events = Vec::with_capacity(4);
    let deviations = options.deviations();
    if aug.typable || deviations {
        let e = EventType::new(EventKind::XsiType);
        events.push(if aug.typable { e } else { e.as_deviation() });
    }
    if aug.nillable || deviations {
        let e = EventType::new(EventKind::XsiNil);
        events.push(if aug.nillable { e } else { e.as_deviation() });
    }
    if options.preserve().prefixes {
        events.push(EventType::new(EventKind::NamespaceDecl).with_subsequent(Some(here)));
    }
    if options.self_contained() {
        events.push(EventType::new(EventKind::SelfContained).with_subsequent(Some(here)));
    }
    events
}

/// Entwürfe eines Element- oder Type-Zustands.
pub(crate) fn element_state(
    augment: Vec<EventType>,
    primary: Vec<EventType>,
    layout: &StateLayout,
    options: &GrammarOptions,
) -> Vec<Draft> {
    let fallback = fallback_group(&primary, layout, options);
    let mut top: Vec<Draft> = augment.into_iter().chain(primary).map(Draft::Event).collect();
    top.extend(fallback);
    top
}

/// Zweite Ebene eines Element-Zustands.
pub(crate) fn fallback_group(primary: &[EventType], layout: &StateLayout, options: &GrammarOptions) -> Option<Draft> {
    let mut items = Vec::new();
    let content = Some(layout.content);

    if options.deviations() {
        if !primary.iter().any(|e| e.kind() == EventKind::EndElement) {
            items.push(Draft::Event(EventType::new(EventKind::EndElement).as_deviation()));
        }
        if layout.tag {
            let here = Some(layout.here);
            items.push(Draft::Event(
                EventType::new(EventKind::AttributeAny).with_subsequent(here).as_deviation(),
            ));
            let mut untyped: Vec<Draft> = primary
                .iter()
                .filter(|e| e.kind() == EventKind::Attribute)
                .filter_map(|e| {
                    let name = e.name()?;
                    Some(Draft::Event(
                        EventType::new(EventKind::AttributeInvalid)
                            .with_name(name)
                            .with_subsequent(e.subsequent())
                            .as_deviation(),
                    ))
                })
                .collect();
            untyped.push(Draft::Event(
                EventType::new(EventKind::AttributeAnyUntyped).with_subsequent(here).as_deviation(),
            ));
            items.extend(Draft::group(untyped));
        }
        items.push(Draft::Event(
            EventType::new(EventKind::StartElementAny).with_subsequent(content).as_deviation(),
        ));
        items.push(Draft::Event(
            EventType::new(EventKind::CharactersUntyped).with_subsequent(content).as_deviation(),
        ));
    }
    if options.preserve().dtd {
        items.push(Draft::Event(EventType::new(EventKind::EntityReference).with_subsequent(content)));
    }
    items.extend(misc_group(options.preserve(), layout.content));
    Draft::group(items)
}

/// CM/PI-Gruppe; `None` wenn beide nicht erhalten werden.
pub(crate) fn misc_group(preserve: &Preserve, target: GrammarRef) -> Option<Draft> {
    let mut items = Vec::with_capacity(2);
    if preserve.comments {
        items.push(Draft::Event(EventType::new(EventKind::Comment).with_subsequent(Some(target))));
    }
    if preserve.pis {
        items.push(Draft::Event(
            EventType::new(EventKind::ProcessingInstruction).with_subsequent(Some(target)),
        ));
    }
    Draft::group(items)
}
