//! Code Tuples (EXI 6.2).
//!
//! Ein [`CodeTuple`] ist ein Knoten im Code-Baum eines Grammar-Zustands.
//! Jedes Item ist entweder ein Event (Index in die [`EventTypeList`]) oder
//! ein geschachteltes Tuple der nächsten Ebene. Die Bitbreite einer Ebene
//! ist `⌈log₂(n)⌉` ihrer Item-Anzahl.
//!
//! # Reversed Tuples
//!
//! Built-in Grammars hängen gelernte Alternativen physisch hinten an. Ein
//! reversed Tuple liest die Items vom Ende her: das zuletzt gelernte Item
//! hat Code 0, bereits existierende Items behalten ihren physischen Platz
//! und rücken im Code um eins auf (EXI 8.4.3).
//!
//! ```text
//! physisch:  [ System(0.x) | EE | SE(a) | SE(b) ]
//! Code:          3           2     1       0
//! ```
//!
//! Checkpoint/Reset arbeiten nur auf der obersten Ebene: `checkpoint()`
//! merkt sich die Item-Anzahl, `reset()` schneidet auf sie zurück.

use crate::bit_width;
use crate::event_code::EventCode;
use crate::event_type::{EventType, EventTypeList};
use crate::qname::StringInterner;

/// Ein Item eines Code Tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeItem {
    /// Index in die Event-Type-Liste des Zustands.
    Event(usize),
    /// Geschachteltes Tuple der nächsten Ebene.
    Tuple(CodeTuple),
}

/// Knoten im Code-Baum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTuple {
    items: Vec<CodeItem>,
    reversed: bool,
    checkpoint: usize,
}

/// Leeres Tuple für Zustände ohne Alternativen.
pub static EMPTY_CODE_TUPLE: CodeTuple = CodeTuple {
    items: Vec::new(),
    reversed: false,
    checkpoint: 0,
};

impl CodeTuple {
    /// Leeres Tuple.
    pub fn new(reversed: bool) -> Self {
        Self { items: Vec::new(), reversed, checkpoint: 0 }
    }

    /// Anzahl der Items dieser Ebene.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Ob die Ebene keine Items hat.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ob Items vom Ende her gelesen werden.
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Bitbreite dieser Ebene.
    pub fn width(&self) -> u8 {
        bit_width::for_count(self.items.len())
    }

    /// Items in physischer Reihenfolge.
    pub fn items(&self) -> &[CodeItem] {
        &self.items
    }

    fn physical(&self, code: u32) -> Option<usize> {
        let code = code as usize;
        if code >= self.items.len() {
            return None;
        }
        Some(if self.reversed { self.items.len() - 1 - code } else { code })
    }

    fn logical(&self, position: usize) -> u32 {
        let code = if self.reversed { self.items.len() - 1 - position } else { position };
        code as u32
    }

    /// Item zu einem Code-Teil dieser Ebene.
    pub fn item(&self, code: u32) -> Option<&CodeItem> {
        self.physical(code).and_then(|p| self.items.get(p))
    }

    /// Hängt ein Item physisch an und gibt seinen Platz zurück.
    pub(crate) fn push(&mut self, item: CodeItem) -> u32 {
        self.items.push(item);
        (self.items.len() - 1) as u32
    }

    /// Merkt sich die aktuelle Item-Anzahl als Rücksetzpunkt.
    pub fn checkpoint(&mut self) {
        self.checkpoint = self.items.len();
    }

    /// Item-Anzahl am Rücksetzpunkt.
    pub fn checkpoint_len(&self) -> usize {
        self.checkpoint
    }

    /// Schneidet auf den Rücksetzpunkt zurück; liefert die Anzahl entfernter Items.
    pub fn reset(&mut self) -> usize {
        let removed = self.items.len().saturating_sub(self.checkpoint);
        self.items.truncate(self.checkpoint);
        removed
    }

    /// Event Code des Listen-Index `index`.
    pub fn code_of(&self, index: usize) -> Option<EventCode> {
        let mut path = Vec::with_capacity(3);
        if self.path_to(index, &mut path) {
            EventCode::from_parts(&path)
        } else {
            None
        }
    }

    fn path_to(&self, index: usize, path: &mut Vec<u32>) -> bool {
        for (pos, item) in self.items.iter().enumerate() {
            path.push(self.logical(pos));
            let found = match item {
                CodeItem::Event(i) => *i == index,
                CodeItem::Tuple(t) => t.path_to(index, path),
            };
            if found {
                return true;
            }
            path.pop();
        }
        false
    }

    /// Listen-Index zu einem vollständigen Code-Pfad.
    ///
    /// `None` wenn ein Teil außerhalb seiner Ebene liegt, der Pfad vor einem
    /// Event endet oder nach einem Event weitergeht.
    pub fn resolve(&self, parts: &[u32]) -> Option<usize> {
        let (first, rest) = parts.split_first()?;
        match self.item(*first)? {
            CodeItem::Event(i) if rest.is_empty() => Some(*i),
            CodeItem::Event(_) => None,
            CodeItem::Tuple(t) => t.resolve(rest),
        }
    }

    /// Bitbreiten der Teile von `code`, so wie ein Decoder sie liest.
    pub fn widths_for(&self, code: &EventCode) -> Option<Vec<u8>> {
        let parts = code.parts();
        let mut widths = Vec::with_capacity(parts.len());
        let mut tuple = self;
        for (i, part) in parts.iter().enumerate() {
            widths.push(tuple.width());
            match tuple.item(*part)? {
                CodeItem::Event(_) if i + 1 == parts.len() => return Some(widths),
                CodeItem::Event(_) => return None,
                CodeItem::Tuple(t) => tuple = t,
            }
        }
        None
    }

    /// Anzahl der Events in allen Ebenen.
    pub fn event_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                CodeItem::Event(_) => 1,
                CodeItem::Tuple(t) => t.event_count(),
            })
            .sum()
    }

    /// Alle (Code, Listen-Index) Paare in Code-Reihenfolge.
    pub fn codes(&self) -> Vec<(EventCode, usize)> {
        let mut out = Vec::new();
        let mut path = Vec::with_capacity(3);
        self.collect_codes(&mut path, &mut out);
        out
    }

    fn collect_codes(&self, path: &mut Vec<u32>, out: &mut Vec<(EventCode, usize)>) {
        for code in 0..self.items.len() as u32 {
            let Some(item) = self.item(code) else { continue };
            path.push(code);
            match item {
                CodeItem::Event(i) => {
                    if let Some(c) = EventCode::from_parts(path) {
                        out.push((c, *i));
                    }
                }
                CodeItem::Tuple(t) => t.collect_codes(path, out),
            }
            path.pop();
        }
    }

    /// Eine Zeile pro Event: `Code<TAB>Label`, in Code-Reihenfolge.
    pub fn describe(&self, list: &EventTypeList, interner: &StringInterner) -> String {
        let mut out = String::new();
        for (code, index) in self.codes() {
            let label = list.get(index).map_or_else(|| "?".to_string(), |e| e.label(interner));
            out.push_str(&format!("{code}\t{label}\n"));
        }
        out
    }
}

// ============================================================================
// Aufbau aus Entwürfen
// ============================================================================

/// Entwurf eines Items vor der Index-Vergabe.
#[derive(Debug, Clone)]
pub(crate) enum Draft {
    Event(EventType),
    Group(Vec<Draft>),
}

impl Draft {
    /// Gruppe, oder `None` wenn sie leer wäre.
    pub(crate) fn group(items: Vec<Draft>) -> Option<Draft> {
        if items.is_empty() { None } else { Some(Draft::Group(items)) }
    }
}

/// Baut Liste und Tuple aus Entwürfen.
///
/// Listen-Indizes werden nach Ebene, dann Pfad vergeben; die Positionen
/// entsprechen der Entwurfsreihenfolge. Nur die oberste Ebene kann
/// reversed sein. Der Rücksetzpunkt steht danach auf dem Ausgangszustand.
pub(crate) fn assemble(top: Vec<Draft>, reversed: bool) -> (EventTypeList, CodeTuple) {
    let mut staged: Vec<(Vec<u32>, EventType)> = Vec::new();
    let mut path = Vec::with_capacity(3);
    let mut tuple = stage(top, reversed, 1, &mut path, &mut staged);

    let mut order: Vec<usize> = (0..staged.len()).collect();
    order.sort_by(|&a, &b| {
        let (pa, pb) = (&staged[a].0, &staged[b].0);
        pa.len().cmp(&pb.len()).then_with(|| pa.cmp(pb))
    });
    let mut remap = vec![0usize; staged.len()];
    for (final_index, &tmp) in order.iter().enumerate() {
        remap[tmp] = final_index;
    }

    let mut slots: Vec<Option<EventType>> = staged.into_iter().map(|(_, e)| Some(e)).collect();
    let mut list = EventTypeList::default();
    for &tmp in &order {
        if let Some(event) = slots[tmp].take() {
            list.push(event);
        }
    }
    renumber(&mut tuple, &remap);
    tuple.checkpoint();
    (list, tuple)
}

fn stage(
    drafts: Vec<Draft>,
    reversed: bool,
    depth: u8,
    path: &mut Vec<u32>,
    staged: &mut Vec<(Vec<u32>, EventType)>,
) -> CodeTuple {
    let mut tuple = CodeTuple::new(reversed);
    for (pos, draft) in drafts.into_iter().enumerate() {
        path.push(pos as u32);
        match draft {
            Draft::Event(mut event) => {
                event.depth = depth;
                event.position = pos as u32;
                tuple.items.push(CodeItem::Event(staged.len()));
                staged.push((path.clone(), event));
            }
            Draft::Group(inner) => {
                let nested = stage(inner, false, depth + 1, path, staged);
                tuple.items.push(CodeItem::Tuple(nested));
            }
        }
        path.pop();
    }
    tuple
}

fn renumber(tuple: &mut CodeTuple, remap: &[usize]) {
    for item in &mut tuple.items {
        match item {
            CodeItem::Event(i) => *i = remap[*i],
            CodeItem::Tuple(t) => renumber(t, remap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_type::EventKind;

    fn ev(kind: EventKind) -> Draft {
        Draft::Event(EventType::new(kind))
    }

    #[test]
    fn breite_folgt_item_anzahl() {
        for (n, w) in [(1usize, 0u8), (5, 3), (16, 4), (17, 5)] {
            let drafts = (0..n).map(|_| ev(EventKind::StartElementAny)).collect();
            let (_, tuple) = assemble(drafts, false);
            assert_eq!(tuple.width(), w, "n={n}");
        }
        assert_eq!(EMPTY_CODE_TUPLE.width(), 0);
    }

    #[test]
    fn liste_nach_ebene_dann_position() {
        let drafts = vec![
            ev(EventKind::StartElement),
            Draft::Group(vec![
                ev(EventKind::EndElement),
                Draft::Group(vec![ev(EventKind::Comment), ev(EventKind::ProcessingInstruction)]),
                ev(EventKind::CharactersUntyped),
            ]),
            ev(EventKind::Characters),
        ];
        let (list, tuple) = assemble(drafts, false);
        let kinds: Vec<_> = list.iter().map(EventType::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::StartElement,
                EventKind::Characters,
                EventKind::EndElement,
                EventKind::CharactersUntyped,
                EventKind::Comment,
                EventKind::ProcessingInstruction,
            ]
        );
        assert_eq!(tuple.code_of(0), Some(EventCode::one(0)));
        assert_eq!(tuple.code_of(1), Some(EventCode::one(2)));
        assert_eq!(tuple.code_of(3), Some(EventCode::two(1, 2)));
        assert_eq!(tuple.code_of(5), Some(EventCode::three(1, 1, 1)));
        assert_eq!(list.get(5).map(EventType::depth), Some(3));
        assert_eq!(list.get(3).map(EventType::position), Some(2));
    }

    #[test]
    fn resolve_ist_invers_zu_code_of() {
        let drafts = vec![
            ev(EventKind::StartElement),
            Draft::Group(vec![ev(EventKind::EndElement), ev(EventKind::CharactersUntyped)]),
        ];
        let (list, tuple) = assemble(drafts, false);
        for e in &list {
            let code = tuple.code_of(e.index()).unwrap();
            assert_eq!(tuple.resolve(&code.parts()), Some(e.index()));
        }
        assert_eq!(tuple.resolve(&[1]), None);
        assert_eq!(tuple.resolve(&[0, 0]), None);
        assert_eq!(tuple.resolve(&[2]), None);
        assert_eq!(tuple.resolve(&[]), None);
    }

    #[test]
    fn widths_pro_teil() {
        let drafts = vec![
            ev(EventKind::StartElement),
            ev(EventKind::StartElement),
            Draft::Group(vec![ev(EventKind::EndElement), ev(EventKind::CharactersUntyped), ev(EventKind::StartElementAny)]),
        ];
        let (_, tuple) = assemble(drafts, false);
        assert_eq!(tuple.widths_for(&EventCode::two(2, 1)), Some(vec![2, 2]));
        assert_eq!(tuple.widths_for(&EventCode::one(0)), Some(vec![2]));
        assert_eq!(tuple.widths_for(&EventCode::one(2)), None);
    }

    #[test]
    fn reversed_neuestes_item_hat_code_null() {
        let (mut list, mut tuple) = assemble(
            vec![Draft::Group(vec![ev(EventKind::EndElement), ev(EventKind::AttributeAny)])],
            true,
        );
        assert_eq!(tuple.width(), 0);
        let learned = list.push(EventType::new(EventKind::Attribute));
        let pos = tuple.push(CodeItem::Event(learned));
        assert_eq!(pos, 1);
        assert_eq!(tuple.code_of(learned), Some(EventCode::one(0)));
        // System-Gruppe behält ihren Platz, Code rückt auf
        assert_eq!(tuple.code_of(0), Some(EventCode::two(1, 0)));
        assert_eq!(tuple.width(), 1);
    }

    #[test]
    fn reset_idempotent() {
        let (mut list, mut tuple) = assemble(vec![ev(EventKind::EndElement)], true);
        for _ in 0..3 {
            let i = list.push(EventType::new(EventKind::StartElement));
            tuple.push(CodeItem::Event(i));
        }
        assert_eq!(tuple.len(), 4);
        assert_eq!(tuple.reset(), 3);
        assert_eq!(tuple.len(), 1);
        assert_eq!(tuple.reset(), 0);
        assert_eq!(tuple.len(), 1);
    }

    #[test]
    fn describe_listet_codes() {
        let (list, tuple) = assemble(
            vec![ev(EventKind::EndElement), Draft::Group(vec![ev(EventKind::StartElementAny)])],
            false,
        );
        let text = tuple.describe(&list, &StringInterner::new());
        assert_eq!(text, "0\tEE\n1.0\tSE(*)\n");
    }
}
