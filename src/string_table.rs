//! String Table Hook für Built-in Grammars (EXI 7.3, 8.4.3).
//!
//! Die Grammar braucht von der String Table nur zwei Dinge: Namen
//! internieren und pro (URI, local-name) den Slot der Local-Name-Partition,
//! der auf die bereits angelegte Built-in Element Grammar zeigt. Werte-
//! und Prefix-Partitionen gehören zur Stream-Schicht.
//!
//! Lifecycle: eine StringTable pro Cache. Die Zuordnung Name → Grammar
//! überlebt [`crate::cache::GrammarCache::reset`]; nur das Gelernte in den
//! Grammars selbst wird zurückgesetzt.

use crate::grammar::GrammarId;
use crate::qname::{ExpandedNameId, StringInterner};
use crate::{FastHashMap, Result};

/// Namen plus Local-Name-Slots für Built-in Grammars.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    names: StringInterner,
    grammars: FastHashMap<ExpandedNameId, GrammarId>,
}

impl StringTable {
    /// Startet mit vorinternierten Namen (z.B. denen des Schemas).
    pub fn with_names(names: StringInterner) -> Self {
        Self { names, grammars: FastHashMap::default() }
    }

    /// Der Interner.
    pub fn names(&self) -> &StringInterner {
        &self.names
    }

    /// Internt (URI, local-name).
    pub fn intern_name(&mut self, uri: &str, local_name: &str) -> Result<ExpandedNameId> {
        self.names.intern_expanded(uri, local_name)
    }

    /// Sucht (URI, local-name) ohne anzulegen.
    pub fn name(&self, uri: &str, local_name: &str) -> Option<ExpandedNameId> {
        self.names.get_expanded(uri, local_name)
    }

    /// Built-in Grammar, die für `name` bereits angelegt wurde.
    #[inline]
    pub fn lookup_grammar(&self, name: ExpandedNameId) -> Option<GrammarId> {
        self.grammars.get(&name).copied()
    }

    /// Trägt die Grammar für `name` ein.
    ///
    /// Ein bestehender Eintrag bleibt erhalten und wird zurückgegeben.
    pub fn register_grammar(&mut self, name: ExpandedNameId, grammar: GrammarId) -> GrammarId {
        *self.grammars.entry(name).or_insert(grammar)
    }

    /// Anzahl der Namen mit Built-in Grammar.
    pub fn grammar_count(&self) -> usize {
        self.grammars.len()
    }
}
