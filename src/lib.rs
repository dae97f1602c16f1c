//! exi-grammar – EXI 1.0 (W3C Second Edition) Grammar Engine
//!
//! Baut Schema-informed Grammars (EXI 8.5) und Built-in Grammars (EXI 8.4),
//! vergibt Event Codes (EXI 6.2) und lernt pro Dokument (EXI 8.4.3).
//! Bitstream, Datentyp-Codecs und String-Werte gehören nicht hierher;
//! ein Encoder oder Decoder fragt über [`Traversal`] die zulässigen Events
//! und deren Codes ab.
//!
//! # Beispiel
//!
//! ```
//! use exi_grammar::{EventCode, GrammarCache, GrammarOptions, Traversal};
//!
//! let mut cache = GrammarCache::schema_less(GrammarOptions::default())?;
//! let greeting = cache.intern_name("", "greeting")?;
//! let mut t = Traversal::new(&mut cache);
//! t.enter_document()?;
//! t.start_document()?;
//! t.start_element(greeting)?;
//! // CH im Start-Tag einer Built-in Grammar: 0.3
//! assert_eq!(t.characters()?.code, EventCode::two(0, 3));
//! t.end_element()?;
//! t.end_document()?;
//! # Ok::<(), exi_grammar::Error>(())
//! ```

pub mod bit_width;
pub mod built_in;
pub mod cache;
pub mod code_tuple;
pub mod error;
pub mod event_code;
pub mod event_type;
pub mod grammar;
pub mod options;
pub mod ordering;
pub mod proto_grammar;
pub mod qname;
pub mod schema;
pub mod string_table;
pub mod traversal;
pub mod undeclared;

pub use error::{Error, ErrorCategory, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent — für interne Datenstrukturen).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// HashSet mit ahash.
pub(crate) type FastHashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Cache und Traversal
pub use cache::GrammarCache;
pub use traversal::{EventMatch, Phase, Traversal};

// Public API: Optionen
pub use options::{GrammarOptions, Preserve};

// Public API: Grammars
pub use code_tuple::{CodeItem, CodeTuple};
pub use event_code::EventCode;
pub use event_type::{EventKind, EventType, EventTypeList, GrammarRef};
pub use grammar::{Grammar, GrammarId, GrammarKind, GrammarState, StateStatus};

// Public API: Schema
pub use qname::{ExpandedNameId, InternedStr, StringInterner};
pub use schema::{ComplexType, ContentClass, MaxOccurs, NodeId, Schema, SchemaBuilder};
