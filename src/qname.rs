//! Interned qualified names.
//!
//! Grammar-Lookups arbeiten nur auf [`InternedStr`] und [`ExpandedNameId`]
//! (`Copy`-Typen, zwei u32-Indizes). Die Strings selbst liegen einmalig im
//! [`StringInterner`] als `Arc<str>`, damit eingefrorene Grammars zwischen
//! Threads geteilt werden können.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::{Error, FastHashMap, Result};

/// Namespace der XML Schema Instance Attribute (xsi:type, xsi:nil).
pub const URI_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace der XML Schema Built-in Typen.
pub const URI_XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// Index in den [`StringInterner`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternedStr(pub(crate) u32);

impl fmt::Debug for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InternedStr({})", self.0)
    }
}

/// Semantische Identität eines QName: URI + local-name (ohne Prefix).
///
/// Zwei QNames sind gleich, wenn URI und local-name gleich sind; der
/// Prefix spielt für Grammars keine Rolle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpandedNameId {
    pub(crate) uri: InternedStr,
    pub(crate) local_name: InternedStr,
}

impl fmt::Debug for ExpandedNameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExpandedNameId({:?}, {:?})", self.uri, self.local_name)
    }
}

impl ExpandedNameId {
    /// Erstellt eine neue ExpandedNameId.
    pub fn new(uri: InternedStr, local_name: InternedStr) -> Self {
        Self { uri, local_name }
    }

    /// Namespace-URI.
    pub fn uri(&self) -> InternedStr {
        self.uri
    }

    /// Local-name.
    pub fn local_name(&self) -> InternedStr {
        self.local_name
    }

    /// Löst die ExpandedNameId zu Strings auf.
    pub fn resolve<'a>(&self, interner: &'a StringInterner) -> (&'a str, &'a str) {
        (interner.resolve(self.uri), interner.resolve(self.local_name))
    }

    /// `{uri}local` bzw. `local` ohne Namespace.
    pub fn display(&self, interner: &StringInterner) -> String {
        match self.resolve(interner) {
            ("", local) => local.to_string(),
            (uri, local) => format!("{{{uri}}}{local}"),
        }
    }
}

/// Zentraler String-Pool für QName-Interning.
///
/// Jeder String liegt genau einmal als `Arc<str>` vor; `strings` und
/// `lookup` teilen sich dieselbe Allokation.
#[derive(Clone, Default)]
pub struct StringInterner {
    strings: Vec<Arc<str>>,
    lookup: FastHashMap<Arc<str>, u32>,
}

impl StringInterner {
    /// Erstellt einen neuen, leeren Interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Internt einen String. Bereits bekannte Strings werden dedupliziert.
    pub fn intern(&mut self, s: &str) -> Result<InternedStr> {
        if let Some(&idx) = self.lookup.get(s) {
            return Ok(InternedStr(idx));
        }
        let idx = u32::try_from(self.strings.len()).map_err(|_| Error::IntegerOverflow)?;
        let shared: Arc<str> = Arc::from(s);
        self.strings.push(Arc::clone(&shared));
        self.lookup.insert(shared, idx);
        Ok(InternedStr(idx))
    }

    /// Sucht einen String ohne ihn anzulegen.
    pub fn get(&self, s: &str) -> Option<InternedStr> {
        self.lookup.get(s).map(|&idx| InternedStr(idx))
    }

    /// Löst einen InternedStr zu &str auf.
    ///
    /// Ids aus einem fremden Interner liefern den leeren String.
    #[inline]
    pub fn resolve(&self, id: InternedStr) -> &str {
        self.strings.get(id.0 as usize).map_or("", |s| s)
    }

    /// Anzahl der internierten Strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Ob der Interner leer ist.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Internt URI + local-name und gibt die ExpandedNameId zurück.
    pub fn intern_expanded(&mut self, uri: &str, local_name: &str) -> Result<ExpandedNameId> {
        let uri = self.intern(uri)?;
        let local_name = self.intern(local_name)?;
        Ok(ExpandedNameId::new(uri, local_name))
    }

    /// Sucht eine ExpandedNameId ohne Strings anzulegen.
    pub fn get_expanded(&self, uri: &str, local_name: &str) -> Option<ExpandedNameId> {
        Some(ExpandedNameId::new(self.get(uri)?, self.get(local_name)?))
    }

    /// Vergleicht zwei Namen erst nach local-name, dann nach URI.
    ///
    /// Ordinaler Vergleich der Strings (Code-Point-Reihenfolge, keine
    /// Locale). Grundlage der Sortierung globaler Elemente, Attribute und
    /// Substitution-Group-Mitglieder (EXI 8.5.1, 8.5.4.1.6).
    pub fn compare_names(&self, a: ExpandedNameId, b: ExpandedNameId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.resolve(a.local_name)
            .cmp(self.resolve(b.local_name))
            .then_with(|| self.resolve(a.uri).cmp(self.resolve(b.uri)))
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringInterner({} strings)", self.strings.len())
    }
}
