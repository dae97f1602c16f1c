//! Central error types for the EXI grammar engine.
//!
//! Jede Variante gehört zu genau einer der drei Fehlerklassen
//! ([`ErrorCategory`]): Grammar-Verletzung durch das Dokument,
//! Verletzung eines API-Vertrags durch den Aufrufer, oder ein
//! inkonsistentes kompiliertes Schema.

use core::fmt;
use std::borrow::Cow;

/// Fehlerklasse einer [`Error`]-Variante.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Das Dokument enthält ein Event, das im aktuellen Zustand nicht zulässig ist.
    Grammar,
    /// Der Aufrufer hat eine Operation benutzt, die für Grammar oder Phase ungültig ist.
    Precondition,
    /// Das kompilierte Schema ist in sich widersprüchlich.
    Schema,
}

/// All errors raised by grammar construction and traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// An event is not admissible in the current grammar state (EXI 8).
    GrammarViolation {
        /// Das abgelehnte Event (leer wenn nicht verfügbar).
        event: Cow<'static, str>,
        /// Der Grammar-Zustand in dem der Fehler auftrat (leer wenn nicht verfügbar).
        state: Cow<'static, str>,
    },
    /// xsi:type names a type that has no grammar in the cache (EXI 8.5.4.4).
    XsiTypeNotFound(String),
    /// Operation invalid for the grammar variant or traversal phase.
    Precondition(Cow<'static, str>),
    /// Two distinct particles share one declaration serial (EXI 8.5.4.3).
    DuplicateParticleSerial { serial: u32 },
    /// An invalid combination of options was specified (EXI 5.4).
    InvalidOptionCombination(Cow<'static, str>),
    /// An id space (interner, grammar arena) is exhausted.
    IntegerOverflow,
    /// A schema node query returned an impossible combination.
    SchemaInconsistency(Cow<'static, str>),
    /// A particle has max occurs < min occurs (EXI 8.5.4.1.5).
    InvalidParticleOccurs { min: usize, max: usize },
    /// A namespace wildcard lists no namespaces (EXI 8.5.4.1.7).
    EmptyNamespaceList,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GrammarViolation { event, state } => {
                if event.is_empty() && state.is_empty() {
                    write!(f, "grammar violation (EXI 8)")
                } else if state.is_empty() {
                    write!(f, "grammar violation: {event} not admissible (EXI 8)")
                } else {
                    write!(f, "grammar violation: {event} not admissible in state '{state}' (EXI 8)")
                }
            }
            Self::XsiTypeNotFound(name) => write!(f, "xsi:type '{name}' has no grammar (EXI 8.5.4.4)"),
            Self::Precondition(msg) => write!(f, "precondition violated: {msg}"),
            Self::DuplicateParticleSerial { serial } => {
                write!(f, "two particles share declaration serial {serial} (EXI 8.5.4.3)")
            }
            Self::InvalidOptionCombination(msg) => write!(f, "invalid option combination: {msg} (EXI 5.4)"),
            Self::IntegerOverflow => write!(f, "id space exhausted"),
            Self::SchemaInconsistency(msg) => write!(f, "inconsistent schema corpus: {msg}"),
            Self::InvalidParticleOccurs { min, max } => {
                write!(f, "invalid particle occurs: max {max} < min {min} (EXI 8.5.4.1.5)")
            }
            Self::EmptyNamespaceList => write!(f, "empty namespace list in wildcard (EXI 8.5.4.1.7)"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Erstellt einen `GrammarViolation` Fehler mit Kontext.
    pub fn grammar_violation(event: impl Into<Cow<'static, str>>, state: impl Into<Cow<'static, str>>) -> Self {
        Self::GrammarViolation {
            event: event.into(),
            state: state.into(),
        }
    }

    /// Erstellt einen `Precondition` Fehler mit Nachricht.
    pub fn precondition(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Erstellt einen `SchemaInconsistency` Fehler mit Nachricht.
    pub fn schema_inconsistency(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::SchemaInconsistency(msg.into())
    }

    /// Ordnet den Fehler einer der drei Fehlerklassen zu.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::GrammarViolation { .. } | Self::XsiTypeNotFound(_) => ErrorCategory::Grammar,
            Self::Precondition(_)
            | Self::DuplicateParticleSerial { .. }
            | Self::InvalidOptionCombination(_)
            | Self::IntegerOverflow => ErrorCategory::Precondition,
            Self::SchemaInconsistency(_)
            | Self::InvalidParticleOccurs { .. }
            | Self::EmptyNamespaceList => ErrorCategory::Schema,
        }
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
