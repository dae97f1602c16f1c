//! Grammar options (EXI 5.4, Table 5-1, restricted to the options that
//! change grammar shape).
//!
//! # Beispiel
//!
//! ```
//! use exi_grammar::options::{GrammarOptions, Preserve};
//!
//! let opts = GrammarOptions::default()
//!     .with_preserve(Preserve { comments: true, ..Preserve::default() })
//!     .with_self_contained();
//!
//! assert!(opts.preserve().comments);
//! assert!(opts.deviations());
//! assert!(opts.validate().is_ok());
//! ```

use crate::{Error, Result};

/// Fidelity options controlling which optional events grammars admit (EXI 5.4, 6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preserve {
    /// CM events can be preserved.
    pub comments: bool,
    /// PI events can be preserved.
    pub pis: bool,
    /// DT and ER events can be preserved.
    pub dtd: bool,
    /// NS events and namespace prefixes can be preserved.
    pub prefixes: bool,
}

impl Preserve {
    /// Ob CM oder PI erhalten werden (dann existiert die CM/PI-Gruppe).
    pub fn misc(&self) -> bool {
        self.comments || self.pis
    }

    /// Ob irgendein Flag gesetzt ist.
    pub fn any(&self) -> bool {
        self.comments || self.pis || self.dtd || self.prefixes
    }
}

/// Options that shape every grammar a cache builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarOptions {
    pub(crate) preserve: Preserve,
    pub(crate) permit_deviations: bool,
    pub(crate) self_contained: bool,
    pub(crate) strict: bool,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            preserve: Preserve::default(),
            permit_deviations: true,
            self_contained: false,
            strict: false,
        }
    }
}

impl GrammarOptions {
    // --- Getter ---

    /// Fidelity options.
    pub fn preserve(&self) -> &Preserve { &self.preserve }
    /// Lax extensibility: deviations from the schema are encodable.
    pub fn permit_deviations(&self) -> bool { self.permit_deviations }
    /// Self-contained elements enabled (EXI 5.4).
    pub fn self_contained(&self) -> bool { self.self_contained }
    /// Strict interpretation of schemas (EXI 5.4).
    pub fn strict(&self) -> bool { self.strict }

    // --- Builder-Setter (Fluent API) ---

    /// Setzt die Preserve-Optionen.
    pub fn with_preserve(mut self, preserve: Preserve) -> Self { self.preserve = preserve; self }
    /// Setzt Lax Extensibility.
    pub fn with_permit_deviations(mut self, val: bool) -> Self { self.permit_deviations = val; self }
    /// Aktiviert Self-Contained.
    pub fn with_self_contained(mut self) -> Self { self.self_contained = true; self }
    /// Aktiviert Strict-Modus.
    pub fn with_strict(mut self) -> Self { self.strict = true; self }

    // --- Mutable Setter ---

    /// Setzt die Preserve-Optionen.
    pub fn set_preserve(&mut self, preserve: Preserve) { self.preserve = preserve; }
    /// Setzt Lax Extensibility.
    pub fn set_permit_deviations(&mut self, val: bool) { self.permit_deviations = val; }
    /// Setzt Self-Contained.
    pub fn set_self_contained(&mut self, val: bool) { self.self_contained = val; }
    /// Setzt Strict-Modus.
    pub fn set_strict(&mut self, val: bool) { self.strict = val; }

    /// Ob Deviation-Productions (AT(*), SE(*), CH [untyped], EE-Fallback) erzeugt werden.
    ///
    /// Strict schließt Deviations immer aus, auch wenn `permit_deviations` gesetzt ist.
    pub fn deviations(&self) -> bool {
        self.permit_deviations && !self.strict
    }

    /// Prüft die Kombinationsregeln aus EXI 5.4.
    ///
    /// Strict verträgt sich weder mit erhaltenen Comments, PIs, DTDs oder
    /// Prefixes noch mit Self-Contained Elementen.
    pub fn validate(&self) -> Result<()> {
        if self.strict && self.preserve.any() {
            return Err(Error::InvalidOptionCombination(
                "strict cannot be combined with preserve options".into(),
            ));
        }
        if self.strict && self.self_contained {
            return Err(Error::InvalidOptionCombination(
                "strict cannot be combined with self-contained elements".into(),
            ));
        }
        Ok(())
    }
}
