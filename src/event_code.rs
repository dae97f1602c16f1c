//! Event Codes (EXI 6.2).
//!
//! Ein Event Code ist der Pfad durch einen Code Tuple: ein Teil pro
//! Ebene, höchstens drei. Die Bitbreite jedes Teils hängt nur von der
//! Anzahl Geschwister auf derselben Ebene ab, nicht vom Code selbst.

use std::fmt;

/// Ein Event Code mit 1-3 Teilen.
///
/// Die Teile werden hierarchisch interpretiert: "1.3.0" heißt Teil1=1,
/// Teil2=3, Teil3=0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventCode {
    part1: u32,
    part2: Option<u32>,
    part3: Option<u32>,
}

impl EventCode {
    /// Erstellt einen Event Code mit einem Teil.
    pub fn one(part1: u32) -> Self {
        Self { part1, part2: None, part3: None }
    }

    /// Erstellt einen Event Code mit zwei Teilen.
    pub fn two(part1: u32, part2: u32) -> Self {
        Self { part1, part2: Some(part2), part3: None }
    }

    /// Erstellt einen Event Code mit drei Teilen.
    pub fn three(part1: u32, part2: u32, part3: u32) -> Self {
        Self { part1, part2: Some(part2), part3: Some(part3) }
    }

    /// Baut einen Code aus einem Pfad; `None` bei leerem Pfad oder mehr als drei Teilen.
    pub fn from_parts(parts: &[u32]) -> Option<Self> {
        match *parts {
            [a] => Some(Self::one(a)),
            [a, b] => Some(Self::two(a, b)),
            [a, b, c] => Some(Self::three(a, b, c)),
            _ => None,
        }
    }

    /// Anzahl der Teile ("event code of length N").
    pub fn length(&self) -> usize {
        1 + self.part2.is_some() as usize + self.part3.is_some() as usize
    }

    /// Gibt den ersten Teil zurück.
    pub fn part1(&self) -> u32 {
        self.part1
    }

    /// Gibt den zweiten Teil zurück (falls vorhanden).
    pub fn part2(&self) -> Option<u32> {
        self.part2
    }

    /// Gibt den dritten Teil zurück (falls vorhanden).
    pub fn part3(&self) -> Option<u32> {
        self.part3
    }

    /// Die Teile als Slice-kompatibler Vektor, in Lesereihenfolge.
    pub fn parts(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(3);
        out.push(self.part1);
        out.extend(self.part2);
        out.extend(self.part3);
        out
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.part1)?;
        if let Some(p2) = self.part2 {
            write!(f, ".{p2}")?;
        }
        if let Some(p3) = self.part3 {
            write!(f, ".{p3}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn laenge_und_teile() {
        assert_eq!(EventCode::one(4).length(), 1);
        assert_eq!(EventCode::two(1, 0).length(), 2);
        let c = EventCode::three(2, 1, 0);
        assert_eq!(c.length(), 3);
        assert_eq!(c.parts(), vec![2, 1, 0]);
        assert_eq!(c.part2(), Some(1));
    }

    #[test]
    fn from_parts_grenzen() {
        assert_eq!(EventCode::from_parts(&[]), None);
        assert_eq!(EventCode::from_parts(&[1, 2]), Some(EventCode::two(1, 2)));
        assert_eq!(EventCode::from_parts(&[1, 2, 3, 4]), None);
    }

    #[test]
    fn display() {
        assert_eq!(EventCode::one(3).to_string(), "3");
        assert_eq!(EventCode::two(1, 0).to_string(), "1.0");
        assert_eq!(EventCode::three(2, 1, 0).to_string(), "2.1.0");
    }
}
