//! Bitbreite einer Code-Tuple-Ebene (EXI 6.2).
//!
//! Eine Ebene mit `n` Alternativen braucht `⌈log₂(n)⌉` Bits; eine Ebene
//! mit höchstens einer Alternative wird gar nicht geschrieben.

/// Anzahl Bits für `n` Alternativen: `⌈log₂(n)⌉`, 0 für `n <= 1`.
#[inline]
pub fn for_count(n: usize) -> u8 {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u8
    }
}

/// Größte Anzahl Alternativen, die mit `width` Bits unterscheidbar ist.
#[inline]
pub fn capacity(width: u8) -> usize {
    1usize.checked_shl(u32::from(width)).unwrap_or(usize::MAX)
}
