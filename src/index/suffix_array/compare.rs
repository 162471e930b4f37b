//! Suffix comparison.
//!
//! Regular symbols compare by code and sort before special symbols. Two
//! special symbols at the same depth compare by text position, and the end
//! of the text is a special symbol at position N. Two distinct suffixes are
//! therefore never equal, and a common prefix never extends over a special
//! symbol.

use crate::alphabet::is_special;
use crate::encseq::SymbolAccess;
use std::cmp::Ordering;

/// Symbol of a suffix at some depth, as seen by the comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sym {
    Regular(u8),
    /// Wildcard, separator or end of text, with its text position
    Special(u64),
}

impl Sym {
    #[inline]
    pub fn at<S: SymbolAccess>(symbols: &S, pos: u64) -> Sym {
        if pos >= symbols.total_length() {
            return Sym::Special(symbols.total_length());
        }
        let c = symbols.symbol(pos);
        if is_special(c) {
            Sym::Special(pos)
        } else {
            Sym::Regular(c)
        }
    }
}

impl Ord for Sym {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Sym::Regular(a), Sym::Regular(b)) => a.cmp(b),
            (Sym::Regular(_), Sym::Special(_)) => Ordering::Less,
            (Sym::Special(_), Sym::Regular(_)) => Ordering::Greater,
            (Sym::Special(p), Sym::Special(q)) => p.cmp(q),
        }
    }
}

impl PartialOrd for Sym {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compares suffixes of one text
pub struct SuffixComparator<'a, S> {
    symbols: &'a S,
    char_by_char: bool,
}

impl<S> Clone for SuffixComparator<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SuffixComparator<'_, S> {}

impl<'a, S: SymbolAccess> SuffixComparator<'a, S> {
    pub fn new(symbols: &'a S, char_by_char: bool) -> Self {
        Self {
            symbols,
            char_by_char,
        }
    }

    pub fn symbols(&self) -> &'a S {
        self.symbols
    }

    /// Order of suffixes `a` and `b`, whose first `depth` symbols are equal
    #[inline]
    pub fn compare(&self, a: u64, b: u64, depth: u64) -> Ordering {
        self.compare_bounded(a, b, depth, u64::MAX).0
    }

    /// Order and longest common prefix, looking at most `limit` symbols deep.
    ///
    /// Suffixes equal on their first `limit` symbols compare `Equal` with an
    /// lcp of `limit`.
    #[inline]
    pub fn compare_bounded(&self, a: u64, b: u64, depth: u64, limit: u64) -> (Ordering, u64) {
        if self.char_by_char {
            self.compare_chars(a, b, depth, limit)
        } else {
            self.compare_blocks(a, b, depth, limit)
        }
    }

    fn compare_chars(&self, a: u64, b: u64, mut depth: u64, limit: u64) -> (Ordering, u64) {
        while depth < limit {
            let x = Sym::at(self.symbols, a + depth);
            let y = Sym::at(self.symbols, b + depth);
            match (x, y) {
                (Sym::Regular(c), Sym::Regular(d)) if c == d => depth += 1,
                _ => return (x.cmp(&y), depth),
            }
        }
        (Ordering::Equal, limit)
    }

    fn compare_blocks(&self, a: u64, b: u64, mut depth: u64, limit: u64) -> (Ordering, u64) {
        let n = self.symbols.total_length();
        let bits = self.symbols.symbol_bits();
        while depth < limit {
            let (pa, pb) = (a + depth, b + depth);
            let block_a = if pa < n { self.symbols.block(pa) } else { Default::default() };
            let block_b = if pb < n { self.symbols.block(pb) } else { Default::default() };

            let common = (block_a.len.min(block_b.len) as u64).min(limit - depth);
            if common == 0 {
                let x = Sym::at(self.symbols, pa);
                let y = Sym::at(self.symbols, pb);
                if x != y || matches!(x, Sym::Special(_)) {
                    return (x.cmp(&y), depth);
                }
                depth += 1;
                continue;
            }

            let mask = u64::MAX << (64 - common as u32 * bits);
            let diff = (block_a.code ^ block_b.code) & mask;
            if diff != 0 {
                let matched = (diff.leading_zeros() / bits) as u64;
                return ((block_a.code & mask).cmp(&(block_b.code & mask)), depth + matched);
            }
            depth += common;
        }
        (Ordering::Equal, limit)
    }

    /// Longest common prefix of two suffixes
    pub fn lcp(&self, a: u64, b: u64) -> u64 {
        if a == b {
            return self.symbols.total_length() - a;
        }
        self.compare_bounded(a, b, 0, u64::MAX).1
    }
}
