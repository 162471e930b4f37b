//! Tables derived from a finished suffix array: LCP, BWT and the
//! bucket-boundary table.

use super::builder::BuiltSuffixArray;
use super::compare::Sym;
use super::types::{BucketEntry, SuffixEntry};
use crate::alphabet::SEPARATOR;
use crate::encseq::{EncodedSequence, SymbolAccess, SymbolVisitor};

/// Which derived tables to compute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivedSelection {
    pub lcp: bool,
    pub bwt: bool,
    pub bck: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedTables {
    pub lcp: Option<Vec<u64>>,
    pub bwt: Option<Vec<u8>>,
    pub buckets: Option<Vec<BucketEntry>>,
}

impl DerivedTables {
    /// Compute the selected tables over the text in the suffix array's direction
    pub fn compute(encoded: &EncodedSequence, built: &BuiltSuffixArray, selection: DerivedSelection) -> Self {
        struct Compute<'a> {
            suffixes: &'a [SuffixEntry],
            selection: DerivedSelection,
            num_chars: usize,
            prefix_length: u32,
        }

        impl SymbolVisitor for Compute<'_> {
            type Output = DerivedTables;

            fn visit<S: SymbolAccess>(self, symbols: &S) -> DerivedTables {
                DerivedTables {
                    lcp: self.selection.lcp.then(|| lcp_table(symbols, self.suffixes)),
                    bwt: self.selection.bwt.then(|| bwt_table(symbols, self.suffixes)),
                    buckets: self.selection.bck.then(|| {
                        bucket_table(symbols, self.suffixes, self.num_chars, self.prefix_length)
                    }),
                }
            }
        }

        encoded.accept_oriented(
            built.direction,
            Compute {
                suffixes: &built.suffixes,
                selection,
                num_chars: encoded.num_chars(),
                prefix_length: built.prefix_length,
            },
        )
    }
}

/// Inverse permutation; `suffixes` must be a permutation of [0, N)
pub fn inverse(suffixes: &[SuffixEntry]) -> Vec<u64> {
    let mut rank = vec![0u64; suffixes.len()];
    for (i, &p) in suffixes.iter().enumerate() {
        rank[p as usize] = i as u64;
    }
    rank
}

/// Kasai's linear-time LCP; `lcp[0] = 0` and a common prefix stops at the
/// first special symbol
pub fn lcp_table<S: SymbolAccess>(symbols: &S, suffixes: &[SuffixEntry]) -> Vec<u64> {
    let n = suffixes.len();
    let rank = inverse(suffixes);
    let mut lcp = vec![0u64; n];
    let mut h = 0u64;
    for i in 0..n as u64 {
        let r = rank[i as usize] as usize;
        if r == 0 {
            h = 0;
            continue;
        }
        let j = suffixes[r - 1];
        loop {
            match (Sym::at(symbols, i + h), Sym::at(symbols, j + h)) {
                (Sym::Regular(a), Sym::Regular(b)) if a == b => h += 1,
                _ => break,
            }
        }
        lcp[r] = h;
        h = h.saturating_sub(1);
    }
    lcp
}

/// Symbol preceding each suffix; the suffix at position 0 gets a separator
pub fn bwt_table<S: SymbolAccess>(symbols: &S, suffixes: &[SuffixEntry]) -> Vec<u8> {
    suffixes
        .iter()
        .map(|&p| if p == 0 { SEPARATOR } else { symbols.symbol(p - 1) })
        .collect()
}

/// Code of the first `prefix_length` symbols when all of them are regular
pub fn regular_prefix<S: SymbolAccess>(symbols: &S, pos: u64, num_chars: u64, prefix_length: u32) -> Option<u64> {
    let mut code = 0u64;
    for i in 0..prefix_length as u64 {
        match Sym::at(symbols, pos + i) {
            Sym::Regular(c) => code = code * num_chars + c as u64,
            Sym::Special(_) => return None,
        }
    }
    Some(code)
}

/// Rank range of every regular prefix of length `prefix_length`.
///
/// An empty bucket's `left` is the `left` of the next non-empty bucket, or
/// N after the last one.
pub fn bucket_table<S: SymbolAccess>(
    symbols: &S,
    suffixes: &[SuffixEntry],
    num_chars: usize,
    prefix_length: u32,
) -> Vec<BucketEntry> {
    let sigma = num_chars as u64;
    let space = sigma.pow(prefix_length) as usize;
    let mut buckets = vec![BucketEntry::default(); space];
    let mut filled = vec![false; space];
    for (rank, &p) in suffixes.iter().enumerate() {
        if let Some(code) = regular_prefix(symbols, p, sigma, prefix_length) {
            let bucket = &mut buckets[code as usize];
            if !filled[code as usize] {
                filled[code as usize] = true;
                bucket.left = rank as u64;
            }
            bucket.count += 1;
        }
    }

    let mut next_left = suffixes.len() as u64;
    for (bucket, &filled) in buckets.iter_mut().zip(&filled).rev() {
        if filled {
            next_left = bucket.left;
        } else {
            bucket.left = next_left;
        }
    }
    buckets
}

/// First rank whose suffix is not greater than its predecessor.
///
/// `rank` is the inverse of `suffixes`, which must be a permutation. Two
/// suffixes starting with the same regular symbol are in order exactly when
/// the suffixes one position further are.
pub fn first_unsorted<S: SymbolAccess>(symbols: &S, suffixes: &[SuffixEntry], rank: &[u64]) -> Option<usize> {
    let n = suffixes.len() as u64;
    let rank_of = |p: u64| if p >= n { u64::MAX } else { rank[p as usize] };
    (1..suffixes.len()).find(|&i| {
        let (a, b) = (suffixes[i - 1], suffixes[i]);
        match (Sym::at(symbols, a), Sym::at(symbols, b)) {
            (Sym::Regular(x), Sym::Regular(y)) if x == y => rank_of(a + 1) >= rank_of(b + 1),
            (x, y) => x >= y,
        }
    })
}
