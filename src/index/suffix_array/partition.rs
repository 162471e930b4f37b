//! Extended prefix codes and the partition plan built on them.
//!
//! The extended prefix code of a suffix reads its first `depth` symbols as a
//! base-(σ+1) number. A special symbol (or the end of the text) contributes
//! the digit σ, and so does every position after it. Codes therefore order
//! suffixes by their first `depth` symbols, and all suffixes sharing a code
//! that contains σ are ordered by position.

use super::compare::Sym;
use super::types::SuffixEntry;
use crate::encseq::SymbolAccess;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixCoder {
    num_chars: u64,
    depth: u32,
    space: u64,
}

impl PrefixCoder {
    pub fn new(num_chars: usize, depth: u32) -> Self {
        let num_chars = num_chars as u64;
        Self {
            num_chars,
            depth,
            space: (num_chars + 1).pow(depth),
        }
    }

    /// Number of distinct codes
    pub fn space(&self) -> u64 {
        self.space
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Code of the suffix starting at `pos`
    #[inline]
    pub fn code<S: SymbolAccess>(&self, symbols: &S, pos: u64) -> u32 {
        let base = self.num_chars + 1;
        let mut code = 0u64;
        let mut special = false;
        for i in 0..self.depth as u64 {
            let digit = if special {
                self.num_chars
            } else {
                match Sym::at(symbols, pos + i) {
                    Sym::Regular(c) => c as u64,
                    Sym::Special(_) => {
                        special = true;
                        self.num_chars
                    }
                }
            };
            code = code * base + digit;
        }
        code as u32
    }

    /// Whether a code contains the special digit
    #[inline]
    pub fn is_special(&self, code: u32) -> bool {
        let base = self.num_chars + 1;
        let mut rest = code as u64;
        for _ in 0..self.depth {
            if rest % base == self.num_chars {
                return true;
            }
            rest /= base;
        }
        false
    }

    /// Occurrences of each code
    pub fn histogram(&self, codes: &[u32]) -> Vec<u64> {
        let mut counts = vec![0u64; self.space as usize];
        for &c in codes {
            counts[c as usize] += 1;
        }
        counts
    }
}

/// Contiguous code ranges, one per part, in code order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    ranges: Vec<Range<u64>>,
}

impl PartitionPlan {
    /// Split the code space into `parts` ranges holding about the same
    /// number of suffixes
    pub fn balanced(histogram: &[u64], parts: usize) -> Self {
        let parts = parts.max(1);
        let space = histogram.len() as u64;
        let total: u64 = histogram.iter().sum();

        let mut ranges = Vec::with_capacity(parts);
        let mut start = 0u64;
        let mut code = 0u64;
        let mut seen = 0u64;
        for j in 1..parts as u64 {
            let target = (total as u128 * j as u128 / parts as u128) as u64;
            while code < space && seen < target {
                seen += histogram[code as usize];
                code += 1;
            }
            ranges.push(start..code);
            start = code;
        }
        ranges.push(start..space);
        Self { ranges }
    }

    pub fn ranges(&self) -> &[Range<u64>] {
        &self.ranges
    }

    pub fn parts(&self) -> usize {
        self.ranges.len()
    }

    /// Positions of all suffixes grouped by part, ascending within a part
    pub fn scatter(&self, codes: &[u32], histogram: &[u64]) -> Vec<Vec<SuffixEntry>> {
        let mut parts: Vec<Vec<SuffixEntry>> = self
            .sizes(histogram)
            .into_iter()
            .map(|size| Vec::with_capacity(size as usize))
            .collect();
        for (p, &c) in codes.iter().enumerate() {
            let part = self.ranges.partition_point(|r| r.end <= c as u64);
            parts[part].push(p as SuffixEntry);
        }
        parts
    }

    /// Suffixes falling into each part
    pub fn sizes(&self, histogram: &[u64]) -> Vec<u64> {
        self.ranges
            .iter()
            .map(|r| histogram[r.start as usize..r.end as usize].iter().sum())
            .collect()
    }
}
