//! Difference-cover sampling.
//!
//! A difference cover D modulo v contains, for every d in [0, v), two
//! members whose difference is d mod v. For any two positions i and j there
//! is therefore a shift δ < v with i+δ and j+δ both sampled. Once the
//! sample suffixes are ranked, two suffixes that agree on their first δ
//! symbols are ordered by the ranks of their suffixes at i+δ and j+δ.

use super::bucket::{comparison_sort, BucketRefiner};
use super::compare::SuffixComparator;
use super::doubling::{double_until_unique, group_ranks};
use super::types::SuffixEntry;
use crate::encseq::SymbolAccess;
use crate::error::{Error, Result};
use rayon::prelude::*;
use std::cmp::Ordering;

pub const MIN_MODULUS: u32 = 4;
pub const MAX_MODULUS: u32 = 1 << 12;

#[derive(Debug, Clone)]
pub struct DifferenceCover {
    modulus: u64,
    members: Vec<u32>,
    /// Index of each residue in `members`, `u32::MAX` when not a member
    member_index: Vec<u32>,
    /// For each difference d, members (a, b) with a - b = d mod v
    pairs: Vec<(u32, u32)>,
}

impl DifferenceCover {
    pub fn new(modulus: u32) -> Result<Self> {
        if !modulus.is_power_of_two() || !(MIN_MODULUS..=MAX_MODULUS).contains(&modulus) {
            return Err(Error::configuration(format!(
                "difference cover modulus {} must be a power of two between {} and {}",
                modulus, MIN_MODULUS, MAX_MODULUS
            )));
        }
        let v = modulus;
        let mut r = 1;
        while r * r < v {
            r += 1;
        }

        let mut member_index = vec![u32::MAX; v as usize];
        let mut members = Vec::new();
        for m in (0..r).chain((1..=r).map(|k| (k * r) % v)) {
            if member_index[m as usize] == u32::MAX {
                member_index[m as usize] = 0;
                members.push(m);
            }
        }
        members.sort_unstable();
        for (i, &m) in members.iter().enumerate() {
            member_index[m as usize] = i as u32;
        }

        // d = k*r - s with k = ceil(d / r) and 0 <= s < r
        let pairs = (0..v)
            .map(|d| {
                let k = d.div_ceil(r);
                ((k * r) % v, k * r - d)
            })
            .collect();

        Ok(Self {
            modulus: v as u64,
            members,
            member_index,
            pairs,
        })
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn members(&self) -> &[u32] {
        &self.members
    }

    #[inline]
    pub fn is_sample(&self, pos: u64) -> bool {
        self.member_index[(pos % self.modulus) as usize] != u32::MAX
    }

    /// Shift that moves both `i` and `j` onto sample positions
    #[inline]
    pub fn delta(&self, i: u64, j: u64) -> u64 {
        let v = self.modulus;
        let (ri, rj) = (i % v, j % v);
        let d = (ri + v - rj) % v;
        let a = self.pairs[d as usize].0 as u64;
        (a + v - ri) % v
    }

    #[inline]
    fn slot(&self, pos: u64) -> usize {
        let residue = (pos % self.modulus) as usize;
        (pos / self.modulus) as usize * self.members.len() + self.member_index[residue] as usize
    }
}

/// Ranks of all sample suffixes in the full suffix order
pub struct SampleRanks {
    cover: DifferenceCover,
    total_length: u64,
    ranks: Vec<u64>,
}

impl SampleRanks {
    pub fn compute<S: SymbolAccess>(symbols: &S, cover: DifferenceCover, char_by_char: bool) -> Self {
        let n = symbols.total_length();
        let v = cover.modulus;
        let cmp = SuffixComparator::new(symbols, char_by_char);

        let mut samples: Vec<u64> = (0..n).filter(|&p| cover.is_sample(p)).collect();
        samples.par_sort_unstable_by(|&a, &b| cmp.compare_bounded(a, b, 0, v).0);

        let slots = (n / v + 1) as usize * cover.members.len();
        let mut ranks = vec![0u64; slots];
        let groups = group_ranks(
            &samples,
            &mut ranks,
            |p| cover.slot(p),
            |a, b| cmp.compare_bounded(a, b, 0, v).0 == Ordering::Equal,
        );
        log::debug!(
            "difference cover v={}: {} samples, {} groups after the first {} symbols",
            v,
            samples.len(),
            groups.len(),
            v
        );

        double_until_unique(&mut samples, &mut ranks, groups, v, n, |p| cover.slot(p));
        Self {
            cover,
            total_length: n,
            ranks,
        }
    }

    /// Rank of the sample suffix at `pos`; the empty suffix ranks last
    #[inline]
    pub fn rank(&self, pos: u64) -> u64 {
        if pos >= self.total_length {
            u64::MAX
        } else {
            self.ranks[self.cover.slot(pos)]
        }
    }

    pub fn cover(&self) -> &DifferenceCover {
        &self.cover
    }
}

/// Bucket refinement with the difference-cover comparator
pub struct DcRefiner<'a, S> {
    cmp: SuffixComparator<'a, S>,
    ranks: &'a SampleRanks,
}

impl<'a, S: SymbolAccess> DcRefiner<'a, S> {
    pub fn new(cmp: SuffixComparator<'a, S>, ranks: &'a SampleRanks) -> Self {
        Self { cmp, ranks }
    }

    /// Order of `a` and `b`, which agree on their first `depth` symbols
    pub fn compare(&self, a: u64, b: u64, depth: u64) -> Ordering {
        let delta = self.ranks.cover().delta(a, b);
        if depth < delta {
            let (ord, _) = self.cmp.compare_bounded(a, b, depth, delta);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.ranks.rank(a + delta).cmp(&self.ranks.rank(b + delta))
    }
}

impl<S: SymbolAccess> BucketRefiner for DcRefiner<'_, S> {
    fn refine(&self, bucket: &mut [SuffixEntry], depth: u64) {
        comparison_sort(bucket, |&a, &b| self.compare(a, b, depth));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encseq::{SatelliteKind, SymbolVisitor};
    use crate::index::suffix_array::compare::tests::{encode, naive_key};

    #[test]
    fn test_cover_property() {
        let mut v = MIN_MODULUS;
        while v <= MAX_MODULUS {
            let cover = DifferenceCover::new(v).unwrap();
            let members = cover.members();
            let mut seen = vec![false; v as usize];
            for &a in members {
                for &b in members {
                    seen[((a + v - b) % v) as usize] = true;
                }
            }
            assert!(seen.iter().all(|&s| s), "v={}", v);
            for i in 0..v as u64 {
                for j in [0, 1, 3, v as u64 - 1] {
                    let d = cover.delta(i, j);
                    assert!(d < v as u64);
                    assert!(cover.is_sample(i + d) && cover.is_sample(j + d), "v={} i={} j={}", v, i, j);
                }
            }
            v *= 2;
        }
    }

    #[test]
    fn test_rejects_bad_modulus() {
        assert!(DifferenceCover::new(3).is_err());
        assert!(DifferenceCover::new(2).is_err());
        assert!(DifferenceCover::new(48).is_err());
        assert!(DifferenceCover::new(1 << 13).is_err());
    }

    struct Check(u32);

    impl SymbolVisitor for Check {
        type Output = (Vec<u64>, Vec<u64>);
        fn visit<S: SymbolAccess>(self, s: &S) -> Self::Output {
            let ranks = SampleRanks::compute(s, DifferenceCover::new(self.0).unwrap(), false);
            let mut samples: Vec<u64> = (0..s.total_length()).filter(|&p| ranks.cover().is_sample(p)).collect();
            samples.sort_by_key(|&p| ranks.rank(p));

            let refiner = DcRefiner::new(SuffixComparator::new(s, false), &ranks);
            let mut all: Vec<u64> = (0..s.total_length()).collect();
            refiner.refine(&mut all, 0);
            (samples, all)
        }
    }

    #[test]
    fn test_sample_ranks_and_refinement_match_naive() {
        let text = b"ACGTACGTACGTACGTAAAAAAAAAAAAAAAAAAAAAAAAACGNNACGTTTT|ACGTACGTACGTACGTAAAAAAAAAAAAAAAA|T";
        let encoded = encode(text, SatelliteKind::Bit);
        let mut expected: Vec<u64> = (0..encoded.total_length()).collect();
        expected.sort_by_key(|&p| naive_key(&encoded, p));
        for v in [4, 8, 16, 64] {
            let (samples, all) = encoded.accept(Check(v));
            let cover = DifferenceCover::new(v).unwrap();
            let expected_samples: Vec<u64> = expected.iter().copied().filter(|&p| cover.is_sample(p)).collect();
            assert_eq!(samples, expected_samples, "v={}", v);
            assert_eq!(all, expected, "v={}", v);
        }
    }
}
