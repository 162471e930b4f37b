//! Counting sort on prefix codes followed by per-bucket refinement.

use super::compare::{SuffixComparator, Sym};
use super::partition::PrefixCoder;
use super::types::{BucketBounds, SuffixEntry, PARALLEL_SORT_THRESHOLD};
use crate::encseq::SymbolAccess;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::ops::Range;

/// Finishes the order of a bucket whose suffixes share `depth` symbols
pub trait BucketRefiner: Sync {
    fn refine(&self, bucket: &mut [SuffixEntry], depth: u64);
}

/// Sort the suffixes of one part.
///
/// `positions` holds, in ascending order, every suffix whose prefix code
/// lies in `range`.
pub fn sort_partition<R: BucketRefiner>(
    coder: &PrefixCoder,
    codes: &[u32],
    range: Range<u64>,
    positions: &[SuffixEntry],
    store_special_codes: bool,
    refiner: &R,
) -> Vec<SuffixEntry> {
    let width = (range.end - range.start) as usize;
    let code_of = |p: SuffixEntry| codes[p as usize];

    let mut counts = vec![0usize; width + 1];
    let mut specials: Vec<SuffixEntry> = Vec::new();
    for &p in positions {
        let c = code_of(p);
        if !store_special_codes && coder.is_special(c) {
            specials.push(p);
        } else {
            counts[(c as u64 - range.start) as usize + 1] += 1;
        }
    }
    for i in 1..counts.len() {
        counts[i] += counts[i - 1];
    }

    let counted = counts[width];
    let mut sorted = vec![0 as SuffixEntry; counted];
    let mut next = counts.clone();
    for &p in positions {
        let c = code_of(p);
        if !store_special_codes && coder.is_special(c) {
            continue;
        }
        let slot = &mut next[(c as u64 - range.start) as usize];
        sorted[*slot] = p;
        *slot += 1;
    }

    if !specials.is_empty() {
        specials.sort_by_key(|&p| code_of(p));
        sorted = merge_by_code(sorted, specials, codes);
    }

    refine_buckets(&mut sorted, codes, coder, refiner);
    sorted
}

/// Merge two code-ordered runs; each keeps its internal order
fn merge_by_code(a: Vec<SuffixEntry>, b: Vec<SuffixEntry>, codes: &[u32]) -> Vec<SuffixEntry> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if codes[b[j] as usize] < codes[a[i] as usize] {
            merged.push(b[j]);
            j += 1;
        } else {
            merged.push(a[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

/// Refine every bucket of regular-code suffixes with more than one member.
///
/// Buckets whose code contains a special digit are already in position
/// order, which is their final order.
fn refine_buckets<R: BucketRefiner>(
    sorted: &mut [SuffixEntry],
    codes: &[u32],
    coder: &PrefixCoder,
    refiner: &R,
) {
    let depth = coder.depth() as u64;
    let mut buckets: Vec<&mut [SuffixEntry]> = Vec::new();
    let mut rest = sorted;
    while !rest.is_empty() {
        let code = codes[rest[0] as usize];
        let len = rest
            .iter()
            .position(|&p| codes[p as usize] != code)
            .unwrap_or(rest.len());
        let (bucket, tail) = rest.split_at_mut(len);
        if len > 1 && !coder.is_special(code) {
            buckets.push(bucket);
        }
        rest = tail;
    }

    log::debug!("refining {} buckets at depth {}", buckets.len(), depth);
    buckets
        .par_iter_mut()
        .for_each(|bucket| refiner.refine(bucket, depth));
}

/// Sort by comparison, in parallel for large inputs
pub fn comparison_sort<F>(bucket: &mut [SuffixEntry], compare: F)
where
    F: Fn(&SuffixEntry, &SuffixEntry) -> Ordering + Sync,
{
    if bucket.len() > PARALLEL_SORT_THRESHOLD {
        bucket.par_sort_unstable_by(compare);
    } else {
        bucket.sort_unstable_by(compare);
    }
}

fn insertion_sort<F>(bucket: &mut [SuffixEntry], compare: F)
where
    F: Fn(SuffixEntry, SuffixEntry) -> Ordering,
{
    for i in 1..bucket.len() {
        let mut j = i;
        while j > 0 && compare(bucket[j - 1], bucket[j]) == Ordering::Greater {
            bucket.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Bucket refinement by size: insertion sort, comparison sort or a
/// one-symbol radix split
pub struct DirectRefiner<'a, S> {
    cmp: SuffixComparator<'a, S>,
    num_chars: usize,
    bounds: BucketBounds,
}

impl<'a, S: SymbolAccess> DirectRefiner<'a, S> {
    pub fn new(cmp: SuffixComparator<'a, S>, num_chars: usize, bounds: BucketBounds) -> Self {
        Self {
            cmp,
            num_chars,
            bounds,
        }
    }

    /// Distribute `bucket` by the symbol at `depth`.
    ///
    /// Returns the group boundaries; group `c` is `starts[c]..starts[c + 1]`
    /// and the group at `sigma` holds the suffixes ending in a special.
    fn radix_split(&self, bucket: &mut [SuffixEntry], depth: u64) -> Vec<usize> {
        let symbols = self.cmp.symbols();
        let sigma = self.num_chars;
        let keys: Vec<usize> = bucket
            .iter()
            .map(|&p| match Sym::at(symbols, p + depth) {
                Sym::Regular(c) => c as usize,
                Sym::Special(_) => sigma,
            })
            .collect();

        let mut starts = vec![0usize; sigma + 2];
        for &k in &keys {
            starts[k + 1] += 1;
        }
        for i in 1..starts.len() {
            starts[i] += starts[i - 1];
        }
        let mut next = starts.clone();
        let mut scratch = vec![0 as SuffixEntry; bucket.len()];
        for (&p, &k) in bucket.iter().zip(&keys) {
            scratch[next[k]] = p;
            next[k] += 1;
        }
        bucket.copy_from_slice(&scratch);

        // a special symbol at this depth is unique per suffix
        bucket[starts[sigma]..].sort_unstable();
        starts
    }
}

impl<S: SymbolAccess> BucketRefiner for DirectRefiner<'_, S> {
    fn refine(&self, bucket: &mut [SuffixEntry], depth: u64) {
        let cmp = self.cmp;
        // groups still to order, each sharing its first `depth` symbols
        let mut pending: Vec<(Range<usize>, u64)> = vec![(0..bucket.len(), depth)];
        while let Some((range, depth)) = pending.pop() {
            let offset = range.start;
            let group = &mut bucket[range];
            if group.len() <= 1 {
                continue;
            }
            if group.len() <= self.bounds.low {
                insertion_sort(group, |a, b| cmp.compare(a, b, depth));
            } else if group.len() <= self.bounds.high || depth >= self.bounds.max_depth {
                comparison_sort(group, |&a, &b| cmp.compare(a, b, depth));
            } else {
                let starts = self.radix_split(group, depth);
                for c in 0..self.num_chars {
                    if starts[c + 1] - starts[c] > 1 {
                        pending.push((offset + starts[c]..offset + starts[c + 1], depth + 1));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encseq::{EncodedSequence, SatelliteKind, SymbolVisitor};
    use crate::index::suffix_array::compare::tests::{encode, naive_key};

    fn naive_sa(encoded: &EncodedSequence) -> Vec<SuffixEntry> {
        let mut sa: Vec<SuffixEntry> = (0..encoded.total_length()).collect();
        sa.sort_by_key(|&p| naive_key(encoded, p));
        sa
    }

    struct Sort {
        depth: u32,
        store_special_codes: bool,
        bounds: BucketBounds,
    }

    impl SymbolVisitor for Sort {
        type Output = Vec<SuffixEntry>;
        fn visit<S: SymbolAccess>(self, s: &S) -> Vec<SuffixEntry> {
            let coder = PrefixCoder::new(4, self.depth);
            let codes: Vec<u32> = (0..s.total_length()).map(|p| coder.code(s, p)).collect();
            let refiner = DirectRefiner::new(SuffixComparator::new(s, false), 4, self.bounds);
            let positions: Vec<SuffixEntry> = (0..s.total_length()).collect();
            sort_partition(&coder, &codes, 0..coder.space(), &positions, self.store_special_codes, &refiner)
        }
    }

    #[test]
    fn test_direct_sort_matches_naive() {
        let text = b"ACGTTGCAANNACGTACGTTTTTTTTTTTTTTTACGACGACG|GGGGGGGGGGGGGGGGGGGGA|CA";
        let encoded = encode(text, SatelliteKind::Bit);
        let expected = naive_sa(&encoded);
        for depth in 1..=3 {
            for store_special_codes in [false, true] {
                for bounds in [
                    BucketBounds::default(),
                    BucketBounds { low: 1, high: 2, max_depth: 100 },
                    BucketBounds { low: 0, high: 0, max_depth: 3 },
                ] {
                    let sa = encoded.accept(Sort {
                        depth,
                        store_special_codes,
                        bounds,
                    });
                    assert_eq!(sa, expected, "depth {} store {} {:?}", depth, store_special_codes, bounds);
                }
            }
        }
    }

    #[test]
    fn test_deep_radix_split_on_long_run() {
        // every split peels off only the suffix reaching the end of the text
        let encoded = encode(&[b'A'; 10_000], SatelliteKind::Bit);
        let sa = encoded.accept(Sort {
            depth: 1,
            store_special_codes: false,
            bounds: BucketBounds { low: 2, high: 3, max_depth: 1_000_000 },
        });
        assert_eq!(sa, (0..10_000).collect::<Vec<SuffixEntry>>());
    }

    #[test]
    fn test_merge_by_code_keeps_run_order() {
        let codes = vec![3, 1, 2, 1, 4];
        let merged = merge_by_code(vec![1, 3, 2], vec![0, 4], &codes);
        assert_eq!(merged, vec![1, 3, 2, 0, 4]);
    }
}
