//! Prefix doubling.
//!
//! Used both as a whole-text strategy and to rank the sample suffixes of a
//! difference cover.

use super::compare::Sym;
use super::types::SuffixEntry;
use crate::encseq::SymbolAccess;
use rayon::prelude::*;
use std::ops::Range;

/// Sort every suffix of the text by prefix doubling
pub fn sort_by_doubling<S: SymbolAccess>(symbols: &S, num_chars: usize) -> Vec<SuffixEntry> {
    let n = symbols.total_length();
    let sigma = num_chars as u64;
    let initial = |p: u64| match Sym::at(symbols, p) {
        Sym::Regular(c) => c as u64,
        Sym::Special(q) => sigma + q,
    };

    let mut order: Vec<SuffixEntry> = (0..n).collect();
    order.par_sort_unstable_by_key(|&p| initial(p));

    let mut ranks = vec![0u64; n as usize];
    let groups = group_ranks(&order, &mut ranks, |p| p as usize, |a, b| initial(a) == initial(b));
    log::debug!("doubling: {} unsorted groups after the first symbol", groups.len());

    double_until_unique(&mut order, &mut ranks, groups, 1, n, |p| p as usize);
    order
}

/// Assign group-start ranks to a sorted `order` and return the groups with
/// more than one member
pub(super) fn group_ranks<F, E>(order: &[u64], ranks: &mut [u64], slot: F, equal: E) -> Vec<Range<usize>>
where
    F: Fn(u64) -> usize,
    E: Fn(u64, u64) -> bool,
{
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 0..order.len() {
        if i > 0 && !equal(order[i - 1], order[i]) {
            if i - start > 1 {
                groups.push(start..i);
            }
            start = i;
        }
        ranks[slot(order[i])] = start as u64;
    }
    if order.len() - start > 1 {
        groups.push(start..order.len());
    }
    groups
}

/// Refine `groups` of `order`, whose members share their first `h` symbols,
/// until every suffix has its own rank.
///
/// `ranks` holds group-start ranks at `slot(p)`; suffixes at or beyond
/// `total_length` rank last.
pub(super) fn double_until_unique<F>(
    order: &mut [u64],
    ranks: &mut [u64],
    mut groups: Vec<Range<usize>>,
    mut h: u64,
    total_length: u64,
    slot: F,
) where
    F: Fn(u64) -> usize + Sync,
{
    while !groups.is_empty() {
        let results: Vec<(Vec<(u64, u64)>, Vec<Range<usize>>)> = {
            let current: &[u64] = ranks;
            let key = |p: u64| {
                if p >= total_length {
                    u64::MAX
                } else {
                    current[slot(p)]
                }
            };

            let mut slices = Vec::with_capacity(groups.len());
            let mut rest: &mut [u64] = order;
            let mut offset = 0;
            for g in &groups {
                let (_, tail) = std::mem::take(&mut rest).split_at_mut(g.start - offset);
                let (group, tail) = tail.split_at_mut(g.len());
                slices.push((g.start, group));
                rest = tail;
                offset = g.end;
            }

            slices
                .into_par_iter()
                .map(|(start, group)| {
                    group.sort_unstable_by_key(|&p| key(p + h));
                    let mut updates = Vec::with_capacity(group.len());
                    let mut subgroups = Vec::new();
                    let mut i = 0;
                    while i < group.len() {
                        let k = key(group[i] + h);
                        let mut j = i + 1;
                        while j < group.len() && key(group[j] + h) == k {
                            j += 1;
                        }
                        for &p in &group[i..j] {
                            updates.push((p, (start + i) as u64));
                        }
                        if j - i > 1 {
                            subgroups.push(start + i..start + j);
                        }
                        i = j;
                    }
                    (updates, subgroups)
                })
                .collect()
        };

        groups = Vec::new();
        for (updates, subgroups) in results {
            for (p, rank) in updates {
                ranks[slot(p)] = rank;
            }
            groups.extend(subgroups);
        }
        log::trace!("doubling: h={} leaves {} groups", h, groups.len());
        h *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encseq::{SatelliteKind, SymbolVisitor};
    use crate::index::suffix_array::compare::tests::{encode, naive_key};

    struct Doubling;

    impl SymbolVisitor for Doubling {
        type Output = Vec<SuffixEntry>;
        fn visit<S: SymbolAccess>(self, s: &S) -> Vec<SuffixEntry> {
            sort_by_doubling(s, 4)
        }
    }

    #[test]
    fn test_doubling_matches_naive() {
        for text in [
            &b"AAAAAAAAAAAAAAAAAAAA"[..],
            b"ACGTNACGT|ACGTACGT|A",
            b"GATTACA",
            b"A",
            b"CCCCNNNNCCCC|CCCC",
        ] {
            let encoded = encode(text, SatelliteKind::Direct);
            let mut expected: Vec<u64> = (0..encoded.total_length()).collect();
            expected.sort_by_key(|&p| naive_key(&encoded, p));
            assert_eq!(encoded.accept(Doubling), expected, "{}", String::from_utf8_lossy(text));
        }
    }

    #[test]
    fn test_group_ranks() {
        let order = vec![4, 1, 3, 0, 2];
        let keys = [1, 0, 1, 1, 0];
        let mut ranks = vec![0; 5];
        let groups = group_ranks(&order, &mut ranks, |p| p as usize, |a, b| keys[a as usize] == keys[b as usize]);
        assert_eq!(groups, vec![0..2, 2..5]);
        assert_eq!(ranks, vec![2, 0, 2, 2, 0]);
    }
}
