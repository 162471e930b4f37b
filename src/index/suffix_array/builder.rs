//! Suffix array builder
//!
//! Sorts all suffixes of an encoded text read in one direction:
//! 1. Compute the extended prefix code of every suffix
//! 2. Split the code space into balanced parts and group suffixes by part
//! 3. Sort each part independently (counting sort + bucket refinement)
//! 4. Concatenate the parts in code order
//!
//! Prefix doubling sorts the whole text at once and ignores parts.

use super::bucket::{sort_partition, BucketRefiner, DirectRefiner};
use super::compare::SuffixComparator;
use super::dcover::{DcRefiner, DifferenceCover, SampleRanks};
use super::doubling::sort_by_doubling;
use super::partition::{PartitionPlan, PrefixCoder};
use super::types::*;
use crate::encseq::{Direction, EncodedSequence, SymbolAccess, SymbolVisitor};
use crate::error::{Error, Result};
use crate::utils::progress::partition_bar;
use rayon::prelude::*;
use std::time::Instant;

/// A finished suffix array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltSuffixArray {
    pub suffixes: Vec<SuffixEntry>,
    pub direction: Direction,
    pub prefix_length: u32,
}

impl BuiltSuffixArray {
    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}

/// Builder for suffix arrays of encoded sequences
pub struct SuffixArrayBuilder {
    config: SortConfig,
}

impl SuffixArrayBuilder {
    pub fn new(config: SortConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sort the suffixes of `encoded` read in `direction`
    pub fn build(&self, encoded: &EncodedSequence, direction: Direction) -> Result<BuiltSuffixArray> {
        let config = &self.config;
        let num_chars = encoded.num_chars();
        if config.parts == 0 {
            return Err(Error::configuration("parts must be at least 1"));
        }
        if config.prefix_length == 0 {
            return Err(Error::configuration("prefix length must be at least 1"));
        }
        let space = (num_chars as u64 + 1).checked_pow(config.prefix_length);
        if space.is_none_or(|s| s > MAX_CODE_SPACE) {
            return Err(Error::configuration(format!(
                "prefix length {} is too large for an alphabet of {} characters",
                config.prefix_length, num_chars
            )));
        }
        if config.strategy == Strategy::Doubling && config.parts > 1 {
            return Err(Error::configuration(
                "prefix doubling cannot be combined with more than one part",
            ));
        }
        let cover = match config.strategy {
            Strategy::DifferenceCover { modulus } => Some(DifferenceCover::new(modulus)?),
            _ => None,
        };

        let start = Instant::now();
        log::info!(
            "sorting {} suffixes ({}, {}, prefix length {}, {} parts)",
            encoded.total_length(),
            direction,
            config.strategy,
            config.prefix_length,
            config.parts
        );
        let suffixes = encoded.accept_oriented(
            direction,
            Sort {
                config,
                num_chars,
                cover,
            },
        );
        log::info!("suffix sort finished in {:.2?}", start.elapsed());

        Ok(BuiltSuffixArray {
            suffixes,
            direction,
            prefix_length: config.prefix_length,
        })
    }
}

struct Sort<'c> {
    config: &'c SortConfig,
    num_chars: usize,
    cover: Option<DifferenceCover>,
}

impl SymbolVisitor for Sort<'_> {
    type Output = Vec<SuffixEntry>;

    fn visit<S: SymbolAccess>(self, symbols: &S) -> Vec<SuffixEntry> {
        let config = self.config;
        if config.strategy == Strategy::Doubling {
            return sort_by_doubling(symbols, self.num_chars);
        }

        let cmp = SuffixComparator::new(symbols, config.char_by_char);
        match self.cover {
            Some(cover) => {
                let ranks = SampleRanks::compute(symbols, cover, config.char_by_char);
                let refiner = DcRefiner::new(cmp, &ranks);
                sort_parts(symbols, config, self.num_chars, &refiner)
            }
            None => {
                let refiner = DirectRefiner::new(cmp, self.num_chars, config.bounds);
                sort_parts(symbols, config, self.num_chars, &refiner)
            }
        }
    }
}

/// Counting sort by prefix code, one partition per code range
fn sort_parts<S, R>(symbols: &S, config: &SortConfig, num_chars: usize, refiner: &R) -> Vec<SuffixEntry>
where
    S: SymbolAccess,
    R: BucketRefiner,
{
    let n = symbols.total_length();
    let coder = PrefixCoder::new(num_chars, config.prefix_length);
    let codes: Vec<u32> = (0..n).into_par_iter().map(|p| coder.code(symbols, p)).collect();
    let histogram = coder.histogram(&codes);
    let plan = PartitionPlan::balanced(&histogram, config.parts);
    for (i, size) in plan.sizes(&histogram).iter().enumerate() {
        log::debug!("part {}: codes {:?}, {} suffixes", i, plan.ranges()[i], size);
    }

    let members = plan.scatter(&codes, &histogram);

    let bar = partition_bar(plan.parts(), config.show_progress);
    let parts: Vec<Vec<SuffixEntry>> = plan
        .ranges()
        .par_iter()
        .zip(members.par_iter())
        .map(|(range, positions)| {
            let part = sort_partition(
                &coder,
                &codes,
                range.clone(),
                positions,
                config.store_special_codes,
                refiner,
            );
            if let Some(bar) = &bar {
                bar.inc(1);
            }
            part
        })
        .collect();
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let mut suffixes = Vec::with_capacity(n as usize);
    for part in parts {
        suffixes.extend(part);
    }
    suffixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encseq::SatelliteKind;
    use crate::index::suffix_array::compare::tests::{encode, naive_key};

    fn naive(encoded: &EncodedSequence, direction: Direction) -> Vec<SuffixEntry> {
        struct Keys;
        impl SymbolVisitor for Keys {
            type Output = Vec<SuffixEntry>;
            fn visit<S: SymbolAccess>(self, s: &S) -> Vec<SuffixEntry> {
                use crate::index::suffix_array::compare::Sym;
                let key = |mut p: u64| {
                    let mut key = Vec::new();
                    loop {
                        let sym = Sym::at(s, p);
                        key.push(sym);
                        if matches!(sym, Sym::Special(_)) {
                            return key;
                        }
                        p += 1;
                    }
                };
                let mut sa: Vec<u64> = (0..s.total_length()).collect();
                sa.sort_by_key(|&p| key(p));
                sa
            }
        }
        encoded.accept_oriented(direction, Keys)
    }

    const TEXT: &[u8] = b"ACGTACGTTTGACNNNACGGGGGGGGGGGGGGGGGGGGGGGGGGGTTTACGTACGATCGAT|ACGTACGTAC|NACGAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    #[test]
    fn test_strategies_agree() {
        let encoded = encode(TEXT, SatelliteKind::Uchar);
        let expected = naive(&encoded, Direction::Forward);

        for strategy in [
            Strategy::Direct,
            Strategy::Doubling,
            Strategy::DifferenceCover { modulus: 4 },
            Strategy::DifferenceCover { modulus: 32 },
        ] {
            for prefix_length in [1, 2, 3] {
                let config = SortConfig {
                    strategy,
                    prefix_length,
                    ..SortConfig::default()
                };
                let built = SuffixArrayBuilder::new(config).build(&encoded, Direction::Forward).unwrap();
                assert_eq!(built.suffixes, expected, "{} pl={}", strategy, prefix_length);
            }
        }
    }

    #[test]
    fn test_partitioned_output_is_identical() {
        let encoded = encode(TEXT, SatelliteKind::Bit);
        let single = SuffixArrayBuilder::new(SortConfig {
            prefix_length: 2,
            ..SortConfig::default()
        })
        .build(&encoded, Direction::Forward)
        .unwrap();
        for parts in [2, 3, 7, 40] {
            for store_special_codes in [false, true] {
                for char_by_char in [false, true] {
                    let config = SortConfig {
                        prefix_length: 2,
                        parts,
                        store_special_codes,
                        char_by_char,
                        ..SortConfig::default()
                    };
                    let built = SuffixArrayBuilder::new(config).build(&encoded, Direction::Forward).unwrap();
                    assert_eq!(built.suffixes, single.suffixes, "parts={}", parts);
                }
            }
        }
    }

    #[test]
    fn test_all_directions_are_sorted_permutations() {
        let encoded = encode(TEXT, SatelliteKind::Ushort);
        for direction in [
            Direction::Forward,
            Direction::Complement,
            Direction::Reverse,
            Direction::ReverseComplement,
        ] {
            let built = SuffixArrayBuilder::new(SortConfig {
                prefix_length: 2,
                parts: 3,
                ..SortConfig::default()
            })
            .build(&encoded, direction)
            .unwrap();
            assert_eq!(built.suffixes, naive(&encoded, direction), "{}", direction);
            let mut sorted = built.suffixes.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..encoded.total_length()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_rejects_invalid_configurations() {
        let encoded = encode(b"ACGT", SatelliteKind::Direct);
        let bad = [
            SortConfig { parts: 0, ..SortConfig::default() },
            SortConfig { prefix_length: 0, ..SortConfig::default() },
            SortConfig { prefix_length: 20, ..SortConfig::default() },
            SortConfig { strategy: Strategy::Doubling, parts: 2, ..SortConfig::default() },
            SortConfig { strategy: Strategy::DifferenceCover { modulus: 6 }, ..SortConfig::default() },
        ];
        for config in bad {
            let result = SuffixArrayBuilder::new(config.clone()).build(&encoded, Direction::Forward);
            assert!(matches!(result, Err(Error::Configuration(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_naive_key_agrees_with_forward_reference() {
        let encoded = encode(TEXT, SatelliteKind::Direct);
        let mut expected: Vec<u64> = (0..encoded.total_length()).collect();
        expected.sort_by_key(|&p| naive_key(&encoded, p));
        assert_eq!(naive(&encoded, Direction::Forward), expected);
    }
}
