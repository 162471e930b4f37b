//! Types for suffix array construction
//!
//! This module defines the sorting configuration shared by the strategies
//! and the tables produced from a finished suffix array.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix array entry - position in the oriented text
pub type SuffixEntry = u64;

/// Default bucket-size bounds (`--algbds 10 31 80`)
pub const DEFAULT_BOUNDS: BucketBounds = BucketBounds {
    low: 10,
    high: 31,
    max_depth: 80,
};

/// Largest extended prefix-code space a counting sort may use
pub const MAX_CODE_SPACE: u64 = 1 << 24;

/// Below this size buckets are sorted sequentially
pub const PARALLEL_SORT_THRESHOLD: usize = 100_000;

/// Suffix sorting algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "name")]
pub enum Strategy {
    /// Counting sort on prefix codes, then per-bucket refinement
    #[default]
    Direct,
    /// Prefix doubling over the whole text
    Doubling,
    /// Difference-cover sample ranks resolve ties
    DifferenceCover { modulus: u32 },
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => f.write_str("direct"),
            Strategy::Doubling => f.write_str("doubling"),
            Strategy::DifferenceCover { modulus } => write!(f, "difference cover (v={})", modulus),
        }
    }
}

/// Thresholds choosing how a bucket is refined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketBounds {
    /// Insertion sort up to this size
    pub low: usize,
    /// Comparison sort up to this size
    pub high: usize,
    /// Radix splitting stops at this depth
    pub max_depth: u64,
}

impl Default for BucketBounds {
    fn default() -> Self {
        DEFAULT_BOUNDS
    }
}

/// Configuration for suffix sorting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig {
    pub strategy: Strategy,
    /// Depth of the prefix code used for the counting sort and partitioning
    pub prefix_length: u32,
    pub parts: usize,
    pub bounds: BucketBounds,
    /// Compare one symbol at a time instead of word-sized blocks
    pub char_by_char: bool,
    /// Keep prefixes containing a special symbol in the counting sort
    pub store_special_codes: bool,
    pub show_progress: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Direct,
            prefix_length: 1,
            parts: 1,
            bounds: BucketBounds::default(),
            char_by_char: false,
            store_special_codes: false,
            show_progress: false,
        }
    }
}

/// One bucket of the bucket-boundary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketEntry {
    /// Rank of the first suffix with this prefix
    pub left: u64,
    pub count: u64,
}
