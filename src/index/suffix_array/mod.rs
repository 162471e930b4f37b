//! Suffix array construction
//!
//! Sorts every suffix of an encoded text and derives the LCP array, the
//! Burrows-Wheeler transform and the bucket-boundary table from the result.
//!
//! ## Architecture
//!
//! - `compare`: Suffix order over special symbols, block and char comparison
//! - `partition`: Extended prefix codes and the balanced partition plan
//! - `bucket`: Counting sort of one partition plus bucket refinement
//! - `doubling`: Prefix doubling
//! - `dcover`: Difference-cover sample ranks and comparator
//! - `builder`: Strategy selection and the parallel partition loop
//! - `derived`: LCP, BWT and bucket-boundary tables
//! - `writer` / `reader`: Table payload codecs
//! - `types`: Sort configuration

pub mod bucket;
pub mod builder;
pub mod compare;
pub mod dcover;
pub mod derived;
pub mod doubling;
pub mod partition;
pub mod reader;
pub mod types;
pub mod writer;

// Re-exports for convenience
pub use builder::{BuiltSuffixArray, SuffixArrayBuilder};
pub use derived::{DerivedSelection, DerivedTables};
pub use reader::{LcpStream, SuffixArrayReader, TableStream, STREAM_BUFFER_SIZE};
pub use types::*;
pub use writer::SuffixArrayWriter;
