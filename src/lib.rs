//! # sfxidx - Suffix Array Indexes for Sequence Collections
//!
//! sfxidx reads DNA or protein sequence collections (FASTA, FASTQ, EMBL,
//! GenBank), encodes them in a compact satellite representation and builds
//! an enhanced suffix array over the concatenated text: the suffix table
//! plus its LCP array, Burrows-Wheeler transform and bucket-boundary table.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`sequence`] - Sequence file readers and the concatenated collection
//! - [`alphabet`] - Character maps (DNA, protein, translation tables)
//! - [`encseq`] - Satellite encodings of the symbol sequence
//! - [`index`] - Suffix sorting, derived tables, index writer and reader
//! - [`config`] - Build and map configuration
//! - [`utils`] - Table codecs and progress bars
//!
//! ## Quick Start
//!
//! ```ignore
//! use sfxidx::config::BuildOptions;
//! use sfxidx::index::{build_index, IndexReader, ReadMode, TableKind, TableSet, Trials};
//! use std::path::PathBuf;
//!
//! let options = BuildOptions {
//!     inputs: vec![PathBuf::from("at1MB.fna")],
//!     tables: Some([TableKind::Tis, TableKind::Suf, TableKind::Lcp].into_iter().collect()),
//!     ..Default::default()
//! };
//! let summary = build_index(&options.validate()?)?;
//!
//! let reader = IndexReader::open(&summary.index_name, summary.tables, ReadMode::Mapped)?;
//! reader.verify(Trials::default())?;
//! ```
//!
//! ## Construction
//!
//! The suffix table is sorted by one of three interchangeable strategies
//! (bucket refinement after a counting sort, prefix doubling, or a
//! difference-cover sample) that produce identical output. The prefix-code
//! space can be split into partitions sorted in parallel on a rayon pool.

pub mod alphabet;
pub mod config;
pub mod encseq;
pub mod error;
pub mod index;
pub mod sequence;
pub mod utils;

pub use error::{Error, Result};
