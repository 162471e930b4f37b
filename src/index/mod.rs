pub mod build;
pub mod reader;
pub mod stats;
pub mod suffix_array;
pub mod types;
pub mod writer;

pub use build::{build_index, BuildSummary};
pub use reader::{IndexReader, ReadMode, Trials};
pub use types::*;
pub use writer::IndexWriter;
