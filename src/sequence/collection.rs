//! Concatenation of the records of all input files.

use super::{open_source, SequenceFormat, SequenceRecord};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Per-file summary, persisted in the project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub format: SequenceFormat,
    /// Index of the first sequence of this file within the collection
    pub first_sequence: u64,
    pub sequences: u64,
    pub residues: u64,
}

/// Ordered sequences of one or more files.
///
/// Residues are stored without separators; a separator sits between each
/// pair of consecutive sequences in the concatenated text, so the text
/// length is `residues + sequences - 1`.
#[derive(Debug, Clone, Default)]
pub struct SequenceCollection {
    files: Vec<FileInfo>,
    residues: Vec<u8>,
    /// Exclusive end offset of each sequence in `residues`
    ends: Vec<u64>,
    descriptions: Vec<String>,
}

impl SequenceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and concatenate files in the given order
    pub fn read(paths: &[PathBuf]) -> Result<Self> {
        let mut collection = Self::new();
        for path in paths {
            collection.read_file(path)?;
        }
        Ok(collection)
    }

    /// Append the records of one file
    pub fn read_file(&mut self, path: &Path) -> Result<()> {
        let (format, mut source) = open_source(path)?;
        let first_sequence = self.num_sequences() as u64;
        let residues_before = self.residues.len() as u64;

        while let Some(record) = source.next_record()? {
            self.push(record);
        }

        let info = FileInfo {
            path: path.to_path_buf(),
            format,
            first_sequence,
            sequences: self.num_sequences() as u64 - first_sequence,
            residues: self.residues.len() as u64 - residues_before,
        };
        log::debug!(
            "{}: {} sequences, {} residues",
            path.display(),
            info.sequences,
            info.residues
        );
        self.files.push(info);
        Ok(())
    }

    /// Append one record to the last file
    pub fn push(&mut self, record: SequenceRecord) {
        self.residues.extend_from_slice(&record.residues);
        self.ends.push(self.residues.len() as u64);
        self.descriptions.push(record.description);
    }

    /// Register records pushed directly as coming from `path`
    pub fn finish_file(&mut self, path: &Path, format: SequenceFormat) {
        let first_sequence = self.files.last().map_or(0, |f| f.first_sequence + f.sequences);
        let first_residue = if first_sequence == 0 {
            0
        } else {
            self.ends[first_sequence as usize - 1]
        };
        self.files.push(FileInfo {
            path: path.to_path_buf(),
            format,
            first_sequence,
            sequences: self.num_sequences() as u64 - first_sequence,
            residues: self.residues.len() as u64 - first_residue,
        });
    }

    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    pub fn num_sequences(&self) -> usize {
        self.ends.len()
    }

    pub fn num_residues(&self) -> u64 {
        self.residues.len() as u64
    }

    /// Length of the concatenated text, separators included
    pub fn total_length(&self) -> u64 {
        match self.num_sequences() {
            0 => 0,
            n => self.num_residues() + n as u64 - 1,
        }
    }

    /// Residue range of sequence `i`
    pub fn range(&self, i: usize) -> Range<usize> {
        let start = if i == 0 { 0 } else { self.ends[i - 1] as usize };
        start..self.ends[i] as usize
    }

    pub fn sequence(&self, i: usize) -> &[u8] {
        &self.residues[self.range(i)]
    }

    pub fn sequences(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.num_sequences()).map(move |i| self.sequence(i))
    }

    /// All residues of one file
    pub fn file_residues(&self, file: &FileInfo) -> &[u8] {
        if file.sequences == 0 {
            return &[];
        }
        let first = file.first_sequence as usize;
        let last = first + file.sequences as usize - 1;
        &self.residues[self.range(first).start..self.range(last).end]
    }

    /// File a sequence was read from
    pub fn file_of(&self, sequence: usize) -> Option<&FileInfo> {
        self.files.iter().find(|f| {
            let first = f.first_sequence as usize;
            (first..first + f.sequences as usize).contains(&sequence)
        })
    }

    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    /// Positions of the separators in the concatenated text
    pub fn separator_positions(&self) -> Vec<u64> {
        let n = self.num_sequences();
        self.ends
            .iter()
            .take(n.saturating_sub(1))
            .enumerate()
            .map(|(i, &end)| end + i as u64)
            .collect()
    }

    /// Common sequence length when every sequence has the same length
    pub fn equal_length(&self) -> Option<u64> {
        let first = self.ends.first().copied()?;
        (1..self.num_sequences())
            .all(|i| self.ends[i] - self.ends[i - 1] == first)
            .then_some(first)
    }

    /// Fail on an empty text
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.num_residues() > 0 {
            return Ok(());
        }
        let path = self
            .files
            .first()
            .map(|f| f.path.clone())
            .unwrap_or_default();
        Err(Error::format(&path, 0, "input contains no residues"))
    }
}
