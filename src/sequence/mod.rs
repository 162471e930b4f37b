//! Multi-format sequence reading.
//!
//! Each supported format implements [`SequenceSource`]; [`open_source`]
//! sniffs the format of a file from its first non-blank line and returns the
//! matching parser. [`SequenceCollection`] concatenates the records of one or
//! more files.

pub mod collection;
pub mod embl;
pub mod fasta;
pub mod fastq;
pub mod genbank;

pub use collection::{FileInfo, SequenceCollection};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One parsed sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub description: String,
    /// Raw residue bytes with layout whitespace removed
    pub residues: Vec<u8>,
    /// Line of the record header, for diagnostics
    pub line: usize,
}

/// Produces the records of one input, in file order
pub trait SequenceSource {
    fn next_record(&mut self) -> Result<Option<SequenceRecord>>;
}

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceFormat {
    Fasta,
    Fastq,
    Embl,
    GenBank,
}

impl SequenceFormat {
    /// Recognize a format from the first non-blank line of a file
    pub fn sniff(first_line: &[u8]) -> Option<Self> {
        match first_line {
            [b'>', ..] => Some(SequenceFormat::Fasta),
            [b'@', ..] => Some(SequenceFormat::Fastq),
            line if line.starts_with(b"ID ") => Some(SequenceFormat::Embl),
            line if line.starts_with(b"LOCUS") => Some(SequenceFormat::GenBank),
            _ => None,
        }
    }
}

impl fmt::Display for SequenceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequenceFormat::Fasta => "FASTA",
            SequenceFormat::Fastq => "FastQ",
            SequenceFormat::Embl => "EMBL",
            SequenceFormat::GenBank => "GenBank",
        };
        f.write_str(name)
    }
}

/// Line-oriented reader with one line of push-back.
///
/// Lines are returned without their terminator (`\n` or `\r\n`).
pub struct LineReader<R> {
    reader: R,
    path: PathBuf,
    line: Vec<u8>,
    line_number: usize,
    pushed_back: bool,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R, path: &Path) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            line: Vec::with_capacity(256),
            line_number: 0,
            pushed_back: false,
        }
    }

    /// Move to the next line; false at end of input
    pub fn advance(&mut self) -> Result<bool> {
        if self.pushed_back {
            self.pushed_back = false;
            return Ok(true);
        }
        self.line.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.line)
            .map_err(|e| Error::file("read", &self.path, e))?;
        if read == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        while matches!(self.line.last(), Some(b'\n' | b'\r')) {
            self.line.pop();
        }
        Ok(true)
    }

    /// Make the next [`advance`](Self::advance) return the current line again
    pub fn push_back(&mut self) {
        self.pushed_back = true;
    }

    pub fn line(&self) -> &[u8] {
        &self.line
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format error at the current line
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::format(&self.path, self.line_number, message)
    }
}

/// True for lines made only of whitespace
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Append the residues of a sequence line, dropping layout characters
/// (whitespace, and digits when `skip_digits` is set)
pub fn append_residues(line: &[u8], skip_digits: bool, residues: &mut Vec<u8>) {
    residues.extend(
        line.iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace() && !(skip_digits && b.is_ascii_digit())),
    );
}

/// Open a sequence file, sniffing its format
pub fn open_source(path: &Path) -> Result<(SequenceFormat, Box<dyn SequenceSource>)> {
    let file = File::open(path).map_err(|e| Error::file("open", path, e))?;
    let reader = BufReader::with_capacity(64 * 1024, file);
    let mut lines = LineReader::new(reader, path);

    loop {
        if !lines.advance()? {
            return Err(Error::format(path, lines.line_number(), "empty file"));
        }
        if !is_blank(lines.line()) {
            break;
        }
    }

    let format = SequenceFormat::sniff(lines.line()).ok_or_else(|| {
        lines.error("unrecognized sequence format (expected FASTA, FastQ, EMBL or GenBank)")
    })?;
    lines.push_back();

    log::debug!("{}: {} format", path.display(), format);
    let source: Box<dyn SequenceSource> = match format {
        SequenceFormat::Fasta => Box::new(fasta::FastaReader::new(lines)),
        SequenceFormat::Fastq => Box::new(fastq::FastqReader::new(lines)),
        SequenceFormat::Embl => Box::new(embl::EmblReader::new(lines)),
        SequenceFormat::GenBank => Box::new(genbank::GenBankReader::new(lines)),
    };
    Ok((format, source))
}

/// Read every record of a file
pub fn read_records(path: &Path) -> Result<Vec<SequenceRecord>> {
    let (_, mut source) = open_source(path)?;
    let mut records = Vec::new();
    while let Some(record) = source.next_record()? {
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
pub(crate) fn lines_of(text: &str) -> LineReader<&[u8]> {
    LineReader::new(text.as_bytes(), Path::new("test.seq"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff() {
        assert_eq!(SequenceFormat::sniff(b">seq1"), Some(SequenceFormat::Fasta));
        assert_eq!(SequenceFormat::sniff(b"@read"), Some(SequenceFormat::Fastq));
        assert_eq!(SequenceFormat::sniff(b"ID   X56734"), Some(SequenceFormat::Embl));
        assert_eq!(SequenceFormat::sniff(b"LOCUS       X"), Some(SequenceFormat::GenBank));
        assert_eq!(SequenceFormat::sniff(b"ACGT"), None);
    }

    #[test]
    fn test_line_reader_push_back() {
        let mut lines = lines_of("one\r\ntwo\n");
        assert!(lines.advance().unwrap());
        assert_eq!(lines.line(), b"one");
        lines.push_back();
        assert!(lines.advance().unwrap());
        assert_eq!(lines.line(), b"one");
        assert!(lines.advance().unwrap());
        assert_eq!(lines.line(), b"two");
        assert_eq!(lines.line_number(), 2);
        assert!(!lines.advance().unwrap());
    }

    #[test]
    fn test_empty_file_is_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.fna");
        fs::write(&path, "\n\n").unwrap();
        assert!(matches!(open_source(&path), Err(Error::Format { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = open_source(&dir.path().join("absent.fna"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_unknown_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, "ACGT\n").unwrap();
        match open_source(&path) {
            Err(Error::Format { line, .. }) => assert_eq!(line, 1),
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("plain text accepted"),
        }
    }
}
