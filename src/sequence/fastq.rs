//! FastQ parser.
//!
//! Records are `@header`, one or more sequence lines, a `+` separator line
//! and quality lines whose total length must equal the sequence length.
//! Quality characters may start with `@`, so quality lines are consumed by
//! length rather than by looking for the next header.

use super::{append_residues, is_blank, LineReader, SequenceRecord, SequenceSource};
use crate::error::Result;
use std::io::BufRead;

pub struct FastqReader<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(lines: LineReader<R>) -> Self {
        Self { lines }
    }
}

impl<R: BufRead> SequenceSource for FastqReader<R> {
    fn next_record(&mut self) -> Result<Option<SequenceRecord>> {
        let description = loop {
            if !self.lines.advance()? {
                return Ok(None);
            }
            let line = self.lines.line();
            if is_blank(line) {
                continue;
            }
            match line.strip_prefix(b"@") {
                Some(header) => break String::from_utf8_lossy(header).trim().to_string(),
                None => return Err(self.lines.error("expected '@' at the start of a FastQ record")),
            }
        };
        let header_line = self.lines.line_number();

        let mut residues = Vec::new();
        loop {
            if !self.lines.advance()? {
                return Err(self.lines.error("FastQ record ends without a '+' line"));
            }
            if self.lines.line().first() == Some(&b'+') {
                break;
            }
            append_residues(self.lines.line(), false, &mut residues);
        }

        let mut quality = 0usize;
        while quality < residues.len() {
            if !self.lines.advance()? {
                break;
            }
            quality += self
                .lines
                .line()
                .iter()
                .filter(|b| !b.is_ascii_whitespace())
                .count();
        }
        if quality != residues.len() {
            return Err(self.lines.error(format!(
                "quality length {} does not match sequence length {}",
                quality,
                residues.len()
            )));
        }

        Ok(Some(SequenceRecord {
            description,
            residues,
            line: header_line,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sequence::lines_of;

    fn read_all(text: &str) -> Result<Vec<SequenceRecord>> {
        let mut reader = FastqReader::new(lines_of(text));
        let mut records = Vec::new();
        while let Some(record) = reader.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    #[test]
    fn test_single_line_records() {
        let records = read_all("@r1\nACGT\n+\nIIII\n@r2\nGG\n+r2\n@@\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].residues, b"ACGT");
        assert_eq!(records[1].description, "r2");
        assert_eq!(records[1].residues, b"GG");
    }

    #[test]
    fn test_multiline_record() {
        let records = read_all("@r1 multi\nACG\nTAC\n+\nIII\n@II\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "r1 multi");
        assert_eq!(records[0].residues, b"ACGTAC");
    }

    #[test]
    fn test_quality_length_mismatch() {
        match read_all("@r1\nACGT\n+\nIIIII\n") {
            Err(Error::Format { message, .. }) => assert!(message.contains("quality length 5")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(read_all("@r1\nACGT\n+\nII\n").is_err());
    }
}
