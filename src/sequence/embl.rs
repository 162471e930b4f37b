//! EMBL flat-file parser.
//!
//! A record starts with an `ID` line; `DE` lines form the description and
//! the sequence follows the `SQ` line up to the `//` terminator. Sequence
//! lines carry position numbers, which are dropped.

use super::{append_residues, is_blank, LineReader, SequenceRecord, SequenceSource};
use crate::error::Result;
use std::io::BufRead;

pub struct EmblReader<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> EmblReader<R> {
    pub fn new(lines: LineReader<R>) -> Self {
        Self { lines }
    }
}

impl<R: BufRead> SequenceSource for EmblReader<R> {
    fn next_record(&mut self) -> Result<Option<SequenceRecord>> {
        loop {
            if !self.lines.advance()? {
                return Ok(None);
            }
            let line = self.lines.line();
            if is_blank(line) {
                continue;
            }
            if line.starts_with(b"ID") {
                break;
            }
            return Err(self.lines.error("expected an ID line at the start of an EMBL record"));
        }
        let header_line = self.lines.line_number();

        let mut description = String::new();
        let mut residues = Vec::new();
        let mut in_sequence = false;
        loop {
            if !self.lines.advance()? {
                return Err(self.lines.error("EMBL record is missing its // terminator"));
            }
            let line = self.lines.line();
            if line.starts_with(b"//") {
                break;
            }
            if in_sequence {
                append_residues(line, true, &mut residues);
            } else if let Some(text) = line.strip_prefix(b"DE") {
                let text = String::from_utf8_lossy(text);
                if !description.is_empty() {
                    description.push(' ');
                }
                description.push_str(text.trim());
            } else if line.starts_with(b"SQ") {
                in_sequence = true;
            } else if line.starts_with(b"ID") {
                return Err(self.lines.error("EMBL record is missing its // terminator"));
            }
        }

        Ok(Some(SequenceRecord {
            description,
            residues,
            line: header_line,
        }))
    }
}
