//! FASTA parser: `>` header lines followed by any number of sequence lines.

use super::{append_residues, is_blank, LineReader, SequenceRecord, SequenceSource};
use crate::error::Result;
use std::io::BufRead;

pub struct FastaReader<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(lines: LineReader<R>) -> Self {
        Self { lines }
    }
}

impl<R: BufRead> SequenceSource for FastaReader<R> {
    fn next_record(&mut self) -> Result<Option<SequenceRecord>> {
        let header = loop {
            if !self.lines.advance()? {
                return Ok(None);
            }
            let line = self.lines.line();
            if is_blank(line) {
                continue;
            }
            match line.strip_prefix(b">") {
                Some(header) => break String::from_utf8_lossy(header).trim().to_string(),
                None => return Err(self.lines.error("sequence data before the first header")),
            }
        };
        let line = self.lines.line_number();

        let mut residues = Vec::new();
        while self.lines.advance()? {
            if self.lines.line().first() == Some(&b'>') {
                self.lines.push_back();
                break;
            }
            append_residues(self.lines.line(), false, &mut residues);
        }

        Ok(Some(SequenceRecord {
            description: header,
            residues,
            line,
        }))
    }
}
