//! GenBank flat-file parser.
//!
//! A record starts with `LOCUS`; the `DEFINITION` field (with its indented
//! continuation lines) is the description and the sequence follows `ORIGIN`
//! up to the `//` terminator.

use super::{append_residues, is_blank, LineReader, SequenceRecord, SequenceSource};
use crate::error::Result;
use std::io::BufRead;

pub struct GenBankReader<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> GenBankReader<R> {
    pub fn new(lines: LineReader<R>) -> Self {
        Self { lines }
    }
}

/// Keyword of a field line (empty for continuation lines)
fn keyword(line: &[u8]) -> &[u8] {
    if line.first().is_some_and(u8::is_ascii_whitespace) {
        return &[];
    }
    let end = memchr::memchr(b' ', line).unwrap_or(line.len());
    &line[..end]
}

impl<R: BufRead> SequenceSource for GenBankReader<R> {
    fn next_record(&mut self) -> Result<Option<SequenceRecord>> {
        loop {
            if !self.lines.advance()? {
                return Ok(None);
            }
            let line = self.lines.line();
            if is_blank(line) {
                continue;
            }
            if keyword(line) == b"LOCUS" {
                break;
            }
            return Err(self.lines.error("expected a LOCUS line at the start of a GenBank record"));
        }
        let header_line = self.lines.line_number();

        let mut description = String::new();
        let mut residues = Vec::new();
        let mut in_definition = false;
        let mut in_sequence = false;
        loop {
            if !self.lines.advance()? {
                return Err(self.lines.error("GenBank record is missing its // terminator"));
            }
            let line = self.lines.line();
            if line.starts_with(b"//") {
                break;
            }
            if in_sequence {
                append_residues(line, true, &mut residues);
                continue;
            }
            match keyword(line) {
                b"DEFINITION" => {
                    in_definition = true;
                    description = String::from_utf8_lossy(&line[10..]).trim().to_string();
                }
                b"" if in_definition => {
                    description.push(' ');
                    description.push_str(String::from_utf8_lossy(line).trim());
                }
                b"ORIGIN" => in_sequence = true,
                b"LOCUS" => {
                    return Err(self.lines.error("GenBank record is missing its // terminator"));
                }
                _ => in_definition = false,
            }
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

    const RECORD: &str = "\
LOCUS       X1                        12 bp    DNA     linear   UNC
DEFINITION  first test
            sequence
ACCESSION   X1
FEATURES             Location/Qualifiers
ORIGIN
        1 acgtacgtac gt
//
";

    #[test]
    fn test_record() {
        let mut reader = GenBankReader::new(lines_of(RECORD));
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.description, "first test sequence");
        assert_eq!(record.residues, b"acgtacgtacgt");
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_missing_terminator() {
        let text = RECORD.trim_end_matches("//\n");
        let mut reader = GenBankReader::new(lines_of(text));
        assert!(matches!(reader.next_record(), Err(Error::Format { .. })));
    }

    #[test]
    fn test_keyword() {
        assert_eq!(keyword(b"ORIGIN      "), b"ORIGIN");
        assert_eq!(keyword(b"            cont"), b"");
    }
}
