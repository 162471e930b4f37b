//! Symbol-map (smap) translation tables.
//!
//! An smap file lists one character group per line: every character of a
//! line maps to the same code and the first one is used for output. The
//! last group holds the wildcards. Blank lines and lines starting with `#`
//! are ignored.
//!
//! ```text
//! # reduced protein alphabet
//! LVIM
//! C
//! ...
//! XBZUO*-
//! ```

use super::{Alphabet, AlphabetKind, AlphabetSpec};
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

const TRANS_PROT11: &str = "\
# eleven-class protein alphabet
LVIMlvim
Cc
Aa
Gg
STst
Pp
FYWfyw
EDed
NQnq
KRkr
Hh
XBZUOxbzuo*-
";

/// Names of the built-in translation tables
pub const BUILTIN_NAMES: [&str; 2] = ["TransDNA", "TransProt11"];

/// Resolve a translation table by built-in name or file path
pub fn load(name: &str) -> Result<Alphabet> {
    match name {
        "TransDNA" => trans_dna(),
        "TransProt11" => parse("TransProt11", TRANS_PROT11),
        _ => {
            let path = Path::new(name);
            if !path.is_file() {
                return Err(Error::configuration(format!(
                    "unknown translation table {} (expected {} or an smap file)",
                    name,
                    BUILTIN_NAMES.join(", ")
                )));
            }
            let text = fs::read_to_string(path).map_err(|e| Error::file("read", path, e))?;
            let table_name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string());
            parse(&table_name, &text)
        }
    }
}

/// `TransDNA` is the nucleotide alphabet under its smap name
fn trans_dna() -> Result<Alphabet> {
    let mut spec = Alphabet::dna().spec().clone();
    spec.name = "TransDNA".to_string();
    Alphabet::from_spec(spec)
}

/// Parse smap text into an alphabet
pub fn parse(name: &str, text: &str) -> Result<Alphabet> {
    let mut groups: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect())
        .collect();

    if let Some(bad) = groups.iter().flat_map(|g| g.chars()).find(|c| !c.is_ascii()) {
        return Err(Error::configuration(format!(
            "translation table {} contains non-ASCII character '{}'",
            name, bad
        )));
    }

    let wildcards = match groups.len() {
        0 | 1 => {
            return Err(Error::configuration(format!(
                "translation table {} needs at least one character group and a wildcard line",
                name
            )));
        }
        _ => groups.pop().unwrap_or_default(),
    };

    let kind = if groups.len() == 4 {
        AlphabetKind::Dna
    } else {
        AlphabetKind::Custom
    };
    log::debug!(
        "translation table {}: {} characters, {} wildcards",
        name,
        groups.len(),
        wildcards.len()
    );

    Alphabet::from_spec(AlphabetSpec {
        name: name.to_string(),
        kind,
        groups,
        wildcards,
    })
}
