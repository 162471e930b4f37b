//! Character map: canonicalizes raw residue bytes into a small code alphabet.
//!
//! Regular characters get codes `0..num_chars`. Wildcards (ambiguous
//! residues such as `N` or `X`) map to [`WILDCARD`] and sequence boundaries
//! are represented by [`SEPARATOR`]. Both are *special* symbols: they never
//! match anything during suffix comparison.

pub mod smap;

use crate::error::{Error, Result};
use crate::sequence::SequenceCollection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code of the boundary between two sequences
pub const SEPARATOR: u8 = u8::MAX;

/// Code shared by every wildcard character
pub const WILDCARD: u8 = u8::MAX - 1;

/// Marker for raw bytes outside the alphabet
pub const UNDEFINED: u8 = u8::MAX - 2;

/// Largest number of regular characters an alphabet may define
pub const MAX_CHARS: usize = 64;

const DNA_GROUPS: [&str; 4] = ["Aa", "Cc", "Gg", "TtUu"];
const DNA_WILDCARDS: &str = "NnSsYyWwRrKkVvBbDdHhMm";

const PROTEIN_CHARS: &[u8] = b"LVIFKREDAGSTNQYWPHMC";
const PROTEIN_WILDCARDS: &str = "XxUuBbZzOo*-";

/// Returns true for wildcard and separator codes
#[inline]
pub fn is_special(code: u8) -> bool {
    code >= WILDCARD
}

/// Kind of alphabet an index was built over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphabetKind {
    Dna,
    Protein,
    /// Defined by a translation table
    Custom,
}

/// Serializable description of an alphabet, stored in the project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphabetSpec {
    pub name: String,
    pub kind: AlphabetKind,
    /// Raw characters per regular code; the first one is printed
    pub groups: Vec<String>,
    pub wildcards: String,
}

/// Raw-byte-to-code map plus the canonical symbol set
#[derive(Clone, PartialEq, Eq)]
pub struct Alphabet {
    spec: AlphabetSpec,
    map: [u8; 256],
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alphabet")
            .field("name", &self.spec.name)
            .field("kind", &self.spec.kind)
            .field("num_chars", &self.num_chars())
            .finish()
    }
}

impl Alphabet {
    /// Build the map for a spec, rejecting characters assigned twice
    pub fn from_spec(spec: AlphabetSpec) -> Result<Self> {
        if spec.groups.is_empty() {
            return Err(Error::configuration(format!(
                "alphabet {} defines no regular characters",
                spec.name
            )));
        }
        if spec.groups.len() > MAX_CHARS {
            return Err(Error::configuration(format!(
                "alphabet {} defines {} characters, at most {} are supported",
                spec.name,
                spec.groups.len(),
                MAX_CHARS
            )));
        }

        let mut map = [UNDEFINED; 256];
        let groups = spec
            .groups
            .iter()
            .enumerate()
            .map(|(code, group)| (code as u8, group.as_str()));
        for (code, group) in groups.chain(std::iter::once((WILDCARD, spec.wildcards.as_str()))) {
            for &raw in group.as_bytes() {
                if map[raw as usize] != UNDEFINED {
                    return Err(Error::configuration(format!(
                        "alphabet {} assigns character '{}' more than once",
                        spec.name,
                        raw.escape_ascii()
                    )));
                }
                map[raw as usize] = code;
            }
        }

        Ok(Self { spec, map })
    }

    /// The nucleotide alphabet: A, C, G, T (U folds to T), IUPAC wildcards
    pub fn dna() -> Self {
        Self::builtin(AlphabetSpec {
            name: "dna".to_string(),
            kind: AlphabetKind::Dna,
            groups: DNA_GROUPS.iter().map(|g| g.to_string()).collect(),
            wildcards: DNA_WILDCARDS.to_string(),
        })
    }

    /// The 20 standard amino acids, ambiguity codes as wildcards
    pub fn protein() -> Self {
        Self::builtin(AlphabetSpec {
            name: "protein".to_string(),
            kind: AlphabetKind::Protein,
            groups: PROTEIN_CHARS
                .iter()
                .map(|&c| format!("{}{}", c as char, c.to_ascii_lowercase() as char))
                .collect(),
            wildcards: PROTEIN_WILDCARDS.to_string(),
        })
    }

    fn builtin(spec: AlphabetSpec) -> Self {
        match Self::from_spec(spec) {
            Ok(alphabet) => alphabet,
            Err(e) => unreachable!("built-in alphabet is malformed: {}", e),
        }
    }

    pub fn spec(&self) -> &AlphabetSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> AlphabetKind {
        self.spec.kind
    }

    /// Number of regular characters (σ)
    pub fn num_chars(&self) -> usize {
        self.spec.groups.len()
    }

    /// Four regular characters make a nucleotide alphabet, whatever its origin
    pub fn is_dna(&self) -> bool {
        self.spec.kind != AlphabetKind::Protein && self.num_chars() == 4
    }

    /// Code of a raw byte ([`UNDEFINED`] when outside the alphabet)
    #[inline]
    pub fn encode(&self, raw: u8) -> u8 {
        self.map[raw as usize]
    }

    /// Printable character of a code
    pub fn decode(&self, code: u8) -> u8 {
        match code {
            SEPARATOR => b'|',
            WILDCARD => self.spec.wildcards.as_bytes().first().copied().unwrap_or(b'?'),
            c => self
                .spec
                .groups
                .get(c as usize)
                .and_then(|g| g.as_bytes().first().copied())
                .unwrap_or(b'?'),
        }
    }

    /// Bits needed for a regular code
    pub fn bits_per_char(&self) -> u32 {
        bits_for(self.num_chars() as u64)
    }

    /// Bits needed for a regular code, a wildcard or a separator
    pub fn bits_per_symbol(&self) -> u32 {
        bits_for(self.num_chars() as u64 + 2)
    }
}

/// Smallest bit count able to represent `values` distinct values (at least 1)
pub fn bits_for(values: u64) -> u32 {
    if values <= 2 {
        1
    } else {
        64 - (values - 1).leading_zeros()
    }
}

/// Complement of a nucleotide code (A<->T, C<->G); specials are unchanged
#[inline]
pub fn complement(code: u8) -> u8 {
    if is_special(code) { code } else { 3 - code }
}

/// Guess whether raw residues look like nucleotides.
///
/// Every byte must be a nucleotide or an IUPAC nucleotide ambiguity code.
pub fn looks_like_dna(residues: &[u8]) -> bool {
    let dna = Alphabet::dna();
    residues.iter().all(|&raw| dna.encode(raw) != UNDEFINED)
}

/// How the alphabet of a build is determined
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AlphabetChoice {
    /// Guess DNA or protein from the residues of each file
    #[default]
    Auto,
    Dna,
    Protein,
    /// Built-in translation table name or smap file
    Smap(String),
}

impl AlphabetChoice {
    /// Alphabet for a collection; auto-detection must agree across files
    pub fn resolve(&self, collection: &SequenceCollection) -> Result<Alphabet> {
        match self {
            AlphabetChoice::Dna => Ok(Alphabet::dna()),
            AlphabetChoice::Protein => Ok(Alphabet::protein()),
            AlphabetChoice::Smap(name) => smap::load(name),
            AlphabetChoice::Auto => {
                let mut guessed: Option<(bool, &std::path::Path)> = None;
                for file in collection.files() {
                    let residues = collection.file_residues(file);
                    if residues.is_empty() {
                        continue;
                    }
                    let is_dna = looks_like_dna(residues);
                    match guessed {
                        None => guessed = Some((is_dna, &file.path)),
                        Some((first, first_path)) if first != is_dna => {
                            let kind = |dna: bool| if dna { "DNA" } else { "protein" };
                            return Err(Error::Alphabet(format!(
                                "cannot guess a common alphabet: {} looks like {} but {} looks like {}",
                                first_path.display(),
                                kind(first),
                                file.path.display(),
                                kind(is_dna)
                            )));
                        }
                        Some(_) => {}
                    }
                }
                let alphabet = match guessed {
                    Some((false, _)) => Alphabet::protein(),
                    _ => Alphabet::dna(),
                };
                log::info!("guessed alphabet: {}", alphabet.name());
                Ok(alphabet)
            }
        }
    }
}
